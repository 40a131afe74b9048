use std::cell::RefCell;
use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Value;

use invoicekit::error::{InvoiceError, Result};
use invoicekit::flow::{Generation, GenerationFlow};
use invoicekit::invoice::{DownloadPolicy, InvoiceFormState, LineItem, PaymentTerms, ValidationFailure};
use invoicekit::services::{
    ActivityKind, CheckoutSession, DocumentGenerator, DocumentRequest, EmailKind, Identity, Mailer,
    PaymentGateway, PaymentRequest, Profile, ProfileStore, User,
};

#[derive(Default)]
struct FakeDocuments {
    requests: RefCell<Vec<DocumentRequest>>,
    fail_with: Option<String>,
}

impl DocumentGenerator for FakeDocuments {
    fn generate(&self, request: &DocumentRequest) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(request.clone());
        match &self.fail_with {
            Some(message) => Err(InvoiceError::DocumentService(message.clone())),
            None => Ok(b"%PDF-1.4".to_vec()),
        }
    }
}

#[derive(Default)]
struct FakePayments {
    requests: RefCell<Vec<PaymentRequest>>,
}

impl PaymentGateway for FakePayments {
    fn create_session(&self, request: &PaymentRequest) -> Result<CheckoutSession> {
        self.requests.borrow_mut().push(request.clone());
        Ok(CheckoutSession {
            session_id: "cs_test_1".to_string(),
            url: Some("https://pay.example/cs_test_1".to_string()),
        })
    }
}

#[derive(Default)]
struct FakeProfiles {
    profiles: RefCell<HashMap<String, Profile>>,
    activity: RefCell<Vec<(String, ActivityKind, Value)>>,
    activity_fails: bool,
}

impl FakeProfiles {
    fn with_profile(user_id: &str, profile: Profile) -> Self {
        let store = Self::default();
        store.profiles.borrow_mut().insert(user_id.to_string(), profile);
        store
    }

    fn kinds(&self) -> Vec<ActivityKind> {
        self.activity.borrow().iter().map(|(_, kind, _)| *kind).collect()
    }
}

impl ProfileStore for FakeProfiles {
    fn get_profile(&self, user_id: &str) -> Result<Profile> {
        Ok(self.profiles.borrow().get(user_id).cloned().unwrap_or_default())
    }

    fn record_activity(&self, user_id: &str, kind: ActivityKind, payload: &Value) -> Result<()> {
        if self.activity_fails {
            return Err(InvoiceError::Io(std::io::Error::other("disk full")));
        }
        self.activity
            .borrow_mut()
            .push((user_id.to_string(), kind, payload.clone()));
        Ok(())
    }

    fn record_download(&self, user_id: &str) -> Result<u32> {
        let mut profiles = self.profiles.borrow_mut();
        let profile = profiles.entry(user_id.to_string()).or_default();
        profile.downloads_used += 1;
        Ok(profile.downloads_used)
    }
}

#[derive(Default)]
struct FakeMailer {
    sent: RefCell<Vec<(String, EmailKind, Value)>>,
    fail: bool,
}

impl Mailer for FakeMailer {
    fn send(&self, to: &str, kind: EmailKind, data: &Value) -> Result<()> {
        if self.fail {
            return Err(InvoiceError::Email("smtp unavailable".to_string()));
        }
        self.sent.borrow_mut().push((to.to_string(), kind, data.clone()));
        Ok(())
    }
}

fn ready_form() -> InvoiceFormState {
    let mut form = InvoiceFormState {
        tax_rate: dec!(10),
        line_items: vec![LineItem::new("Design work", dec!(2), dec!(50))],
        ..InvoiceFormState::default()
    };
    form.company.name = "Acme".to_string();
    form.client.name = "Bob".to_string();
    form.details.number = "INV-2026-0001".to_string();
    form.details.payment_terms = PaymentTerms::Net15;
    form.details.issue_date = NaiveDate::from_ymd_opt(2026, 12, 20);
    form
}

fn member() -> Identity {
    Identity::from_user(Some(User {
        id: "user-1".to_string(),
        email: "ann@example.com".to_string(),
        name: Some("Ann".to_string()),
    }))
}

fn policy() -> DownloadPolicy {
    DownloadPolicy {
        guest_limit: 1,
        member_limit: 2,
    }
}

#[test]
fn first_guest_download_is_free() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles::default();
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99));

    let outcome = flow.run(&ready_form(), &Identity::Guest).unwrap();

    match outcome {
        Generation::Document {
            number,
            bytes,
            totals,
            downloads_used,
        } => {
            assert_eq!(number, "INV-2026-0001");
            assert_eq!(bytes, b"%PDF-1.4");
            assert_eq!(totals.subtotal, dec!(100));
            assert_eq!(totals.total, dec!(110));
            assert_eq!(downloads_used, 1);
        }
        other => panic!("expected a document, got {other:?}"),
    }

    let requests = documents.requests.borrow();
    assert_eq!(requests.len(), 1);
    // due date is derived before the request goes out
    assert_eq!(requests[0].invoice_details.due_date, "2027-01-04");
    assert!(payments.requests.borrow().is_empty());
    assert_eq!(profiles.kinds(), vec![ActivityKind::Download]);
}

#[test]
fn allowance_used_up_starts_checkout() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles::with_profile(
        "user-1",
        Profile {
            is_premium: false,
            downloads_used: 2,
        },
    );
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99));

    let outcome = flow.run(&ready_form(), &member()).unwrap();

    match outcome {
        Generation::PaymentRequired {
            number,
            amount,
            session,
        } => {
            assert_eq!(number, "INV-2026-0001");
            assert_eq!(amount, dec!(2.99));
            assert_eq!(session.session_id, "cs_test_1");
        }
        other => panic!("expected checkout, got {other:?}"),
    }

    assert!(documents.requests.borrow().is_empty());
    let payment_requests = payments.requests.borrow();
    assert_eq!(payment_requests[0].user_id.as_deref(), Some("user-1"));
    assert_eq!(payment_requests[0].customer_email.as_deref(), Some("ann@example.com"));
    assert_eq!(profiles.kinds(), vec![ActivityKind::CheckoutStarted]);
    assert_eq!(profiles.get_profile("user-1").unwrap().downloads_used, 2);
}

#[test]
fn member_gets_more_free_downloads_than_guest() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles::with_profile(
        "user-1",
        Profile {
            is_premium: false,
            downloads_used: 1,
        },
    );
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99));

    assert!(matches!(
        flow.run(&ready_form(), &member()).unwrap(),
        Generation::Document { downloads_used: 2, .. }
    ));
    assert!(matches!(
        flow.run(&ready_form(), &member()).unwrap(),
        Generation::PaymentRequired { .. }
    ));
}

#[test]
fn premium_ignores_the_limit_and_does_not_count() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles::with_profile(
        "user-1",
        Profile {
            is_premium: true,
            downloads_used: 40,
        },
    );
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99));

    let outcome = flow.run(&ready_form(), &member()).unwrap();

    assert!(matches!(outcome, Generation::Document { downloads_used: 40, .. }));
    assert!(payments.requests.borrow().is_empty());
    assert_eq!(profiles.get_profile("user-1").unwrap().downloads_used, 40);
}

#[test]
fn invalid_form_never_reaches_services() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles::default();
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99));

    let mut form = ready_form();
    form.line_items = vec![LineItem::new("Free consultation", dec!(1), dec!(0))];

    let err = flow.run(&form, &Identity::Guest).unwrap_err();

    assert!(matches!(
        err,
        InvoiceError::Validation(ValidationFailure::NoBillableLineItem)
    ));
    assert!(documents.requests.borrow().is_empty());
    assert!(payments.requests.borrow().is_empty());
    assert!(profiles.activity.borrow().is_empty());
}

#[test]
fn document_failure_is_reported_and_not_counted() {
    let documents = FakeDocuments {
        fail_with: Some("Template not found".to_string()),
        ..FakeDocuments::default()
    };
    let payments = FakePayments::default();
    let profiles = FakeProfiles::default();
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99));

    let err = flow.run(&ready_form(), &Identity::Guest).unwrap_err();

    assert_eq!(err.to_string(), "Document generation failed: Template not found");
    assert_eq!(profiles.get_profile("guest").unwrap().downloads_used, 0);
    assert!(profiles.activity.borrow().is_empty());
}

#[test]
fn confirmation_goes_to_signed_in_user() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles::default();
    let mailer = FakeMailer::default();
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99))
        .with_mailer(&mailer);

    flow.run(&ready_form(), &member()).unwrap();

    let sent = mailer.sent.borrow();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "ann@example.com");
    assert_eq!(sent[0].1, EmailKind::InvoiceGenerated);
    assert_eq!(sent[0].2["invoiceNumber"], "INV-2026-0001");
    let total: Decimal = sent[0].2["total"].as_str().unwrap().parse().unwrap();
    assert_eq!(total, dec!(110));
}

#[test]
fn guests_get_no_confirmation() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles::default();
    let mailer = FakeMailer::default();
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99))
        .with_mailer(&mailer);

    flow.run(&ready_form(), &Identity::Guest).unwrap();

    assert!(mailer.sent.borrow().is_empty());
}

#[test]
fn email_failure_does_not_fail_generation() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles::default();
    let mailer = FakeMailer {
        fail: true,
        ..FakeMailer::default()
    };
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99))
        .with_mailer(&mailer);

    let outcome = flow.run(&ready_form(), &member()).unwrap();

    assert!(matches!(outcome, Generation::Document { downloads_used: 1, .. }));
}

#[test]
fn activity_log_failure_keeps_the_document() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles {
        activity_fails: true,
        ..FakeProfiles::default()
    };
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99));

    let outcome = flow.run(&ready_form(), &Identity::Guest).unwrap();

    match outcome {
        Generation::Document {
            bytes,
            downloads_used,
            ..
        } => {
            assert_eq!(bytes, b"%PDF-1.4");
            assert_eq!(downloads_used, 1);
        }
        other => panic!("expected a document, got {other:?}"),
    }
    assert_eq!(documents.requests.borrow().len(), 1);
}

#[test]
fn activity_log_failure_keeps_the_checkout_session() {
    let documents = FakeDocuments::default();
    let payments = FakePayments::default();
    let profiles = FakeProfiles {
        activity_fails: true,
        ..FakeProfiles::with_profile(
            "guest",
            Profile {
                is_premium: false,
                downloads_used: 1,
            },
        )
    };
    let flow = GenerationFlow::new(&documents, &payments, &profiles, policy(), dec!(2.99));

    let outcome = flow.run(&ready_form(), &Identity::Guest).unwrap();

    assert!(matches!(outcome, Generation::PaymentRequired { .. }));
    assert_eq!(payments.requests.borrow().len(), 1);
}
