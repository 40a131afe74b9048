//! External collaborators: document generation, checkout, email, identity
//! and the profile/activity store.
//!
//! Each collaborator is a trait so the generation flow can run against test
//! doubles; the HTTP implementations live in [`http`] and [`identity`].

mod http;
mod identity;
mod store;

pub use http::{HttpDocumentGenerator, HttpMailer, HttpPaymentGateway, ServiceClient};
pub use identity::{HostedIdentity, Identity, IdentityService, User};
pub use store::FileProfileStore;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::invoice::amount::lenient;
use crate::invoice::{InvoiceFormState, InvoiceTemplate, LineItem, PartyInfo};

/// Body sent to the document generation service.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentRequest {
    pub invoice_type: InvoiceTemplate,
    pub company_info: PartyInfo,
    pub client_info: PartyInfo,
    pub invoice_details: DocumentDetails,
    pub line_items: Vec<LineItem>,
    pub additional_options: AdditionalOptions,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentDetails {
    pub number: String,
    pub issue_date: String,
    pub due_date: String,
    pub currency: String,
    pub payment_terms: String,
    #[serde(serialize_with = "lenient::serialize")]
    pub late_fee_rate: Decimal,
    #[serde(serialize_with = "lenient::serialize")]
    pub late_fee_amount: Decimal,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalOptions {
    #[serde(serialize_with = "lenient::serialize")]
    pub tax_rate: Decimal,
    #[serde(serialize_with = "lenient::serialize")]
    pub subtotal: Decimal,
    #[serde(serialize_with = "lenient::serialize")]
    pub tax_amount: Decimal,
    #[serde(serialize_with = "lenient::serialize")]
    pub total: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl DocumentRequest {
    /// Build the request from a form, computing totals fresh.
    pub fn from_form(form: &InvoiceFormState) -> Self {
        let totals = form.totals();
        let details = &form.details;
        let date = |d: Option<chrono::NaiveDate>| d.map(|d| d.to_string()).unwrap_or_default();

        Self {
            invoice_type: form.template,
            company_info: form.company.clone(),
            client_info: form.client.clone(),
            invoice_details: DocumentDetails {
                number: details.number.trim().to_string(),
                issue_date: date(details.issue_date),
                due_date: date(details.due_date),
                currency: details.currency.clone(),
                payment_terms: details.payment_terms.code().to_string(),
                late_fee_rate: details.late_fee_rate,
                late_fee_amount: details.late_fee_amount,
            },
            line_items: form.line_items.clone(),
            additional_options: AdditionalOptions {
                tax_rate: form.tax_rate,
                subtotal: totals.subtotal,
                tax_amount: totals.tax_amount,
                total: totals.total,
                logo_url: form.branding.logo_url.clone(),
                accent_color: form.branding.accent_color.clone(),
                notes: form.branding.notes.clone(),
            },
        }
    }
}

/// Renders an invoice into a binary document (PDF).
pub trait DocumentGenerator {
    fn generate(&self, request: &DocumentRequest) -> Result<Vec<u8>>;
}

/// Body sent to the payment session service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    #[serde(serialize_with = "lenient::serialize")]
    pub amount: Decimal,
    pub invoice_number: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_email: Option<String>,
}

/// Hosted checkout handle returned by the payment service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSession {
    #[serde(alias = "id")]
    pub session_id: String,
    #[serde(default)]
    pub url: Option<String>,
}

pub trait PaymentGateway {
    fn create_session(&self, request: &PaymentRequest) -> Result<CheckoutSession>;
}

/// Transactional email templates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EmailKind {
    Welcome,
    InvoiceGenerated,
}

pub trait Mailer {
    fn send(&self, to: &str, kind: EmailKind, data: &serde_json::Value) -> Result<()>;
}

/// Entitlement-relevant part of a user profile.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Profile {
    #[serde(default)]
    pub is_premium: bool,
    #[serde(default)]
    pub downloads_used: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActivityKind {
    Download,
    CheckoutStarted,
    SignIn,
    SignUp,
    SignOut,
}

impl ActivityKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActivityKind::Download => "download",
            ActivityKind::CheckoutStarted => "checkout_started",
            ActivityKind::SignIn => "sign_in",
            ActivityKind::SignUp => "sign_up",
            ActivityKind::SignOut => "sign_out",
        }
    }
}

/// Per-user profile and activity log.
pub trait ProfileStore {
    fn get_profile(&self, user_id: &str) -> Result<Profile>;

    fn record_activity(
        &self,
        user_id: &str,
        kind: ActivityKind,
        payload: &serde_json::Value,
    ) -> Result<()>;

    /// Count one free download; returns the new total.
    fn record_download(&self, user_id: &str) -> Result<u32>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::invoice::{InvoiceDetails, PaymentTerms};
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    #[test]
    fn document_request_uses_camel_case_keys() {
        let mut form = InvoiceFormState {
            company: PartyInfo {
                name: "Acme".to_string(),
                ..PartyInfo::default()
            },
            details: InvoiceDetails {
                number: " INV-9 ".to_string(),
                issue_date: NaiveDate::from_ymd_opt(2026, 1, 10),
                payment_terms: PaymentTerms::Net15,
                ..InvoiceDetails::default()
            },
            tax_rate: dec!(10),
            line_items: vec![LineItem::new("Widget", dec!(2), dec!(10))],
            ..InvoiceFormState::default()
        };
        form.details.refresh_due_date();
        form.branding.accent_color = Some("#0044ff".to_string());

        let json = serde_json::to_value(DocumentRequest::from_form(&form)).unwrap();
        assert_eq!(json["invoiceType"], "standard");
        assert_eq!(json["companyInfo"]["name"], "Acme");
        assert_eq!(json["invoiceDetails"]["number"], "INV-9");
        assert_eq!(json["invoiceDetails"]["issueDate"], "2026-01-10");
        assert_eq!(json["invoiceDetails"]["dueDate"], "2026-01-25");
        assert_eq!(json["invoiceDetails"]["paymentTerms"], "net_15");
        assert_eq!(json["lineItems"][0]["amount"], 20);
        assert_eq!(json["additionalOptions"]["total"], 22);
        assert_eq!(json["additionalOptions"]["accentColor"], "#0044ff");
        assert!(json["additionalOptions"].get("logoUrl").is_none());
    }

    #[test]
    fn payment_request_omits_missing_identity() {
        let request = PaymentRequest {
            amount: dec!(2.99),
            invoice_number: "INV-1".to_string(),
            user_id: None,
            customer_email: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(json, r#"{"amount":2.99,"invoiceNumber":"INV-1"}"#);
    }

    #[test]
    fn checkout_session_accepts_either_id_key() {
        let a: CheckoutSession = serde_json::from_str(r#"{"sessionId":"cs_1"}"#).unwrap();
        let b: CheckoutSession =
            serde_json::from_str(r#"{"id":"cs_2","url":"https://pay.example/cs_2"}"#).unwrap();
        assert_eq!(a.session_id, "cs_1");
        assert_eq!(a.url, None);
        assert_eq!(b.url.as_deref(), Some("https://pay.example/cs_2"));
    }
}
