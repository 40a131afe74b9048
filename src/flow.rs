//! Invoice generation: validate, total, check the free allowance, then either
//! render the document or hand off to checkout.

use rust_decimal::Decimal;
use serde_json::json;

use crate::error::Result;
use crate::invoice::{can_download_free, DownloadPolicy, InvoiceFormState, InvoiceTotals};
use crate::services::{
    ActivityKind, CheckoutSession, DocumentGenerator, DocumentRequest, EmailKind, Identity,
    Mailer, PaymentGateway, PaymentRequest, ProfileStore,
};

/// Result of a generation attempt.
#[derive(Debug)]
pub enum Generation {
    /// The document was rendered within the free allowance (or for a
    /// premium account).
    Document {
        number: String,
        bytes: Vec<u8>,
        totals: InvoiceTotals,
        downloads_used: u32,
    },
    /// The allowance is used up; the user has to pay through `session`.
    PaymentRequired {
        number: String,
        amount: Decimal,
        session: CheckoutSession,
    },
}

pub struct GenerationFlow<'a> {
    documents: &'a dyn DocumentGenerator,
    payments: &'a dyn PaymentGateway,
    profiles: &'a dyn ProfileStore,
    mailer: Option<&'a dyn Mailer>,
    policy: DownloadPolicy,
    download_price: Decimal,
}

impl<'a> GenerationFlow<'a> {
    pub fn new(
        documents: &'a dyn DocumentGenerator,
        payments: &'a dyn PaymentGateway,
        profiles: &'a dyn ProfileStore,
        policy: DownloadPolicy,
        download_price: Decimal,
    ) -> Self {
        Self {
            documents,
            payments,
            profiles,
            mailer: None,
            policy,
            download_price,
        }
    }

    pub fn with_mailer(mut self, mailer: &'a dyn Mailer) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn run(&self, form: &InvoiceFormState, identity: &Identity) -> Result<Generation> {
        let mut form = form.clone();
        form.details.refresh_due_date();
        form.validate()?;

        let number = form.details.number.trim().to_string();
        let totals = form.totals();
        let profile = self.profiles.get_profile(identity.user_id())?;
        let limit = self.policy.limit_for(identity.is_signed_in());

        if !can_download_free(profile.downloads_used, limit, profile.is_premium) {
            tracing::info!(
                invoice = %number,
                used = profile.downloads_used,
                limit,
                "free downloads used up, starting checkout"
            );
            return self.start_checkout(number, identity);
        }

        let bytes = self.documents.generate(&DocumentRequest::from_form(&form))?;
        tracing::info!(invoice = %number, total = %totals.total, bytes = bytes.len(), "invoice generated");

        let downloads_used = if profile.is_premium {
            profile.downloads_used
        } else {
            self.profiles.record_download(identity.user_id())?
        };
        self.record_activity(
            identity,
            ActivityKind::Download,
            json!({
                "invoice": number,
                "client": form.client.name,
                "total": totals.total.round_dp(2).to_string(),
                "currency": form.details.currency,
            }),
        );

        self.send_confirmation(&form, &totals, identity);

        Ok(Generation::Document {
            number,
            bytes,
            totals,
            downloads_used,
        })
    }

    fn start_checkout(&self, number: String, identity: &Identity) -> Result<Generation> {
        let request = PaymentRequest {
            amount: self.download_price,
            invoice_number: number.clone(),
            user_id: identity.user().map(|u| u.id.clone()),
            customer_email: identity.email().map(str::to_string),
        };
        let session = self.payments.create_session(&request)?;

        self.record_activity(
            identity,
            ActivityKind::CheckoutStarted,
            json!({ "invoice": number, "session": session.session_id }),
        );

        Ok(Generation::PaymentRequired {
            number,
            amount: self.download_price,
            session,
        })
    }

    /// Append to the activity log. Runs after the document or session
    /// exists, so a store failure is logged and does not undo it.
    fn record_activity(&self, identity: &Identity, kind: ActivityKind, payload: serde_json::Value) {
        if let Err(e) = self
            .profiles
            .record_activity(identity.user_id(), kind, &payload)
        {
            tracing::warn!(error = %e, kind = kind.as_str(), "activity not recorded");
        }
    }

    /// Email the signed-in user. Failures are logged only: the document has
    /// already been produced at this point.
    fn send_confirmation(&self, form: &InvoiceFormState, totals: &InvoiceTotals, identity: &Identity) {
        let (Some(mailer), Some(to)) = (self.mailer, identity.email()) else {
            tracing::debug!("no confirmation email sent");
            return;
        };

        let data = json!({
            "invoiceNumber": form.details.number.trim(),
            "clientName": form.client.name,
            "total": totals.total.round_dp(2).to_string(),
            "currency": form.details.currency,
        });
        if let Err(e) = mailer.send(to, EmailKind::InvoiceGenerated, &data) {
            tracing::warn!(error = %e, to, "confirmation email failed");
        }
    }
}
