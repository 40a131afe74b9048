use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::amount::lenient;
use super::line_item::{LineItem, LineItemPatch};
use super::terms::{compute_due_date, PaymentTerms};
use super::totals::{aggregate, InvoiceTotals};
use crate::error::{InvoiceError, Result};

/// Contact block for either side of the invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDetails {
    #[serde(default)]
    pub number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub payment_terms: PaymentTerms,
    /// Informational only, never applied to the totals.
    #[serde(default, with = "lenient")]
    pub late_fee_rate: Decimal,
    /// Informational only, never applied to the totals.
    #[serde(default, with = "lenient")]
    pub late_fee_amount: Decimal,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl Default for InvoiceDetails {
    fn default() -> Self {
        Self {
            number: String::new(),
            issue_date: None,
            due_date: None,
            currency: default_currency(),
            payment_terms: PaymentTerms::default(),
            late_fee_rate: Decimal::ZERO,
            late_fee_amount: Decimal::ZERO,
        }
    }
}

impl InvoiceDetails {
    /// Re-derive the due date from the issue date and payment terms.
    ///
    /// Must be called after every change to either input.
    pub fn refresh_due_date(&mut self) {
        self.due_date = compute_due_date(self.issue_date, self.payment_terms).apply_to(self.due_date);
    }
}

/// Visual variant the document service renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceTemplate {
    #[default]
    Standard,
    Modern,
    Minimal,
    Corporate,
}

impl InvoiceTemplate {
    pub const ALL: [InvoiceTemplate; 4] = [
        InvoiceTemplate::Standard,
        InvoiceTemplate::Modern,
        InvoiceTemplate::Minimal,
        InvoiceTemplate::Corporate,
    ];

    pub fn name(self) -> &'static str {
        match self {
            InvoiceTemplate::Standard => "standard",
            InvoiceTemplate::Modern => "modern",
            InvoiceTemplate::Minimal => "minimal",
            InvoiceTemplate::Corporate => "corporate",
        }
    }
}

impl fmt::Display for InvoiceTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for InvoiceTemplate {
    type Err = InvoiceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        InvoiceTemplate::ALL
            .into_iter()
            .find(|t| t.name() == needle)
            .ok_or_else(|| InvoiceError::UnknownTemplate(s.to_string()))
    }
}

/// Branding options forwarded to the document service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branding {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Everything the user fills in for one invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceFormState {
    #[serde(default)]
    pub template: InvoiceTemplate,
    /// Percentage, expected to be within 0..=100.
    #[serde(default, with = "lenient")]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub company: PartyInfo,
    #[serde(default)]
    pub client: PartyInfo,
    #[serde(default)]
    pub details: InvoiceDetails,
    #[serde(default)]
    pub branding: Branding,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
}

impl InvoiceFormState {
    /// Current totals; recomputed on every call.
    pub fn totals(&self) -> InvoiceTotals {
        aggregate(&self.line_items, self.tax_rate)
    }

    pub fn validate(&self) -> std::result::Result<(), ValidationFailure> {
        validate(self)
    }

    pub fn is_valid(&self) -> bool {
        is_valid(self)
    }

    /// Append a blank line item (quantity 1, rate 0) and return its index.
    pub fn add_line_item(&mut self) -> usize {
        self.line_items.push(LineItem::default());
        self.line_items.len() - 1
    }

    pub fn update_line_item(&mut self, index: usize, patch: LineItemPatch) -> Result<&LineItem> {
        let count = self.line_items.len();
        let item = self
            .line_items
            .get_mut(index)
            .ok_or(InvoiceError::InvalidLineItemIndex { index, count })?;
        item.apply(patch);
        Ok(item)
    }

    pub fn remove_line_item(&mut self, index: usize) -> Result<LineItem> {
        if index >= self.line_items.len() {
            return Err(InvoiceError::InvalidLineItemIndex {
                index,
                count: self.line_items.len(),
            });
        }
        Ok(self.line_items.remove(index))
    }

    pub fn set_issue_date(&mut self, issue_date: Option<NaiveDate>) {
        self.details.issue_date = issue_date;
        self.details.refresh_due_date();
    }

    /// Switch payment terms. `manual_due_date` is only honored for custom terms.
    pub fn set_payment_terms(&mut self, terms: PaymentTerms, manual_due_date: Option<NaiveDate>) {
        self.details.payment_terms = terms;
        if terms == PaymentTerms::Custom && manual_due_date.is_some() {
            self.details.due_date = manual_due_date;
        }
        self.details.refresh_due_date();
    }
}

/// First unmet generation precondition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    MissingCompanyName,
    MissingClientName,
    MissingInvoiceNumber,
    MissingIssueDate,
    NoBillableLineItem,
}

impl fmt::Display for ValidationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let message = match self {
            ValidationFailure::MissingCompanyName => "Please enter your company name",
            ValidationFailure::MissingClientName => "Please enter the client name",
            ValidationFailure::MissingInvoiceNumber => "Please enter an invoice number",
            ValidationFailure::MissingIssueDate => "Please enter the invoice date",
            ValidationFailure::NoBillableLineItem => {
                "Please add at least one line item with description and price"
            }
        };
        f.write_str(message)
    }
}

impl std::error::Error for ValidationFailure {}

/// Check the generation preconditions in order and report the first one
/// that does not hold.
///
/// A line item only counts when it has a description *and* a rate above
/// zero; quantity is not checked, so a row billed at zero never qualifies.
pub fn validate(form: &InvoiceFormState) -> std::result::Result<(), ValidationFailure> {
    if form.company.name.trim().is_empty() {
        return Err(ValidationFailure::MissingCompanyName);
    }
    if form.client.name.trim().is_empty() {
        return Err(ValidationFailure::MissingClientName);
    }
    if form.details.number.trim().is_empty() {
        return Err(ValidationFailure::MissingInvoiceNumber);
    }
    if form.details.issue_date.is_none() {
        return Err(ValidationFailure::MissingIssueDate);
    }
    if !form.line_items.iter().any(LineItem::is_billable) {
        return Err(ValidationFailure::NoBillableLineItem);
    }
    Ok(())
}

pub fn is_valid(form: &InvoiceFormState) -> bool {
    validate(form).is_ok()
}
