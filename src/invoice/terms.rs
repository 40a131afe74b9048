use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::InvoiceError;

/// Payment terms code, determining the offset between issue date and due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PaymentTerms {
    #[serde(rename = "due_on_receipt")]
    DueOnReceipt,
    #[serde(rename = "net_15")]
    Net15,
    #[default]
    #[serde(rename = "net_30")]
    Net30,
    #[serde(rename = "net_45")]
    Net45,
    #[serde(rename = "net_60")]
    Net60,
    #[serde(rename = "custom")]
    Custom,
}

impl PaymentTerms {
    pub const ALL: [PaymentTerms; 6] = [
        PaymentTerms::DueOnReceipt,
        PaymentTerms::Net15,
        PaymentTerms::Net30,
        PaymentTerms::Net45,
        PaymentTerms::Net60,
        PaymentTerms::Custom,
    ];

    /// Days added to the issue date, `None` for custom terms.
    pub fn offset_days(self) -> Option<u32> {
        match self {
            PaymentTerms::DueOnReceipt => Some(0),
            PaymentTerms::Net15 => Some(15),
            PaymentTerms::Net30 => Some(30),
            PaymentTerms::Net45 => Some(45),
            PaymentTerms::Net60 => Some(60),
            PaymentTerms::Custom => None,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            PaymentTerms::DueOnReceipt => "due_on_receipt",
            PaymentTerms::Net15 => "net_15",
            PaymentTerms::Net30 => "net_30",
            PaymentTerms::Net45 => "net_45",
            PaymentTerms::Net60 => "net_60",
            PaymentTerms::Custom => "custom",
        }
    }

    /// Human readable label for printed invoices.
    pub fn label(self) -> String {
        match self {
            PaymentTerms::DueOnReceipt => "Due on receipt".to_string(),
            PaymentTerms::Custom => "Custom".to_string(),
            other => format!("Net {} days", other.offset_days().unwrap_or_default()),
        }
    }
}

impl fmt::Display for PaymentTerms {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for PaymentTerms {
    type Err = InvoiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        PaymentTerms::ALL
            .into_iter()
            .find(|terms| terms.code() == needle)
            .ok_or_else(|| InvoiceError::UnknownPaymentTerms(s.to_string()))
    }
}

/// Outcome of deriving a due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueDate {
    /// No issue date yet, so there is no due date either.
    Unset,
    /// Automatically derived due date.
    Date(NaiveDate),
    /// Custom terms: leave whatever due date the user entered.
    Keep,
}

impl DueDate {
    /// Apply the derivation to a stored due date.
    pub fn apply_to(self, current: Option<NaiveDate>) -> Option<NaiveDate> {
        match self {
            DueDate::Unset => None,
            DueDate::Date(date) => Some(date),
            DueDate::Keep => current,
        }
    }
}

/// Derive the due date from an issue date and payment terms.
///
/// Uses plain calendar-day arithmetic: no business-day adjustment and no
/// timezone handling beyond the date itself.
pub fn compute_due_date(issue_date: Option<NaiveDate>, terms: PaymentTerms) -> DueDate {
    let Some(days) = terms.offset_days() else {
        return DueDate::Keep;
    };
    let Some(issued) = issue_date else {
        return DueDate::Unset;
    };

    match issued.checked_add_days(Days::new(u64::from(days))) {
        Some(due) => DueDate::Date(due),
        None => DueDate::Unset,
    }
}
