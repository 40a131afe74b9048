use std::path::PathBuf;
use thiserror::Error;

use crate::invoice::ValidationFailure;

#[derive(Error, Debug)]
pub enum InvoiceError {
    #[error("Config directory not found at {0}. Run 'invoicekit init' to create it.")]
    ConfigNotFound(PathBuf),

    #[error("Config file not found: {0}")]
    ConfigFileNotFound(PathBuf),

    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config directory already exists at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Draft not found: {0}")]
    DraftNotFound(PathBuf),

    #[error("Failed to parse draft {path}: {source}")]
    DraftParse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize {what}: {reason}")]
    Serialize { what: String, reason: String },

    #[error("Invalid line item index '{index}' (draft has {count} item(s))")]
    InvalidLineItemIndex { index: usize, count: usize },

    #[error("Unknown payment terms '{0}'. Expected one of: due_on_receipt, net_15, net_30, net_45, net_60, custom")]
    UnknownPaymentTerms(String),

    #[error("Unknown template '{0}'. Expected one of: standard, modern, minimal, corporate")]
    UnknownTemplate(String),

    #[error("Unknown wizard step '{0}'. Expected one of: template, branding, details, preview")]
    UnknownWizardStep(String),

    #[error("Invalid date '{0}'. Expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("{0}")]
    Validation(ValidationFailure),

    #[error("Document generation failed: {0}")]
    DocumentService(String),

    #[error("Payment session could not be created: {0}")]
    PaymentService(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Email could not be sent: {0}")]
    Email(String),

    #[error("Request to {url} failed: {reason}")]
    Http { url: String, reason: String },

    #[error("No {0} endpoint configured. Set it under [services] in config.toml")]
    NotConfigured(&'static str),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ValidationFailure> for InvoiceError {
    fn from(failure: ValidationFailure) -> Self {
        InvoiceError::Validation(failure)
    }
}

pub type Result<T> = std::result::Result<T, InvoiceError>;
