pub mod config;
pub mod error;
pub mod flow;
pub mod invoice;
pub mod logging;
pub mod services;

pub use config::{Config, State};
pub use error::{InvoiceError, Result};
pub use flow::{Generation, GenerationFlow};
pub use invoice::{
    aggregate, can_download_free, compute_due_date, is_valid, recompute_line_item, DueDate,
    InvoiceFormState, InvoiceTotals, LineItem, LineItemPatch, PaymentTerms, ValidationFailure,
};
