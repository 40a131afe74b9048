//! Invoice computation and validation.
//!
//! Everything here is synchronous and side-effect free. Derived values (line
//! item amounts, totals, due dates, validity) are recomputed by explicit calls
//! after each mutation; nothing is cached.

pub mod amount;
mod entitlement;
mod form;
mod line_item;
mod numbering;
mod terms;
mod totals;
mod wizard;

pub use entitlement::{can_download_free, DownloadPolicy};
pub use form::{
    is_valid, validate, Branding, InvoiceDetails, InvoiceFormState, InvoiceTemplate, PartyInfo,
    ValidationFailure,
};
pub use line_item::{recompute_line_item, LineItem, LineItemPatch};
pub use numbering::{format_invoice_number, next_sequence};
pub use terms::{compute_due_date, DueDate, PaymentTerms};
pub use totals::{aggregate, InvoiceTotals};
pub use wizard::WizardStep;
