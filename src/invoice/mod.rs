//! Invoice reconciliation.
//!
//! Card bills are recorded ahead of time as future invoices. When the real
//! payment is recorded it is matched against them within an amount and date
//! tolerance window, and linked automatically only when there is exactly one
//! exact match.

mod endpoints;
mod matching;

pub use endpoints::{
    get_invoice_candidates_endpoint, link_invoice_endpoint, reconcile_transaction_endpoint,
};
pub use matching::{
    AMOUNT_TOLERANCE, DATE_TOLERANCE_DAYS, InvoiceSearch, LinkDecision, decide_link,
    find_invoice_candidates, is_candidate, link_invoice, reconcile_payment,
};
