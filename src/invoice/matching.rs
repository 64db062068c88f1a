//! Matching card bill payments to the invoices that were projected for them.

use serde::{Deserialize, Serialize};
use time::Date;

use crate::{
    Error, TransactionId, UserId,
    card::extract_card_info,
    currency::deserialize_amount,
    transaction::{Origin, Transaction, TransactionRepository},
};

/// How far an invoice amount may be from the payment, as a fraction of the payment.
pub const AMOUNT_TOLERANCE: f64 = 0.10;

/// How many days an invoice may be due before or after the payment.
pub const DATE_TOLERANCE_DAYS: i64 = 15;

/// Absorbs rounding in the amount comparison, e.g. 0.1 * 100.
const EPSILON: f64 = 1e-9;

/// What to look for when matching a payment to future invoices.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct InvoiceSearch {
    /// The amount that was paid.
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    /// Only match invoices for the card ending in these digits.
    #[serde(default)]
    pub card_suffix: Option<String>,
    /// Only match invoices due within [DATE_TOLERANCE_DAYS] of this date.
    #[serde(default)]
    pub date: Option<Date>,
}

impl InvoiceSearch {
    /// Build the search for a payment that has already been recorded.
    pub fn for_payment(payment: &Transaction) -> Self {
        Self {
            amount: payment.amount,
            card_suffix: extract_card_info(payment).and_then(|info| info.suffix),
            date: Some(payment.date),
        }
    }

    fn suffix_filter(&self) -> Option<&str> {
        self.card_suffix
            .as_deref()
            .map(str::trim)
            .filter(|suffix| !suffix.is_empty())
    }
}

fn invoice_suffix(invoice: &Transaction) -> Option<String> {
    extract_card_info(invoice).and_then(|info| info.suffix)
}

fn to_cents(amount: f64) -> i64 {
    (amount * 100.0).round() as i64
}

/// Whether `invoice` is an unpaid future invoice within the tolerance window of `search`.
pub fn is_candidate(invoice: &Transaction, search: &InvoiceSearch) -> bool {
    if invoice.origin != Origin::FutureInvoice {
        return false;
    }

    if (invoice.amount - search.amount).abs() > AMOUNT_TOLERANCE * search.amount + EPSILON {
        return false;
    }

    if search
        .suffix_filter()
        .is_some_and(|suffix| invoice_suffix(invoice).as_deref() != Some(suffix))
    {
        return false;
    }

    match search.date {
        Some(date) => (invoice.date - date).whole_days().abs() <= DATE_TOLERANCE_DAYS,
        None => true,
    }
}

/// The invoices in `invoices` that could have been paid by the payment described by `search`.
pub fn find_invoice_candidates(invoices: &[Transaction], search: &InvoiceSearch) -> Vec<Transaction> {
    invoices
        .iter()
        .filter(|invoice| is_candidate(invoice, search))
        .cloned()
        .collect()
}

/// What to do with a payment after searching for its invoice.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "decision", content = "invoices", rename_all = "snake_case")]
pub enum LinkDecision {
    /// Exactly one invoice matched exactly and it can be linked without asking.
    AutoLink(Transaction),
    /// The user has to pick which invoice, if any, the payment was for.
    NeedsConfirmation(Vec<Transaction>),
    /// No invoice was close enough.
    NoMatch,
}

/// Decide whether a payment can be linked to one of its `candidates` without asking the user.
///
/// Only a single candidate whose amount equals the payment to the cent and
/// whose card suffix is the same as the payment's is linked automatically.
pub fn decide_link(mut candidates: Vec<Transaction>, search: &InvoiceSearch) -> LinkDecision {
    if candidates.is_empty() {
        return LinkDecision::NoMatch;
    }

    if candidates.len() == 1 {
        let candidate = &candidates[0];
        let exact_amount = to_cents(candidate.amount) == to_cents(search.amount);
        let same_suffix = invoice_suffix(candidate).as_deref() == search.suffix_filter();

        if exact_amount && same_suffix {
            return LinkDecision::AutoLink(candidates.remove(0));
        }
    }

    LinkDecision::NeedsConfirmation(candidates)
}

/// Mark a future invoice as paid.
///
/// # Errors
/// Returns [Error::NotAFutureInvoice] if the record is not an unpaid future
/// invoice, or [Error::NotFound] if the user does not own it.
pub fn link_invoice(
    repository: &impl TransactionRepository,
    user_id: UserId,
    invoice_id: TransactionId,
) -> Result<Transaction, Error> {
    let linked = repository
        .set_origin(user_id, invoice_id, Origin::FutureInvoice, Origin::PaidInvoice)?
        .ok_or(Error::NotAFutureInvoice(invoice_id))?;
    tracing::info!("linked invoice {invoice_id} for user {user_id}");

    Ok(linked)
}

/// Search for the invoice a recorded payment was for and link it if the match is unambiguous.
///
/// The returned [LinkDecision::AutoLink] holds the invoice after it was marked as paid.
///
/// # Errors
/// Returns [Error::NotAPayment] if the record is not a manually recorded expense,
/// or an error if the payment could not be loaded or the link could not be stored.
pub fn reconcile_payment(
    repository: &impl TransactionRepository,
    user_id: UserId,
    payment_id: TransactionId,
) -> Result<LinkDecision, Error> {
    let payment = repository.get(user_id, payment_id)?;

    if !payment.is_outflow() || payment.origin != Origin::Manual {
        return Err(Error::NotAPayment(payment_id));
    }
    let search = InvoiceSearch::for_payment(&payment);

    let invoices: Vec<Transaction> = repository
        .list_future_invoices(user_id)?
        .into_iter()
        .filter(|invoice| invoice.id != payment_id)
        .collect();

    match decide_link(find_invoice_candidates(&invoices, &search), &search) {
        LinkDecision::AutoLink(invoice) => Ok(LinkDecision::AutoLink(link_invoice(
            repository, user_id, invoice.id,
        )?)),
        decision => Ok(decision),
    }
}

#[cfg(test)]
mod is_candidate_tests {
    use time::macros::date;

    use crate::{
        test_utils::test_transaction,
        transaction::{Direction, Origin, Transaction},
    };

    use super::{InvoiceSearch, is_candidate};

    fn invoice(amount: f64) -> Transaction {
        let mut invoice = test_transaction(1, amount, Direction::Saida);
        invoice.origin = Origin::FutureInvoice;
        invoice.card_suffix = Some("1234".to_owned());
        invoice
    }

    fn search(amount: f64) -> InvoiceSearch {
        InvoiceSearch {
            amount,
            card_suffix: None,
            date: None,
        }
    }

    #[test]
    fn amount_within_ten_percent() {
        assert!(is_candidate(&invoice(90.0), &search(100.0)));
        assert!(is_candidate(&invoice(110.0), &search(100.0)));
        assert!(!is_candidate(&invoice(111.0), &search(100.0)));
        assert!(!is_candidate(&invoice(89.0), &search(100.0)));
    }

    #[test]
    fn only_future_invoices() {
        let mut paid = invoice(100.0);
        paid.origin = Origin::PaidInvoice;
        let mut manual = invoice(100.0);
        manual.origin = Origin::Manual;

        assert!(!is_candidate(&paid, &search(100.0)));
        assert!(!is_candidate(&manual, &search(100.0)));
    }

    #[test]
    fn suffix_filter() {
        let with_suffix = |suffix: &str| InvoiceSearch {
            card_suffix: Some(suffix.to_owned()),
            ..search(100.0)
        };

        assert!(is_candidate(&invoice(100.0), &with_suffix("1234")));
        assert!(!is_candidate(&invoice(100.0), &with_suffix("9999")));
        assert!(is_candidate(&invoice(100.0), &with_suffix("")));
    }

    #[test]
    fn date_within_fifteen_days() {
        let on = |date| InvoiceSearch {
            date: Some(date),
            ..search(100.0)
        };

        // test invoices are dated 2025-03-10
        assert!(is_candidate(&invoice(100.0), &on(date!(2025 - 03 - 25))));
        assert!(is_candidate(&invoice(100.0), &on(date!(2025 - 02 - 23))));
        assert!(!is_candidate(&invoice(100.0), &on(date!(2025 - 03 - 26))));
        assert!(!is_candidate(&invoice(100.0), &on(date!(2025 - 02 - 22))));
    }
}
