//! Route handlers for matching payments to future invoices.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};

use crate::{
    Error, TransactionId, UserId, app_state::RepositoryState, card::reset_card_limit,
    transaction::{Transaction, TransactionRepository},
};

use super::matching::{
    InvoiceSearch, LinkDecision, find_invoice_candidates, link_invoice, reconcile_payment,
};

/// List the future invoices that a payment could be for.
pub async fn get_invoice_candidates_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Query(search): Query<InvoiceSearch>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let invoices = state.transactions().list_future_invoices(user_id)?;

    Ok(Json(find_invoice_candidates(&invoices, &search)))
}

/// Mark a future invoice as paid after the user confirmed the match.
pub async fn link_invoice_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Path(invoice_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    let linked = link_invoice(&state.transactions(), user_id, invoice_id)?;
    reset_card_limit(&state.cards(), user_id, &linked);

    Ok(Json(linked))
}

/// Look for the invoice a recorded payment was for, linking it if the match is unambiguous.
pub async fn reconcile_transaction_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<LinkDecision>, Error> {
    let decision = reconcile_payment(&state.transactions(), user_id, transaction_id)?;

    if let LinkDecision::AutoLink(invoice) = &decision {
        reset_card_limit(&state.cards(), user_id, invoice);
    }

    Ok(Json(decision))
}
