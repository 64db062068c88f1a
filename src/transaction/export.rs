//! Download a user's transactions as a CSV file.

use axum::{
    Extension,
    extract::State,
    http::header::{CONTENT_DISPOSITION, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use csv::WriterBuilder;
use serde::Serialize;

use crate::{Error, UserId, app_state::RepositoryState};

use super::{core::Transaction, repository::TransactionRepository};

const HEADERS: [&str; 10] = [
    "id",
    "data",
    "nome",
    "categoria",
    "valor",
    "tipo_movimento",
    "origem",
    "forma_pagamento",
    "cartao_final",
    "apelido",
];

#[derive(Serialize)]
struct ExportRow<'a> {
    id: i64,
    date: String,
    name: &'a str,
    category: &'a str,
    amount: String,
    direction: &'static str,
    origin: &'static str,
    payment_method: Option<&'a str>,
    card_suffix: Option<&'a str>,
    card_nickname: Option<&'a str>,
}

impl<'a> From<&'a Transaction> for ExportRow<'a> {
    fn from(transaction: &'a Transaction) -> Self {
        Self {
            id: transaction.id,
            date: transaction.date.to_string(),
            name: &transaction.name,
            category: &transaction.category,
            amount: format!("{:.2}", transaction.amount),
            direction: transaction.direction.as_str(),
            origin: transaction.origin.as_str(),
            payment_method: transaction.payment_method.as_deref(),
            card_suffix: transaction.card_suffix.as_deref(),
            card_nickname: transaction.card_nickname.as_deref(),
        }
    }
}

/// Write `transactions` as CSV with a header row.
///
/// # Errors
/// Returns [Error::CsvError] if a row could not be written.
pub fn transactions_to_csv(transactions: &[Transaction]) -> Result<Vec<u8>, Error> {
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);

    writer
        .write_record(HEADERS)
        .map_err(|error| Error::CsvError(error.to_string()))?;

    for transaction in transactions {
        writer
            .serialize(ExportRow::from(transaction))
            .map_err(|error| Error::CsvError(error.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|error| Error::CsvError(error.to_string()))
}

/// Download all of the user's transactions as `transacoes.csv`.
pub async fn export_transactions_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Response, Error> {
    let transactions = state.transactions().list_all(user_id)?;
    let body = transactions_to_csv(&transactions)?;

    tracing::debug!("exporting {} transactions for user {user_id}", transactions.len());

    Ok((
        [
            (CONTENT_TYPE, "text/csv; charset=utf-8"),
            (CONTENT_DISPOSITION, "attachment; filename=\"transacoes.csv\""),
        ],
        body,
    )
        .into_response())
}
