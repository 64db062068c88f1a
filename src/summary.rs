//! The monthly balance and its projection once pending card bills are paid.

use axum::{
    Extension, Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::{
    Error, UserId,
    app_state::RepositoryState,
    timezone::{MonthQuery, month_range},
    transaction::{Direction, Origin, Transaction, TransactionQuery, TransactionRepository},
};

/// Income, expenses and pending invoices for one month.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    /// The calendar year.
    pub year: i32,
    /// The month, 1 to 12.
    pub month: u8,
    /// The sum of income.
    pub income: f64,
    /// The sum of expenses, not counting future invoices.
    pub expenses: f64,
    /// `income - expenses`.
    pub balance: f64,
    /// The sum of the future invoices due this month.
    pub pending_invoices: f64,
    /// The balance once the pending invoices are paid.
    pub projected_balance: f64,
}

/// Summarize the transactions dated in `month` of `year`.
///
/// Transactions outside the month are ignored.
///
/// # Errors
/// Returns [Error::InvalidMonth] if `month` is not between 1 and 12.
pub fn monthly_summary(
    transactions: &[Transaction],
    year: i32,
    month: u8,
) -> Result<MonthlySummary, Error> {
    let range = month_range(year, month)?;
    let in_month: Vec<&Transaction> = transactions
        .iter()
        .filter(|t| range.contains(&t.date))
        .collect();

    let income: f64 = in_month
        .iter()
        .filter(|t| t.direction == Direction::Entrada)
        .map(|t| t.amount)
        .sum();
    let expenses: f64 = in_month
        .iter()
        .filter(|t| t.direction == Direction::Saida && t.origin != Origin::FutureInvoice)
        .map(|t| t.amount)
        .sum();
    let pending_invoices: f64 = in_month
        .iter()
        .filter(|t| t.direction == Direction::Saida && t.origin == Origin::FutureInvoice)
        .map(|t| t.amount)
        .sum();

    let balance = income - expenses;

    Ok(MonthlySummary {
        year,
        month,
        income,
        expenses,
        balance,
        pending_invoices,
        projected_balance: balance - pending_invoices,
    })
}

/// Summarize the user's month.
pub async fn get_summary_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<MonthlySummary>, Error> {
    let range = month_range(query.year, query.month)?;
    let transactions = state.transactions().list(
        user_id,
        &TransactionQuery {
            date_range: Some(range),
            ..Default::default()
        },
    )?;

    monthly_summary(&transactions, query.year, query.month).map(Json)
}
