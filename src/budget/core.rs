use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{BudgetId, Error, UserId, currency::deserialize_amount};

/// A monthly spending limit for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Budget {
    /// The id for the budget.
    pub id: BudgetId,
    /// The user that owns the budget.
    pub user_id: UserId,
    /// The transaction category the budget applies to.
    pub category: String,
    /// How much may be spent in the category each month.
    pub limit: f64,
}

/// The fields of a budget that the user provides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewBudget {
    /// The transaction category the budget applies to.
    pub category: String,
    /// How much may be spent in the category each month.
    #[serde(deserialize_with = "deserialize_amount")]
    pub limit: f64,
}

pub fn create_budget_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS orcamentos_categorias (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
            categoria TEXT NOT NULL COLLATE NOCASE,
            limite REAL NOT NULL CHECK (limite >= 0),
            UNIQUE(user_id, categoria)
        )",
        (),
    )?;

    Ok(())
}

fn map_row_to_budget(row: &Row) -> Result<Budget, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserId::new(row.get(1)?);
    let category = row.get(2)?;
    let limit = row.get(3)?;

    Ok(Budget {
        id,
        user_id,
        category,
        limit,
    })
}

/// Create the budget for a category, or replace its limit if it already has one.
///
/// Categories are compared ignoring case.
///
/// # Errors
/// Returns [Error::EmptyCategory] for a blank category, [Error::InvalidAmount]
/// for a negative limit or [Error::SqlError] if the query failed.
pub fn upsert_budget(
    user_id: UserId,
    budget: NewBudget,
    connection: &Connection,
) -> Result<Budget, Error> {
    let category = budget.category.trim();

    if category.is_empty() {
        return Err(Error::EmptyCategory);
    }

    if !budget.limit.is_finite() || budget.limit < 0.0 {
        return Err(Error::InvalidAmount(budget.limit.to_string()));
    }

    let budget = connection
        .prepare(
            "INSERT INTO orcamentos_categorias (user_id, categoria, limite) VALUES (?1, ?2, ?3)
             ON CONFLICT(user_id, categoria) DO UPDATE SET limite = excluded.limite
             RETURNING id, user_id, categoria, limite",
        )?
        .query_row((user_id.as_i64(), category, budget.limit), map_row_to_budget)?;

    Ok(budget)
}

/// Get the user's budgets ordered by category.
///
/// # Errors
/// Returns [Error::SqlError] if the query failed.
pub fn get_budgets(user_id: UserId, connection: &Connection) -> Result<Vec<Budget>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, categoria, limite FROM orcamentos_categorias
             WHERE user_id = ?1 ORDER BY categoria",
        )?
        .query_map([user_id.as_i64()], map_row_to_budget)?
        .map(|maybe_budget| maybe_budget.map_err(Error::from))
        .collect()
}

/// Delete one of the user's budgets.
///
/// # Errors
/// Returns [Error::NotFound] if the user has no budget with `id`.
pub fn delete_budget(user_id: UserId, id: BudgetId, connection: &Connection) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM orcamentos_categorias WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}
