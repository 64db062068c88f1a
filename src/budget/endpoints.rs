//! Route handlers for budgets.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
};
use rusqlite::Connection;

use crate::{
    Alert, AppState, BudgetId, Error, UserId,
    app_state::RepositoryState,
    timezone::{MonthQuery, month_range},
    transaction::{TransactionQuery, TransactionRepository},
};

use super::{
    core::{Budget, NewBudget, delete_budget, get_budgets, upsert_budget},
    usage::{BudgetUsage, budget_usage},
};

/// The state needed for the budget handlers.
#[derive(Debug, Clone)]
pub struct BudgetState {
    /// The database connection for managing budgets.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for BudgetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

impl BudgetState {
    fn connection(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

/// List the user's budgets.
pub async fn get_budgets_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<Budget>>, Error> {
    let connection = state.connection()?;

    get_budgets(user_id, &connection).map(Json)
}

/// Create or replace the budget for a category.
pub async fn put_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserId>,
    Json(budget): Json<NewBudget>,
) -> Result<Json<Budget>, Error> {
    let connection = state.connection()?;

    upsert_budget(user_id, budget, &connection).map(Json)
}

/// Delete a budget.
pub async fn delete_budget_endpoint(
    State(state): State<BudgetState>,
    Extension(user_id): Extension<UserId>,
    Path(budget_id): Path<BudgetId>,
) -> Result<Alert, Error> {
    let connection = state.connection()?;
    delete_budget(user_id, budget_id, &connection)?;

    Ok(Alert::success("Budget deleted", ""))
}

/// Compare each budget with the month's spending.
pub async fn get_budget_usage_endpoint(
    State(budget_state): State<BudgetState>,
    State(repository_state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Query(query): Query<MonthQuery>,
) -> Result<Json<Vec<BudgetUsage>>, Error> {
    let month = month_range(query.year, query.month)?;
    let budgets = {
        let connection = budget_state.connection()?;
        get_budgets(user_id, &connection)?
    };

    let transactions = repository_state.transactions().list(
        user_id,
        &TransactionQuery {
            date_range: Some(month.clone()),
            ..Default::default()
        },
    )?;

    Ok(Json(budget_usage(&budgets, &transactions, &month)))
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Json,
        extract::{FromRef, Path, Query, State},
    };
    use time::macros::date;

    use crate::{
        Error,
        app_state::RepositoryState,
        budget::core::NewBudget,
        test_utils::test_app_state,
        timezone::MonthQuery,
        transaction::{Direction, NewTransaction, TransactionRepository},
    };

    use super::{
        BudgetState, delete_budget_endpoint, get_budget_usage_endpoint,
        get_budgets_endpoint, put_budget_endpoint,
    };

    #[tokio::test]
    async fn put_list_and_delete() {
        let (state, user_id) = test_app_state();
        let budget_state = BudgetState::from_ref(&state);

        let Json(budget) = put_budget_endpoint(
            State(budget_state.clone()),
            Extension(user_id),
            Json(NewBudget {
                category: "Mercado".to_owned(),
                limit: 800.0,
            }),
        )
        .await
        .unwrap();
        let Json(budgets) = get_budgets_endpoint(State(budget_state.clone()), Extension(user_id))
            .await
            .unwrap();
        assert_eq!(budgets, vec![budget.clone()]);

        delete_budget_endpoint(State(budget_state.clone()), Extension(user_id), Path(budget.id))
            .await
            .unwrap();
        let result =
            delete_budget_endpoint(State(budget_state), Extension(user_id), Path(budget.id)).await;
        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn usage_for_month() {
        let (state, user_id) = test_app_state();
        let budget_state = BudgetState::from_ref(&state);
        let repository_state = RepositoryState::from_ref(&state);
        put_budget_endpoint(
            State(budget_state.clone()),
            Extension(user_id),
            Json(NewBudget {
                category: "Mercado".to_owned(),
                limit: 500.0,
            }),
        )
        .await
        .unwrap();
        repository_state
            .transactions()
            .create(
                user_id,
                NewTransaction::new(125.0, date!(2025 - 03 - 10), "Feira", Direction::Saida)
                    .category("Mercado"),
            )
            .unwrap();

        let Json(usage) = get_budget_usage_endpoint(
            State(budget_state.clone()),
            State(repository_state.clone()),
            Extension(user_id),
            Query(MonthQuery { year: 2025, month: 3 }),
        )
        .await
        .unwrap();
        assert_eq!(usage[0].spent, 125.0);
        assert_eq!(usage[0].percent_used, 25.0);

        let result = get_budget_usage_endpoint(
            State(budget_state),
            State(repository_state),
            Extension(user_id),
            Query(MonthQuery { year: 2025, month: 13 }),
        )
        .await;
        assert_eq!(result.err(), Some(Error::InvalidMonth(13)));
    }
}
