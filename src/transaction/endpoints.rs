//! Route handlers for reading and writing transactions.

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use time::Date;

use crate::{
    Alert, Error, TransactionId, UserId, app_state::RepositoryState, card::reset_card_limit,
};

use super::{
    core::{Direction, NewTransaction, Origin, Transaction},
    repository::{TransactionQuery, TransactionRepository},
};

/// The query string accepted by [get_transactions_endpoint].
#[derive(Debug, Default, Deserialize)]
pub struct TransactionFilter {
    /// Only include income or only expenses.
    pub tipo_movimento: Option<Direction>,
    /// Only include transactions with this origin.
    pub origem: Option<Origin>,
    /// Only include transactions on or after this date.
    pub from: Option<Date>,
    /// Only include transactions on or before this date.
    pub to: Option<Date>,
}

impl From<TransactionFilter> for TransactionQuery {
    fn from(filter: TransactionFilter) -> Self {
        let date_range = match (filter.from, filter.to) {
            (None, None) => None,
            (from, to) => Some(from.unwrap_or(Date::MIN)..=to.unwrap_or(Date::MAX)),
        };

        TransactionQuery {
            direction: filter.tipo_movimento,
            origin: filter.origem,
            date_range,
        }
    }
}

/// List the user's transactions, newest first.
pub async fn get_transactions_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Json<Vec<Transaction>>, Error> {
    state
        .transactions()
        .list(user_id, &filter.into())
        .map(Json)
}

/// Record a new transaction.
pub async fn create_transaction_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Json(transaction): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let transaction = state.transactions().create(user_id, transaction)?;
    reset_card_limit(&state.cards(), user_id, &transaction);

    Ok((StatusCode::CREATED, Json(transaction)))
}

/// Get a single transaction.
pub async fn get_transaction_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Json<Transaction>, Error> {
    state.transactions().get(user_id, transaction_id).map(Json)
}

/// Replace a transaction's details.
pub async fn update_transaction_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
    Json(transaction): Json<NewTransaction>,
) -> Result<Json<Transaction>, Error> {
    let repository = state.transactions();
    let cards = state.cards();

    let previous = repository.get(user_id, transaction_id)?;
    let updated = repository.update(user_id, transaction_id, transaction)?;

    reset_card_limit(&cards, user_id, &previous);
    reset_card_limit(&cards, user_id, &updated);

    Ok(Json(updated))
}

/// Delete a transaction.
pub async fn delete_transaction_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Path(transaction_id): Path<TransactionId>,
) -> Result<Alert, Error> {
    let repository = state.transactions();

    let transaction = repository.get(user_id, transaction_id)?;
    repository.delete(user_id, transaction_id)?;
    reset_card_limit(&state.cards(), user_id, &transaction);

    Ok(Alert::success(
        "Transaction deleted",
        &format!("\"{}\" was removed.", transaction.name),
    ))
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Json,
        extract::{Path, Query, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        Error,
        card::{CardRepository, NewCard},
        test_utils::test_repository_state,
        transaction::{Direction, NewTransaction, TransactionQuery},
    };

    use super::{
        TransactionFilter, create_transaction_endpoint, delete_transaction_endpoint,
        get_transaction_endpoint, get_transactions_endpoint, update_transaction_endpoint,
    };

    fn expense(amount: f64) -> NewTransaction {
        NewTransaction::new(amount, date!(2025 - 03 - 10), "Mercado", Direction::Saida)
    }

    #[tokio::test]
    async fn create_and_filter_by_direction() {
        let (state, user_id) = test_repository_state();

        let (status, Json(created)) =
            create_transaction_endpoint(State(state.clone()), Extension(user_id), Json(expense(10.0)))
                .await
                .unwrap();
        create_transaction_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(NewTransaction::new(
                3000.0,
                date!(2025 - 03 - 05),
                "Salário",
                Direction::Entrada,
            )),
        )
        .await
        .unwrap();

        let Json(expenses) = get_transactions_endpoint(
            State(state),
            Extension(user_id),
            Query(TransactionFilter {
                tipo_movimento: Some(Direction::Saida),
                ..Default::default()
            }),
        )
        .await
        .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(expenses, vec![created]);
    }

    #[test]
    fn filter_with_one_bound_is_open_ended() {
        let query = TransactionQuery::from(TransactionFilter {
            from: Some(date!(2025 - 03 - 01)),
            ..Default::default()
        });

        let range = query.date_range.unwrap();
        assert_eq!(*range.start(), date!(2025 - 03 - 01));
        assert_eq!(*range.end(), time::Date::MAX);
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (state, user_id) = test_repository_state();
        let (_, Json(created)) =
            create_transaction_endpoint(State(state.clone()), Extension(user_id), Json(expense(10.0)))
                .await
                .unwrap();

        let Json(updated) = update_transaction_endpoint(
            State(state.clone()),
            Extension(user_id),
            Path(created.id),
            Json(expense(12.5)),
        )
        .await
        .unwrap();
        assert_eq!(updated.amount, 12.5);

        delete_transaction_endpoint(State(state.clone()), Extension(user_id), Path(created.id))
            .await
            .unwrap();

        let result =
            get_transaction_endpoint(State(state), Extension(user_id), Path(created.id)).await;
        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn writing_a_card_transaction_resets_the_card_limit() {
        let (state, user_id) = test_repository_state();
        let cards = state.cards();
        let card = cards
            .create(user_id, NewCard::new("Nubank", "1234").limit(1000.0))
            .unwrap();
        cards.set_available_limit(user_id, card.id, Some(1000.0)).unwrap();

        create_transaction_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(expense(10.0).card_suffix("1234")),
        )
        .await
        .unwrap();

        assert_eq!(cards.get(user_id, card.id).unwrap().available_limit, None);
    }
}
