//! Route handlers for registering cards and the cards found in transactions.

use std::collections::BTreeMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    Alert, CardId, Error, UserId, app_state::RepositoryState,
    transaction::TransactionRepository,
};

use super::{
    core::{Card, NewCard},
    detection::{DetectedCard, detect_orphan_cards_for_user, register_detected_cards},
    limit::resolve_available_limits,
    repository::CardRepository,
};

/// List the user's cards with their available limits filled in.
pub async fn get_cards_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
) -> Result<Json<Vec<Card>>, Error> {
    let repository = state.cards();
    let cards = repository.list(user_id)?;

    let cards = if cards.iter().any(|card| card.available_limit.is_none()) {
        let transactions = state.transactions().list_all(user_id)?;
        resolve_available_limits(&repository, user_id, cards, &transactions)?
    } else {
        cards
    };

    Ok(Json(cards))
}

/// Register a new card.
pub async fn create_card_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Json(card): Json<NewCard>,
) -> Result<(StatusCode, Json<Card>), Error> {
    let card = state.cards().create(user_id, card)?;
    tracing::info!("user {user_id} registered card {}", card.id);

    Ok((StatusCode::CREATED, Json(card)))
}

/// Replace a card's details.
pub async fn update_card_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Path(card_id): Path<CardId>,
    Json(card): Json<NewCard>,
) -> Result<Json<Card>, Error> {
    state.cards().update(user_id, card_id, card).map(Json)
}

/// Delete a card. Its transactions are kept.
pub async fn delete_card_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
    Path(card_id): Path<CardId>,
) -> Result<Alert, Error> {
    state.cards().delete(user_id, card_id)?;

    Ok(Alert::success(
        "Card deleted",
        "Transactions made with the card were kept.",
    ))
}

/// List the cards that transactions point at but that are not registered, keyed by suffix.
pub async fn get_orphan_cards_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
) -> Json<BTreeMap<String, DetectedCard>> {
    Json(detect_orphan_cards_for_user(
        &state.transactions(),
        &state.cards(),
        user_id,
    ))
}

/// Register every card returned by [get_orphan_cards_endpoint].
pub async fn register_orphan_cards_endpoint(
    State(state): State<RepositoryState>,
    Extension(user_id): Extension<UserId>,
) -> Result<(StatusCode, Json<Vec<Card>>), Error> {
    let cards = state.cards();
    let detected = detect_orphan_cards_for_user(&state.transactions(), &cards, user_id);
    let created = register_detected_cards(&cards, user_id, &detected)?;

    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
mod tests {
    use axum::{
        Extension, Json,
        extract::{Path, State},
        http::StatusCode,
    };
    use time::macros::date;

    use crate::{
        Error,
        card::core::NewCard,
        test_utils::test_repository_state,
        transaction::{Direction, NewTransaction, TransactionRepository},
    };

    use super::{
        create_card_endpoint, delete_card_endpoint, get_cards_endpoint,
        get_orphan_cards_endpoint, register_orphan_cards_endpoint, update_card_endpoint,
    };

    #[tokio::test]
    async fn create_then_list_with_available_limit() {
        let (state, user_id) = test_repository_state();
        state
            .transactions()
            .create(
                user_id,
                NewTransaction::new(120.0, date!(2025 - 03 - 10), "Loja", Direction::Saida)
                    .card_suffix("1234"),
            )
            .unwrap();

        let (status, Json(card)) = create_card_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(NewCard::new("Nubank", "1234").limit(1000.0)),
        )
        .await
        .unwrap();
        let Json(cards) = get_cards_endpoint(State(state), Extension(user_id))
            .await
            .unwrap();

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(cards.len(), 1);
        assert_eq!(cards[0].id, card.id);
        assert_eq!(cards[0].available_limit, Some(880.0));
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (state, user_id) = test_repository_state();
        let (_, Json(card)) = create_card_endpoint(
            State(state.clone()),
            Extension(user_id),
            Json(NewCard::new("Nubank", "1234")),
        )
        .await
        .unwrap();

        let Json(updated) = update_card_endpoint(
            State(state.clone()),
            Extension(user_id),
            Path(card.id),
            Json(NewCard::new("Roxinho", "1234").active(false)),
        )
        .await
        .unwrap();
        assert_eq!(updated.nickname, "Roxinho");
        assert!(!updated.active);

        delete_card_endpoint(State(state.clone()), Extension(user_id), Path(card.id))
            .await
            .unwrap();
        let result = delete_card_endpoint(State(state), Extension(user_id), Path(card.id)).await;
        assert_eq!(result.err(), Some(Error::NotFound));
    }

    #[tokio::test]
    async fn detect_and_register_orphans() {
        let (state, user_id) = test_repository_state();
        state
            .transactions()
            .create(
                user_id,
                NewTransaction::new(80.0, date!(2025 - 03 - 10), "Posto final 4321", Direction::Saida),
            )
            .unwrap();

        let Json(detected) =
            get_orphan_cards_endpoint(State(state.clone()), Extension(user_id)).await;
        assert_eq!(detected["4321"].total_amount, 80.0);

        let (status, Json(created)) =
            register_orphan_cards_endpoint(State(state.clone()), Extension(user_id))
                .await
                .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created[0].last_digits, "4321");
        assert_eq!(created[0].nickname, "Cartão final 4321");

        let Json(detected) = get_orphan_cards_endpoint(State(state), Extension(user_id)).await;
        assert!(detected.is_empty());
    }
}
