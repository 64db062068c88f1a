#![allow(missing_docs)]

use axum::{extract::FromRef, response::Response};
use rusqlite::Connection;
use serde::de::DeserializeOwned;
use time::macros::date;

use crate::{
    AppState, AuthEvents, PasswordHash, RepositoryState, UserId,
    app_state::create_cookie_key,
    auth::{AuthState, DEFAULT_COOKIE_DURATION, create_user},
    cache::CachePolicy,
    card::Card,
    db::initialize,
    transaction::{Direction, Origin, Transaction},
};

pub(crate) fn get_test_connection() -> Connection {
    let connection = Connection::open_in_memory().unwrap();
    initialize(&connection).unwrap();
    connection
}

#[track_caller]
pub(crate) fn create_test_user(connection: &Connection, email: &str) -> UserId {
    create_user(
        email,
        &PasswordHash::new_unchecked("hunter2"),
        None,
        connection,
    )
    .unwrap()
    .id
}

pub(crate) async fn parse_json_body<T: DeserializeOwned>(response: Response) -> T {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Could not read response body");

    serde_json::from_slice(&body).expect("Response body is not the expected JSON")
}

pub(crate) fn test_auth_state() -> AuthState {
    AuthState {
        db_connection: std::sync::Arc::new(std::sync::Mutex::new(get_test_connection())),
        cookie_key: create_cookie_key("foobar"),
        cookie_duration: DEFAULT_COOKIE_DURATION,
        password_cost: 4,
        auth_events: AuthEvents::default(),
    }
}

pub(crate) fn test_app_state() -> (AppState, UserId) {
    let state = AppState::new(
        Connection::open_in_memory().unwrap(),
        "foobar",
        "America/Sao_Paulo",
        CachePolicy::default(),
    )
    .unwrap();

    let user_id = create_test_user(&state.db_connection.lock().unwrap(), "ana@example.com");

    (state, user_id)
}

pub(crate) fn test_repository_state() -> (RepositoryState, UserId) {
    let (state, user_id) = test_app_state();

    (RepositoryState::from_ref(&state), user_id)
}

/// A manual transaction owned by user 1, dated 2025-03-10.
pub(crate) fn test_transaction(id: i64, amount: f64, direction: Direction) -> Transaction {
    Transaction {
        id,
        user_id: UserId::new(1),
        amount,
        date: date!(2025 - 03 - 10),
        category: "Outros".to_owned(),
        name: "Teste".to_owned(),
        payment_method: None,
        card_suffix: None,
        card_nickname: None,
        direction,
        origin: Origin::Manual,
    }
}

pub(crate) fn test_card(id: i64, nickname: &str, last_digits: &str) -> Card {
    Card {
        id,
        user_id: UserId::new(1),
        nickname: nickname.to_owned(),
        last_digits: last_digits.to_owned(),
        limit: 0.0,
        available_limit: None,
        active: true,
    }
}
