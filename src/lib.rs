//! Carteira is a web service for tracking household finances.
//!
//! Users record income and expense transactions, manage credit cards, set
//! budgets per category and view computed balances and projections.
//!
//! This library provides a JSON API, the SQLite backed repositories behind it,
//! and the reconciliation heuristics that link card purchases and invoice
//! payments to registered cards.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use tokio::signal;

mod alert;
mod app_state;
mod auth;
mod budget;
pub mod cache;
mod card;
pub mod currency;
mod database_id;
mod db;
pub mod endpoints;
pub mod invoice;
mod logging;
pub mod phone;
mod routing;
mod subscription;
mod summary;
mod timezone;
mod transaction;

#[cfg(test)]
mod test_utils;

pub use alert::Alert;
pub use app_state::{AppState, RepositoryState};
pub use auth::{
    AuthEvent, AuthEvents, AuthStateObserver, CacheInvalidationObserver, PasswordHash, User,
    UserId, ValidatedPassword, get_user_by_email, spawn_observer,
};
pub use budget::{Budget, BudgetUsage, budget_usage};
pub use card::{
    Card, CardInfo, CardRepository, DetectedCard, NewCard, SqliteCardRepository,
    detect_orphan_cards, extract_card_info, find_matching_card,
};
pub use database_id::{BudgetId, CardId, DatabaseId, TransactionId};
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use routing::build_router;
pub use subscription::{Plan, SubscriptionStatus, check_subscription, set_subscription};
pub use summary::{MonthlySummary, monthly_summary};
pub use timezone::get_local_offset;
pub use transaction::{
    CachedTransactionRepository, Direction, NewTransaction, Origin, SqliteTransactionRepository,
    Transaction, TransactionCache, TransactionQuery, TransactionRepository,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {error}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(error) => {
                tracing::error!("failed to install signal handler: {error}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an invalid combination of email and password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The request did not carry a valid session.
    #[error("not logged in")]
    Unauthenticated,

    /// The session cookie is past its expiry.
    #[error("the session has expired")]
    SessionExpired,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email used to register does not look like an email address.
    #[error("\"{0}\" is not a valid email address")]
    InvalidEmail(String),

    /// The session expiry could not be formatted for the cookie.
    #[error("could not format the session expiry: {0}")]
    InvalidDateFormat(String),

    /// The email used to register is already taken.
    #[error("the email \"{0}\" is already registered")]
    DuplicateEmail(String),

    /// A phone number could not be normalized to the canonical 12 digit form.
    #[error("\"{0}\" is not a valid phone number")]
    InvalidPhoneNumber(String),

    /// An amount could not be parsed or was negative.
    #[error("\"{0}\" is not a valid amount")]
    InvalidAmount(String),

    /// A card suffix must be exactly four digits.
    #[error("\"{0}\" is not a valid card suffix, expected four digits")]
    InvalidCardSuffix(String),

    /// The user already has a card with these last digits.
    #[error("a card ending in {0} already exists")]
    DuplicateCardSuffix(String),

    /// A category name was empty.
    #[error("category cannot be empty")]
    EmptyCategory,

    /// A month outside 1..=12 was requested.
    #[error("{0} is not a valid month")]
    InvalidMonth(u8),

    /// Tried to link a record that is not an unpaid future invoice.
    #[error("transaction {0} is not an unpaid future invoice")]
    NotAFutureInvoice(TransactionId),

    /// Tried to reconcile a record that is not a manually recorded expense.
    #[error("transaction {0} is not a payment and cannot settle an invoice")]
    NotAPayment(TransactionId),

    /// A new record claimed to be an already paid invoice.
    #[error("new records cannot be created as paid invoices, link a future invoice instead")]
    InvalidOrigin,

    /// Tried to edit a record that has already been reconciled with a payment.
    #[error("transaction {0} has already been reconciled and cannot be edited")]
    AlreadyReconciled(TransactionId),

    /// The requested resource was not found.
    ///
    /// Rows owned by other users are reported as not found.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// Could not acquire the cache lock
    #[error("could not acquire the cache lock")]
    CacheLockError,

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Writing the CSV export failed.
    #[error("could not write CSV: {0}")]
    CsvError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::Unauthenticated | Error::SessionExpired => {
                StatusCode::UNAUTHORIZED
            }
            Error::NotFound => StatusCode::NOT_FOUND,
            Error::DuplicateEmail(_)
            | Error::DuplicateCardSuffix(_)
            | Error::NotAFutureInvoice(_)
            | Error::AlreadyReconciled(_) => StatusCode::CONFLICT,
            Error::TooWeak(_)
            | Error::InvalidEmail(_)
            | Error::InvalidPhoneNumber(_)
            | Error::InvalidAmount(_)
            | Error::InvalidCardSuffix(_)
            | Error::EmptyCategory
            | Error::InvalidOrigin
            | Error::NotAPayment(_)
            | Error::InvalidMonth(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Error::HashingError(_)
            | Error::InvalidDateFormat(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::CacheLockError
            | Error::InvalidTimezoneError(_)
            | Error::CsvError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn into_alert(self) -> Alert {
        match self {
            Error::InvalidCredentials => Alert::error(
                "Could not log in",
                "The email or password is incorrect. Check your details and try again.",
            ),
            Error::Unauthenticated | Error::SessionExpired => Alert::error(
                "Session expired",
                "Log in again to continue where you left off.",
            ),
            Error::NotFound => Alert::error(
                "Not found",
                "The record could not be found. \
                Try refreshing to see if it has already been deleted.",
            ),
            Error::InvalidTimezoneError(timezone) => Alert::error(
                "Invalid Timezone Settings",
                &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            ),
            error @ (Error::HashingError(_)
            | Error::InvalidDateFormat(_)
            | Error::SqlError(_)
            | Error::DatabaseLockError
            | Error::CacheLockError
            | Error::CsvError(_)) => {
                tracing::error!("An unexpected error occurred: {}", error);
                Alert::error(
                    "Something went wrong",
                    "An unexpected error occurred, try again later or check the server logs.",
                )
            }
            error => Alert::error("Could not complete the request", &error.to_string()),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        (status, self.into_alert()).into_response()
    }
}
