//! Implements a struct that holds the state of the REST server.

use std::sync::{Arc, Mutex};

use axum::extract::FromRef;
use axum_extra::extract::cookie::Key;
use rusqlite::Connection;
use sha2::{Digest, Sha512};
use time::Duration;

use crate::{
    AuthEvents, Error, PasswordHash,
    auth::DEFAULT_COOKIE_DURATION,
    cache::CachePolicy,
    card::SqliteCardRepository,
    db::initialize,
    transaction::{
        CachedTransactionRepository, SqliteTransactionRepository, TransactionCache,
        new_transaction_cache,
    },
};

/// The state of the REST server.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,

    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,

    /// The bcrypt cost used when hashing new passwords.
    pub password_cost: u32,

    /// The local timezone as a canonical timezone name, e.g. "America/Sao_Paulo".
    pub local_timezone: String,

    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,

    /// Each user's transactions, shared by every request.
    pub transaction_cache: TransactionCache,

    /// Where sign in, sign out and session expiry are published.
    pub auth_events: AuthEvents,
}

impl AppState {
    /// Create a new [AppState] with a SQLite database connection.
    ///
    /// This function will initialize the database by adding the tables for the domain models.
    /// `local_timezone` should be a valid, canonical timezone name, e.g. "America/Sao_Paulo".
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub fn new(
        db_connection: Connection,
        cookie_secret: &str,
        local_timezone: &str,
        cache_policy: CachePolicy,
    ) -> Result<Self, Error> {
        initialize(&db_connection)?;

        Ok(Self {
            cookie_key: create_cookie_key(cookie_secret),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            password_cost: PasswordHash::DEFAULT_COST,
            local_timezone: local_timezone.to_owned(),
            db_connection: Arc::new(Mutex::new(db_connection)),
            transaction_cache: new_transaction_cache(cache_policy),
            auth_events: AuthEvents::default(),
        })
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Create a signing key for cookies from a `secret`s string.
pub fn create_cookie_key(secret: &str) -> Key {
    let hash = Sha512::digest(secret);

    Key::from(&hash)
}

/// The state needed by handlers that read and write a user's records.
#[derive(Debug, Clone)]
pub struct RepositoryState {
    /// The database connection
    pub db_connection: Arc<Mutex<Connection>>,
    /// Each user's transactions, shared by every request.
    pub transaction_cache: TransactionCache,
    /// The local timezone as a canonical timezone name.
    pub local_timezone: String,
}

impl RepositoryState {
    /// The transaction repository, reading through the shared cache.
    pub fn transactions(&self) -> CachedTransactionRepository<SqliteTransactionRepository> {
        CachedTransactionRepository::new(
            SqliteTransactionRepository::new(self.db_connection.clone()),
            self.transaction_cache.clone(),
        )
    }

    /// The card repository.
    pub fn cards(&self) -> SqliteCardRepository {
        SqliteCardRepository::new(self.db_connection.clone())
    }
}

impl FromRef<AppState> for RepositoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            transaction_cache: state.transaction_cache.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rusqlite::Connection;

    use crate::cache::CachePolicy;

    use super::{AppState, create_cookie_key};

    #[test]
    fn new_initializes_database() {
        let state = AppState::new(
            Connection::open_in_memory().unwrap(),
            "foobar",
            "America/Sao_Paulo",
            CachePolicy::default(),
        )
        .unwrap();

        let count: i64 = state
            .db_connection
            .lock()
            .unwrap()
            .query_row("SELECT COUNT(*) FROM registros_financeiros", [], |row| {
                row.get(0)
            })
            .unwrap();

        assert_eq!(count, 0);
    }

    #[test]
    fn cookie_key_is_deterministic() {
        assert_eq!(
            create_cookie_key("secret").master(),
            create_cookie_key("secret").master()
        );
        assert_ne!(
            create_cookie_key("secret").master(),
            create_cookie_key("other").master()
        );
    }
}
