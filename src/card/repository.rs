//! The card repository trait and its SQLite implementation.

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, OptionalExtension};

use crate::{CardId, Error, UserId};

use super::core::{CARD_COLUMNS, Card, NewCard, map_card_row};

/// Handles the creation and retrieval of a user's cards.
///
/// Every method is scoped to `user_id`: cards owned by another user are
/// reported as [Error::NotFound].
pub trait CardRepository {
    /// Register a new card.
    ///
    /// Gives [Error::DuplicateCardSuffix] if the user already has a card with the same last digits.
    fn create(&self, user_id: UserId, card: NewCard) -> Result<Card, Error>;

    /// Retrieve a single card.
    fn get(&self, user_id: UserId, id: CardId) -> Result<Card, Error>;

    /// Retrieve all of the user's cards, active or not.
    fn list(&self, user_id: UserId) -> Result<Vec<Card>, Error>;

    /// Replace a card's details. The available limit is cleared so it is recomputed.
    fn update(&self, user_id: UserId, id: CardId, card: NewCard) -> Result<Card, Error>;

    /// Delete a card.
    fn delete(&self, user_id: UserId, id: CardId) -> Result<(), Error>;

    /// Find the card with the last digits `suffix`, if the user has one.
    fn find_by_suffix(&self, user_id: UserId, suffix: &str) -> Result<Option<Card>, Error>;

    /// Store the computed available limit, or `None` to have it recomputed.
    fn set_available_limit(
        &self,
        user_id: UserId,
        id: CardId,
        available_limit: Option<f64>,
    ) -> Result<(), Error>;
}

/// Stores cards in the `cartoes_credito` table.
#[derive(Debug, Clone)]
pub struct SqliteCardRepository {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteCardRepository {
    /// Create a new repository for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

fn map_unique_violation(error: rusqlite::Error, last_digits: &str) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            _,
        ) => Error::DuplicateCardSuffix(last_digits.to_owned()),
        error => error.into(),
    }
}

impl CardRepository for SqliteCardRepository {
    fn create(&self, user_id: UserId, card: NewCard) -> Result<Card, Error> {
        let card = card.validate()?;

        let created = self
            .lock()?
            .prepare(&format!(
                "INSERT INTO cartoes_credito (user_id, apelido, ultimos_digitos, limite, ativo)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 RETURNING {CARD_COLUMNS}"
            ))?
            .query_row(
                (
                    user_id.as_i64(),
                    &card.nickname,
                    &card.last_digits,
                    card.limit,
                    card.active,
                ),
                map_card_row,
            )
            .map_err(|error| map_unique_violation(error, &card.last_digits))?;

        Ok(created)
    }

    fn get(&self, user_id: UserId, id: CardId) -> Result<Card, Error> {
        let card = self
            .lock()?
            .prepare(&format!(
                "SELECT {CARD_COLUMNS} FROM cartoes_credito WHERE id = ?1 AND user_id = ?2"
            ))?
            .query_row((id, user_id.as_i64()), map_card_row)?;

        Ok(card)
    }

    fn list(&self, user_id: UserId) -> Result<Vec<Card>, Error> {
        self.lock()?
            .prepare(&format!(
                "SELECT {CARD_COLUMNS} FROM cartoes_credito WHERE user_id = ?1 ORDER BY apelido, id"
            ))?
            .query_map([user_id.as_i64()], map_card_row)?
            .map(|maybe_card| maybe_card.map_err(Error::from))
            .collect()
    }

    fn update(&self, user_id: UserId, id: CardId, card: NewCard) -> Result<Card, Error> {
        let card = card.validate()?;

        let updated = self
            .lock()?
            .prepare(&format!(
                "UPDATE cartoes_credito
                 SET apelido = ?3, ultimos_digitos = ?4, limite = ?5, ativo = ?6,
                     limite_disponivel = NULL
                 WHERE id = ?1 AND user_id = ?2
                 RETURNING {CARD_COLUMNS}"
            ))?
            .query_row(
                (
                    id,
                    user_id.as_i64(),
                    &card.nickname,
                    &card.last_digits,
                    card.limit,
                    card.active,
                ),
                map_card_row,
            )
            .map_err(|error| map_unique_violation(error, &card.last_digits))?;

        Ok(updated)
    }

    fn delete(&self, user_id: UserId, id: CardId) -> Result<(), Error> {
        let rows_affected = self.lock()?.execute(
            "DELETE FROM cartoes_credito WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    fn find_by_suffix(&self, user_id: UserId, suffix: &str) -> Result<Option<Card>, Error> {
        let card = self
            .lock()?
            .prepare(&format!(
                "SELECT {CARD_COLUMNS} FROM cartoes_credito
                 WHERE user_id = ?1 AND ultimos_digitos = ?2"
            ))?
            .query_row((user_id.as_i64(), suffix), map_card_row)
            .optional()?;

        Ok(card)
    }

    fn set_available_limit(
        &self,
        user_id: UserId,
        id: CardId,
        available_limit: Option<f64>,
    ) -> Result<(), Error> {
        let rows_affected = self.lock()?.execute(
            "UPDATE cartoes_credito SET limite_disponivel = ?3 WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64(), available_limit),
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }
}
