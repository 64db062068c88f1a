//! The credit card model and the table it lives in.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{CardId, Error, UserId, currency::deserialize_amount};

/// The number of trailing card digits used to identify a card.
pub const SUFFIX_LENGTH: usize = 4;

/// A credit card registered by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    /// The ID of the card.
    pub id: CardId,
    /// The user that owns the card.
    pub user_id: UserId,
    /// A name for the card, e.g. "Nubank".
    pub nickname: String,
    /// The last four digits of the card number, unique per user.
    pub last_digits: String,
    /// The credit limit.
    pub limit: f64,
    /// The limit left after outstanding purchases, `None` until it is computed.
    pub available_limit: Option<f64>,
    /// Whether the card is still in use.
    pub active: bool,
}

/// The fields of a card that the user provides.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewCard {
    /// A name for the card. Defaults to "Cartão final NNNN" when blank.
    #[serde(default)]
    pub nickname: String,
    /// The last four digits of the card number.
    pub last_digits: String,
    /// The credit limit.
    #[serde(default, deserialize_with = "deserialize_amount")]
    pub limit: f64,
    /// Whether the card is still in use.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl NewCard {
    /// Create an active card with no limit.
    pub fn new(nickname: &str, last_digits: &str) -> Self {
        Self {
            nickname: nickname.to_owned(),
            last_digits: last_digits.to_owned(),
            limit: 0.0,
            active: true,
        }
    }

    /// Set the credit limit.
    pub fn limit(mut self, limit: f64) -> Self {
        self.limit = limit;
        self
    }

    /// Set whether the card is in use.
    pub fn active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Check the suffix and limit and fill in a default nickname.
    ///
    /// # Errors
    /// Returns [Error::InvalidCardSuffix] unless `last_digits` is exactly four
    /// ASCII digits, or [Error::InvalidAmount] for a negative limit.
    pub fn validate(self) -> Result<Self, Error> {
        let last_digits = self.last_digits.trim().to_owned();

        if !is_valid_suffix(&last_digits) {
            return Err(Error::InvalidCardSuffix(self.last_digits));
        }

        if !self.limit.is_finite() || self.limit < 0.0 {
            return Err(Error::InvalidAmount(self.limit.to_string()));
        }

        let nickname = match self.nickname.trim() {
            "" => default_nickname(&last_digits),
            nickname => nickname.to_owned(),
        };

        Ok(Self {
            nickname,
            last_digits,
            ..self
        })
    }
}

/// Whether `suffix` is exactly four ASCII digits.
pub fn is_valid_suffix(suffix: &str) -> bool {
    suffix.len() == SUFFIX_LENGTH && suffix.chars().all(|c| c.is_ascii_digit())
}

/// The nickname given to a card that the user did not name.
pub fn default_nickname(suffix: &str) -> String {
    format!("Cartão final {suffix}")
}

/// Create the `cartoes_credito` table.
///
/// # Errors
/// Returns an error if the table could not be created.
pub fn create_card_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS cartoes_credito (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                apelido TEXT NOT NULL,
                ultimos_digitos TEXT NOT NULL CHECK (length(ultimos_digitos) = 4),
                limite REAL NOT NULL DEFAULT 0 CHECK (limite >= 0),
                limite_disponivel REAL,
                ativo INTEGER NOT NULL DEFAULT 1,
                UNIQUE(user_id, ultimos_digitos)
                )",
        (),
    )?;

    Ok(())
}

pub(crate) const CARD_COLUMNS: &str =
    "id, user_id, apelido, ultimos_digitos, limite, limite_disponivel, ativo";

pub(crate) fn map_card_row(row: &Row) -> Result<Card, rusqlite::Error> {
    Ok(Card {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        nickname: row.get(2)?,
        last_digits: row.get(3)?,
        limit: row.get(4)?,
        available_limit: row.get(5)?,
        active: row.get(6)?,
    })
}
