//! The transaction model and the table it lives in.

use std::{fmt::Display, str::FromStr};

use rusqlite::{Connection, Row, types::Type};
use serde::{Deserialize, Serialize};
use time::Date;

use crate::{Error, TransactionId, UserId, currency::deserialize_amount};

/// Whether money came in or went out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Income.
    Entrada,
    /// An expense.
    Saida,
}

impl Direction {
    /// The value stored in the `tipo_movimento` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Entrada => "entrada",
            Direction::Saida => "saida",
        }
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "entrada" => Ok(Direction::Entrada),
            "saida" => Ok(Direction::Saida),
            other => Err(format!("unknown direction \"{other}\"")),
        }
    }
}

impl Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a transaction came from.
///
/// Future invoices are projected card bills. Linking one to the real payment
/// turns it into a paid invoice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    /// Entered by the user.
    #[default]
    Manual,
    /// A projected card bill that has not been paid yet.
    FutureInvoice,
    /// A card bill that was matched to its payment.
    PaidInvoice,
}

impl Origin {
    /// The value stored in the `origem` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Origin::Manual => "manual",
            Origin::FutureInvoice => "future_invoice",
            Origin::PaidInvoice => "paid_invoice",
        }
    }
}

impl FromStr for Origin {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "manual" => Ok(Origin::Manual),
            "future_invoice" => Ok(Origin::FutureInvoice),
            "paid_invoice" => Ok(Origin::PaidInvoice),
            other => Err(format!("unknown origin \"{other}\"")),
        }
    }
}

impl Display for Origin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An income or expense record owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The user that owns the transaction.
    pub user_id: UserId,
    /// The amount of money, always positive. See [Transaction::direction] for the sign.
    pub amount: f64,
    /// When the transaction happened, or for future invoices, when the bill is due.
    pub date: Date,
    /// The budget category, e.g. "Mercado".
    pub category: String,
    /// A description of the transaction.
    pub name: String,
    /// How the transaction was paid, e.g. "Cartão de crédito final 1234".
    pub payment_method: Option<String>,
    /// The card suffix entered by the user, if any.
    pub card_suffix: Option<String>,
    /// The card nickname entered by the user, if any.
    pub card_nickname: Option<String>,
    /// Whether money came in or went out.
    #[serde(rename = "tipo_movimento")]
    pub direction: Direction,
    /// Where the transaction came from.
    pub origin: Origin,
}

impl Transaction {
    /// Whether the transaction is an expense.
    pub fn is_outflow(&self) -> bool {
        self.direction == Direction::Saida
    }
}

/// The fields of a transaction that the user provides.
///
/// Use the builder methods to set the optional fields.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct NewTransaction {
    /// The amount of money, either a number or text such as "1.234,56".
    #[serde(deserialize_with = "deserialize_amount")]
    pub amount: f64,
    /// When the transaction happened.
    pub date: Date,
    /// The budget category.
    pub category: String,
    /// A description of the transaction.
    pub name: String,
    /// How the transaction was paid.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// The last digits of the card used.
    #[serde(default)]
    pub card_suffix: Option<String>,
    /// The nickname of the card used.
    #[serde(default)]
    pub card_nickname: Option<String>,
    /// Whether money came in or went out.
    #[serde(rename = "tipo_movimento")]
    pub direction: Direction,
    /// Where the transaction came from, defaults to [Origin::Manual].
    #[serde(default)]
    pub origin: Origin,
}

impl NewTransaction {
    /// Create a manual transaction in the "Outros" category.
    pub fn new(amount: f64, date: Date, name: &str, direction: Direction) -> Self {
        Self {
            amount,
            date,
            category: "Outros".to_owned(),
            name: name.to_owned(),
            payment_method: None,
            card_suffix: None,
            card_nickname: None,
            direction,
            origin: Origin::Manual,
        }
    }

    /// Set the category.
    pub fn category(mut self, category: &str) -> Self {
        self.category = category.to_owned();
        self
    }

    /// Set the payment method.
    pub fn payment_method(mut self, payment_method: &str) -> Self {
        self.payment_method = Some(payment_method.to_owned());
        self
    }

    /// Set the card suffix.
    pub fn card_suffix(mut self, card_suffix: &str) -> Self {
        self.card_suffix = Some(card_suffix.to_owned());
        self
    }

    /// Set the card nickname.
    pub fn card_nickname(mut self, card_nickname: &str) -> Self {
        self.card_nickname = Some(card_nickname.to_owned());
        self
    }

    /// Set the origin.
    pub fn origin(mut self, origin: Origin) -> Self {
        self.origin = origin;
        self
    }

    /// Trim the text fields, turn blank optional fields into `None` and check the amount.
    ///
    /// # Errors
    /// Returns [Error::InvalidAmount] for negative or non-finite amounts,
    /// [Error::EmptyCategory] if the category is blank and [Error::InvalidOrigin]
    /// for [Origin::PaidInvoice], which only linking an invoice may set.
    pub fn validate(self) -> Result<Self, Error> {
        if !self.amount.is_finite() || self.amount < 0.0 {
            return Err(Error::InvalidAmount(self.amount.to_string()));
        }

        if self.origin == Origin::PaidInvoice {
            return Err(Error::InvalidOrigin);
        }

        let category = self.category.trim().to_owned();
        if category.is_empty() {
            return Err(Error::EmptyCategory);
        }

        Ok(Self {
            category,
            name: self.name.trim().to_owned(),
            payment_method: non_blank(self.payment_method),
            card_suffix: non_blank(self.card_suffix),
            card_nickname: non_blank(self.card_nickname),
            ..self
        })
    }
}

fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|text| text.trim().to_owned())
        .filter(|text| !text.is_empty())
}

/// Create the `registros_financeiros` table.
///
/// # Errors
/// Returns an error if the table could not be created.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS registros_financeiros (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL REFERENCES profiles(id) ON DELETE CASCADE,
                valor REAL NOT NULL CHECK (valor >= 0),
                data TEXT NOT NULL,
                categoria TEXT NOT NULL,
                nome TEXT NOT NULL,
                forma_pagamento TEXT,
                cartao_final TEXT,
                apelido TEXT,
                tipo_movimento TEXT NOT NULL CHECK (tipo_movimento IN ('entrada', 'saida')),
                origem TEXT NOT NULL DEFAULT 'manual'
                    CHECK (origem IN ('manual', 'future_invoice', 'paid_invoice'))
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_registros_user_date
            ON registros_financeiros(user_id, data)",
        (),
    )?;

    Ok(())
}

/// The columns read by [map_transaction_row], in order.
pub(crate) const TRANSACTION_COLUMNS: &str = "id, user_id, valor, data, categoria, nome, \
    forma_pagamento, cartao_final, apelido, tipo_movimento, origem";

pub(crate) fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let direction: String = row.get(9)?;
    let origin: String = row.get(10)?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserId::new(row.get(1)?),
        amount: row.get(2)?,
        date: row.get(3)?,
        category: row.get(4)?,
        name: row.get(5)?,
        payment_method: row.get(6)?,
        card_suffix: row.get(7)?,
        card_nickname: row.get(8)?,
        direction: direction
            .parse()
            .map_err(|error: String| conversion_error(9, error))?,
        origin: origin
            .parse()
            .map_err(|error: String| conversion_error(10, error))?,
    })
}

fn conversion_error(column: usize, message: String) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, Type::Text, message.into())
}
