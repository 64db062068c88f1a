//! Code for creating the profiles table and fetching users from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, PasswordHash};

/// A newtype wrapper for integer user IDs.
///
/// Every repository query is filtered by a `UserId`, so keeping it distinct
/// from the other integer IDs stops a card ID from being passed where the
/// owner is expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Hash)]
pub struct UserId(i64);

impl UserId {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserId,
    /// The email the user logs in with.
    pub email: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's phone number in canonical 12 digit form.
    pub phone: Option<String>,
}

/// The public part of a [User] returned to the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileView {
    /// The user's ID.
    pub id: UserId,
    /// The email the user logs in with.
    pub email: String,
    /// The user's phone number in canonical 12 digit form.
    pub phone: Option<String>,
}

impl From<&User> for ProfileView {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            phone: user.phone.clone(),
        }
    }
}

/// Create the profiles table.
///
/// The subscription columns are read by [crate::subscription].
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS profiles (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                phone TEXT,
                subscription_tier TEXT,
                subscription_end TEXT
                )",
        (),
    )?;

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let password: String = row.get(2)?;

    Ok(User {
        id: UserId::new(row.get(0)?),
        email: row.get(1)?,
        password_hash: PasswordHash::new_unchecked(&password),
        phone: row.get(3)?,
    })
}

/// Create and insert a new user into the database.
///
/// `phone` should already be normalized, see [crate::phone::validate_phone].
///
/// # Errors
///
/// Returns a [Error::DuplicateEmail] if the email is taken,
/// or [Error::SqlError] if an SQL related error occurred.
pub fn create_user(
    email: &str,
    password_hash: &PasswordHash,
    phone: Option<&str>,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .execute(
            "INSERT INTO profiles (email, password, phone) VALUES (?1, ?2, ?3)",
            (email, password_hash.to_string(), phone),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateEmail(email.to_owned()),
            error => error.into(),
        })?;

    let id = UserId::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: email.to_owned(),
        password_hash: password_hash.clone(),
        phone: phone.map(str::to_owned),
    })
}

/// Get the user that logs in with `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has the email.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .query_row(
            "SELECT id, email, password, phone FROM profiles WHERE email = ?1",
            (email,),
            map_user_row,
        )
        .map_err(Error::from)
}

/// Get the user with `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn get_user_by_id(user_id: UserId, connection: &Connection) -> Result<User, Error> {
    connection
        .query_row(
            "SELECT id, email, password, phone FROM profiles WHERE id = ?1",
            (user_id.as_i64(),),
            map_user_row,
        )
        .map_err(Error::from)
}
