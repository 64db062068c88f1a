//! The transaction repository trait, its SQLite implementation and a caching wrapper.

use std::{
    ops::RangeInclusive,
    sync::{Arc, Mutex},
};

use rusqlite::{Connection, params_from_iter, types::Value};
use time::Date;

use crate::{
    Error, TransactionId, UserId,
    cache::{CachePolicy, SystemClock, TtlCache},
};

use super::core::{
    Direction, NewTransaction, Origin, TRANSACTION_COLUMNS, Transaction, map_transaction_row,
};

/// Defines which transactions [TransactionRepository::list] returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransactionQuery {
    /// Only include income or only expenses.
    pub direction: Option<Direction>,
    /// Only include transactions with this origin.
    pub origin: Option<Origin>,
    /// Include transactions within `date_range` (inclusive).
    pub date_range: Option<RangeInclusive<Date>>,
}

impl TransactionQuery {
    /// Whether `transaction` satisfies every filter in the query.
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.direction
            .is_none_or(|direction| transaction.direction == direction)
            && self.origin.is_none_or(|origin| transaction.origin == origin)
            && self
                .date_range
                .as_ref()
                .is_none_or(|range| range.contains(&transaction.date))
    }
}

/// Handles the creation and retrieval of a user's transactions.
///
/// Every method is scoped to `user_id`: transactions owned by another user
/// are reported as [Error::NotFound].
pub trait TransactionRepository {
    /// Create a new transaction.
    fn create(&self, user_id: UserId, transaction: NewTransaction) -> Result<Transaction, Error>;

    /// Retrieve a single transaction.
    fn get(&self, user_id: UserId, id: TransactionId) -> Result<Transaction, Error>;

    /// Retrieve transactions in the way defined by `query`, newest first.
    fn list(&self, user_id: UserId, query: &TransactionQuery) -> Result<Vec<Transaction>, Error>;

    /// Replace the user editable fields of a transaction.
    ///
    /// The origin is kept as is, use [TransactionRepository::set_origin] to change it.
    /// Paid invoices cannot be edited and give [Error::AlreadyReconciled].
    fn update(
        &self,
        user_id: UserId,
        id: TransactionId,
        transaction: NewTransaction,
    ) -> Result<Transaction, Error>;

    /// Delete a transaction.
    fn delete(&self, user_id: UserId, id: TransactionId) -> Result<(), Error>;

    /// Change where a transaction came from, but only if its origin is still `from`.
    ///
    /// Returns `None` when the transaction exists with a different origin.
    fn set_origin(
        &self,
        user_id: UserId,
        id: TransactionId,
        from: Origin,
        to: Origin,
    ) -> Result<Option<Transaction>, Error>;

    /// Retrieve all of a user's transactions.
    fn list_all(&self, user_id: UserId) -> Result<Vec<Transaction>, Error> {
        self.list(user_id, &TransactionQuery::default())
    }

    /// Retrieve the user's unpaid future invoices.
    fn list_future_invoices(&self, user_id: UserId) -> Result<Vec<Transaction>, Error> {
        self.list(
            user_id,
            &TransactionQuery {
                origin: Some(Origin::FutureInvoice),
                ..Default::default()
            },
        )
    }
}

/// Stores transactions in the `registros_financeiros` table.
#[derive(Debug, Clone)]
pub struct SqliteTransactionRepository {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteTransactionRepository {
    /// Create a new repository for the SQLite `connection`.
    pub fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, Error> {
        self.connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })
    }
}

/// Check that `user_id` owns the transaction `id`.
///
/// # Errors
/// Returns [Error::NotFound] if it does not.
fn ensure_exists(connection: &Connection, user_id: UserId, id: TransactionId) -> Result<(), Error> {
    connection.query_row(
        "SELECT 1 FROM registros_financeiros WHERE id = ?1 AND user_id = ?2",
        (id, user_id.as_i64()),
        |_| Ok(()),
    )?;

    Ok(())
}

impl TransactionRepository for SqliteTransactionRepository {
    fn create(&self, user_id: UserId, transaction: NewTransaction) -> Result<Transaction, Error> {
        let transaction = transaction.validate()?;
        let connection = self.lock()?;

        let created = connection
            .prepare(&format!(
                "INSERT INTO registros_financeiros
                    (user_id, valor, data, categoria, nome, forma_pagamento, cartao_final,
                     apelido, tipo_movimento, origem)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
                 RETURNING {TRANSACTION_COLUMNS}"
            ))?
            .query_row(
                (
                    user_id.as_i64(),
                    transaction.amount,
                    transaction.date,
                    &transaction.category,
                    &transaction.name,
                    &transaction.payment_method,
                    &transaction.card_suffix,
                    &transaction.card_nickname,
                    transaction.direction.as_str(),
                    transaction.origin.as_str(),
                ),
                map_transaction_row,
            )?;

        Ok(created)
    }

    fn get(&self, user_id: UserId, id: TransactionId) -> Result<Transaction, Error> {
        let transaction = self
            .lock()?
            .prepare(&format!(
                "SELECT {TRANSACTION_COLUMNS} FROM registros_financeiros
                 WHERE id = ?1 AND user_id = ?2"
            ))?
            .query_row((id, user_id.as_i64()), map_transaction_row)?;

        Ok(transaction)
    }

    fn list(&self, user_id: UserId, query: &TransactionQuery) -> Result<Vec<Transaction>, Error> {
        let mut where_clause_parts = vec!["user_id = ?1".to_owned()];
        let mut query_parameters = vec![Value::Integer(user_id.as_i64())];

        if let Some(direction) = query.direction {
            query_parameters.push(Value::Text(direction.as_str().to_owned()));
            where_clause_parts.push(format!("tipo_movimento = ?{}", query_parameters.len()));
        }

        if let Some(origin) = query.origin {
            query_parameters.push(Value::Text(origin.as_str().to_owned()));
            where_clause_parts.push(format!("origem = ?{}", query_parameters.len()));
        }

        if let Some(date_range) = &query.date_range {
            where_clause_parts.push(format!(
                "data BETWEEN ?{} AND ?{}",
                query_parameters.len() + 1,
                query_parameters.len() + 2,
            ));
            query_parameters.push(Value::Text(date_range.start().to_string()));
            query_parameters.push(Value::Text(date_range.end().to_string()));
        }

        let query_string = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM registros_financeiros WHERE {} \
             ORDER BY data DESC, id DESC",
            where_clause_parts.join(" AND ")
        );

        self.lock()?
            .prepare(&query_string)?
            .query_map(params_from_iter(query_parameters.iter()), map_transaction_row)?
            .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
            .collect()
    }

    fn update(
        &self,
        user_id: UserId,
        id: TransactionId,
        transaction: NewTransaction,
    ) -> Result<Transaction, Error> {
        let transaction = transaction.validate()?;
        let connection = self.lock()?;

        let updated = connection
            .prepare(&format!(
                "UPDATE registros_financeiros
                 SET valor = ?3, data = ?4, categoria = ?5, nome = ?6, forma_pagamento = ?7,
                     cartao_final = ?8, apelido = ?9, tipo_movimento = ?10
                 WHERE id = ?1 AND user_id = ?2 AND origem != ?11
                 RETURNING {TRANSACTION_COLUMNS}"
            ))?
            .query_row(
                (
                    id,
                    user_id.as_i64(),
                    transaction.amount,
                    transaction.date,
                    &transaction.category,
                    &transaction.name,
                    &transaction.payment_method,
                    &transaction.card_suffix,
                    &transaction.card_nickname,
                    transaction.direction.as_str(),
                    Origin::PaidInvoice.as_str(),
                ),
                map_transaction_row,
            );

        match updated {
            Ok(updated) => Ok(updated),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                ensure_exists(&connection, user_id, id)?;
                Err(Error::AlreadyReconciled(id))
            }
            Err(error) => Err(error.into()),
        }
    }

    fn delete(&self, user_id: UserId, id: TransactionId) -> Result<(), Error> {
        let rows_affected = self.lock()?.execute(
            "DELETE FROM registros_financeiros WHERE id = ?1 AND user_id = ?2",
            (id, user_id.as_i64()),
        )?;

        if rows_affected == 0 {
            return Err(Error::NotFound);
        }

        Ok(())
    }

    fn set_origin(
        &self,
        user_id: UserId,
        id: TransactionId,
        from: Origin,
        to: Origin,
    ) -> Result<Option<Transaction>, Error> {
        let connection = self.lock()?;

        let updated = connection
            .prepare(&format!(
                "UPDATE registros_financeiros SET origem = ?4
                 WHERE id = ?1 AND user_id = ?2 AND origem = ?3
                 RETURNING {TRANSACTION_COLUMNS}"
            ))?
            .query_row(
                (id, user_id.as_i64(), from.as_str(), to.as_str()),
                map_transaction_row,
            );

        match updated {
            Ok(updated) => Ok(Some(updated)),
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                ensure_exists(&connection, user_id, id)?;
                Ok(None)
            }
            Err(error) => Err(error.into()),
        }
    }
}

/// The per-user transaction lists shared by every [CachedTransactionRepository].
pub type TransactionCache = Arc<Mutex<TtlCache<UserId, Vec<Transaction>>>>;

/// Create an empty [TransactionCache].
pub fn new_transaction_cache(policy: CachePolicy) -> TransactionCache {
    Arc::new(Mutex::new(TtlCache::new(policy, SystemClock)))
}

/// Serves list queries from a cached copy of the user's transactions.
///
/// The cache holds each user's full list and queries are filtered in memory.
/// Every write through this repository drops the user's cached list.
#[derive(Debug, Clone)]
pub struct CachedTransactionRepository<R> {
    inner: R,
    cache: TransactionCache,
}

impl<R: TransactionRepository> CachedTransactionRepository<R> {
    /// Wrap `inner` so reads go through `cache`.
    pub fn new(inner: R, cache: TransactionCache) -> Self {
        Self { inner, cache }
    }

    fn invalidate(&self, user_id: UserId) -> Result<(), Error> {
        self.cache
            .lock()
            .map_err(|_| Error::CacheLockError)?
            .invalidate(&user_id);

        Ok(())
    }
}

impl<R: TransactionRepository> TransactionRepository for CachedTransactionRepository<R> {
    fn create(&self, user_id: UserId, transaction: NewTransaction) -> Result<Transaction, Error> {
        let created = self.inner.create(user_id, transaction)?;
        self.invalidate(user_id)?;

        Ok(created)
    }

    fn get(&self, user_id: UserId, id: TransactionId) -> Result<Transaction, Error> {
        self.inner.get(user_id, id)
    }

    fn list(&self, user_id: UserId, query: &TransactionQuery) -> Result<Vec<Transaction>, Error> {
        let transactions = self.list_all(user_id)?;

        Ok(transactions
            .into_iter()
            .filter(|transaction| query.matches(transaction))
            .collect())
    }

    fn update(
        &self,
        user_id: UserId,
        id: TransactionId,
        transaction: NewTransaction,
    ) -> Result<Transaction, Error> {
        let updated = self.inner.update(user_id, id, transaction)?;
        self.invalidate(user_id)?;

        Ok(updated)
    }

    fn delete(&self, user_id: UserId, id: TransactionId) -> Result<(), Error> {
        self.inner.delete(user_id, id)?;
        self.invalidate(user_id)
    }

    fn set_origin(
        &self,
        user_id: UserId,
        id: TransactionId,
        from: Origin,
        to: Origin,
    ) -> Result<Option<Transaction>, Error> {
        let updated = self.inner.set_origin(user_id, id, from, to)?;

        if updated.is_some() {
            self.invalidate(user_id)?;
        }

        Ok(updated)
    }

    fn list_all(&self, user_id: UserId) -> Result<Vec<Transaction>, Error> {
        let generation = {
            let mut cache = self.cache.lock().map_err(|_| Error::CacheLockError)?;

            if let Some(transactions) = cache.get(&user_id) {
                tracing::debug!("serving transactions for user {user_id} from cache");
                return Ok(transactions);
            }

            cache.generation()
        };

        let transactions = self.inner.list_all(user_id)?;

        let stored = self
            .cache
            .lock()
            .map_err(|_| Error::CacheLockError)?
            .set_if_current(user_id, transactions.clone(), generation);

        if !stored {
            tracing::debug!("cache for user {user_id} was invalidated during the fetch");
        }

        Ok(transactions)
    }
}
