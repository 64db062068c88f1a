//! Income and expense records.
//!
//! This module contains everything related to transactions:
//! - The [Transaction] model and [NewTransaction] for creating transactions
//! - The [TransactionRepository] trait, its SQLite implementation and the caching wrapper
//! - The JSON route handlers and CSV export

mod core;
mod endpoints;
mod export;
mod repository;

pub use core::{Direction, NewTransaction, Origin, Transaction, create_transaction_table};
pub use endpoints::{
    TransactionFilter, create_transaction_endpoint, delete_transaction_endpoint,
    get_transaction_endpoint, get_transactions_endpoint, update_transaction_endpoint,
};
pub use export::{export_transactions_endpoint, transactions_to_csv};
pub use repository::{
    CachedTransactionRepository, SqliteTransactionRepository, TransactionCache, TransactionQuery,
    TransactionRepository, new_transaction_cache,
};
