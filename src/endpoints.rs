//! The API endpoints URIs.

/// The route for registering a new user.
pub const USERS: &str = "/api/users";
/// The route for logging in a user.
pub const LOG_IN: &str = "/api/log_in";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/api/log_out";
/// The route to list and create transactions.
pub const TRANSACTIONS: &str = "/api/transactions";
/// The route to read, update and delete a single transaction.
pub const TRANSACTION: &str = "/api/transactions/{transaction_id}";
/// The route to match a payment against future invoices.
pub const RECONCILE_TRANSACTION: &str = "/api/transactions/{transaction_id}/reconcile";
/// The route to download the user's transactions as CSV.
pub const EXPORT_TRANSACTIONS: &str = "/api/transactions/export";
/// The route to list and create cards.
pub const CARDS: &str = "/api/cards";
/// The route to update and delete a single card.
pub const CARD: &str = "/api/cards/{card_id}";
/// The route to detect and register cards that only appear in transactions.
pub const ORPHAN_CARDS: &str = "/api/cards/orphans";
/// The route to search for the future invoices a payment could be for.
pub const INVOICE_CANDIDATES: &str = "/api/invoices/candidates";
/// The route to mark a future invoice as paid.
pub const LINK_INVOICE: &str = "/api/invoices/{invoice_id}/link";
/// The route to list and upsert budgets.
pub const BUDGETS: &str = "/api/budgets";
/// The route to delete a budget.
pub const BUDGET: &str = "/api/budgets/{budget_id}";
/// The route for spending against each budget in a month.
pub const BUDGET_USAGE: &str = "/api/budgets/usage";
/// The route for the monthly summary and projection.
pub const SUMMARY: &str = "/api/summary";
/// The route for the user's subscription status.
pub const SUBSCRIPTION: &str = "/api/subscription";
