//! Database ID type definitions.

/// Alias for the integer type used for mapping to database IDs.
pub type DatabaseId = i64;
/// The ID of a row in the `registros_financeiros` table.
pub type TransactionId = DatabaseId;
/// The ID of a row in the `cartoes_credito` table.
pub type CardId = DatabaseId;
/// The ID of a row in the `orcamentos_categorias` table.
pub type BudgetId = DatabaseId;
