//! Monthly spending limits per category.

mod core;
mod endpoints;
mod usage;

pub use core::{Budget, NewBudget, create_budget_table, delete_budget, get_budgets, upsert_budget};
pub use endpoints::{
    BudgetState, delete_budget_endpoint, get_budget_usage_endpoint,
    get_budgets_endpoint, put_budget_endpoint,
};
pub use usage::{BudgetUsage, budget_usage};
