//! How much of each budget has been spent in a month.

use std::ops::RangeInclusive;

use serde::Serialize;
use time::Date;

use crate::transaction::{Origin, Transaction};

use super::core::Budget;

/// The spending against one budget over a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetUsage {
    /// The budget's category.
    pub category: String,
    /// The budget's monthly limit.
    pub limit: f64,
    /// How much was spent in the category.
    pub spent: f64,
    /// How much is left, negative when over budget.
    pub remaining: f64,
    /// `spent` as a percentage of `limit`.
    pub percent_used: f64,
}

/// Compare each budget with the expenses of its category within `month`.
///
/// Future invoices are projections, so they do not count as spent.
pub fn budget_usage(
    budgets: &[Budget],
    transactions: &[Transaction],
    month: &RangeInclusive<Date>,
) -> Vec<BudgetUsage> {
    budgets
        .iter()
        .map(|budget| {
            let category = budget.category.to_lowercase();
            let spent: f64 = transactions
                .iter()
                .filter(|t| t.is_outflow() && t.origin != Origin::FutureInvoice)
                .filter(|t| month.contains(&t.date))
                .filter(|t| t.category.to_lowercase() == category)
                .map(|t| t.amount)
                .sum();

            BudgetUsage {
                category: budget.category.clone(),
                limit: budget.limit,
                spent,
                remaining: budget.limit - spent,
                percent_used: percent_used(spent, budget.limit),
            }
        })
        .collect()
}

// A zero limit is fully used by any spending at all.
fn percent_used(spent: f64, limit: f64) -> f64 {
    if limit > 0.0 {
        spent / limit * 100.0
    } else if spent > 0.0 {
        100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use time::macros::date;

    use crate::{
        UserId,
        budget::Budget,
        test_utils::test_transaction,
        transaction::{Direction, Origin, Transaction},
    };

    use super::budget_usage;

    fn budget(category: &str, limit: f64) -> Budget {
        Budget {
            id: 1,
            user_id: UserId::new(1),
            category: category.to_owned(),
            limit,
        }
    }

    fn spend(id: i64, amount: f64, category: &str) -> Transaction {
        let mut transaction = test_transaction(id, amount, Direction::Saida);
        transaction.category = category.to_owned();
        transaction
    }

    #[test]
    fn sums_expenses_in_category_and_month() {
        let mut last_month = spend(3, 1000.0, "Mercado");
        last_month.date = date!(2025 - 02 - 28);
        let mut income = spend(4, 1000.0, "Mercado");
        income.direction = Direction::Entrada;
        let mut projected = spend(5, 1000.0, "Mercado");
        projected.origin = Origin::FutureInvoice;
        let transactions = vec![
            spend(1, 150.0, "Mercado"),
            spend(2, 50.0, "mercado"),
            last_month,
            income,
            projected,
            spend(6, 70.0, "Lazer"),
        ];

        let usage = budget_usage(
            &[budget("Mercado", 800.0)],
            &transactions,
            &(date!(2025 - 03 - 01)..=date!(2025 - 03 - 31)),
        );

        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].spent, 200.0);
        assert_eq!(usage[0].remaining, 600.0);
        assert_eq!(usage[0].percent_used, 25.0);
    }

    #[test]
    fn over_budget_has_negative_remaining() {
        let usage = budget_usage(
            &[budget("Lazer", 100.0)],
            &[spend(1, 150.0, "Lazer")],
            &(date!(2025 - 03 - 01)..=date!(2025 - 03 - 31)),
        );

        assert_eq!(usage[0].remaining, -50.0);
        assert_eq!(usage[0].percent_used, 150.0);
    }

    #[test]
    fn zero_limit() {
        let month = date!(2025 - 03 - 01)..=date!(2025 - 03 - 31);

        let unused = budget_usage(&[budget("Lazer", 0.0)], &[], &month);
        let used = budget_usage(&[budget("Lazer", 0.0)], &[spend(1, 1.0, "Lazer")], &month);

        assert_eq!(unused[0].percent_used, 0.0);
        assert_eq!(used[0].percent_used, 100.0);
    }
}
