//! Available credit limits.
//!
//! A card's available limit is derived from the user's transactions. It is
//! stored once computed and cleared whenever a transaction on the card is
//! written, so it is only recomputed when something changed.

use std::slice;

use crate::{
    Error, UserId,
    transaction::{Origin, Transaction},
};

use super::{
    core::Card,
    detection::{extract_card_info, find_matching_card},
    repository::CardRepository,
};

/// How much has been spent on `card` and not paid off yet.
///
/// This is the sum of manual purchases made with the card minus the sum of
/// the card's paid invoices, and never less than zero.
pub fn outstanding_balance(card: &Card, transactions: &[Transaction]) -> f64 {
    let cards = slice::from_ref(card);

    let spent: f64 = transactions
        .iter()
        .filter(|t| t.is_outflow() && t.origin == Origin::Manual)
        .filter(|t| find_matching_card(t, cards).is_some())
        .map(|t| t.amount)
        .sum();

    let paid: f64 = transactions
        .iter()
        .filter(|t| t.origin == Origin::PaidInvoice)
        .filter(|t| {
            extract_card_info(t).and_then(|info| info.suffix).as_deref()
                == Some(card.last_digits.as_str())
        })
        .map(|t| t.amount)
        .sum();

    (spent - paid).max(0.0)
}

/// The credit left on `card`.
pub fn available_limit(card: &Card, transactions: &[Transaction]) -> f64 {
    card.limit - outstanding_balance(card, transactions)
}

/// Compute and store the available limit of each card that does not have one.
///
/// # Errors
/// Returns an error if a computed limit could not be stored.
pub fn resolve_available_limits(
    repository: &impl CardRepository,
    user_id: UserId,
    cards: Vec<Card>,
    transactions: &[Transaction],
) -> Result<Vec<Card>, Error> {
    cards
        .into_iter()
        .map(|mut card| {
            if card.available_limit.is_none() {
                let limit = available_limit(&card, transactions);
                repository.set_available_limit(user_id, card.id, Some(limit))?;
                tracing::debug!("computed available limit for card {}", card.id);
                card.available_limit = Some(limit);
            }

            Ok(card)
        })
        .collect()
}

/// Clear the stored available limit of the card `transaction` was paid with.
///
/// Failures are logged since the transaction itself has already been written.
pub fn reset_card_limit(repository: &impl CardRepository, user_id: UserId, transaction: &Transaction) {
    if extract_card_info(transaction).is_none() {
        return;
    }

    let cards = match repository.list(user_id) {
        Ok(cards) => cards,
        Err(error) => {
            tracing::error!("could not load cards to reset their limit: {error}");
            return;
        }
    };

    if let Some(card) = find_matching_card(transaction, &cards) {
        if let Err(error) = repository.set_available_limit(user_id, card.id, None) {
            tracing::error!("could not reset the limit of card {}: {error}", card.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use crate::{
        card::{
            NewCard,
            repository::{CardRepository, SqliteCardRepository},
        },
        test_utils::{create_test_user, get_test_connection, test_card, test_transaction},
        transaction::{Direction, Origin, Transaction},
    };

    use super::{available_limit, outstanding_balance, reset_card_limit, resolve_available_limits};

    fn on_card(id: i64, amount: f64, suffix: &str, origin: Origin) -> Transaction {
        let mut transaction = test_transaction(id, amount, Direction::Saida);
        transaction.card_suffix = Some(suffix.to_owned());
        transaction.origin = origin;
        transaction
    }

    #[test]
    fn purchases_minus_paid_invoices() {
        let mut card = test_card(1, "Nubank", "1234");
        card.limit = 1000.0;
        let transactions = vec![
            on_card(1, 200.0, "1234", Origin::Manual),
            on_card(2, 100.0, "1234", Origin::Manual),
            on_card(3, 120.0, "1234", Origin::PaidInvoice),
            on_card(4, 999.0, "1234", Origin::FutureInvoice),
            on_card(5, 50.0, "9999", Origin::Manual),
        ];

        assert_eq!(outstanding_balance(&card, &transactions), 180.0);
        assert_eq!(available_limit(&card, &transactions), 820.0);
    }

    #[test]
    fn overpaying_does_not_raise_limit() {
        let mut card = test_card(1, "Nubank", "1234");
        card.limit = 1000.0;
        let transactions = vec![
            on_card(1, 100.0, "1234", Origin::Manual),
            on_card(2, 300.0, "1234", Origin::PaidInvoice),
        ];

        assert_eq!(outstanding_balance(&card, &transactions), 0.0);
        assert_eq!(available_limit(&card, &transactions), 1000.0);
    }

    #[test]
    fn income_is_ignored() {
        let card = test_card(1, "Nubank", "1234");
        let mut refund = on_card(1, 100.0, "1234", Origin::Manual);
        refund.direction = Direction::Entrada;

        assert_eq!(outstanding_balance(&card, &[refund]), 0.0);
    }

    #[test]
    fn resolves_only_missing_limits_and_reset_clears_them() {
        let connection = get_test_connection();
        let user_id = create_test_user(&connection, "ana@example.com");
        let repository = SqliteCardRepository::new(Arc::new(Mutex::new(connection)));
        let card = repository
            .create(user_id, NewCard::new("Nubank", "1234").limit(500.0))
            .unwrap();
        let purchase = on_card(1, 50.0, "1234", Origin::Manual);

        let resolved = resolve_available_limits(
            &repository,
            user_id,
            repository.list(user_id).unwrap(),
            &[purchase.clone()],
        )
        .unwrap();

        assert_eq!(resolved[0].available_limit, Some(450.0));
        assert_eq!(
            repository.get(user_id, card.id).unwrap().available_limit,
            Some(450.0)
        );

        reset_card_limit(&repository, user_id, &purchase);

        assert_eq!(repository.get(user_id, card.id).unwrap().available_limit, None);
    }

    #[test]
    fn reset_ignores_transactions_without_card() {
        let connection = get_test_connection();
        let user_id = create_test_user(&connection, "ana@example.com");
        let repository = SqliteCardRepository::new(Arc::new(Mutex::new(connection)));
        let card = repository
            .create(user_id, NewCard::new("Nubank", "1234").limit(500.0))
            .unwrap();
        repository
            .set_available_limit(user_id, card.id, Some(10.0))
            .unwrap();
        let transaction = test_transaction(1, 5.0, Direction::Saida);

        reset_card_limit(&repository, user_id, &transaction);

        assert_eq!(
            repository.get(user_id, card.id).unwrap().available_limit,
            Some(10.0)
        );
    }
}
