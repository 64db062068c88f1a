//! Heuristics for finding which card a transaction was paid with.
//!
//! Transactions carry card details in a few loosely structured ways: an
//! explicit suffix field, a nickname, or text such as "final 1234" buried in
//! the description or payment method. Outflows that point at a card the user
//! has not registered are "orphans", which are grouped by suffix so the user
//! can register the missing cards in one go.

use std::{collections::BTreeMap, sync::OnceLock};

use regex::Regex;
use serde::Serialize;

use crate::{
    Error, UserId,
    transaction::{Transaction, TransactionRepository},
};

use super::{
    core::{Card, NewCard, SUFFIX_LENGTH, default_nickname},
    repository::CardRepository,
};

/// The card details found in a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardInfo {
    /// The last four digits of the card.
    pub suffix: Option<String>,
    /// The card nickname the user typed.
    pub nickname: Option<String>,
}

/// A card that transactions point at but that the user has not registered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectedCard {
    /// The last four digits of the card.
    pub suffix: String,
    /// The first nickname seen for the suffix, or a default name.
    pub nickname: String,
    /// How many transactions point at the card.
    pub orphan_transactions: usize,
    /// The sum of those transactions.
    pub total_amount: f64,
}

fn free_text_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)\bfinal\s*:?\s*([0-9]{4})\b",
            r"[*xX•]{4,}[\s.-]*([0-9]{4})\b",
            r"(?i)\bcart[aã]o\b[^0-9]{0,20}?([0-9]{4})\b",
        ]
        .into_iter()
        .map(|pattern| Regex::new(pattern).expect("invalid card suffix regex"))
        .collect()
    })
}

fn suffix_from_structured(card_suffix: &str) -> Option<String> {
    let digits: Vec<char> = card_suffix.chars().filter(|c| c.is_ascii_digit()).collect();

    if digits.len() < SUFFIX_LENGTH {
        return None;
    }

    Some(digits[digits.len() - SUFFIX_LENGTH..].iter().collect())
}

fn suffix_from_text(text: &str) -> Option<String> {
    free_text_patterns().iter().find_map(|pattern| {
        pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|suffix| suffix.as_str().to_owned())
    })
}

/// Find the card suffix and nickname in a transaction.
///
/// The `card_suffix` field is used when it has at least four digits, otherwise
/// the name and payment method are searched for text such as "final 1234",
/// "**** 1234" or "cartão 1234".
///
/// Returns `None` when the transaction has neither a suffix nor a nickname.
pub fn extract_card_info(transaction: &Transaction) -> Option<CardInfo> {
    let suffix = transaction
        .card_suffix
        .as_deref()
        .and_then(suffix_from_structured)
        .or_else(|| suffix_from_text(&transaction.name))
        .or_else(|| {
            transaction
                .payment_method
                .as_deref()
                .and_then(suffix_from_text)
        });

    let nickname = transaction
        .card_nickname
        .as_deref()
        .map(str::trim)
        .filter(|nickname| !nickname.is_empty())
        .map(str::to_owned);

    if suffix.is_none() && nickname.is_none() {
        return None;
    }

    Some(CardInfo { suffix, nickname })
}

/// Find the registered card a transaction was paid with.
///
/// Cards are matched on their last digits. When the transaction has no
/// detectable suffix, the nickname is compared ignoring case. Inactive cards
/// are still matched.
pub fn find_matching_card<'a>(transaction: &Transaction, cards: &'a [Card]) -> Option<&'a Card> {
    let info = extract_card_info(transaction)?;

    match (&info.suffix, &info.nickname) {
        (Some(suffix), _) => cards.iter().find(|card| &card.last_digits == suffix),
        (None, Some(nickname)) => {
            let nickname = nickname.to_lowercase();
            cards
                .iter()
                .find(|card| card.nickname.trim().to_lowercase() == nickname)
        }
        (None, None) => None,
    }
}

/// Group the outflows that point at unregistered cards by card suffix.
///
/// Transactions without a detectable suffix are left out.
pub fn detect_orphan_cards(
    transactions: &[Transaction],
    cards: &[Card],
) -> BTreeMap<String, DetectedCard> {
    let mut detected: BTreeMap<String, DetectedCard> = BTreeMap::new();

    for transaction in transactions.iter().filter(|t| t.is_outflow()) {
        if find_matching_card(transaction, cards).is_some() {
            continue;
        }

        let Some(CardInfo {
            suffix: Some(suffix),
            nickname,
        }) = extract_card_info(transaction)
        else {
            continue;
        };

        let entry = detected
            .entry(suffix.clone())
            .or_insert_with(|| DetectedCard {
                nickname: String::new(),
                suffix,
                orphan_transactions: 0,
                total_amount: 0.0,
            });

        if entry.nickname.is_empty() {
            entry.nickname = nickname.unwrap_or_default();
        }

        entry.orphan_transactions += 1;
        entry.total_amount += transaction.amount;
    }

    for card in detected.values_mut() {
        if card.nickname.is_empty() {
            card.nickname = default_nickname(&card.suffix);
        }
    }

    detected
}

/// Detect the orphan cards for `user_id` straight from the repositories.
///
/// Repository errors are logged and give an empty result.
pub fn detect_orphan_cards_for_user(
    transactions: &impl TransactionRepository,
    cards: &impl CardRepository,
    user_id: UserId,
) -> BTreeMap<String, DetectedCard> {
    let fetched = transactions
        .list_all(user_id)
        .and_then(|transactions| cards.list(user_id).map(|cards| (transactions, cards)));

    match fetched {
        Ok((transactions, cards)) => detect_orphan_cards(&transactions, &cards),
        Err(error) => {
            tracing::error!("could not detect orphan cards for user {user_id}: {error}");
            BTreeMap::new()
        }
    }
}

/// Register a card for each detected suffix.
///
/// The cards start active with no limit. Suffixes that already belong to a
/// card are skipped.
///
/// # Errors
/// Returns any repository error other than a duplicate suffix.
pub fn register_detected_cards(
    cards: &impl CardRepository,
    user_id: UserId,
    detected: &BTreeMap<String, DetectedCard>,
) -> Result<Vec<Card>, Error> {
    let mut created = Vec::with_capacity(detected.len());

    for card in detected.values() {
        match cards.create(user_id, NewCard::new(&card.nickname, &card.suffix)) {
            Ok(card) => {
                tracing::info!("registered detected card ending in {}", card.last_digits);
                created.push(card);
            }
            Err(Error::DuplicateCardSuffix(suffix)) => {
                tracing::info!("skipping detected card ending in {suffix}, it is already registered");
            }
            Err(error) => return Err(error),
        }
    }

    Ok(created)
}

#[cfg(test)]
mod extract_card_info_tests {
    use crate::{test_utils::test_transaction, transaction::Direction};

    use super::{CardInfo, extract_card_info};

    #[test]
    fn structured_suffix_wins() {
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.card_suffix = Some("5555 4444 3333 1234".to_owned());
        transaction.name = "Mercado final 9999".to_owned();

        assert_eq!(
            extract_card_info(&transaction),
            Some(CardInfo {
                suffix: Some("1234".to_owned()),
                nickname: None
            })
        );
    }

    #[test]
    fn short_structured_suffix_falls_back_to_text() {
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.card_suffix = Some("12".to_owned());
        transaction.name = "Mercado final 9999".to_owned();

        let info = extract_card_info(&transaction).unwrap();

        assert_eq!(info.suffix.as_deref(), Some("9999"));
    }

    #[test]
    fn finds_suffix_in_free_text() {
        for (text, expected) in [
            ("Compra cartão final 1234", "1234"),
            ("Compra FINAL: 4321", "4321"),
            ("**** 5678 Loja", "5678"),
            ("xxxx8765", "8765"),
            ("Cartão de crédito 2468", "2468"),
        ] {
            let mut transaction = test_transaction(1, 10.0, Direction::Saida);
            transaction.name = text.to_owned();

            let info = extract_card_info(&transaction);

            assert_eq!(
                info.and_then(|info| info.suffix).as_deref(),
                Some(expected),
                "could not find suffix in {text:?}"
            );
        }
    }

    #[test]
    fn searches_payment_method() {
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.payment_method = Some("Crédito final 1357".to_owned());

        let info = extract_card_info(&transaction).unwrap();

        assert_eq!(info.suffix.as_deref(), Some("1357"));
    }

    #[test]
    fn ignores_longer_digit_runs() {
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.name = "Pedido final 123456".to_owned();

        assert_eq!(extract_card_info(&transaction), None);
    }

    #[test]
    fn ignores_non_ascii_digits() {
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.name = "Compra final ١٢٣٤".to_owned();
        transaction.payment_method = Some("Cartão ४५६७".to_owned());

        assert_eq!(extract_card_info(&transaction), None);
    }

    #[test]
    fn nickname_only() {
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.card_nickname = Some("  Nubank ".to_owned());

        assert_eq!(
            extract_card_info(&transaction),
            Some(CardInfo {
                suffix: None,
                nickname: Some("Nubank".to_owned())
            })
        );
    }

    #[test]
    fn nothing_to_detect() {
        let transaction = test_transaction(1, 10.0, Direction::Saida);

        assert_eq!(extract_card_info(&transaction), None);
    }
}

#[cfg(test)]
mod find_matching_card_tests {
    use crate::{
        test_utils::{test_card, test_transaction},
        transaction::Direction,
    };

    use super::find_matching_card;

    #[test]
    fn matches_on_suffix() {
        let cards = vec![test_card(1, "Nubank", "1234"), test_card(2, "Inter", "5678")];
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.card_suffix = Some("5678".to_owned());

        assert_eq!(find_matching_card(&transaction, &cards), Some(&cards[1]));
    }

    #[test]
    fn suffix_takes_precedence_over_nickname() {
        let cards = vec![test_card(1, "Nubank", "1234")];
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.card_suffix = Some("9999".to_owned());
        transaction.card_nickname = Some("Nubank".to_owned());

        assert_eq!(find_matching_card(&transaction, &cards), None);
    }

    #[test]
    fn matches_nickname_ignoring_case() {
        let cards = vec![test_card(1, "Nubank", "1234")];
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.card_nickname = Some("NUBANK".to_owned());

        assert_eq!(find_matching_card(&transaction, &cards), Some(&cards[0]));
    }

    #[test]
    fn inactive_cards_still_match() {
        let mut card = test_card(1, "Nubank", "1234");
        card.active = false;
        let cards = vec![card];
        let mut transaction = test_transaction(1, 10.0, Direction::Saida);
        transaction.card_suffix = Some("1234".to_owned());

        assert_eq!(find_matching_card(&transaction, &cards), Some(&cards[0]));
    }
}
