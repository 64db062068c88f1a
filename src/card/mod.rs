//! Credit cards, the heuristics that tie transactions to them and their available limits.

mod core;
mod detection;
mod endpoints;
mod limit;
mod repository;

pub use core::{Card, NewCard, create_card_table};
pub use detection::{
    CardInfo, DetectedCard, detect_orphan_cards, detect_orphan_cards_for_user, extract_card_info,
    find_matching_card, register_detected_cards,
};
pub use endpoints::{
    create_card_endpoint, delete_card_endpoint, get_cards_endpoint, get_orphan_cards_endpoint,
    register_orphan_cards_endpoint, update_card_endpoint,
};
pub use limit::{available_limit, outstanding_balance, reset_card_limit, resolve_available_limits};
pub use repository::{CardRepository, SqliteCardRepository};
