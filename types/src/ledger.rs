use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Credits, EntryId, PlayerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Receive,
    Send,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Receive => f.write_str("RECEIVE"),
            TransactionType::Send => f.write_str("SEND"),
        }
    }
}

/// Immutable record of one directional credit movement for one player.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub player: PlayerId,
    pub direction: TransactionType,
    pub amount: Credits,
    pub description: String,
    pub created_at_ms: u64,
}

impl LedgerEntry {
    /// Builds an entry, or `None` for a zero amount (such movements are never recorded).
    pub fn new(
        id: EntryId,
        player: PlayerId,
        direction: TransactionType,
        amount: Credits,
        description: &str,
        created_at_ms: u64,
    ) -> Option<Self> {
        if amount.is_zero() {
            return None;
        }
        Some(Self {
            id,
            player,
            direction,
            amount,
            description: description.to_string(),
            created_at_ms,
        })
    }
}
