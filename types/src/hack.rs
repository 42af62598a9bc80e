use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{Credits, HackId, PlayerId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HackStatus {
    Defended,
    Succeeded,
}

impl fmt::Display for HackStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HackStatus::Defended => f.write_str("Defended"),
            HackStatus::Succeeded => f.write_str("Succeeded"),
        }
    }
}

/// One resolved attack. Written once, never updated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HackAttempt {
    pub id: HackId,
    pub attacker: PlayerId,
    pub defender: PlayerId,
    pub status: HackStatus,
    /// Amount actually moved; zero when defended.
    pub credits: Credits,
    pub created_at_ms: u64,
}

impl HackAttempt {
    pub fn involves(&self, player: PlayerId) -> bool {
        self.attacker == player || self.defender == player
    }
}
