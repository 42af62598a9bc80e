use serde::{Deserialize, Serialize};

use crate::{Credits, PlayerId, UpgradeId};

/// Consumable protection: each use absorbs one hack.
///
/// A record only exists while `uses > 0`; the charge that drives it to zero also deletes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefenseUpgrade {
    pub id: UpgradeId,
    pub owner: PlayerId,
    pub uses: u32,
}

impl DefenseUpgrade {
    pub fn new(id: UpgradeId, owner: PlayerId) -> Self {
        Self { id, owner, uses: 1 }
    }

    /// Spends one charge. Returns `true` when the upgrade is depleted.
    pub fn consume(&mut self) -> bool {
        self.uses = self.uses.saturating_sub(1);
        self.uses == 0
    }
}

/// Permanent steal multiplier, bought once.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffenseUpgrade {
    pub id: UpgradeId,
    pub owner: PlayerId,
    pub multiplier_bps: u32,
    pub price: Credits,
}
