use crate::{
    constants::{
        BONUS_AMOUNT, DEFENSE_UPGRADE_PRICE, OFFENSE_UPGRADE_MULTIPLIER_BPS, OFFENSE_UPGRADE_PRICE,
        RANK_UP_COST, ROOT_RANK,
    },
    Credits,
};

/// Prices and rules the engine reads but never changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Economy {
    pub defense_upgrade_price: Credits,
    pub offense_upgrade_price: Credits,
    pub offense_multiplier_bps: u32,
    pub rank_up_cost: Credits,
    pub bonus_amount: Credits,
    /// Whether a player may target themselves with a hack.
    pub allow_self_hack: bool,
    pub root_rank: u32,
}

impl Default for Economy {
    fn default() -> Self {
        Self {
            defense_upgrade_price: DEFENSE_UPGRADE_PRICE,
            offense_upgrade_price: OFFENSE_UPGRADE_PRICE,
            offense_multiplier_bps: OFFENSE_UPGRADE_MULTIPLIER_BPS,
            rank_up_cost: RANK_UP_COST,
            bonus_amount: BONUS_AMOUNT,
            allow_self_hack: true,
            root_rank: ROOT_RANK,
        }
    }
}

impl Economy {
    /// Nominal steal amount for an attacker holding the offense upgrade.
    pub fn apply_offense_multiplier(&self, base: Credits) -> Credits {
        base.apply_bps(self.offense_multiplier_bps)
    }
}
