use crate::Credits;

/// Maximum handle length for player registration
pub const MAX_HANDLE_LENGTH: usize = 32;

/// Price of one defense upgrade charge
pub const DEFENSE_UPGRADE_PRICE: Credits = Credits::from_whole(200);

/// Price of the (one-time) offense upgrade
pub const OFFENSE_UPGRADE_PRICE: Credits = Credits::from_whole(250);

/// Offense multiplier in basis points (1.5x)
pub const OFFENSE_UPGRADE_MULTIPLIER_BPS: u32 = 15_000;

/// Cost of advancing one rank
pub const RANK_UP_COST: Credits = Credits::from_whole(50);

/// Credits granted to every active player per bonus cycle
pub const BONUS_AMOUNT: Credits = Credits::from_whole(5);

/// Bonus cycle length (5 minutes)
pub const BONUS_INTERVAL_SECS: u64 = 5 * 60;

/// Amounts the `hack` command accepts by default
pub const HACK_MIN: Credits = Credits::from_whole(1);
pub const HACK_MAX: Credits = Credits::from_whole(50);

/// Rank assigned to the bootstrap administrator
pub const ROOT_RANK: u32 = 999;

/// Ledger descriptions
pub const HACK_DESCRIPTION: &str = "Hack";
pub const DEFENSE_PURCHASE_DESCRIPTION: &str = "Bought Defense Upgrade";
pub const OFFENSE_PURCHASE_DESCRIPTION: &str = "Bought Offense Upgrade";
pub const RANK_UP_DESCRIPTION: &str = "Rank Up";
pub const BONUS_DESCRIPTION: &str = "Daily Bonus";
