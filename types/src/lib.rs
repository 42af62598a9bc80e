//! Common types used throughout hacknet.
//!
//! Records here are plain data: the rules that move credits between them live in
//! `hacknet-execution`.

pub mod constants;
pub mod credits;
pub mod economy;
pub mod error;
pub mod execution;
pub mod hack;
mod id;
pub mod ledger;
pub mod player;
pub mod upgrade;

pub use credits::{Credits, CreditsError, BPS_SCALE, CREDIT_SCALE};
pub use economy::Economy;
pub use error::EconomyError;
pub use execution::{Key, KeyKind, Value};
pub use hack::{HackAttempt, HackStatus};
pub use id::{EntryId, HackId, PlayerId, UpgradeId};
pub use ledger::{LedgerEntry, TransactionType};
pub use player::{Player, PlayerInvariantError, ProfileEdit, Role};
pub use upgrade::{DefenseUpgrade, OffenseUpgrade};
