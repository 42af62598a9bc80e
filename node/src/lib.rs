use hacknet_types::{
    constants, player::validate_handle, Credits, CreditsError, Economy, PlayerInvariantError,
    BPS_SCALE,
};
use serde::{Deserialize, Serialize};
use std::{fmt, path::PathBuf, str::FromStr, time::Duration};
use thiserror::Error;
use tracing::Level;

pub mod scheduler;
pub mod sqlite;

#[cfg(test)]
mod tests;

/// On-disk configuration for the `hacknet` binary.
///
/// Amounts are written in whole credits (fractions down to 0.001 are accepted). Every field has a
/// default, so an empty file is a valid configuration.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_defense_upgrade_price")]
    pub defense_upgrade_price: f64,
    #[serde(default = "default_offense_upgrade_price")]
    pub offense_upgrade_price: f64,
    #[serde(default = "default_offense_multiplier")]
    pub offense_multiplier: f64,
    #[serde(default = "default_rank_up_cost")]
    pub rank_up_cost: f64,
    #[serde(default = "default_bonus_amount")]
    pub bonus_amount: f64,
    #[serde(default = "default_bonus_interval_secs")]
    pub bonus_interval_secs: u64,
    #[serde(default = "default_hack_min")]
    pub hack_min: f64,
    #[serde(default = "default_hack_max")]
    pub hack_max: f64,
    #[serde(default = "default_allow_self_hack")]
    pub allow_self_hack: bool,

    #[serde(default = "default_database")]
    pub database: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_root_handle")]
    pub root_handle: String,
    #[serde(default = "default_root_rank")]
    pub root_rank: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} is not a valid credit amount: {value}")]
    InvalidAmount {
        field: &'static str,
        value: f64,
        #[source]
        source: CreditsError,
    },
    #[error("{field} must be > 0 (got {value})")]
    InvalidNonZero { field: &'static str, value: String },
    #[error("offense_multiplier must be a finite value >= 1.0 (got {value})")]
    InvalidMultiplier { value: f64 },
    #[error("hack_min must not exceed hack_max (hack_min={min}, hack_max={max})")]
    InvalidHackRange { min: Credits, max: Credits },
    #[error("invalid log level: {value}")]
    InvalidLogLevel { value: String },
    #[error("root_handle is invalid: {value}")]
    InvalidRootHandle {
        value: String,
        #[source]
        source: PlayerInvariantError,
    },
}

pub struct ValidatedConfig {
    pub economy: Economy,
    pub hack_min: Credits,
    pub hack_max: Credits,
    pub bonus_interval: Duration,
    pub database: PathBuf,
    pub log_level: Level,
    pub root_handle: String,
}

impl fmt::Debug for ValidatedConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let economy = &self.economy;
        f.debug_struct("ValidatedConfig")
            .field(
                "defense_upgrade_price",
                &economy.defense_upgrade_price.to_string(),
            )
            .field(
                "offense_upgrade_price",
                &economy.offense_upgrade_price.to_string(),
            )
            .field("offense_multiplier_bps", &economy.offense_multiplier_bps)
            .field("rank_up_cost", &economy.rank_up_cost.to_string())
            .field("bonus_amount", &economy.bonus_amount.to_string())
            .field("hack_min", &self.hack_min.to_string())
            .field("hack_max", &self.hack_max.to_string())
            .field("allow_self_hack", &economy.allow_self_hack)
            .field("bonus_interval", &self.bonus_interval)
            .field("database", &self.database)
            .field("log_level", &self.log_level)
            .field("root_handle", &self.root_handle)
            .field("root_rank", &economy.root_rank)
            .finish()
    }
}

fn default_defense_upgrade_price() -> f64 {
    constants::DEFENSE_UPGRADE_PRICE.as_f64()
}

fn default_offense_upgrade_price() -> f64 {
    constants::OFFENSE_UPGRADE_PRICE.as_f64()
}

fn default_offense_multiplier() -> f64 {
    constants::OFFENSE_UPGRADE_MULTIPLIER_BPS as f64 / BPS_SCALE as f64
}

fn default_rank_up_cost() -> f64 {
    constants::RANK_UP_COST.as_f64()
}

fn default_bonus_amount() -> f64 {
    constants::BONUS_AMOUNT.as_f64()
}

fn default_bonus_interval_secs() -> u64 {
    constants::BONUS_INTERVAL_SECS
}

fn default_hack_min() -> f64 {
    constants::HACK_MIN.as_f64()
}

fn default_hack_max() -> f64 {
    constants::HACK_MAX.as_f64()
}

fn default_allow_self_hack() -> bool {
    true
}

fn default_database() -> String {
    "hacknet.db".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_root_handle() -> String {
    "root".to_string()
}

fn default_root_rank() -> u32 {
    constants::ROOT_RANK
}

impl Default for Config {
    fn default() -> Self {
        Self {
            defense_upgrade_price: default_defense_upgrade_price(),
            offense_upgrade_price: default_offense_upgrade_price(),
            offense_multiplier: default_offense_multiplier(),
            rank_up_cost: default_rank_up_cost(),
            bonus_amount: default_bonus_amount(),
            bonus_interval_secs: default_bonus_interval_secs(),
            hack_min: default_hack_min(),
            hack_max: default_hack_max(),
            allow_self_hack: default_allow_self_hack(),
            database: default_database(),
            log_level: default_log_level(),
            root_handle: default_root_handle(),
            root_rank: default_root_rank(),
        }
    }
}

fn amount(field: &'static str, value: f64) -> Result<Credits, ConfigError> {
    Credits::from_f64(value).map_err(|source| ConfigError::InvalidAmount {
        field,
        value,
        source,
    })
}

fn nonzero_amount(field: &'static str, value: f64) -> Result<Credits, ConfigError> {
    let credits = amount(field, value)?;
    if credits.is_zero() {
        return Err(ConfigError::InvalidNonZero {
            field,
            value: value.to_string(),
        });
    }
    Ok(credits)
}

fn multiplier_bps(value: f64) -> Result<u32, ConfigError> {
    let bps = value * BPS_SCALE as f64;
    if !value.is_finite() || value < 1.0 || bps > u32::MAX as f64 {
        return Err(ConfigError::InvalidMultiplier { value });
    }
    Ok(bps.round() as u32)
}

impl Config {
    pub fn validate(self) -> Result<ValidatedConfig, ConfigError> {
        let hack_min = nonzero_amount("hack_min", self.hack_min)?;
        let hack_max = nonzero_amount("hack_max", self.hack_max)?;
        if hack_min > hack_max {
            return Err(ConfigError::InvalidHackRange {
                min: hack_min,
                max: hack_max,
            });
        }
        if self.bonus_interval_secs == 0 {
            return Err(ConfigError::InvalidNonZero {
                field: "bonus_interval_secs",
                value: self.bonus_interval_secs.to_string(),
            });
        }
        let log_level =
            Level::from_str(&self.log_level).map_err(|_| ConfigError::InvalidLogLevel {
                value: self.log_level.clone(),
            })?;
        validate_handle(&self.root_handle).map_err(|source| ConfigError::InvalidRootHandle {
            value: self.root_handle.clone(),
            source,
        })?;

        let economy = Economy {
            defense_upgrade_price: amount("defense_upgrade_price", self.defense_upgrade_price)?,
            offense_upgrade_price: amount("offense_upgrade_price", self.offense_upgrade_price)?,
            offense_multiplier_bps: multiplier_bps(self.offense_multiplier)?,
            rank_up_cost: amount("rank_up_cost", self.rank_up_cost)?,
            bonus_amount: amount("bonus_amount", self.bonus_amount)?,
            allow_self_hack: self.allow_self_hack,
            root_rank: self.root_rank,
        };

        Ok(ValidatedConfig {
            economy,
            hack_min,
            hack_max,
            bonus_interval: Duration::from_secs(self.bonus_interval_secs),
            database: PathBuf::from(self.database),
            log_level,
            root_handle: self.root_handle,
        })
    }
}

impl ValidatedConfig {
    /// Whether the `hack` command accepts `requested`. The engine itself only rejects zero.
    pub fn hack_amount_allowed(&self, requested: Credits) -> bool {
        (self.hack_min..=self.hack_max).contains(&requested)
    }
}
