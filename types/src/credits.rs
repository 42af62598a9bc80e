use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

/// Milli-credits per whole credit.
pub const CREDIT_SCALE: u64 = 1_000;

/// Basis points representing a 1x multiplier.
pub const BPS_SCALE: u32 = 10_000;

const FRACTION_DIGITS: usize = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CreditsError {
    #[error("credits must be a finite, non-negative number (got {0})")]
    OutOfRange(String),
    #[error("credits have at most 3 decimal places (got {0})")]
    TooPrecise(String),
    #[error("invalid credits amount: {0}")]
    Malformed(String),
}

/// A non-negative amount of in-game currency, stored as milli-credits.
///
/// Negative balances are unrepresentable. Arithmetic that could underflow goes through
/// [`Credits::checked_sub`] so callers decide how to surface the shortfall.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Credits(u64);

impl Credits {
    pub const ZERO: Self = Self(0);

    pub const fn from_milli(milli: u64) -> Self {
        Self(milli)
    }

    pub const fn from_whole(whole: u64) -> Self {
        Self(whole.saturating_mul(CREDIT_SCALE))
    }

    /// Converts a configured decimal value, rounding to the nearest milli-credit.
    pub fn from_f64(value: f64) -> Result<Self, CreditsError> {
        if !value.is_finite() || value < 0.0 {
            return Err(CreditsError::OutOfRange(value.to_string()));
        }
        let milli = (value * CREDIT_SCALE as f64).round();
        if milli > u64::MAX as f64 {
            return Err(CreditsError::OutOfRange(value.to_string()));
        }
        Ok(Self(milli as u64))
    }

    pub const fn milli(self) -> u64 {
        self.0
    }

    /// Decimal value in whole credits, as written in configuration.
    pub fn as_f64(self) -> f64 {
        self.0 as f64 / CREDIT_SCALE as f64
    }

    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    /// Scales by a basis-point multiplier (`15_000` = 1.5x), rounding down.
    pub fn apply_bps(self, bps: u32) -> Self {
        let scaled = (self.0 as u128)
            .saturating_mul(bps as u128)
            .checked_div(BPS_SCALE as u128)
            .unwrap_or(0);
        Self(scaled.min(u64::MAX as u128) as u64)
    }
}

impl fmt::Display for Credits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / CREDIT_SCALE;
        let fraction = self.0 % CREDIT_SCALE;
        if fraction == 0 {
            write!(f, "{whole}.0")
        } else {
            let digits = format!("{fraction:03}");
            write!(f, "{whole}.{}", digits.trim_end_matches('0'))
        }
    }
}

impl FromStr for Credits {
    type Err = CreditsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let (whole, fraction) = match trimmed.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (trimmed, ""),
        };
        if whole.is_empty() && fraction.is_empty() {
            return Err(CreditsError::Malformed(value.to_string()));
        }
        if fraction.len() > FRACTION_DIGITS {
            return Err(CreditsError::TooPrecise(value.to_string()));
        }
        let parse_digits = |digits: &str| -> Result<u64, CreditsError> {
            if digits.is_empty() {
                return Ok(0);
            }
            if !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(CreditsError::Malformed(value.to_string()));
            }
            digits
                .parse::<u64>()
                .map_err(|_| CreditsError::OutOfRange(value.to_string()))
        };
        let whole = parse_digits(whole)?;
        let padded = format!("{fraction:0<width$}", width = FRACTION_DIGITS);
        let fraction = parse_digits(&padded)?;
        whole
            .checked_mul(CREDIT_SCALE)
            .and_then(|milli| milli.checked_add(fraction))
            .map(Self)
            .ok_or_else(|| CreditsError::OutOfRange(value.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_and_displays_decimals() {
        assert_eq!("200".parse::<Credits>(), Ok(Credits::from_whole(200)));
        assert_eq!("12.5".parse::<Credits>(), Ok(Credits::from_milli(12_500)));
        assert_eq!(".25".parse::<Credits>(), Ok(Credits::from_milli(250)));
        assert_eq!(Credits::from_milli(12_500).to_string(), "12.5");
        assert_eq!(Credits::from_whole(30).to_string(), "30.0");
        assert_eq!(Credits::from_milli(1).to_string(), "0.001");
    }

    #[test]
    fn rejects_negative_and_malformed_input() {
        assert!(matches!(
            "-5".parse::<Credits>(),
            Err(CreditsError::Malformed(_))
        ));
        assert!(matches!(
            "1.2345".parse::<Credits>(),
            Err(CreditsError::TooPrecise(_))
        ));
        assert!(matches!(
            Credits::from_f64(-0.5),
            Err(CreditsError::OutOfRange(_))
        ));
        assert!(matches!(
            Credits::from_f64(f64::NAN),
            Err(CreditsError::OutOfRange(_))
        ));
    }

    #[test]
    fn from_f64_rounds_to_milli() {
        assert_eq!(Credits::from_f64(200.0), Ok(Credits::from_whole(200)));
        assert_eq!(Credits::from_f64(0.0004), Ok(Credits::ZERO));
        assert_eq!(Credits::from_f64(12.3456), Ok(Credits::from_milli(12_346)));
    }

    #[test]
    fn offense_multiplier_scales_exactly() {
        assert_eq!(
            Credits::from_whole(100).apply_bps(15_000),
            Credits::from_whole(150)
        );
        assert_eq!(
            Credits::from_whole(50).apply_bps(15_000),
            Credits::from_milli(75_000)
        );
        assert_eq!(Credits::from_milli(3).apply_bps(15_000), Credits::from_milli(4));
    }

    proptest! {
        #[test]
        fn display_parses_back(milli in 0u64..=u64::MAX / 2) {
            let credits = Credits::from_milli(milli);
            prop_assert_eq!(credits.to_string().parse::<Credits>(), Ok(credits));
        }

        #[test]
        fn unit_multiplier_is_identity(milli in any::<u64>()) {
            let credits = Credits::from_milli(milli);
            prop_assert_eq!(credits.apply_bps(BPS_SCALE), credits);
        }
    }
}
