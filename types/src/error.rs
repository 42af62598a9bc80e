use thiserror::Error;

use crate::{player::PlayerInvariantError, Credits, PlayerId};

/// Business-rule failures raised to callers, plus storage failures that aborted a unit of work.
#[derive(Debug, Error)]
pub enum EconomyError {
    #[error("insufficient credits (required={required}, available={available})")]
    InsufficientCredits {
        required: Credits,
        available: Credits,
    },
    #[error("offense upgrade already owned")]
    AlreadyOwned,
    #[error("player with id [{0}] does not exist")]
    PlayerNotFound(PlayerId),
    #[error("player with handle [{0}] does not exist")]
    HandleNotFound(String),
    #[error("handle \"{0}\" unavailable")]
    HandleTaken(String),
    #[error("invalid profile: {0}")]
    InvalidProfile(#[from] PlayerInvariantError),
    #[error("hack amount must be positive")]
    InvalidHackAmount,
    #[error("players may not hack themselves")]
    SelfHack,
    #[error("storage failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl EconomyError {
    /// True for failures caused by the request rather than the backend.
    pub fn is_business(&self) -> bool {
        !matches!(self, EconomyError::Storage(_))
    }
}
