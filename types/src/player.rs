use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use crate::{constants::MAX_HANDLE_LENGTH, Credits, PlayerId, UpgradeId};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlayerInvariantError {
    #[error("player handle is empty")]
    EmptyHandle,
    #[error("player handle too long (len={len}, max={max})")]
    HandleTooLong { len: usize, max: usize },
    #[error("player {0} names itself as standing defender")]
    SelfDefender(PlayerId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn toggled(self) -> Self {
        match self {
            Role::User => Role::Admin,
            Role::Admin => Role::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => f.write_str("USER"),
            Role::Admin => f.write_str("ADMIN"),
        }
    }
}

/// Authoritative player record.
///
/// Upgrade ownership is stored as ids in both directions: the player holds the id of the
/// upgrade it owns and the upgrade holds its owner's id. The upgrade handlers keep the two sides
/// consistent inside a single commit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub handle: String,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
    pub credits: Credits,
    pub rank: u32,
    pub role: Role,
    pub active: bool,
    /// The one attacker whose hacks against this player are defended for free.
    pub standing_defender: Option<PlayerId>,
    pub defense_upgrade: Option<UpgradeId>,
    pub offense_upgrade: Option<UpgradeId>,
    pub created_at_ms: u64,
    /// Last bonus cycle this player was credited for.
    #[serde(default)]
    pub last_bonus_cycle: Option<u64>,
}

impl Player {
    pub fn new(id: PlayerId, handle: String, email: Option<String>, created_at_ms: u64) -> Self {
        Self {
            id,
            handle,
            email,
            profile_picture: None,
            credits: Credits::ZERO,
            rank: 0,
            role: Role::User,
            active: true,
            standing_defender: None,
            defense_upgrade: None,
            offense_upgrade: None,
            created_at_ms,
            last_bonus_cycle: None,
        }
    }

    pub fn validate_invariants(&self) -> Result<(), PlayerInvariantError> {
        validate_handle(&self.handle)?;
        if self.standing_defender == Some(self.id) {
            return Err(PlayerInvariantError::SelfDefender(self.id));
        }
        Ok(())
    }
}

pub fn validate_handle(handle: &str) -> Result<(), PlayerInvariantError> {
    if handle.trim().is_empty() {
        return Err(PlayerInvariantError::EmptyHandle);
    }
    if handle.len() > MAX_HANDLE_LENGTH {
        return Err(PlayerInvariantError::HandleTooLong {
            len: handle.len(),
            max: MAX_HANDLE_LENGTH,
        });
    }
    Ok(())
}

/// Profile fields a player may change about themselves.
///
/// An empty `handle` keeps the current one; `email` and `profile_picture` always replace the
/// stored values.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub handle: String,
    pub email: Option<String>,
    pub profile_picture: Option<String>,
}
