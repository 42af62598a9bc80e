use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    DefenseUpgrade, EntryId, HackAttempt, HackId, LedgerEntry, OffenseUpgrade, Player, PlayerId,
    UpgradeId,
};

/// Storage key for every record the engine persists.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    Player(PlayerId),
    /// Unique handle index, resolves to a player id.
    Handle(String),
    DefenseUpgrade(UpgradeId),
    OffenseUpgrade(UpgradeId),
    Hack(HackId),
    LedgerEntry(EntryId),
}

/// Record family of a [`Key`], used for scans.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyKind {
    Player,
    Handle,
    DefenseUpgrade,
    OffenseUpgrade,
    Hack,
    LedgerEntry,
}

impl KeyKind {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyKind::Player => "player",
            KeyKind::Handle => "handle",
            KeyKind::DefenseUpgrade => "defense_upgrade",
            KeyKind::OffenseUpgrade => "offense_upgrade",
            KeyKind::Hack => "hack",
            KeyKind::LedgerEntry => "ledger_entry",
        }
    }
}

impl fmt::Display for KeyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Key {
    pub fn kind(&self) -> KeyKind {
        match self {
            Key::Player(_) => KeyKind::Player,
            Key::Handle(_) => KeyKind::Handle,
            Key::DefenseUpgrade(_) => KeyKind::DefenseUpgrade,
            Key::OffenseUpgrade(_) => KeyKind::OffenseUpgrade,
            Key::Hack(_) => KeyKind::Hack,
            Key::LedgerEntry(_) => KeyKind::LedgerEntry,
        }
    }

    /// Stable textual form, unique across kinds.
    pub fn encode(&self) -> String {
        let kind = self.kind();
        match self {
            Key::Player(id) => format!("{kind}:{id}"),
            Key::Handle(handle) => format!("{kind}:{handle}"),
            Key::DefenseUpgrade(id) | Key::OffenseUpgrade(id) => format!("{kind}:{id}"),
            Key::Hack(id) => format!("{kind}:{id}"),
            Key::LedgerEntry(id) => format!("{kind}:{id}"),
        }
    }

    /// Inverse of [`Key::encode`].
    pub fn decode(encoded: &str) -> anyhow::Result<Self> {
        let (kind, rest) = encoded
            .split_once(':')
            .with_context(|| format!("key without kind: {encoded}"))?;
        let parse_err = || format!("malformed {kind} key: {encoded}");
        Ok(match kind {
            "player" => Key::Player(rest.parse().with_context(parse_err)?),
            "handle" => Key::Handle(rest.to_string()),
            "defense_upgrade" => Key::DefenseUpgrade(rest.parse().with_context(parse_err)?),
            "offense_upgrade" => Key::OffenseUpgrade(rest.parse().with_context(parse_err)?),
            "hack" => Key::Hack(rest.parse().with_context(parse_err)?),
            "ledger_entry" => Key::LedgerEntry(rest.parse().with_context(parse_err)?),
            _ => anyhow::bail!("unknown key kind: {kind}"),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    Player(Player),
    PlayerRef(PlayerId),
    DefenseUpgrade(DefenseUpgrade),
    OffenseUpgrade(OffenseUpgrade),
    Hack(HackAttempt),
    LedgerEntry(LedgerEntry),
}

impl Value {
    pub fn encode(&self) -> anyhow::Result<Vec<u8>> {
        serde_json::to_vec(self).context("encode value")
    }

    pub fn decode(bytes: &[u8]) -> anyhow::Result<Self> {
        serde_json::from_slice(bytes).context("decode value")
    }
}
