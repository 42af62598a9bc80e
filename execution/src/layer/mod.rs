use anyhow::{anyhow, Result};
use hacknet_types::{
    constants, Credits, DefenseUpgrade, Economy, EconomyError, EntryId, HackAttempt, HackId,
    HackStatus, Key, KeyKind, LedgerEntry, OffenseUpgrade, Player, PlayerId, ProfileEdit, Role,
    TransactionType, UpgradeId, Value,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::clock::MonotonicClock;
use crate::state::{State, Status};

mod handlers;

/// One unit of work.
///
/// Reads go through to the underlying state unless this layer already staged a write for the
/// key. Writes are only staged; nothing reaches storage until the engine applies
/// [`Layer::commit`]. Dropping a layer (for example after a business-rule error) discards
/// everything it staged.
pub struct Layer<'a, S: State> {
    state: &'a S,
    pending: BTreeMap<Key, Status>,

    economy: &'a Economy,
    clock: &'a MonotonicClock,
}

impl<'a, S: State> Layer<'a, S> {
    pub fn new(state: &'a S, economy: &'a Economy, clock: &'a MonotonicClock) -> Self {
        Self {
            state,
            pending: BTreeMap::new(),
            economy,
            clock,
        }
    }

    fn stage(&mut self, key: Key, value: Value) {
        self.pending.insert(key, Status::Update(value));
    }

    fn unstage(&mut self, key: Key) {
        self.pending.insert(key, Status::Delete);
    }

    fn stage_player(&mut self, player: Player) {
        self.stage(Key::Player(player.id), Value::Player(player));
    }

    pub async fn player(&self, id: PlayerId) -> Result<Player, EconomyError> {
        match self.get(&Key::Player(id)).await? {
            Some(Value::Player(player)) => Ok(player),
            _ => Err(EconomyError::PlayerNotFound(id)),
        }
    }

    pub async fn player_by_handle(&self, handle: &str) -> Result<Player, EconomyError> {
        match self.get(&Key::Handle(handle.to_string())).await? {
            Some(Value::PlayerRef(id)) => self.player(id).await,
            _ => Err(EconomyError::HandleNotFound(handle.to_string())),
        }
    }

    pub async fn players(&self) -> Result<Vec<Player>, EconomyError> {
        Ok(self
            .scan(KeyKind::Player)
            .await?
            .into_iter()
            .filter_map(|(_, value)| match value {
                Value::Player(player) => Some(player),
                _ => None,
            })
            .collect())
    }

    pub async fn defense_upgrade(&self, id: UpgradeId) -> Result<Option<DefenseUpgrade>> {
        Ok(match self.get(&Key::DefenseUpgrade(id)).await? {
            Some(Value::DefenseUpgrade(upgrade)) => Some(upgrade),
            _ => None,
        })
    }

    pub async fn offense_upgrade(&self, id: UpgradeId) -> Result<Option<OffenseUpgrade>> {
        Ok(match self.get(&Key::OffenseUpgrade(id)).await? {
            Some(Value::OffenseUpgrade(upgrade)) => Some(upgrade),
            _ => None,
        })
    }

    fn debit(player: &mut Player, amount: Credits) -> Result<(), EconomyError> {
        player.credits = player.credits.checked_sub(amount).ok_or(
            EconomyError::InsufficientCredits {
                required: amount,
                available: player.credits,
            },
        )?;
        Ok(())
    }

    fn credit(player: &mut Player, amount: Credits) -> Result<(), EconomyError> {
        player.credits = player
            .credits
            .checked_add(amount)
            .ok_or_else(|| anyhow!("balance overflow for player {}", player.id))?;
        Ok(())
    }

    /// Players whose records this layer rewrote.
    pub fn touched_players(&self) -> Vec<PlayerId> {
        self.pending
            .keys()
            .filter_map(|key| match key {
                Key::Player(id) => Some(*id),
                _ => None,
            })
            .collect()
    }

    pub fn commit(self) -> Vec<(Key, Status)> {
        self.pending.into_iter().collect()
    }
}

impl<'a, S: State> State for Layer<'a, S> {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        Ok(match self.pending.get(key) {
            Some(Status::Update(value)) => Some(value.clone()),
            Some(Status::Delete) => None,
            None => self.state.get(key).await?,
        })
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.stage(key, value);
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.unstage(key.clone());
        Ok(())
    }

    async fn scan(&self, kind: KeyKind) -> Result<Vec<(Key, Value)>> {
        let mut records: BTreeMap<Key, Value> = self.state.scan(kind).await?.into_iter().collect();
        for (key, status) in &self.pending {
            if key.kind() != kind {
                continue;
            }
            match status {
                Status::Update(value) => {
                    records.insert(key.clone(), value.clone());
                }
                Status::Delete => {
                    records.remove(key);
                }
            }
        }
        Ok(records.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Memory;

    #[tokio::test]
    async fn staged_writes_shadow_state_until_commit() {
        let mut memory = Memory::default();
        let neo = Player::new(PlayerId::random(), "neo".to_string(), None, 0);
        memory
            .insert(Key::Player(neo.id), Value::Player(neo.clone()))
            .await
            .unwrap();

        let economy = Economy::default();
        let clock = MonotonicClock::default();
        let mut layer = Layer::new(&memory, &economy, &clock);

        let mut renamed = neo.clone();
        renamed.handle = "the_one".to_string();
        layer.stage_player(renamed.clone());
        assert_eq!(layer.player(neo.id).await.unwrap(), renamed);
        assert_eq!(layer.players().await.unwrap(), vec![renamed]);
        assert_eq!(layer.touched_players(), vec![neo.id]);

        drop(layer);
        assert_eq!(
            memory.get(&Key::Player(neo.id)).await.unwrap(),
            Some(Value::Player(neo))
        );
    }

    #[tokio::test]
    async fn staged_delete_hides_record_from_scan() {
        let mut memory = Memory::default();
        let neo = PlayerId::random();
        memory
            .insert(Key::Handle("neo".to_string()), Value::PlayerRef(neo))
            .await
            .unwrap();

        let economy = Economy::default();
        let clock = MonotonicClock::default();
        let mut layer = Layer::new(&memory, &economy, &clock);
        layer.unstage(Key::Handle("neo".to_string()));
        assert!(layer.scan(KeyKind::Handle).await.unwrap().is_empty());
        assert!(matches!(
            layer.player_by_handle("neo").await,
            Err(EconomyError::HandleNotFound(_))
        ));
    }
}
