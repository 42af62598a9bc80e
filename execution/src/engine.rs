use anyhow::Context;
use hacknet_types::{
    Credits, DefenseUpgrade, Economy, EconomyError, EntryId, HackAttempt, Key, KeyKind,
    LedgerEntry, OffenseUpgrade, Player, PlayerId, ProfileEdit, Role, Value,
};
use std::{cmp::Reverse, sync::Arc};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::{
    cache::{CacheStats, DirectoryCache, Mutation, View},
    clock::MonotonicClock,
    layer::Layer,
    locks::LockTable,
    state::{State, Status},
};

/// Runs one handler as an atomic unit: stage on a fresh [`Layer`] under the state read guard,
/// then apply the change set under the write guard. The caller holds the row locks.
macro_rules! unit {
    ($engine:expr, $mutation:expr, |$layer:ident| $body:expr) => {{
        let (output, changes, touched) = {
            let state = $engine.state.read().await;
            #[allow(unused_mut)]
            let mut $layer = Layer::new(&*state, &$engine.economy, &$engine.clock);
            let output = $body?;
            let touched = $layer.touched_players();
            (output, $layer.commit(), touched)
        };
        $engine.apply($mutation, changes, &touched).await?;
        output
    }};
}

/// Entry point for every economy operation.
///
/// Each public method is one unit of work, isolated from concurrent units touching the same
/// players by [`LockTable`] row locks. Handle-changing operations also serialize on the
/// directory lock. Listings go through [`DirectoryCache`], which is invalidated after every
/// commit that rewrote a player and before the writing call returns.
pub struct Engine<S: State> {
    state: RwLock<S>,
    economy: Economy,
    clock: MonotonicClock,
    locks: LockTable,
    directory: Mutex<()>,
    cache: DirectoryCache,
}

impl<S: State> Engine<S> {
    pub fn new(state: S, economy: Economy) -> Self {
        Self {
            state: RwLock::new(state),
            economy,
            clock: MonotonicClock::default(),
            locks: LockTable::default(),
            directory: Mutex::new(()),
            cache: DirectoryCache::default(),
        }
    }

    pub fn economy(&self) -> &Economy {
        &self.economy
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Releases the backend, for example to reopen it elsewhere.
    pub fn into_state(self) -> S {
        self.state.into_inner()
    }

    async fn apply(
        &self,
        mutation: Mutation,
        changes: Vec<(Key, Status)>,
        touched: &[PlayerId],
    ) -> Result<(), EconomyError> {
        if changes.is_empty() {
            debug!(?mutation, "nothing to commit");
            return Ok(());
        }
        let count = changes.len();
        let mut state = self.state.write().await;
        state
            .apply(changes)
            .await
            .with_context(|| format!("committing {count} changes for {mutation:?}"))?;
        // Before the guard drops, so readers that see this commit miss on older views.
        if !touched.is_empty() {
            self.cache.invalidate(mutation, touched);
        }
        Ok(())
    }

    // === Combat ===

    pub async fn resolve_hack(
        &self,
        attacker: PlayerId,
        defender: PlayerId,
        requested: Credits,
    ) -> Result<HackAttempt, EconomyError> {
        let _rows = self.locks.acquire(&[attacker, defender]).await;
        Ok(unit!(self, Mutation::Hack, |layer| layer
            .resolve_hack(attacker, defender, requested)
            .await))
    }

    pub async fn set_standing_defender(
        &self,
        player: PlayerId,
        target: PlayerId,
    ) -> Result<bool, EconomyError> {
        let _rows = self.locks.acquire(&[player, target]).await;
        Ok(unit!(self, Mutation::StandingDefender, |layer| layer
            .set_standing_defender(player, target)
            .await))
    }

    pub async fn clear_standing_defender(&self, player: PlayerId) -> Result<bool, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::StandingDefender, |layer| layer
            .clear_standing_defender(player)
            .await))
    }

    /// Hacks `player` took part in, newest first.
    pub async fn history(&self, player: PlayerId) -> Result<Vec<HackAttempt>, EconomyError> {
        let records = self.state.read().await.scan(KeyKind::Hack).await?;
        let mut attempts: Vec<HackAttempt> = records
            .into_iter()
            .filter_map(|(_, value)| match value {
                Value::Hack(attempt) if attempt.involves(player) => Some(attempt),
                _ => None,
            })
            .collect();
        attempts.sort_by_key(|attempt| Reverse(attempt.created_at_ms));
        Ok(attempts)
    }

    // === Upgrades ===

    pub async fn buy_defense_upgrade(
        &self,
        player: PlayerId,
    ) -> Result<DefenseUpgrade, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::Purchase, |layer| layer
            .buy_defense_upgrade(player)
            .await))
    }

    pub async fn buy_offense_upgrade(
        &self,
        player: PlayerId,
    ) -> Result<OffenseUpgrade, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::Purchase, |layer| layer
            .buy_offense_upgrade(player)
            .await))
    }

    pub fn apply_offense_multiplier(&self, base: Credits) -> Credits {
        self.economy.apply_offense_multiplier(base)
    }

    pub async fn defense_upgrade_of(
        &self,
        player: PlayerId,
    ) -> Result<Option<DefenseUpgrade>, EconomyError> {
        let state = self.state.read().await;
        let layer = Layer::new(&*state, &self.economy, &self.clock);
        let Some(id) = layer.player(player).await?.defense_upgrade else {
            return Ok(None);
        };
        let upgrade = layer.defense_upgrade(id).await?;
        Ok(upgrade)
    }

    pub async fn offense_upgrade_of(
        &self,
        player: PlayerId,
    ) -> Result<Option<OffenseUpgrade>, EconomyError> {
        let state = self.state.read().await;
        let layer = Layer::new(&*state, &self.economy, &self.clock);
        let Some(id) = layer.player(player).await?.offense_upgrade else {
            return Ok(None);
        };
        let upgrade = layer.offense_upgrade(id).await?;
        Ok(upgrade)
    }

    // === Directory ===

    pub async fn player(&self, id: PlayerId) -> Result<Player, EconomyError> {
        let state = self.state.read().await;
        let layer = Layer::new(&*state, &self.economy, &self.clock);
        let player = layer.player(id).await?;
        Ok(player)
    }

    pub async fn player_by_handle(&self, handle: &str) -> Result<Player, EconomyError> {
        let state = self.state.read().await;
        let layer = Layer::new(&*state, &self.economy, &self.clock);
        let player = layer.player_by_handle(handle).await?;
        Ok(player)
    }

    async fn listing(&self, view: View) -> Result<Arc<Vec<Player>>, EconomyError> {
        if let Some(players) = self.cache.get(&view) {
            return Ok(players);
        }
        // Observed before the read so a commit landing in between discards this fill.
        let observed = self.cache.generation();
        let mut players = {
            let state = self.state.read().await;
            let layer = Layer::new(&*state, &self.economy, &self.clock);
            let players = layer.players().await?;
            players
        };
        players.retain(|player| match &view {
            View::AllActive | View::Ranked => player.active,
            View::ActiveExcept(handle) => player.active && &player.handle != handle,
            View::AllExcept(handle) => &player.handle != handle,
        });
        match view {
            View::Ranked => {
                players.sort_by_key(|player| (Reverse(player.rank), player.created_at_ms))
            }
            _ => players.sort_by_key(|player| player.created_at_ms),
        }
        Ok(self.cache.fill(view, players, observed))
    }

    /// Active players in registration order.
    pub async fn list_active(&self) -> Result<Arc<Vec<Player>>, EconomyError> {
        self.listing(View::AllActive).await
    }

    /// Active players, highest rank first.
    pub async fn list_ranked(&self) -> Result<Arc<Vec<Player>>, EconomyError> {
        self.listing(View::Ranked).await
    }

    pub async fn list_active_except(&self, handle: &str) -> Result<Arc<Vec<Player>>, EconomyError> {
        self.listing(View::ActiveExcept(handle.to_string())).await
    }

    /// Every player, inactive included, except `handle`.
    pub async fn list_all_except(&self, handle: &str) -> Result<Arc<Vec<Player>>, EconomyError> {
        self.listing(View::AllExcept(handle.to_string())).await
    }

    pub async fn register(
        &self,
        handle: &str,
        email: Option<String>,
    ) -> Result<Player, EconomyError> {
        let _directory = self.directory.lock().await;
        Ok(unit!(self, Mutation::Register, |layer| layer
            .register(handle, email)
            .await))
    }

    /// Creates the root administrator if the directory is empty.
    pub async fn bootstrap_root(&self, handle: &str) -> Result<Option<Player>, EconomyError> {
        let _directory = self.directory.lock().await;
        Ok(unit!(self, Mutation::Bootstrap, |layer| layer
            .bootstrap_root(handle)
            .await))
    }

    pub async fn edit_profile(
        &self,
        player: PlayerId,
        edit: ProfileEdit,
    ) -> Result<Player, EconomyError> {
        let _directory = self.directory.lock().await;
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::EditProfile, |layer| layer
            .edit_profile(player, edit)
            .await))
    }

    pub async fn switch_status(&self, player: PlayerId) -> Result<Player, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::SwitchStatus, |layer| layer
            .toggle_status(player)
            .await))
    }

    pub async fn ban(&self, player: PlayerId) -> Result<Player, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::Ban, |layer| layer
            .set_active(player, false)
            .await))
    }

    pub async fn unban(&self, player: PlayerId) -> Result<Player, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::Unban, |layer| layer
            .set_active(player, true)
            .await))
    }

    pub async fn switch_role(&self, player: PlayerId) -> Result<Player, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::SwitchRole, |layer| layer
            .toggle_role(player)
            .await))
    }

    pub async fn promote(&self, player: PlayerId) -> Result<Player, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::Promote, |layer| layer
            .set_role(player, Role::Admin)
            .await))
    }

    pub async fn demote(&self, player: PlayerId) -> Result<Player, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::Demote, |layer| layer
            .set_role(player, Role::User)
            .await))
    }

    pub async fn rank_up(&self, player: PlayerId) -> Result<Player, EconomyError> {
        let _rows = self.locks.acquire(&[player]).await;
        Ok(unit!(self, Mutation::RankUp, |layer| layer.rank_up(player).await))
    }

    // === Ledger ===

    async fn entries(&self) -> Result<Vec<LedgerEntry>, EconomyError> {
        let records = self.state.read().await.scan(KeyKind::LedgerEntry).await?;
        let mut entries: Vec<LedgerEntry> = records
            .into_iter()
            .filter_map(|(_, value)| match value {
                Value::LedgerEntry(entry) => Some(entry),
                _ => None,
            })
            .collect();
        entries.sort_by_key(|entry| Reverse(entry.created_at_ms));
        Ok(entries)
    }

    pub async fn ledger_entry(&self, id: EntryId) -> Result<Option<LedgerEntry>, EconomyError> {
        let record = self.state.read().await.get(&Key::LedgerEntry(id)).await?;
        Ok(match record {
            Some(Value::LedgerEntry(entry)) => Some(entry),
            _ => None,
        })
    }

    /// Every ledger entry, newest first.
    pub async fn ledger_entries(&self) -> Result<Vec<LedgerEntry>, EconomyError> {
        self.entries().await
    }

    /// Ledger entries of one player, newest first.
    pub async fn ledger_entries_for(
        &self,
        player: PlayerId,
    ) -> Result<Vec<LedgerEntry>, EconomyError> {
        let mut entries = self.entries().await?;
        entries.retain(|entry| entry.player == player);
        Ok(entries)
    }

    // === Bonus ===

    /// Credits the bonus for `cycle` to every active player, each in its own unit. Returns how
    /// many players were credited; players already paid for `cycle` are skipped.
    pub async fn grant_bonus(&self, cycle: u64) -> Result<usize, EconomyError> {
        let candidates: Vec<PlayerId> = self
            .list_active()
            .await?
            .iter()
            .map(|player| player.id)
            .collect();

        let mut granted = 0;
        for player in candidates {
            let _rows = self.locks.acquire(&[player]).await;
            let credited = unit!(self, Mutation::Bonus, |layer| layer
                .grant_bonus(player, cycle)
                .await);
            if credited {
                granted += 1;
            }
        }
        debug!(cycle, granted, "bonus cycle finished");
        Ok(granted)
    }
}
