use anyhow::{bail, Result};
use hacknet_types::{
    constants, Credits, DefenseUpgrade, Key, KeyKind, OffenseUpgrade, Player, PlayerId,
    UpgradeId, Value,
};
use std::sync::{
    atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
    Arc,
};

use crate::state::{Memory, State, Status};

static CREATED_AT: AtomicU64 = AtomicU64::new(1);

/// Stores an active USER with the given balance and returns it.
pub async fn create_player<S: State>(state: &mut S, handle: &str, credits: f64) -> Player {
    let created_at_ms = CREATED_AT.fetch_add(1, Ordering::Relaxed);
    let mut player = Player::new(PlayerId::random(), handle.to_string(), None, created_at_ms);
    player.credits = Credits::from_f64(credits).expect("valid credits");
    state
        .insert(Key::Handle(handle.to_string()), Value::PlayerRef(player.id))
        .await
        .expect("insert handle");
    save_player(state, &player).await;
    player
}

pub async fn save_player<S: State>(state: &mut S, player: &Player) {
    state
        .insert(Key::Player(player.id), Value::Player(player.clone()))
        .await
        .expect("insert player");
}

/// Gives `player` a defense upgrade with `uses` charges.
pub async fn give_defense_upgrade<S: State>(
    state: &mut S,
    player: &mut Player,
    uses: u32,
) -> DefenseUpgrade {
    let upgrade = DefenseUpgrade {
        id: UpgradeId::random(),
        owner: player.id,
        uses,
    };
    player.defense_upgrade = Some(upgrade.id);
    state
        .insert(
            Key::DefenseUpgrade(upgrade.id),
            Value::DefenseUpgrade(upgrade.clone()),
        )
        .await
        .expect("insert defense upgrade");
    save_player(state, player).await;
    upgrade
}

/// Gives `player` the offense upgrade at the default multiplier.
pub async fn give_offense_upgrade<S: State>(state: &mut S, player: &mut Player) -> OffenseUpgrade {
    let upgrade = OffenseUpgrade {
        id: UpgradeId::random(),
        owner: player.id,
        multiplier_bps: constants::OFFENSE_UPGRADE_MULTIPLIER_BPS,
        price: constants::OFFENSE_UPGRADE_PRICE,
    };
    player.offense_upgrade = Some(upgrade.id);
    state
        .insert(
            Key::OffenseUpgrade(upgrade.id),
            Value::OffenseUpgrade(upgrade.clone()),
        )
        .await
        .expect("insert offense upgrade");
    save_player(state, player).await;
    upgrade
}

/// Shared control over a [`FailingState`] after the engine owns it.
#[derive(Clone, Default)]
pub struct FailSwitch {
    armed: Arc<AtomicBool>,
    allowed: Arc<AtomicUsize>,
}

impl FailSwitch {
    /// Every later commit fails.
    pub fn arm(&self) {
        self.fail_after(0);
    }

    /// The next `commits` commits succeed, every one after them fails.
    pub fn fail_after(&self, commits: usize) {
        self.allowed.store(commits, Ordering::SeqCst);
        self.armed.store(true, Ordering::SeqCst);
    }

    pub fn disarm(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    fn should_fail(&self) -> bool {
        self.armed.load(Ordering::SeqCst)
            && self
                .allowed
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
                .is_err()
    }
}

/// In-memory backend whose commits can be made to fail on demand.
///
/// A failed `apply` writes nothing, which is what a transactional backend does when its
/// transaction aborts.
#[derive(Default)]
pub struct FailingState {
    inner: Memory,
    switch: FailSwitch,
}

impl FailingState {
    pub fn new(inner: Memory) -> Self {
        Self {
            inner,
            switch: FailSwitch::default(),
        }
    }

    pub fn switch(&self) -> FailSwitch {
        self.switch.clone()
    }
}

impl State for FailingState {
    async fn get(&self, key: &Key) -> Result<Option<Value>> {
        self.inner.get(key).await
    }

    async fn insert(&mut self, key: Key, value: Value) -> Result<()> {
        self.inner.insert(key, value).await
    }

    async fn delete(&mut self, key: &Key) -> Result<()> {
        self.inner.delete(key).await
    }

    async fn scan(&self, kind: KeyKind) -> Result<Vec<(Key, Value)>> {
        self.inner.scan(kind).await
    }

    async fn apply(&mut self, changes: Vec<(Key, Status)>) -> Result<()> {
        if self.switch.should_fail() {
            bail!("injected commit failure ({} changes dropped)", changes.len());
        }
        self.inner.apply(changes).await
    }
}
