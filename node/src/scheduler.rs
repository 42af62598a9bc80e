use hacknet_execution::{Engine, State};
use hacknet_types::EconomyError;
use std::{
    future::Future,
    sync::Arc,
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

/// Bonus cycle containing `now`. Cycles are aligned to the unix epoch so restarts inside a cycle
/// map to the same number.
pub fn cycle_at(now: SystemTime, interval: Duration) -> u64 {
    let secs = now
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or(0);
    secs / interval.as_secs().max(1)
}

/// Oldest bonus cycle not yet fully granted.
///
/// Cycles are granted strictly in order. A cycle that fails part way stays pending and is
/// finished before any later one; players it already paid are skipped on the retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BonusSchedule {
    next: u64,
}

impl BonusSchedule {
    pub fn starting_at(cycle: u64) -> Self {
        Self { next: cycle }
    }

    pub fn next(&self) -> u64 {
        self.next
    }

    /// Grants every pending cycle up to and including `current`, returning how many grants
    /// were made. Stops at the first failure and leaves that cycle pending.
    pub async fn catch_up<S: State>(
        &mut self,
        engine: &Engine<S>,
        current: u64,
    ) -> Result<usize, EconomyError> {
        let mut granted = 0;
        while self.next <= current {
            granted += engine.grant_bonus(self.next).await?;
            self.next += 1;
        }
        Ok(granted)
    }
}

/// Grants the periodic bonus every `interval` until `shutdown` resolves.
///
/// The first tick grants the cycle the loop starts in. Failures are logged and the failed cycle
/// is retried on the next tick.
pub async fn run_bonus_loop<S: State>(
    engine: Arc<Engine<S>>,
    interval: Duration,
    shutdown: impl Future<Output = ()>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    tokio::pin!(shutdown);
    let mut schedule = BonusSchedule::starting_at(cycle_at(SystemTime::now(), interval));

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("bonus scheduler stopping");
                return;
            }
            _ = ticker.tick() => {
                let current = cycle_at(SystemTime::now(), interval);
                match schedule.catch_up(&engine, current).await {
                    Ok(granted) => info!(cycle = current, granted, "bonus cycle granted"),
                    Err(err) => warn!(cycle = schedule.next(), ?err, "bonus cycle failed"),
                }
            }
        }
    }
}
