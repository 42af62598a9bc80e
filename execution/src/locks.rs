use hacknet_types::PlayerId;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-player row locks.
///
/// A unit of work holds the locks of every player it reads or writes from the first read until
/// its changes are applied. Upgrades are owned 1:1, so the owner's lock covers them too. Locks
/// are always taken in ascending id order, which rules out deadlock between units that share
/// players.
#[derive(Default)]
pub struct LockTable {
    rows: Mutex<HashMap<PlayerId, Arc<AsyncMutex<()>>>>,
}

/// Held row locks; released on drop.
pub struct RowGuard {
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl LockTable {
    pub async fn acquire(&self, players: &[PlayerId]) -> RowGuard {
        let mut ids = players.to_vec();
        ids.sort_unstable();
        ids.dedup();

        let rows: Vec<Arc<AsyncMutex<()>>> = {
            let mut table = match self.rows.lock() {
                Ok(table) => table,
                Err(poisoned) => {
                    tracing::warn!("Row lock table poisoned; recovering");
                    poisoned.into_inner()
                }
            };
            ids.iter()
                .map(|id| table.entry(*id).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(rows.len());
        for row in rows {
            guards.push(row.lock_owned().await);
        }
        RowGuard { _guards: guards }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn overlapping_sets_are_serialized() {
        let table = Arc::new(LockTable::default());
        let a = PlayerId::random();
        let b = PlayerId::random();

        let held = table.acquire(&[a, b]).await;
        let contender = {
            let table = table.clone();
            tokio::spawn(async move {
                let _guard = table.acquire(&[b, a]).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(held);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .expect("contender acquires after release")
            .expect("task completes");
    }

    #[tokio::test]
    async fn duplicate_ids_do_not_self_deadlock() {
        let table = LockTable::default();
        let a = PlayerId::random();
        let _guard = tokio::time::timeout(Duration::from_secs(1), table.acquire(&[a, a]))
            .await
            .expect("same id twice is one lock");
    }
}
