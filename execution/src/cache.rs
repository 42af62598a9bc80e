//! Read-through cache for directory listings.
//!
//! Each listing shape is a named [`View`]. Writers report a [`Mutation`] together with the
//! players whose records changed; the cache then drops
//! - every view of a kind the mutation declares in [`Mutation::invalidates`] (membership or
//!   ordering may have changed), and
//! - every other view that currently lists one of the changed players (its contents are stale).
//!
//! Fills carry the generation observed before the backing read. Any invalidation in between
//! bumps the generation and the fill is discarded, so a listing read after a commit never sees
//! pre-commit data.

use hacknet_types::{Player, PlayerId};
use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, RwLock, RwLockReadGuard, RwLockWriteGuard,
    },
};
use tracing::debug;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ViewKind {
    AllActive,
    Ranked,
    ActiveExcept,
    AllExcept,
}

impl ViewKind {
    pub const ALL: &'static [ViewKind] = &[
        ViewKind::AllActive,
        ViewKind::Ranked,
        ViewKind::ActiveExcept,
        ViewKind::AllExcept,
    ];
}

/// A cached listing, keyed by query shape.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum View {
    /// Active players.
    AllActive,
    /// Active players, rank descending.
    Ranked,
    /// Active players except the one with this handle.
    ActiveExcept(String),
    /// All players, active or not, except the one with this handle.
    AllExcept(String),
}

impl View {
    pub fn kind(&self) -> ViewKind {
        match self {
            View::AllActive => ViewKind::AllActive,
            View::Ranked => ViewKind::Ranked,
            View::ActiveExcept(_) => ViewKind::ActiveExcept,
            View::AllExcept(_) => ViewKind::AllExcept,
        }
    }
}

/// Every write that can change a player record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mutation {
    Register,
    Bootstrap,
    SwitchStatus,
    Ban,
    Unban,
    SwitchRole,
    Promote,
    Demote,
    RankUp,
    EditProfile,
    StandingDefender,
    Purchase,
    Hack,
    Bonus,
}

impl Mutation {
    /// View kinds dropped wholesale, regardless of which players they list.
    pub fn invalidates(self) -> &'static [ViewKind] {
        match self {
            // A new player joins every listing.
            Mutation::Register | Mutation::Bootstrap => ViewKind::ALL,
            // Membership of the active listings flips.
            Mutation::SwitchStatus | Mutation::Ban | Mutation::Unban => &[
                ViewKind::AllActive,
                ViewKind::Ranked,
                ViewKind::ActiveExcept,
            ],
            Mutation::RankUp => &[ViewKind::Ranked],
            // A renamed player may enter or leave a handle-keyed listing.
            Mutation::EditProfile => &[ViewKind::ActiveExcept, ViewKind::AllExcept],
            Mutation::SwitchRole
            | Mutation::Promote
            | Mutation::Demote
            | Mutation::StandingDefender
            | Mutation::Purchase
            | Mutation::Hack
            | Mutation::Bonus => &[],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub invalidations: u64,
}

struct Entry {
    players: Arc<Vec<Player>>,
    members: HashSet<PlayerId>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<View, Entry>,
    generation: u64,
}

#[derive(Default)]
pub struct DirectoryCache {
    inner: RwLock<Inner>,
    hits: AtomicU64,
    misses: AtomicU64,
    invalidations: AtomicU64,
}

impl DirectoryCache {
    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        match self.inner.read() {
            Ok(inner) => inner,
            Err(poisoned) => {
                tracing::warn!("Directory cache lock poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        match self.inner.write() {
            Ok(inner) => inner,
            Err(poisoned) => {
                tracing::warn!("Directory cache lock poisoned; recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Generation to pass to [`DirectoryCache::fill`] after a miss.
    pub fn generation(&self) -> u64 {
        self.read().generation
    }

    pub fn get(&self, view: &View) -> Option<Arc<Vec<Player>>> {
        let cached = self
            .read()
            .entries
            .get(view)
            .map(|entry| entry.players.clone());
        match cached {
            Some(players) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(?view, "directory cache hit");
                Some(players)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(?view, "directory cache miss");
                None
            }
        }
    }

    /// Stores a freshly read listing unless an invalidation happened since `observed`.
    pub fn fill(&self, view: View, players: Vec<Player>, observed: u64) -> Arc<Vec<Player>> {
        let players = Arc::new(players);
        let mut inner = self.write();
        if inner.generation != observed {
            debug!(?view, "discarding directory fill raced by a write");
            return players;
        }
        let members = players.iter().map(|player| player.id).collect();
        inner.entries.insert(
            view,
            Entry {
                players: players.clone(),
                members,
            },
        );
        players
    }

    /// Drops the views a mutation may have made stale. Returns how many were dropped.
    pub fn invalidate(&self, mutation: Mutation, touched: &[PlayerId]) -> usize {
        let kinds = mutation.invalidates();
        let mut inner = self.write();
        inner.generation = inner.generation.wrapping_add(1);
        let before = inner.entries.len();
        inner.entries.retain(|view, entry| {
            !kinds.contains(&view.kind()) && !touched.iter().any(|id| entry.members.contains(id))
        });
        let dropped = before - inner.entries.len();
        drop(inner);

        self.invalidations.fetch_add(1, Ordering::Relaxed);
        debug!(?mutation, dropped, "directory cache invalidated");
        dropped
    }

    pub fn is_cached(&self, view: &View) -> bool {
        self.read().entries.contains_key(view)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(handle: &str) -> Player {
        Player::new(PlayerId::random(), handle.to_string(), None, 0)
    }

    fn warm(cache: &DirectoryCache, view: View, players: &[Player]) {
        let generation = cache.generation();
        cache.fill(view, players.to_vec(), generation);
    }

    #[test]
    fn every_mutation_declares_a_trigger_set() {
        assert_eq!(Mutation::Register.invalidates(), ViewKind::ALL);
        assert!(Mutation::Ban.invalidates().contains(&ViewKind::AllActive));
        assert!(!Mutation::Ban.invalidates().contains(&ViewKind::AllExcept));
        assert_eq!(Mutation::RankUp.invalidates(), &[ViewKind::Ranked]);
        assert!(Mutation::Hack.invalidates().is_empty());
    }

    #[test]
    fn hit_after_fill_and_miss_after_invalidation() {
        let cache = DirectoryCache::default();
        let neo = player("neo");
        assert!(cache.get(&View::AllActive).is_none());
        warm(&cache, View::AllActive, std::slice::from_ref(&neo));
        assert_eq!(cache.get(&View::AllActive).unwrap().len(), 1);

        assert_eq!(cache.invalidate(Mutation::Register, &[]), 1);
        assert!(cache.get(&View::AllActive).is_none());
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 2,
                invalidations: 1,
            }
        );
    }

    #[test]
    fn content_changes_drop_only_views_listing_the_player() {
        let cache = DirectoryCache::default();
        let neo = player("neo");
        let smith = player("smith");
        warm(&cache, View::AllActive, &[neo.clone(), smith.clone()]);
        warm(&cache, View::ActiveExcept("neo".to_string()), &[smith.clone()]);

        cache.invalidate(Mutation::Hack, &[neo.id]);
        assert!(!cache.is_cached(&View::AllActive));
        assert!(cache.is_cached(&View::ActiveExcept("neo".to_string())));

        cache.invalidate(Mutation::Purchase, &[smith.id]);
        assert!(!cache.is_cached(&View::ActiveExcept("neo".to_string())));
    }

    #[test]
    fn unban_drops_active_views_that_do_not_list_the_player() {
        let cache = DirectoryCache::default();
        let neo = player("neo");
        let banned = player("banned");
        warm(&cache, View::Ranked, std::slice::from_ref(&neo));
        warm(&cache, View::AllExcept("neo".to_string()), std::slice::from_ref(&banned));

        cache.invalidate(Mutation::Unban, &[banned.id]);
        assert!(!cache.is_cached(&View::Ranked));
        assert!(!cache.is_cached(&View::AllExcept("neo".to_string())));
    }

    #[test]
    fn fill_raced_by_invalidation_is_discarded() {
        let cache = DirectoryCache::default();
        let observed = cache.generation();
        cache.invalidate(Mutation::Bonus, &[]);
        let players = cache.fill(View::AllActive, vec![player("stale")], observed);
        assert_eq!(players.len(), 1);
        assert!(!cache.is_cached(&View::AllActive));
    }
}
