//! Hacknet execution layer.
//!
//! This crate contains the rules that move credits: hack resolution, upgrade purchases, rank-ups,
//! moderation and the periodic bonus. Every operation runs as one unit of work on a [`Layer`],
//! which stages writes over a [`State`] backend and hands them back as a single change set.
//!
//! ## Atomicity
//! A unit either commits all of its staged changes or none. Business-rule failures
//! ([`hacknet_types::EconomyError`]) are raised before anything is applied, and backends must
//! apply a change set all-or-nothing.
//!
//! ## Isolation
//! [`Engine`] serializes units that touch the same players through per-player row locks taken in
//! id order, so concurrent hacks against one defender can never move more than the defender held.
//!
//! The primary entrypoint is [`Engine`].
//!
//! ## Example
//! ```rust,ignore
//! use hacknet_execution::{Engine, Memory};
//! use hacknet_types::{Credits, Economy};
//!
//! # async fn example() -> Result<(), hacknet_types::EconomyError> {
//! let engine = Engine::new(Memory::default(), Economy::default());
//! let neo = engine.register("neo", None).await?;
//! let smith = engine.register("smith", None).await?;
//! let attempt = engine
//!     .resolve_hack(neo.id, smith.id, Credits::from_whole(10))
//!     .await?;
//! println!("{} moved {}", attempt.status, attempt.credits);
//! # Ok(())
//! # }
//! ```

pub mod cache;
mod clock;
mod engine;
mod layer;
mod locks;
mod state;

#[cfg(any(test, feature = "mocks"))]
pub mod mocks;


pub use cache::{CacheStats, Mutation, View, ViewKind};
pub use clock::MonotonicClock;
pub use engine::Engine;
pub use layer::Layer;
pub use locks::{LockTable, RowGuard};
pub use state::{Memory, State, Status};
