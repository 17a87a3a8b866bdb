//! # crdt-counter
//!
//! Thread-safe, state-based counter CRDTs.
//!
//! A CRDT (Conflict-free Replicated Data Type) is a data structure that can be
//! replicated across multiple processes and updated independently. When
//! replicas are merged, they are guaranteed to converge to the same state
//! without requiring coordination or consensus.
//!
//! ## Quick Start
//!
//! ```
//! use crdt_counter::prelude::*;
//!
//! // Grow-only counter
//! let c1 = GCounter::new("device-1");
//! c1.increment();
//!
//! let c2 = GCounter::new("device-2");
//! c2.increment();
//!
//! c1.merge(&c2);
//! assert_eq!(c1.value(), 2);
//!
//! // Negative operands are rejected, not fatal
//! assert!(c1.increment_by(-1).is_err());
//! assert_eq!(c1.value(), 2);
//! ```
//!
//! ## Counters
//!
//! - [`GCounter`] - Grow-only counter (increment only)
//! - [`PNCounter`] - Positive-negative counter (increment and decrement)
//!
//! Both are shared replicas: every operation takes `&self` and the state sits
//! behind a per-instance lock, so a counter can be wrapped in an `Arc` and
//! updated from many threads.
//!
//! ## Exchanging State
//!
//! [`GCounterState`] and [`PNCounterState`] are the plain values that cross
//! process boundaries (serializable with the `serde` feature). They implement
//! the [`Crdt`] trait, whose [`Crdt::merge`] is commutative, associative and
//! idempotent, and [`DeltaCrdt`] for shipping only what a peer is missing.
//!
//! ## Replica Identity
//!
//! Each replica needs a practically unique [`ReplicaId`]. Any
//! [`ReplicaIdSource`] can supply one; [`TimestampRandomIds`] is the default.

#![warn(missing_docs)]

mod crdt;
mod error;
mod gcounter;
mod identity;
mod pncounter;

pub mod prelude;

pub use crdt::{Crdt, DeltaCrdt};
pub use error::{CounterError, IdentityError, Result};
pub use gcounter::{GCounter, GCounterDelta, GCounterState};
pub use identity::{
    generate_replica_id, ReplicaId, ReplicaIdSource, SequentialIds, TimestampRandomIds,
};
pub use pncounter::{PNCounter, PNCounterDelta, PNCounterState};
