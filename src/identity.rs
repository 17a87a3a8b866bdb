//! Replica identifiers and the sources that produce them.
//!
//! Every counter replica writes only to its own column, keyed by a
//! [`ReplicaId`]. Where those identifiers come from is pluggable through
//! [`ReplicaIdSource`]: the default [`TimestampRandomIds`] is good enough for
//! independently started processes, and a deployment with a coordinated
//! allocator can supply its own source.

use std::borrow::Borrow;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::IdentityError;

/// Identifier of a single counter replica.
///
/// Opaque to the counters: only equality and ordering are used.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(transparent)
)]
pub struct ReplicaId(String);

impl ReplicaId {
    /// Wrap an existing identifier.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ReplicaId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ReplicaId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReplicaId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ReplicaId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&ReplicaId> for ReplicaId {
    fn from(id: &ReplicaId) -> Self {
        id.clone()
    }
}

/// Anything that can hand out practically unique replica identifiers.
pub trait ReplicaIdSource {
    /// Produce the next identifier.
    fn next_id(&self) -> Result<ReplicaId, IdentityError>;
}

impl<F> ReplicaIdSource for F
where
    F: Fn() -> Result<ReplicaId, IdentityError>,
{
    fn next_id(&self) -> Result<ReplicaId, IdentityError> {
        self()
    }
}

/// Identifiers of the form `<unix-nanos>-<random-hex>`.
///
/// Collisions need two processes on the same clock tick drawing the same
/// random bytes. That is unlikely but not impossible, so this is not a
/// cryptographic uniqueness guarantee.
///
/// # Example
///
/// ```
/// use crdt_counter::{ReplicaIdSource, TimestampRandomIds};
///
/// let id = TimestampRandomIds::new().next_id().unwrap();
/// let (nanos, random) = id.as_str().split_once('-').unwrap();
/// assert!(nanos.parse::<u128>().is_ok());
/// assert_eq!(random.len(), 16);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimestampRandomIds {
    random_bytes: usize,
}

impl TimestampRandomIds {
    /// Number of random bytes appended when not configured otherwise.
    pub const DEFAULT_RANDOM_BYTES: usize = 8;

    /// Create a source with [`Self::DEFAULT_RANDOM_BYTES`] of randomness.
    pub fn new() -> Self {
        Self {
            random_bytes: Self::DEFAULT_RANDOM_BYTES,
        }
    }

    /// Use `n` random bytes per identifier (at least one).
    #[must_use]
    pub fn with_random_bytes(mut self, n: usize) -> Self {
        self.random_bytes = n.max(1);
        self
    }

    /// Number of random bytes drawn per identifier.
    #[must_use]
    pub fn random_bytes(&self) -> usize {
        self.random_bytes
    }
}

impl Default for TimestampRandomIds {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplicaIdSource for TimestampRandomIds {
    fn next_id(&self) -> Result<ReplicaId, IdentityError> {
        let nanos = SystemTime::now().duration_since(UNIX_EPOCH)?.as_nanos();

        let mut bytes = vec![0u8; self.random_bytes];
        OsRng.try_fill_bytes(&mut bytes)?;

        let id = ReplicaId(format!("{nanos}-{}", hex::encode(&bytes)));
        tracing::trace!(replica = %id, "generated replica id");
        Ok(id)
    }
}

/// Identifiers of the form `<prefix>-<n>` with `n` counting up from zero.
///
/// Stands in for a coordinated allocator: uniqueness holds only as long as
/// every replica draws from the same instance (or distinct prefixes).
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    /// Create a source numbering identifiers under `prefix`.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl ReplicaIdSource for SequentialIds {
    fn next_id(&self) -> Result<ReplicaId, IdentityError> {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Ok(ReplicaId(format!("{}-{n}", self.prefix)))
    }
}

/// Generate an identifier with the default [`TimestampRandomIds`] source.
pub fn generate_replica_id() -> Result<ReplicaId, IdentityError> {
    TimestampRandomIds::new().next_id()
}
