use std::collections::BTreeMap;

use parking_lot::{Mutex, MutexGuard};

use crate::error::{CounterError, IdentityError, Result};
use crate::identity::{ReplicaId, ReplicaIdSource, TimestampRandomIds};
use crate::{Crdt, DeltaCrdt};

/// Exchangeable state of a grow-only counter: one count per replica.
///
/// This is the plain value that crosses process boundaries. Transport layers
/// rebuild it entry by entry (never from a total) before merging, since the
/// join works per replica.
///
/// # Example
///
/// ```
/// use crdt_counter::prelude::*;
///
/// let mut a = GCounterState::from_entries([("node-1", 3)]);
/// let b = GCounterState::from_entries([("node-1", 1), ("node-2", 4)]);
///
/// a.merge(&b);
/// assert_eq!(a.count_for("node-1"), 3);
/// assert_eq!(a.value(), 7);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GCounterState {
    counts: BTreeMap<ReplicaId, u64>,
}

impl GCounterState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a state from `(replica, count)` pairs.
    ///
    /// A replica listed more than once keeps its largest count.
    pub fn from_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, u64)>,
        K: Into<ReplicaId>,
    {
        let mut counts: BTreeMap<ReplicaId, u64> = BTreeMap::new();
        for (replica, count) in entries {
            let entry = counts.entry(replica.into()).or_insert(0);
            *entry = count.max(*entry);
        }
        Self { counts }
    }

    /// Sum of all replica counts, saturating at `u64::MAX`.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.counts
            .values()
            .fold(0u64, |total, &count| total.saturating_add(count))
    }

    /// Count recorded for a specific replica.
    #[must_use]
    pub fn count_for(&self, replica: &str) -> u64 {
        self.counts.get(replica).copied().unwrap_or(0)
    }

    /// Iterate over `(replica, count)` pairs in replica order.
    pub fn entries(&self) -> impl Iterator<Item = (&ReplicaId, u64)> + '_ {
        self.counts.iter().map(|(replica, &count)| (replica, count))
    }

    /// Number of replicas with a recorded count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Whether no replica has recorded anything yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Add to one replica's column, saturating at `u64::MAX`.
    ///
    /// Returns the new count and the part of `delta` lost to saturation.
    fn add(&mut self, replica: &ReplicaId, delta: u64) -> (u64, u64) {
        let entry = self.counts.entry(replica.clone()).or_insert(0);
        let before = *entry;
        *entry = before.saturating_add(delta);
        (*entry, delta - (*entry - before))
    }
}

/// Pointwise max of `other` into `counts`. Returns how many entries advanced.
fn join(counts: &mut BTreeMap<ReplicaId, u64>, other: &BTreeMap<ReplicaId, u64>) -> usize {
    let mut advanced = 0;
    for (replica, &count) in other {
        match counts.get_mut(replica) {
            Some(local) if *local >= count => {}
            Some(local) => {
                *local = count;
                advanced += 1;
            }
            None => {
                counts.insert(replica.clone(), count);
                advanced += 1;
            }
        }
    }
    advanced
}

impl Crdt for GCounterState {
    fn merge(&mut self, other: &Self) {
        join(&mut self.counts, &other.counts);
    }
}

/// Delta for [`GCounterState`]: only the entries where the sender is ahead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GCounterDelta {
    counts: BTreeMap<ReplicaId, u64>,
}

impl GCounterDelta {
    /// Whether the delta carries nothing new.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Number of entries carried.
    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Iterate over the carried `(replica, count)` pairs.
    pub fn entries(&self) -> impl Iterator<Item = (&ReplicaId, u64)> + '_ {
        self.counts.iter().map(|(replica, &count)| (replica, count))
    }
}

impl DeltaCrdt for GCounterState {
    type Delta = GCounterDelta;

    fn delta(&self, other: &Self) -> GCounterDelta {
        let counts = self
            .counts
            .iter()
            .filter(|&(replica, &count)| count > other.count_for(replica.as_str()))
            .map(|(replica, &count)| (replica.clone(), count))
            .collect();
        GCounterDelta { counts }
    }

    fn apply_delta(&mut self, delta: &GCounterDelta) {
        join(&mut self.counts, &delta.counts);
    }
}

/// Reject negative deltas before any state is touched.
pub(crate) fn checked_delta(delta: i64) -> Result<u64> {
    u64::try_from(delta).map_err(|_| {
        tracing::debug!(delta, "rejected negative delta");
        CounterError::InvalidOperand { delta }
    })
}

/// A grow-only counter (G-Counter) replica.
///
/// Each replica only ever adds to its own column; the total is the sum of
/// every column it has seen. The state sits behind a single lock, so a
/// `GCounter` can be shared between threads (e.g. in an `Arc`) and every
/// operation is linearizable on that instance.
///
/// # Example
///
/// ```
/// use crdt_counter::prelude::*;
///
/// let a = GCounter::new("node-a");
/// a.increment_by(3)?;
///
/// let b = GCounter::new("node-b");
/// b.increment_by(5)?;
///
/// a.merge(&b);
/// assert_eq!(a.value(), 8);
/// # Ok::<(), crdt_counter::CounterError>(())
/// ```
#[derive(Debug)]
pub struct GCounter {
    replica: ReplicaId,
    state: Mutex<GCounterState>,
}

impl GCounter {
    /// Create an empty counter owned by `replica`.
    pub fn new(replica: impl Into<ReplicaId>) -> Self {
        Self::from_state(replica, GCounterState::new())
    }

    /// Create an empty counter with a fresh [`TimestampRandomIds`] identifier.
    pub fn generate() -> std::result::Result<Self, IdentityError> {
        Self::with_source(&TimestampRandomIds::new())
    }

    /// Create an empty counter with an identifier drawn from `source`.
    pub fn with_source<S>(source: &S) -> std::result::Result<Self, IdentityError>
    where
        S: ReplicaIdSource + ?Sized,
    {
        Ok(Self::new(source.next_id()?))
    }

    /// Rebuild a replica from previously exchanged state.
    pub fn from_state(replica: impl Into<ReplicaId>, state: GCounterState) -> Self {
        Self {
            replica: replica.into(),
            state: Mutex::new(state),
        }
    }

    /// This replica's identifier.
    #[must_use]
    pub fn replica_id(&self) -> &ReplicaId {
        &self.replica
    }

    /// Increment this replica's count by 1.
    pub fn increment(&self) {
        self.add(1);
    }

    /// Increment this replica's count by `delta`.
    ///
    /// # Errors
    ///
    /// [`CounterError::InvalidOperand`] if `delta` is negative; the counter
    /// is not modified.
    ///
    /// The replica's count saturates at `u64::MAX`; any excess is dropped.
    pub fn increment_by(&self, delta: i64) -> Result<()> {
        let delta = checked_delta(delta)?;
        self.add(delta);
        Ok(())
    }

    pub(crate) fn add(&self, delta: u64) {
        let (count, dropped) = self.state.lock().add(&self.replica, delta);
        if dropped > 0 {
            tracing::debug!(replica = %self.replica, delta, dropped, "increment saturated");
        }
        tracing::trace!(replica = %self.replica, delta, count, "incremented");
    }

    /// Total across all replicas seen so far.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.state.lock().value()
    }

    /// Count recorded for a specific replica.
    #[must_use]
    pub fn count_for(&self, replica: &str) -> u64 {
        self.state.lock().count_for(replica)
    }

    /// Copy of the current state, taken under the lock.
    #[must_use]
    pub fn snapshot(&self) -> GCounterState {
        self.state.lock().clone()
    }

    /// Merge another live replica into this one.
    ///
    /// The source is snapshotted under its own lock, which is released before
    /// this replica's lock is taken. Only one lock is ever held, so merging a
    /// counter into itself or merging two counters into each other from
    /// different threads cannot deadlock.
    pub fn merge(&self, other: &GCounter) {
        let snapshot = other.snapshot();
        self.merge_state(&snapshot);
    }

    /// Merge exchanged state into this replica.
    pub fn merge_state(&self, other: &GCounterState) {
        let advanced = join(&mut self.state.lock().counts, &other.counts);
        if advanced > 0 {
            tracing::debug!(replica = %self.replica, advanced, "merged counter state");
        }
    }

    /// Entries this replica holds that `other` has not seen.
    #[must_use]
    pub fn delta_since(&self, other: &GCounterState) -> GCounterDelta {
        self.state.lock().delta(other)
    }

    /// Apply a delta produced by another replica.
    pub fn apply_delta(&self, delta: &GCounterDelta) {
        let advanced = join(&mut self.state.lock().counts, &delta.counts);
        if advanced > 0 {
            tracing::debug!(replica = %self.replica, advanced, "applied counter delta");
        }
    }

    /// Start a new replica under `replica`, seeded with this one's state.
    ///
    /// The new replica must have its own identifier: two live replicas
    /// writing the same column lose updates when merged.
    #[must_use]
    pub fn fork(&self, replica: impl Into<ReplicaId>) -> Self {
        Self::from_state(replica, self.snapshot())
    }

    /// Consume the replica, returning its state.
    #[must_use]
    pub fn into_state(self) -> GCounterState {
        self.state.into_inner()
    }

    pub(crate) fn lock(&self) -> MutexGuard<'_, GCounterState> {
        self.state.lock()
    }
}
