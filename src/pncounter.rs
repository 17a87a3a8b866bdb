use crate::error::{IdentityError, Result};
use crate::gcounter::{checked_delta, GCounter, GCounterDelta, GCounterState};
use crate::identity::{ReplicaId, ReplicaIdSource, TimestampRandomIds};
use crate::{Crdt, DeltaCrdt};

/// `positive - negative`, clamped into `i64`.
fn net(positive: u64, negative: u64) -> i64 {
    let diff = i128::from(positive) - i128::from(negative);
    i64::try_from(diff).unwrap_or(if diff < 0 { i64::MIN } else { i64::MAX })
}

/// Exchangeable state of a PN-Counter: a pair of grow-only states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PNCounterState {
    positive: GCounterState,
    negative: GCounterState,
}

impl PNCounterState {
    /// Create an empty state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a state from its increment and decrement halves.
    pub fn from_parts(positive: GCounterState, negative: GCounterState) -> Self {
        Self { positive, negative }
    }

    /// Net value (`increments - decrements`).
    #[must_use]
    pub fn value(&self) -> i64 {
        net(self.positive.value(), self.negative.value())
    }

    /// Grow-only state of all increments.
    #[must_use]
    pub fn positive(&self) -> &GCounterState {
        &self.positive
    }

    /// Grow-only state of all decrements.
    #[must_use]
    pub fn negative(&self) -> &GCounterState {
        &self.negative
    }
}

impl Crdt for PNCounterState {
    fn merge(&mut self, other: &Self) {
        self.positive.merge(&other.positive);
        self.negative.merge(&other.negative);
    }
}

/// Delta for [`PNCounterState`], one [`GCounterDelta`] per half.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PNCounterDelta {
    positive: GCounterDelta,
    negative: GCounterDelta,
}

impl PNCounterDelta {
    /// Whether neither half carries anything new.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.positive.is_empty() && self.negative.is_empty()
    }

    /// Increment entries carried by this delta.
    #[must_use]
    pub fn positive(&self) -> &GCounterDelta {
        &self.positive
    }

    /// Decrement entries carried by this delta.
    #[must_use]
    pub fn negative(&self) -> &GCounterDelta {
        &self.negative
    }
}

impl DeltaCrdt for PNCounterState {
    type Delta = PNCounterDelta;

    fn delta(&self, other: &Self) -> PNCounterDelta {
        PNCounterDelta {
            positive: self.positive.delta(&other.positive),
            negative: self.negative.delta(&other.negative),
        }
    }

    fn apply_delta(&mut self, delta: &PNCounterDelta) {
        self.positive.apply_delta(&delta.positive);
        self.negative.apply_delta(&delta.negative);
    }
}

/// A positive-negative counter (PN-Counter) replica.
///
/// Supports both increment and decrement by keeping two grow-only counters,
/// one for increments and one for decrements, under the same replica id.
/// The value is `increments - decrements` and may be negative.
///
/// [`PNCounter::value`] reads the two halves in separate critical sections,
/// so under concurrent writers it can pair an increment that has landed with
/// a decrement that has not. [`PNCounter::snapshot`] holds both locks (always
/// increments first) and gives a consistent reading.
///
/// # Example
///
/// ```
/// use crdt_counter::prelude::*;
///
/// let c1 = PNCounter::new("node-1");
/// c1.increment_by(5)?;
/// c1.decrement_by(2)?;
/// assert_eq!(c1.value(), 3);
///
/// let c2 = PNCounter::new("node-2");
/// c2.increment_by(3)?;
/// c2.decrement();
///
/// c1.merge(&c2);
/// assert_eq!(c1.value(), 5);
/// # Ok::<(), crdt_counter::CounterError>(())
/// ```
#[derive(Debug)]
pub struct PNCounter {
    increments: GCounter,
    decrements: GCounter,
}

impl PNCounter {
    /// Create an empty counter owned by `replica`.
    pub fn new(replica: impl Into<ReplicaId>) -> Self {
        Self::from_state(replica, PNCounterState::new())
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
    pub fn from_state(replica: impl Into<ReplicaId>, state: PNCounterState) -> Self {
        let replica = replica.into();
        Self {
            increments: GCounter::from_state(replica.clone(), state.positive),
            decrements: GCounter::from_state(replica, state.negative),
        }
    }

    /// This replica's identifier.
    #[must_use]
    pub fn replica_id(&self) -> &ReplicaId {
        self.increments.replica_id()
    }

    /// Increment the counter by 1.
    pub fn increment(&self) {
        self.increments.add(1);
    }

    /// Increment the counter by `delta`.
    ///
    /// # Errors
    ///
    /// [`CounterError::InvalidOperand`](crate::CounterError::InvalidOperand)
    /// if `delta` is negative; the counter is not modified.
    ///
    /// Each half saturates at `u64::MAX`; any excess is dropped.
    pub fn increment_by(&self, delta: i64) -> Result<()> {
        self.increments.add(checked_delta(delta)?);
        Ok(())
    }

    /// Decrement the counter by 1.
    pub fn decrement(&self) {
        self.decrements.add(1);
    }

    /// Decrement the counter by `delta`.
    ///
    /// # Errors
    ///
    /// [`CounterError::InvalidOperand`](crate::CounterError::InvalidOperand)
    /// if `delta` is negative; the counter is not modified.
    ///
    /// Each half saturates at `u64::MAX`; any excess is dropped.
    pub fn decrement_by(&self, delta: i64) -> Result<()> {
        self.decrements.add(checked_delta(delta)?);
        Ok(())
    }

    /// Current value (`increments - decrements`).
    #[must_use]
    pub fn value(&self) -> i64 {
        net(self.increments.value(), self.decrements.value())
    }

    /// Value read from a single consistent [`snapshot`](Self::snapshot).
    #[must_use]
    pub fn consistent_value(&self) -> i64 {
        let positive = self.increments.lock();
        let negative = self.decrements.lock();
        net(positive.value(), negative.value())
    }

    /// Copy of both halves, taken while holding both locks.
    #[must_use]
    pub fn snapshot(&self) -> PNCounterState {
        let positive = self.increments.lock();
        let negative = self.decrements.lock();
        PNCounterState {
            positive: positive.clone(),
            negative: negative.clone(),
        }
    }

    /// Merge another live replica into this one.
    ///
    /// Increments merge with increments and decrements with decrements. The
    /// source is snapshotted first, so no lock of `other` is held while this
    /// replica's locks are taken.
    pub fn merge(&self, other: &PNCounter) {
        let snapshot = other.snapshot();
        self.merge_state(&snapshot);
    }

    /// Merge exchanged state into this replica.
    pub fn merge_state(&self, other: &PNCounterState) {
        self.increments.merge_state(&other.positive);
        self.decrements.merge_state(&other.negative);
    }

    /// Entries this replica holds that `other` has not seen.
    #[must_use]
    pub fn delta_since(&self, other: &PNCounterState) -> PNCounterDelta {
        PNCounterDelta {
            positive: self.increments.delta_since(&other.positive),
            negative: self.decrements.delta_since(&other.negative),
        }
    }

    /// Apply a delta produced by another replica.
    pub fn apply_delta(&self, delta: &PNCounterDelta) {
        self.increments.apply_delta(&delta.positive);
        self.decrements.apply_delta(&delta.negative);
    }

    /// Start a new replica under `replica`, seeded with a consistent
    /// snapshot of this one.
    ///
    /// The new replica must have its own identifier: two live replicas
    /// writing the same column lose updates when merged.
    #[must_use]
    pub fn fork(&self, replica: impl Into<ReplicaId>) -> Self {
        Self::from_state(replica, self.snapshot())
    }

    /// Consume the replica, returning its state.
    #[must_use]
    pub fn into_state(self) -> PNCounterState {
        PNCounterState {
            positive: self.increments.into_state(),
            negative: self.decrements.into_state(),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::CounterError;

    #[test]
    fn new_counter_is_zero() {
        let c = PNCounter::new("a");
        assert_eq!(c.value(), 0);
    }

    #[test]
    fn increment_and_decrement() {
        let c = PNCounter::new("a");
        c.increment();
        c.increment();
        c.decrement();
        assert_eq!(c.value(), 1);
    }

    #[test]
    fn increment_by_then_decrement_by() {
        let c = PNCounter::new("a");
        c.increment_by(5).unwrap();
        c.decrement_by(2).unwrap();
        assert_eq!(c.value(), 3);
    }

    #[test]
    fn can_go_negative() {
        let c = PNCounter::new("a");
        c.decrement();
        c.decrement();
        assert_eq!(c.value(), -2);
    }

    #[test]
    fn negative_operands_are_rejected() {
        let c = PNCounter::new("a");
        c.increment_by(4).unwrap();
        let before = c.snapshot();

        assert_eq!(
            c.increment_by(-2),
            Err(CounterError::InvalidOperand { delta: -2 })
        );
        assert_eq!(
            c.decrement_by(-7),
            Err(CounterError::InvalidOperand { delta: -7 })
        );
        assert_eq!(c.value(), 4);
        assert_eq!(c.snapshot(), before);
    }

    #[test]
    fn halves_share_replica_id() {
        let c = PNCounter::new("a");
        c.increment_by(3).unwrap();
        c.decrement_by(1).unwrap();

        let state = c.snapshot();
        assert_eq!(state.positive().count_for("a"), 3);
        assert_eq!(state.negative().count_for("a"), 1);
    }

    #[test]
    fn merge_different_replicas() {
        let c1 = PNCounter::new("a");
        c1.increment();
        c1.increment();

        let c2 = PNCounter::new("b");
        c2.decrement();

        c1.merge(&c2);
        assert_eq!(c1.value(), 1);
    }

    #[test]
    fn merge_is_componentwise() {
        let p1 = PNCounter::new("node1");
        p1.increment_by(5).unwrap();
        p1.decrement_by(2).unwrap();

        let p2 = PNCounter::new("node2");
        p2.increment_by(3).unwrap();
        p2.decrement_by(1).unwrap();

        p1.merge(&p2);
        assert_eq!(p1.value(), 5);

        let state = p1.snapshot();
        assert_eq!(state.positive().value(), 8);
        assert_eq!(state.negative().value(), 3);
    }

    #[test]
    fn merge_is_commutative() {
        let c1 = PNCounter::new("a");
        c1.increment();

        let c2 = PNCounter::new("b");
        c2.decrement();
        c2.decrement();

        let left = c1.fork("left");
        left.merge(&c2);

        let right = c2.fork("right");
        right.merge(&c1);

        assert_eq!(left.snapshot(), right.snapshot());
        assert_eq!(left.value(), -1);
    }

    #[test]
    fn merge_is_idempotent() {
        let c1 = PNCounter::new("a");
        c1.increment();

        let c2 = PNCounter::new("b");
        c2.decrement();

        c1.merge(&c2);
        let after_first = c1.snapshot();
        c1.merge(&c2);

        assert_eq!(c1.snapshot(), after_first);
    }

    #[test]
    fn merge_with_self_is_noop() {
        let c = PNCounter::new("a");
        c.increment_by(3).unwrap();
        c.decrement();
        c.merge(&c);
        assert_eq!(c.value(), 2);
    }

    #[test]
    fn consistent_value_matches_value_when_quiet() {
        let c = PNCounter::new("a");
        c.increment_by(10).unwrap();
        c.decrement_by(4).unwrap();
        assert_eq!(c.consistent_value(), c.value());
        assert_eq!(c.snapshot().value(), 6);
    }

    #[test]
    fn value_clamps_to_i64() {
        let state = PNCounterState::from_parts(
            GCounterState::from_entries([("a", u64::MAX)]),
            GCounterState::new(),
        );
        assert_eq!(state.value(), i64::MAX);

        let state = PNCounterState::from_parts(
            GCounterState::new(),
            GCounterState::from_entries([("a", u64::MAX)]),
        );
        assert_eq!(state.value(), i64::MIN);
    }

    #[test]
    fn forked_replica_converges() {
        let a = PNCounter::new("a");
        a.increment_by(5).unwrap();

        let b = a.fork("b");
        a.decrement();
        b.decrement_by(2).unwrap();
        b.increment();

        a.merge(&b);
        b.merge(&a);
        assert_eq!(a.snapshot(), b.snapshot());
        assert_eq!(a.value(), 3);
    }

    #[test]
    fn saturated_halves_clamp_value() {
        let c = PNCounter::new("a");
        for _ in 0..3 {
            c.increment_by(i64::MAX).unwrap();
        }
        c.decrement_by(i64::MAX).unwrap();

        let state = c.snapshot();
        assert_eq!(state.positive().count_for("a"), u64::MAX);
        assert_eq!(state.negative().count_for("a"), i64::MAX as u64);
        assert_eq!(c.value(), i64::MAX);
    }

    #[test]
    fn delta_round_trip_through_live_replicas() {
        let a = PNCounter::new("a");
        a.increment_by(4).unwrap();
        a.decrement();

        let b = PNCounter::new("b");
        b.decrement_by(2).unwrap();

        let d = a.delta_since(&b.snapshot());
        assert!(!d.is_empty());
        assert_eq!(d.positive().len(), 1);
        b.apply_delta(&d);
        assert_eq!(b.value(), 1);

        assert!(a.delta_since(&a.snapshot()).is_empty());
    }

    #[test]
    fn from_state_restores_value() {
        let c = PNCounter::new("a");
        c.increment_by(9).unwrap();
        c.decrement_by(3).unwrap();

        let restored = PNCounter::from_state("a", c.snapshot());
        assert_eq!(restored.value(), 6);

        restored.increment();
        assert_eq!(restored.into_state().value(), 7);
    }

    #[test]
    fn counter_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<PNCounter>();
    }
}
