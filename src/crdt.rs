/// Core trait for state-based CRDTs.
///
/// A CRDT (Conflict-free Replicated Data Type) guarantees that concurrent
/// updates on different replicas will converge to the same state after merging,
/// without requiring coordination.
///
/// # Properties
///
/// All implementations must satisfy:
/// - **Commutativity:** `a.merge(b) == b.merge(a)`
/// - **Associativity:** `a.merge(b.merge(c)) == a.merge(b).merge(c)`
/// - **Idempotency:** `a.merge(a) == a`
pub trait Crdt {
    /// Merge another replica's state into this one.
    ///
    /// After merging, `self` contains the least upper bound of both states.
    fn merge(&mut self, other: &Self);
}

/// Extension trait for delta-state CRDTs.
///
/// Instead of shipping a full state, a replica can ship only the part of its
/// state that a peer has not yet seen.
///
/// # Example
///
/// ```
/// use crdt_counter::prelude::*;
///
/// let mut a = GCounterState::new();
/// a.merge(&GCounterState::from_entries([("a", 2)]));
///
/// let mut b = GCounterState::from_entries([("b", 1)]);
///
/// let delta = a.delta(&b);
/// b.apply_delta(&delta);
/// assert_eq!(b.value(), 3);
/// ```
pub trait DeltaCrdt: Crdt {
    /// The type of delta produced by this CRDT.
    type Delta;

    /// Generate a delta containing changes in `self` that `other` does not have.
    fn delta(&self, other: &Self) -> Self::Delta;

    /// Apply a delta to this replica's state.
    ///
    /// Equivalent to merging the state that produced the delta.
    fn apply_delta(&mut self, delta: &Self::Delta);
}
