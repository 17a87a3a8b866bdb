//! Convenient re-exports for common usage.
//!
//! ```
//! use crdt_counter::prelude::*;
//! ```

pub use crate::CounterError;
pub use crate::Crdt;
pub use crate::DeltaCrdt;
pub use crate::GCounter;
pub use crate::GCounterState;
pub use crate::PNCounter;
pub use crate::PNCounterState;
pub use crate::ReplicaId;
pub use crate::ReplicaIdSource;
