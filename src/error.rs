use std::time::SystemTimeError;

/// Errors returned by counter operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CounterError {
    /// A negative delta was passed to an increment or decrement.
    ///
    /// The counter is left untouched when this is returned.
    #[error("invalid operand: delta must be non-negative, got {delta}")]
    InvalidOperand {
        /// The rejected delta.
        delta: i64,
    },
}

/// Errors raised while producing a replica identifier.
///
/// A counter cannot be constructed without an identifier, so these are
/// usually fatal for the caller that requested a new replica.
#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    /// The operating system could not supply random bytes.
    #[error("failed to obtain random bytes: {0}")]
    Randomness(#[from] rand::Error),

    /// The system clock reads earlier than the Unix epoch.
    #[error("system clock is before the unix epoch: {0}")]
    Clock(#[from] SystemTimeError),

    /// A custom identity source failed.
    #[error("identity source failed: {0}")]
    Source(String),
}

/// Result alias for counter operations.
pub type Result<T, E = CounterError> = std::result::Result<T, E>;
