//! Error types for the relay layer.

use crate::RelayCode;

/// Errors a relay client call can produce.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The relay service could not allocate a new session: out of
    /// capacity, quota exhausted, or an upstream fault.
    #[error("relay allocation failed: {0}")]
    AllocationFailed(String),

    /// The code does not name a live allocation. Stale codes from an
    /// expired allocation land here too.
    #[error("no relay allocation for code {0}")]
    UnknownCode(RelayCode),

    /// The relay service could not be reached.
    #[error("relay unavailable: {0}")]
    Unavailable(String),
}
