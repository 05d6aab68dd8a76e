//! The relay client trait and its join-code type.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::RelayError;

/// A short code that resolves to one relay allocation.
///
/// Travels inside the session record's start marker, so it is always
/// representable as a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelayCode(pub String);

impl RelayCode {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RelayCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Brokers the handoff from lobby to game transport.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static`: a relay client is shared across async tasks
///   for the life of the coordinator.
/// - The returned futures are `Send` because the coordinator's callers may
///   drive it from a spawned task.
pub trait RelayClient: Send + Sync + 'static {
    /// Allocates a new relay session and returns its join code.
    ///
    /// Called by the host when it starts the game. The code is then written
    /// into the session record for members to discover.
    fn allocate(
        &self,
    ) -> impl std::future::Future<Output = Result<RelayCode, RelayError>> + Send;

    /// Redeems a join code, connecting this process to the allocation the
    /// code belongs to.
    ///
    /// Called by each non-host member once it observes the start marker.
    fn redeem(
        &self,
        code: &RelayCode,
    ) -> impl std::future::Future<Output = Result<(), RelayError>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_code_serializes_transparently() {
        let code = RelayCode::new("HNMT83");
        assert_eq!(serde_json::to_string(&code).unwrap(), r#""HNMT83""#);
    }

    #[test]
    fn test_relay_code_deserializes_from_bare_string() {
        let code: RelayCode = serde_json::from_str(r#""HNMT83""#).unwrap();
        assert_eq!(code, RelayCode::new("HNMT83"));
    }
}
