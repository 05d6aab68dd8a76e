//! An in-process relay for tests and demos.

use std::collections::HashMap;
use std::sync::Arc;

use rand::Rng;
use tokio::sync::Mutex;

use crate::{RelayClient, RelayCode, RelayError};

/// Join codes are drawn from an alphabet without 0/O/1/I so they survive
/// being read out loud.
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const CODE_LEN: usize = 6;

fn generate_code() -> RelayCode {
    let mut rng = rand::rng();
    let code: String = (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect();
    RelayCode(code)
}

/// A [`RelayClient`] that brokers allocations entirely in process.
///
/// Cloning is cheap and every clone shares the same allocation table, so a
/// test can hand one `LocalRelay` to several coordinators and they will see
/// each other's codes.
#[derive(Debug, Clone, Default)]
pub struct LocalRelay {
    inner: Arc<Mutex<RelayTable>>,
}

#[derive(Debug, Default)]
struct RelayTable {
    /// Allocated codes and how many times each has been redeemed.
    redemptions: HashMap<RelayCode, u64>,
}

impl LocalRelay {
    pub fn new() -> Self {
        Self::default()
    }

    /// How many times `code` has been redeemed. Zero for codes never
    /// allocated.
    pub async fn redemptions(&self, code: &RelayCode) -> u64 {
        self.inner
            .lock()
            .await
            .redemptions
            .get(code)
            .copied()
            .unwrap_or(0)
    }

    /// Number of allocations made so far.
    pub async fn allocated(&self) -> usize {
        self.inner.lock().await.redemptions.len()
    }
}

impl RelayClient for LocalRelay {
    async fn allocate(&self) -> Result<RelayCode, RelayError> {
        let mut table = self.inner.lock().await;
        // Regenerate on the (unlikely) collision with a live code.
        let mut code = generate_code();
        while table.redemptions.contains_key(&code) {
            code = generate_code();
        }
        table.redemptions.insert(code.clone(), 0);
        tracing::info!(%code, "relay allocation created");
        Ok(code)
    }

    async fn redeem(&self, code: &RelayCode) -> Result<(), RelayError> {
        let mut table = self.inner.lock().await;
        match table.redemptions.get_mut(code) {
            Some(count) => {
                *count += 1;
                tracing::debug!(%code, redemptions = *count, "relay code redeemed");
                Ok(())
            }
            None => Err(RelayError::UnknownCode(code.clone())),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allocate_returns_six_char_code() {
        let relay = LocalRelay::new();
        let code = relay.allocate().await.unwrap();
        assert_eq!(code.as_str().len(), CODE_LEN);
        assert!(code
            .as_str()
            .bytes()
            .all(|b| CODE_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn test_redeem_allocated_code_succeeds_and_counts() {
        let relay = LocalRelay::new();
        let code = relay.allocate().await.unwrap();
        assert_eq!(relay.redemptions(&code).await, 0);

        relay.redeem(&code).await.unwrap();
        relay.redeem(&code).await.unwrap();
        assert_eq!(relay.redemptions(&code).await, 2);
    }

    #[tokio::test]
    async fn test_redeem_unknown_code_fails() {
        let relay = LocalRelay::new();
        let bogus = RelayCode::new("NOPE99");
        let err = relay.redeem(&bogus).await.unwrap_err();
        assert!(matches!(err, RelayError::UnknownCode(c) if c == bogus));
    }

    #[tokio::test]
    async fn test_clones_share_the_allocation_table() {
        let relay = LocalRelay::new();
        let code = relay.allocate().await.unwrap();

        let other = relay.clone();
        other.redeem(&code).await.unwrap();
        assert_eq!(relay.redemptions(&code).await, 1);
        assert_eq!(relay.allocated().await, 1);
    }
}
