//! Relay handshake client for Muster.
//!
//! When a host starts the game, every participant must converge on the same
//! game transport session. The relay service brokers that: the host
//! **allocates** a short join code, publishes it through the session record,
//! and each member **redeems** the code to connect to the same relay
//! allocation.
//!
//! This crate defines:
//!
//! 1. **The client trait** ([`RelayClient`]): allocate and redeem, nothing
//!    more. Production deployments implement it against their relay
//!    provider's API.
//! 2. **A local reference relay** ([`LocalRelay`]): an in-process
//!    implementation used by tests and demos. It tracks redemptions per
//!    code so tests can assert exactly-once handoffs.
//! 3. **Errors** ([`RelayError`]): what can go wrong on either call.
//!
//! Transport-level replication is out of scope end to end; a redeemed code
//! is the end of this crate's responsibility.

mod client;
mod error;
mod local;

pub use client::{RelayClient, RelayCode};
pub use error::RelayError;
pub use local::LocalRelay;
