//! Trellis Testkit
//!
//! Deterministic mock collaborators, fixtures, and signing helpers shared
//! by the workspace's unit and integration tests. Everything here is
//! scriptable and in-memory; nothing talks to a network.

#![forbid(unsafe_code)]
// test support code is allowed to be blunt about failure
#![allow(clippy::unwrap_used, clippy::expect_used)]

pub mod factories;
pub mod keys;
pub mod mocks;

pub use factories::{test_config, test_pool, TEST_MINT, TEST_TREASURY};
pub use keys::{admin_signing_key, signed_admin_envelope, TEST_ADMIN_SEED};
pub use mocks::{FaultyStore, MockEscrowProvider, MockHolderIndex, MockLedgerBalance};

/// Install a fmt tracing subscriber for a test binary; repeated calls are
/// harmless
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_test_writer()
        .try_init();
}
