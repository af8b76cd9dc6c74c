//! Entity and config factories

use chrono::{Duration, Utc};

use trellis_core::model::{Pool, PoolMode, PoolStatus};
use trellis_core::types::PoolId;
use trellis_core::units::TOKEN_DECIMALS;
use trellis_core::{EngineConfig, MergePolicy};

use crate::keys::admin_signing_key;

/// Test mint address used by [`test_config`]
pub const TEST_MINT: &str = "Mint1111111111111111111111111111";

/// Test treasury owner used by [`test_config`]
pub const TEST_TREASURY: &str = "Treasury111111111111111111111111";

/// Config wired to the testkit admin key, with short collaborator
/// timeouts so timeout paths stay testable
pub fn test_config() -> EngineConfig {
    EngineConfig {
        admin_wallet: hex::encode(admin_signing_key().verifying_key().to_bytes()),
        token_mint: TEST_MINT.to_string(),
        treasury_wallet: TEST_TREASURY.to_string(),
        command_freshness_secs: 300,
        collaborator_timeout_ms: 2_000,
        token_decimals: TOKEN_DECIMALS,
        merge_policy: MergePolicy::HighestWins,
    }
}

/// An active pool with a 30-day window, no cliff, and no rules
pub fn test_pool(mode: PoolMode, total_size: f64) -> Pool {
    let now = Utc::now();
    Pool {
        id: PoolId::new(),
        name: "test pool".into(),
        total_size,
        start_time: now,
        end_time: now + Duration::days(30),
        cliff_seconds: 0,
        mode,
        status: PoolStatus::Active,
        snapshot_taken: false,
        rules: vec![],
        escrow: None,
        created_at: now,
        cancelled: None,
    }
}
