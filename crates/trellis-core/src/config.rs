//! Engine configuration
//!
//! Loaded from TOML once at startup, validated, then injected into the
//! engine components. There is no global config handle; whoever constructs
//! the engine owns the config and the store and passes both down.

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, TrellisError};
use crate::units::TOKEN_DECIMALS;

/// How a wallet qualifying under multiple rules is merged into one
/// membership entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergePolicy {
    /// The richest single rule wins; others are recorded as sources only
    HighestWins,
    /// Amounts from every satisfied rule are summed
    Sum,
}

/// What a failed holder enumeration does to the surrounding computation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleFailurePolicy {
    /// Fail the whole pool computation
    Abort,
    /// Drop the rule's contribution and report it as skipped
    SkipRule,
}

fn default_freshness_secs() -> i64 {
    300
}

fn default_collaborator_timeout_ms() -> u64 {
    10_000
}

fn default_token_decimals() -> u32 {
    TOKEN_DECIMALS
}

fn default_merge_policy() -> MergePolicy {
    MergePolicy::HighestWins
}

/// Engine-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Hex-encoded ed25519 verifying key of the administrator wallet
    pub admin_wallet: String,
    /// Mint address of the vested token
    pub token_mint: String,
    /// Treasury account owner queried for solvency
    pub treasury_wallet: String,
    /// Admin command freshness window, seconds
    #[serde(default = "default_freshness_secs")]
    pub command_freshness_secs: i64,
    /// Upper bound on any single collaborator call, milliseconds
    #[serde(default = "default_collaborator_timeout_ms")]
    pub collaborator_timeout_ms: u64,
    /// Token decimals of the deployment
    #[serde(default = "default_token_decimals")]
    pub token_decimals: u32,
    /// Multi-rule merge policy for the allocation calculator
    #[serde(default = "default_merge_policy")]
    pub merge_policy: MergePolicy,
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)
            .map_err(|e| TrellisError::validation(format!("config parse: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        self.admin_key()?;
        if self.token_mint.is_empty() {
            return Err(TrellisError::validation("token_mint must not be empty"));
        }
        if self.treasury_wallet.is_empty() {
            return Err(TrellisError::validation("treasury_wallet must not be empty"));
        }
        if self.command_freshness_secs <= 0 {
            return Err(TrellisError::validation(
                "command_freshness_secs must be positive",
            ));
        }
        if self.collaborator_timeout_ms == 0 {
            return Err(TrellisError::validation(
                "collaborator_timeout_ms must be positive",
            ));
        }
        if self.token_decimals > 18 {
            return Err(TrellisError::validation("token_decimals out of range"));
        }
        Ok(())
    }

    /// Decode the configured admin identity into a verifying key
    pub fn admin_key(&self) -> Result<VerifyingKey> {
        let bytes = hex::decode(&self.admin_wallet)
            .map_err(|e| TrellisError::validation(format!("admin_wallet hex: {e}")))?;
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| TrellisError::validation("admin_wallet must be 32 hex-encoded bytes"))?;
        VerifyingKey::from_bytes(&arr)
            .map_err(|e| TrellisError::validation(format!("admin_wallet key: {e}")))
    }

    /// Collaborator timeout as a std duration
    pub fn collaborator_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.collaborator_timeout_ms)
    }
}
