//! Collaborator effect traits (pure interfaces, no implementations)
//!
//! The engine never talks to an indexer, an escrow contract, or the ledger
//! directly; it is handed implementations of these traits at construction.
//! Production adapters live with the embedding service, deterministic mocks
//! in `trellis-testkit`. Callers bound every invocation with the configured
//! collaborator timeout.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::types::{CollectionId, WalletId};

/// One wallet's holdings in a collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderBalance {
    /// Holding wallet
    pub wallet: WalletId,
    /// Number of NFTs held
    pub held_count: u64,
}

/// Aggregate statistics for a collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionStats {
    /// Total minted supply
    pub total_supply: u64,
    /// Distinct holding wallets
    pub unique_holders: u64,
}

/// Reference to a deployed escrow contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowRef {
    /// Escrow contract identifier
    pub escrow_id: String,
    /// Deployment transaction reference
    pub tx_ref: String,
}

/// On-chain state of an escrow contract
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowStatus {
    /// Tokens deposited, base units
    pub deposited_base: u64,
    /// Tokens already withdrawn, base units
    pub withdrawn_base: u64,
}

/// NFT holder enumeration service
#[async_trait]
pub trait HolderIndex: Send + Sync {
    /// Enumerate every holder of `collection` with their held counts
    async fn get_holders(&self, collection: &CollectionId) -> Result<Vec<HolderBalance>>;

    /// Aggregate stats for `collection`
    async fn get_collection_stats(&self, collection: &CollectionId) -> Result<CollectionStats>;
}

/// On-chain vesting escrow provider
#[async_trait]
pub trait EscrowProvider: Send + Sync {
    /// Deploy an escrow holding `total` human units over the given window
    async fn deploy(
        &self,
        total: f64,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        name: &str,
    ) -> Result<EscrowRef>;

    /// Request cancellation of a deployed escrow
    async fn cancel(&self, escrow_id: &str) -> Result<()>;

    /// Current deposited/withdrawn amounts of an escrow
    async fn get_status(&self, escrow_id: &str) -> Result<EscrowStatus>;
}

/// Token balance lookup on the ledger
#[async_trait]
pub trait LedgerBalance: Send + Sync {
    /// Base-unit balance of `owner`'s account for `mint`; an absent
    /// account reads as 0, not an error
    async fn get_token_balance(&self, owner: &WalletId, mint: &str) -> Result<u64>;
}
