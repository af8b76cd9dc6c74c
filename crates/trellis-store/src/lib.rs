//! Trellis Store
//!
//! Persistence abstraction for the vesting engine. [`VestingStore`] is the
//! only surface the engine writes through; backends keep the contracts
//! below or the engine's invariants do not hold:
//!
//! - `insert_membership` is an ATOMIC check-and-insert: at most one active
//!   membership may exist per (pool, wallet), and the existence check and
//!   the insert must not be separable by a concurrent writer. A relational
//!   backend does this with a partial uniqueness constraint; the in-memory
//!   backend holds its write lock across both steps.
//! - Claims and audit entries are append-only.
//! - Nothing is ever physically deleted; cancellation mutates flags.

#![forbid(unsafe_code)]

use async_trait::async_trait;

use trellis_core::model::{AuditEntry, Claim, Membership, Pool};
use trellis_core::types::{MembershipId, PoolId, WalletId};
use trellis_core::Result;

pub mod memory;

pub use memory::MemoryStore;

/// Outcome of the atomic membership insert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipInsert {
    /// The membership was created
    Inserted,
    /// The wallet already holds an active membership in the pool;
    /// nothing was written
    AlreadyActive,
}

/// Storage surface for pools, memberships, claims, and the admin action log
#[async_trait]
pub trait VestingStore: Send + Sync {
    /// Persist a new pool
    async fn create_pool(&self, pool: Pool) -> Result<()>;

    /// Fetch a pool by id
    async fn get_pool(&self, id: PoolId) -> Result<Option<Pool>>;

    /// Replace a pool record; `NotFound` if it does not exist
    async fn update_pool(&self, pool: Pool) -> Result<()>;

    /// All pools, oldest first
    async fn list_pools(&self) -> Result<Vec<Pool>>;

    /// Atomic check-and-insert of a membership (see crate docs)
    async fn insert_membership(&self, membership: Membership) -> Result<MembershipInsert>;

    /// Fetch a membership by id
    async fn get_membership(&self, id: MembershipId) -> Result<Option<Membership>>;

    /// Replace a membership record; `NotFound` if it does not exist
    async fn update_membership(&self, membership: Membership) -> Result<()>;

    /// Every membership of a pool, active or not
    async fn memberships_for_pool(&self, pool_id: PoolId) -> Result<Vec<Membership>>;

    /// The active membership of `wallet` in `pool_id`, if any
    async fn active_membership(
        &self,
        pool_id: PoolId,
        wallet: &WalletId,
    ) -> Result<Option<Membership>>;

    /// Append an immutable claim record
    async fn append_claim(&self, claim: Claim) -> Result<()>;

    /// Claims settled against one membership
    async fn claims_for_membership(&self, id: MembershipId) -> Result<Vec<Claim>>;

    /// Every claim record
    async fn list_claims(&self) -> Result<Vec<Claim>>;

    /// Append an admin action log entry
    async fn append_audit(&self, entry: AuditEntry) -> Result<()>;

    /// The admin action log, oldest first
    async fn list_audit(&self) -> Result<Vec<AuditEntry>>;
}
