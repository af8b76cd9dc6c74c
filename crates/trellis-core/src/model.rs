//! Domain entities: pools, rules, memberships, claims, audit entries
//!
//! Entities are plain serde structs; every mutation that matters goes
//! through the engine so the store stays a dumb keeper of records. Pools
//! and memberships are never physically deleted: cancellation flips flags
//! and stamps a reason, keeping the audit trail intact.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::effects::EscrowRef;
use crate::types::{ClaimId, CollectionId, MembershipId, PoolId, RuleId, WalletId};
use crate::units::to_base;

/// How a pool's memberships come to exist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolMode {
    /// Allocations entered directly by an operator; rules never evaluated
    Manual,
    /// Allocations computed once from holder data, then locked
    Snapshot,
    /// Allocations grow over time as new holders qualify
    Dynamic,
}

/// Lifecycle status of a pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolStatus {
    /// Accepting allocations and claims
    Active,
    /// Temporarily suspended; allocations remain
    Paused,
    /// Terminal; memberships revoked
    Cancelled,
}

/// Allocation semantics of an eligibility rule
///
/// Wire form keeps the upstream `PERCENTAGE`/`FIXED` tags. Modelled as a
/// sum type so the calculator dispatches exhaustively; there is no default
/// branch for a typo'd tag to fall through to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum AllocationKind {
    /// Share of the pool size granted to EACH qualifying wallet, percent.
    /// Per-wallet, not split across the cohort: two qualifying wallets
    /// under a 50% rule receive 50% of the pool each.
    #[serde(rename = "PERCENTAGE")]
    Percentage(f64),
    /// Flat token amount per qualifying wallet, human units
    #[serde(rename = "FIXED")]
    Fixed(f64),
}

/// One eligibility criterion inside a pool
///
/// Rules are independent of each other; insertion order is kept for
/// display but does not affect evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EligibilityRule {
    /// Rule identifier
    pub id: RuleId,
    /// NFT collection whose holders qualify
    pub collection: CollectionId,
    /// Minimum held count to qualify
    pub min_held: u64,
    /// Allocation granted to each qualifying wallet
    pub allocation: AllocationKind,
    /// Disabled rules are skipped entirely by the calculator
    pub enabled: bool,
}

impl EligibilityRule {
    /// Create an enabled rule
    pub fn new(collection: CollectionId, min_held: u64, allocation: AllocationKind) -> Self {
        Self {
            id: RuleId::new(),
            collection,
            min_held,
            allocation,
            enabled: true,
        }
    }
}

/// Cancellation stamp kept on logically deleted records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelInfo {
    /// When the record was cancelled
    pub at: DateTime<Utc>,
    /// Operator-supplied reason
    pub reason: String,
}

/// A vesting campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// Pool identifier
    pub id: PoolId,
    /// Operator-facing name, also used as the escrow contract name
    pub name: String,
    /// Total pool size in human units
    pub total_size: f64,
    /// Vesting window start
    pub start_time: DateTime<Utc>,
    /// Vesting window end
    pub end_time: DateTime<Utc>,
    /// Cliff duration in seconds from `start_time`
    pub cliff_seconds: u64,
    /// Membership provenance mode
    pub mode: PoolMode,
    /// Lifecycle status
    pub status: PoolStatus,
    /// Set exactly once when a snapshot pool commits
    pub snapshot_taken: bool,
    /// Eligibility rules, insertion-ordered
    pub rules: Vec<EligibilityRule>,
    /// Escrow deployment reference, absent until deployed
    pub escrow: Option<EscrowRef>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Cancellation stamp, present iff status is Cancelled
    pub cancelled: Option<CancelInfo>,
}

impl Pool {
    /// Whether the pool is in the Active state
    pub fn is_active(&self) -> bool {
        self.status == PoolStatus::Active
    }
}

/// One wallet's allocation within one pool
///
/// At most one active membership exists per (pool, wallet); the store
/// enforces this atomically on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Membership {
    /// Membership identifier
    pub id: MembershipId,
    /// Owning pool
    pub pool_id: PoolId,
    /// Recipient wallet
    pub wallet: WalletId,
    /// Allocated token amount, human units
    pub amount: f64,
    /// Share of the pool, percent (reporting only)
    pub share_pct: f64,
    /// Ordinal of the first contributing rule (reporting only)
    pub tier: u8,
    /// NFT count backing the allocation
    pub nft_count: u64,
    /// Every rule that qualified this wallet
    pub sources: Vec<RuleId>,
    /// Cleared on cancellation; an inactive membership takes no claims
    pub is_active: bool,
    /// Set on cancellation, together with `cancelled`
    pub is_cancelled: bool,
    /// Set by snapshot commit; a locked membership blocks pool cancellation
    pub snapshot_locked: bool,
    /// Sum of settled claims, base units
    pub claimed_base: u64,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Cancellation stamp
    pub cancelled: Option<CancelInfo>,
}

impl Membership {
    /// Full allocation in base units
    pub fn allocated_base(&self, decimals: u32) -> u64 {
        to_base(self.amount, decimals)
    }

    /// Unclaimed remainder in base units
    pub fn remaining_base(&self, decimals: u32) -> u64 {
        self.allocated_base(decimals).saturating_sub(self.claimed_base)
    }

    /// Logically delete: clears the active flag and stamps the reason.
    /// The record itself is never removed.
    pub fn revoke(&mut self, at: DateTime<Utc>, reason: impl Into<String>) {
        self.is_active = false;
        self.is_cancelled = true;
        self.cancelled = Some(CancelInfo {
            at,
            reason: reason.into(),
        });
    }
}

/// Immutable claim ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claim {
    /// Claim identifier
    pub id: ClaimId,
    /// Membership the claim settles against
    pub membership_id: MembershipId,
    /// Claiming wallet
    pub wallet: WalletId,
    /// Claimed amount, base units
    pub amount_base: u64,
    /// Ledger transaction reference
    pub tx_ref: String,
    /// Settlement time
    pub at: DateTime<Utc>,
}

/// Admin action log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Acting identity ("system" for engine-internal effects)
    pub actor: String,
    /// Short machine-readable action name
    pub action: String,
    /// Human-readable detail
    pub detail: String,
    /// When the action happened
    pub at: DateTime<Utc>,
}

impl AuditEntry {
    /// Create an entry stamped now
    pub fn record(
        actor: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            actor: actor.into(),
            action: action.into(),
            detail: detail.into(),
            at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocation_kind_keeps_upstream_tags() {
        let json = serde_json::to_string(&AllocationKind::Percentage(50.0)).unwrap();
        assert_eq!(json, r#"{"type":"PERCENTAGE","value":50.0}"#);

        let fixed: AllocationKind = serde_json::from_str(r#"{"type":"FIXED","value":1000.0}"#).unwrap();
        assert_eq!(fixed, AllocationKind::Fixed(1000.0));
    }

    #[test]
    fn revoke_is_logical_not_physical() {
        let mut m = Membership {
            id: MembershipId::new(),
            pool_id: PoolId::new(),
            wallet: WalletId::new("w1"),
            amount: 10.0,
            share_pct: 1.0,
            tier: 0,
            nft_count: 3,
            sources: vec![],
            is_active: true,
            is_cancelled: false,
            snapshot_locked: false,
            claimed_base: 0,
            created_at: Utc::now(),
            cancelled: None,
        };
        m.revoke(Utc::now(), "pool cancelled");
        assert!(!m.is_active);
        assert!(m.is_cancelled);
        assert_eq!(m.cancelled.as_ref().unwrap().reason, "pool cancelled");
        // amount survives for the audit trail
        assert_eq!(m.amount, 10.0);
    }

    #[test]
    fn remaining_base_saturates() {
        let m = Membership {
            id: MembershipId::new(),
            pool_id: PoolId::new(),
            wallet: WalletId::new("w1"),
            amount: 1.0,
            share_pct: 0.0,
            tier: 0,
            nft_count: 1,
            sources: vec![],
            is_active: true,
            is_cancelled: false,
            snapshot_locked: false,
            claimed_base: 2_000_000_000,
            created_at: Utc::now(),
            cancelled: None,
        };
        assert_eq!(m.remaining_base(crate::units::TOKEN_DECIMALS), 0);
    }
}
