//! Commit pipeline
//!
//! Persists a batch of computed allocations as membership records. Every
//! insert is attempted independently: one wallet's failure is captured in
//! the report and never aborts the rest. A wallet that already holds an
//! active membership in the pool is a no-op success, which is what makes
//! retrying a commit safe.
//!
//! The duplicate check is NOT performed here; the store's
//! `insert_membership` is an atomic check-and-insert, so concurrent
//! commits to the same pool cannot double-allocate.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;

use trellis_core::model::{Membership, Pool};
use trellis_core::types::{MembershipId, WalletId};
use trellis_store::{MembershipInsert, VestingStore};

use crate::allocation::ComputedAllocation;

/// One wallet that could not be committed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletFailure {
    /// The wallet that failed
    pub wallet: WalletId,
    /// Why the insert was not performed
    pub reason: String,
}

/// Itemized outcome of a commit run
///
/// Partial failure is data, not an error: the pipeline always returns a
/// report, and callers decide what a non-empty `failed` list means.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommitReport {
    /// Wallets whose membership was created by this run
    pub succeeded: Vec<WalletId>,
    /// Wallets that already held an active membership (idempotent no-op)
    pub unchanged: Vec<WalletId>,
    /// Wallets whose insert failed, with reasons
    pub failed: Vec<WalletFailure>,
}

impl CommitReport {
    /// True when no record failed
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Persists computed allocations with per-record failure isolation
#[derive(Clone)]
pub struct CommitPipeline {
    store: Arc<dyn VestingStore>,
}

impl CommitPipeline {
    /// Create a pipeline writing through the given store
    pub fn new(store: Arc<dyn VestingStore>) -> Self {
        Self { store }
    }

    /// Commit `allocations` into `pool`'s membership.
    ///
    /// `locked` marks the created records `snapshot_locked`, which is how
    /// snapshot commits make their recipients' commitments permanent.
    pub async fn commit(
        &self,
        pool: &Pool,
        allocations: &BTreeMap<WalletId, ComputedAllocation>,
        locked: bool,
    ) -> CommitReport {
        let mut report = CommitReport::default();

        for (wallet, alloc) in allocations {
            if wallet.as_str().is_empty() {
                report.failed.push(WalletFailure {
                    wallet: wallet.clone(),
                    reason: "empty wallet identity".into(),
                });
                continue;
            }
            if !(alloc.amount.is_finite() && alloc.amount > 0.0) {
                report.failed.push(WalletFailure {
                    wallet: wallet.clone(),
                    reason: format!("allocation amount {} must be positive", alloc.amount),
                });
                continue;
            }

            let membership = Membership {
                id: MembershipId::new(),
                pool_id: pool.id,
                wallet: wallet.clone(),
                amount: alloc.amount,
                share_pct: alloc.share_pct,
                tier: alloc.tier,
                nft_count: alloc.nft_count,
                sources: alloc.sources.clone(),
                is_active: true,
                is_cancelled: false,
                snapshot_locked: locked,
                claimed_base: 0,
                created_at: Utc::now(),
                cancelled: None,
            };

            match self.store.insert_membership(membership).await {
                Ok(MembershipInsert::Inserted) => report.succeeded.push(wallet.clone()),
                Ok(MembershipInsert::AlreadyActive) => report.unchanged.push(wallet.clone()),
                Err(err) => {
                    tracing::warn!(pool = %pool.id, %wallet, error = %err, "membership insert failed");
                    report.failed.push(WalletFailure {
                        wallet: wallet.clone(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            pool = %pool.id,
            succeeded = report.succeeded.len(),
            unchanged = report.unchanged.len(),
            failed = report.failed.len(),
            "commit run finished"
        );
        report
    }
}
