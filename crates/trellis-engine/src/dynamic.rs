//! Dynamic reconciler
//!
//! Re-evaluates live dynamic pools against their current rule and holder
//! sets and commits only the additions. Wallets that no longer qualify
//! keep what they were granted: allocations are sticky, and membership
//! shrinks only through an explicit admin removal. Re-running against an
//! unchanged world is a no-op by construction (the commit pipeline is
//! idempotent).

use std::sync::Arc;

use trellis_core::model::{AuditEntry, PoolMode, PoolStatus};
use trellis_core::types::{PoolId, WalletId};
use trellis_core::{Result, RuleFailurePolicy, TrellisError};
use trellis_store::VestingStore;

use crate::allocation::{AllocationCalculator, SkippedRule};
use crate::commit::{CommitPipeline, WalletFailure};

/// Itemized outcome of one pool sync
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    /// The synced pool
    pub pool_id: PoolId,
    /// Wallets that gained a membership this run
    pub added: Vec<WalletId>,
    /// Wallets that already held one (the common case)
    pub unchanged: Vec<WalletId>,
    /// Wallets whose insert failed
    pub failed: Vec<WalletFailure>,
    /// Rules dropped because their holder enumeration failed
    pub skipped_rules: Vec<SkippedRule>,
}

/// Incremental membership growth for dynamic pools
#[derive(Clone)]
pub struct DynamicReconciler {
    store: Arc<dyn VestingStore>,
    calculator: AllocationCalculator,
    pipeline: CommitPipeline,
}

impl DynamicReconciler {
    /// Wire the reconciler over its store and calculator
    pub fn new(store: Arc<dyn VestingStore>, calculator: AllocationCalculator) -> Self {
        Self {
            pipeline: CommitPipeline::new(store.clone()),
            store,
            calculator,
        }
    }

    /// Sync one dynamic pool.
    ///
    /// A flaky collection must not stall growth of the others, so holder
    /// enumeration failures skip the rule (and are reported) instead of
    /// aborting the run.
    pub async fn sync_pool(&self, pool_id: PoolId) -> Result<SyncReport> {
        let pool = self
            .store
            .get_pool(pool_id)
            .await?
            .ok_or_else(|| TrellisError::not_found(format!("pool {pool_id}")))?;
        if pool.mode != PoolMode::Dynamic {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}, only dynamic pools sync",
                pool.mode
            )));
        }
        if pool.status != PoolStatus::Active {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}, only active pools sync",
                pool.status
            )));
        }

        let set = self
            .calculator
            .compute(&pool, RuleFailurePolicy::SkipRule)
            .await?;
        let report = self.pipeline.commit(&pool, &set.allocations, false).await;

        self.store
            .append_audit(AuditEntry::record(
                "system",
                "pool_synced",
                format!(
                    "pool {pool_id}: {} added, {} unchanged, {} failed, {} rules skipped",
                    report.succeeded.len(),
                    report.unchanged.len(),
                    report.failed.len(),
                    set.skipped_rules.len()
                ),
            ))
            .await?;

        Ok(SyncReport {
            pool_id,
            added: report.succeeded,
            unchanged: report.unchanged,
            failed: report.failed,
            skipped_rules: set.skipped_rules,
        })
    }

    /// Sync every active dynamic pool, in creation order
    pub async fn sync_all(&self) -> Result<Vec<SyncReport>> {
        let mut reports = Vec::new();
        for pool in self.store.list_pools().await? {
            if pool.mode == PoolMode::Dynamic && pool.is_active() {
                reports.push(self.sync_pool(pool.id).await?);
            }
        }
        Ok(reports)
    }
}
