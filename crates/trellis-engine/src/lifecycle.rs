//! Pool lifecycle state machine
//!
//! Owns every pool status transition and its side effects on membership
//! records, plus the operations that mutate a pool's shape: rule edits,
//! snapshot preview/commit, manual allocation, explicit membership
//! removal, and escrow deployment.
//!
//! Guards enforced here:
//! - cancel is terminal; a snapshot pool with any locked membership
//!   cannot be cancelled at all
//! - rules mutate only while the pool is dynamic
//! - a snapshot commits at most once
//! - manual pools take operator entries, never calculator output
//!
//! Escrow cancellation during pool cancellation is fire-and-log: local
//! state is the source of truth for claim eligibility, so a failing or
//! timed-out escrow call never blocks the transition.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use trellis_core::effects::EscrowProvider;
use trellis_core::model::{
    AuditEntry, CancelInfo, EligibilityRule, Membership, Pool, PoolMode, PoolStatus,
};
use trellis_core::types::{MembershipId, PoolId, RuleId, WalletId};
use trellis_core::{
    AllocationKind, BestEffort, EngineConfig, Result, RuleFailurePolicy, TrellisError,
};
use trellis_store::{MembershipInsert, VestingStore};

use crate::allocation::{AllocationCalculator, AllocationSet};
use crate::bounded;
use crate::commit::{CommitPipeline, CommitReport};

/// Operator input for pool creation
#[derive(Debug, Clone, PartialEq)]
pub struct NewPool {
    /// Operator-facing name
    pub name: String,
    /// Total pool size, human units
    pub total_size: f64,
    /// Vesting window start
    pub start_time: DateTime<Utc>,
    /// Vesting window end
    pub end_time: DateTime<Utc>,
    /// Cliff duration in seconds from start
    pub cliff_seconds: u64,
    /// Membership provenance mode
    pub mode: PoolMode,
    /// Initial rules (allowed in any mode at creation)
    pub rules: Vec<EligibilityRule>,
}

/// Pool status transitions and structural mutations
#[derive(Clone)]
pub struct PoolLifecycle {
    store: Arc<dyn VestingStore>,
    escrow: Arc<dyn EscrowProvider>,
    calculator: AllocationCalculator,
    pipeline: CommitPipeline,
    timeout: Duration,
}

impl PoolLifecycle {
    /// Wire the lifecycle over its store and collaborators
    pub fn new(
        store: Arc<dyn VestingStore>,
        escrow: Arc<dyn EscrowProvider>,
        calculator: AllocationCalculator,
        config: &EngineConfig,
    ) -> Self {
        Self {
            pipeline: CommitPipeline::new(store.clone()),
            store,
            escrow,
            calculator,
            timeout: config.collaborator_timeout(),
        }
    }

    async fn load_pool(&self, id: PoolId) -> Result<Pool> {
        self.store
            .get_pool(id)
            .await?
            .ok_or_else(|| TrellisError::not_found(format!("pool {id}")))
    }

    async fn audit(&self, action: &str, detail: String) -> Result<()> {
        self.store
            .append_audit(AuditEntry::record("system", action, detail))
            .await
    }

    fn validate_rule(rule: &EligibilityRule) -> Result<()> {
        if rule.min_held == 0 {
            return Err(TrellisError::validation("rule min_held must be at least 1"));
        }
        match rule.allocation {
            AllocationKind::Percentage(pct) => {
                if !(pct.is_finite() && pct > 0.0 && pct <= 100.0) {
                    return Err(TrellisError::validation(format!(
                        "percentage allocation {pct} must be in (0, 100]"
                    )));
                }
            }
            AllocationKind::Fixed(tokens) => {
                if !(tokens.is_finite() && tokens > 0.0) {
                    return Err(TrellisError::validation(format!(
                        "fixed allocation {tokens} must be positive"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Create a pool in the Active state
    pub async fn create_pool(&self, spec: NewPool) -> Result<Pool> {
        if spec.name.trim().is_empty() {
            return Err(TrellisError::validation("pool name must not be empty"));
        }
        if !(spec.total_size.is_finite() && spec.total_size > 0.0) {
            return Err(TrellisError::validation(format!(
                "pool size {} must be positive",
                spec.total_size
            )));
        }
        if spec.end_time <= spec.start_time {
            return Err(TrellisError::validation("end_time must be after start_time"));
        }
        let window = (spec.end_time - spec.start_time)
            .num_seconds()
            .unsigned_abs();
        if spec.cliff_seconds > window {
            return Err(TrellisError::validation(
                "cliff must fit inside the vesting window",
            ));
        }
        for rule in &spec.rules {
            Self::validate_rule(rule)?;
        }

        let pool = Pool {
            id: PoolId::new(),
            name: spec.name,
            total_size: spec.total_size,
            start_time: spec.start_time,
            end_time: spec.end_time,
            cliff_seconds: spec.cliff_seconds,
            mode: spec.mode,
            status: PoolStatus::Active,
            snapshot_taken: false,
            rules: spec.rules,
            escrow: None,
            created_at: Utc::now(),
            cancelled: None,
        };
        self.store.create_pool(pool.clone()).await?;
        self.audit("pool_created", format!("pool {} ({})", pool.id, pool.name))
            .await?;
        tracing::info!(pool = %pool.id, mode = ?pool.mode, "pool created");
        Ok(pool)
    }

    /// Add a rule to a dynamic pool
    pub async fn add_rule(&self, pool_id: PoolId, rule: EligibilityRule) -> Result<Pool> {
        let mut pool = self.load_pool(pool_id).await?;
        if pool.mode != PoolMode::Dynamic {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}; rules mutate only while dynamic",
                pool.mode
            )));
        }
        if pool.status == PoolStatus::Cancelled {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is cancelled"
            )));
        }
        Self::validate_rule(&rule)?;
        let rule_id = rule.id;
        pool.rules.push(rule);
        self.store.update_pool(pool.clone()).await?;
        self.audit("rule_added", format!("pool {pool_id} rule {rule_id}"))
            .await?;
        Ok(pool)
    }

    /// Enable or disable a rule of a dynamic pool
    pub async fn set_rule_enabled(
        &self,
        pool_id: PoolId,
        rule_id: RuleId,
        enabled: bool,
    ) -> Result<Pool> {
        let mut pool = self.load_pool(pool_id).await?;
        if pool.mode != PoolMode::Dynamic {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}; rules mutate only while dynamic",
                pool.mode
            )));
        }
        let rule = pool
            .rules
            .iter_mut()
            .find(|r| r.id == rule_id)
            .ok_or_else(|| TrellisError::not_found(format!("rule {rule_id}")))?;
        rule.enabled = enabled;
        self.store.update_pool(pool.clone()).await?;
        self.audit(
            "rule_toggled",
            format!("pool {pool_id} rule {rule_id} enabled={enabled}"),
        )
        .await?;
        Ok(pool)
    }

    /// Active → Paused
    pub async fn pause(&self, pool_id: PoolId) -> Result<Pool> {
        let mut pool = self.load_pool(pool_id).await?;
        if pool.status != PoolStatus::Active {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}, only active pools pause",
                pool.status
            )));
        }
        pool.status = PoolStatus::Paused;
        self.store.update_pool(pool.clone()).await?;
        self.audit("pool_paused", format!("pool {pool_id}")).await?;
        tracing::info!(pool = %pool_id, "pool paused");
        Ok(pool)
    }

    /// Paused → Active
    pub async fn resume(&self, pool_id: PoolId) -> Result<Pool> {
        let mut pool = self.load_pool(pool_id).await?;
        if pool.status != PoolStatus::Paused {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}, only paused pools resume",
                pool.status
            )));
        }
        pool.status = PoolStatus::Active;
        self.store.update_pool(pool.clone()).await?;
        self.audit("pool_resumed", format!("pool {pool_id}")).await?;
        tracing::info!(pool = %pool_id, "pool resumed");
        Ok(pool)
    }

    /// Active|Paused → Cancelled. Terminal.
    ///
    /// Revokes every active membership, then requests escrow cancellation
    /// best-effort. A snapshot pool with locked memberships refuses the
    /// transition entirely.
    pub async fn cancel(&self, pool_id: PoolId, reason: &str) -> Result<Pool> {
        let mut pool = self.load_pool(pool_id).await?;
        if pool.status == PoolStatus::Cancelled {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is already cancelled"
            )));
        }

        let memberships = self.store.memberships_for_pool(pool_id).await?;
        if pool.mode == PoolMode::Snapshot && memberships.iter().any(|m| m.snapshot_locked) {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} has locked snapshot commitments and cannot be cancelled"
            )));
        }

        let now = Utc::now();
        for mut membership in memberships.into_iter().filter(|m| m.is_active) {
            membership.revoke(now, reason);
            self.store.update_membership(membership).await?;
        }

        pool.status = PoolStatus::Cancelled;
        pool.cancelled = Some(CancelInfo {
            at: now,
            reason: reason.to_string(),
        });
        self.store.update_pool(pool.clone()).await?;

        if let Some(escrow) = &pool.escrow {
            let outcome = BestEffort::from(
                bounded(
                    self.timeout,
                    "escrow cancel",
                    self.escrow.cancel(&escrow.escrow_id),
                )
                .await,
            );
            outcome.log("escrow cancel on pool cancellation");
        }

        self.audit("pool_cancelled", format!("pool {pool_id}: {reason}"))
            .await?;
        tracing::info!(pool = %pool_id, reason, "pool cancelled");
        Ok(pool)
    }

    /// Run the calculator for a snapshot pool without writing anything
    pub async fn preview_snapshot(&self, pool_id: PoolId) -> Result<AllocationSet> {
        let pool = self.snapshot_pool_open(pool_id).await?;
        self.calculator
            .compute(&pool, RuleFailurePolicy::Abort)
            .await
    }

    /// Compute and persist a snapshot pool's allocations, locking the
    /// created memberships.
    ///
    /// `snapshot_taken` flips only on a clean commit; a partially failed
    /// run leaves the flag unset so the (idempotent) commit can be
    /// retried without double-allocating the wallets that did land.
    pub async fn commit_snapshot(&self, pool_id: PoolId) -> Result<CommitReport> {
        let mut pool = self.snapshot_pool_open(pool_id).await?;
        let set = self
            .calculator
            .compute(&pool, RuleFailurePolicy::Abort)
            .await?;
        let report = self.pipeline.commit(&pool, &set.allocations, true).await;

        if report.is_clean() {
            pool.snapshot_taken = true;
            self.store.update_pool(pool).await?;
        }
        self.audit(
            "snapshot_committed",
            format!(
                "pool {pool_id}: {} created, {} unchanged, {} failed",
                report.succeeded.len(),
                report.unchanged.len(),
                report.failed.len()
            ),
        )
        .await?;
        Ok(report)
    }

    async fn snapshot_pool_open(&self, pool_id: PoolId) -> Result<Pool> {
        let pool = self.load_pool(pool_id).await?;
        if pool.mode != PoolMode::Snapshot {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}, not snapshot",
                pool.mode
            )));
        }
        if pool.snapshot_taken {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} snapshot already taken"
            )));
        }
        if pool.status != PoolStatus::Active {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}, snapshots commit on active pools",
                pool.status
            )));
        }
        Ok(pool)
    }

    /// Direct operator entry for a manual pool
    pub async fn add_manual_allocation(
        &self,
        pool_id: PoolId,
        wallet: WalletId,
        amount: f64,
        nft_count: u64,
    ) -> Result<Membership> {
        let pool = self.load_pool(pool_id).await?;
        if pool.mode != PoolMode::Manual {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}; direct entry is for manual pools",
                pool.mode
            )));
        }
        if pool.status != PoolStatus::Active {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}",
                pool.status
            )));
        }
        if wallet.as_str().is_empty() {
            return Err(TrellisError::validation("wallet must not be empty"));
        }
        if !(amount.is_finite() && amount > 0.0) {
            return Err(TrellisError::validation(format!(
                "allocation amount {amount} must be positive"
            )));
        }

        let membership = Membership {
            id: MembershipId::new(),
            pool_id,
            wallet: wallet.clone(),
            amount,
            share_pct: amount / pool.total_size * 100.0,
            tier: 0,
            nft_count,
            sources: vec![],
            is_active: true,
            is_cancelled: false,
            snapshot_locked: false,
            claimed_base: 0,
            created_at: Utc::now(),
            cancelled: None,
        };
        match self.store.insert_membership(membership.clone()).await? {
            MembershipInsert::Inserted => {}
            MembershipInsert::AlreadyActive => {
                return Err(TrellisError::precondition(format!(
                    "wallet {wallet} already holds an active membership in pool {pool_id}"
                )));
            }
        }
        self.audit(
            "manual_allocation",
            format!("pool {pool_id} wallet {wallet} amount {amount}"),
        )
        .await?;
        Ok(membership)
    }

    /// Explicit admin removal of one membership (logical delete)
    pub async fn remove_membership(
        &self,
        membership_id: MembershipId,
        reason: &str,
    ) -> Result<Membership> {
        let mut membership = self
            .store
            .get_membership(membership_id)
            .await?
            .ok_or_else(|| TrellisError::not_found(format!("membership {membership_id}")))?;
        if !membership.is_active {
            return Err(TrellisError::precondition(format!(
                "membership {membership_id} is already inactive"
            )));
        }
        membership.revoke(Utc::now(), reason);
        self.store.update_membership(membership.clone()).await?;
        self.audit(
            "membership_removed",
            format!("membership {membership_id}: {reason}"),
        )
        .await?;
        Ok(membership)
    }

    /// Deploy the pool's escrow and store the returned reference.
    ///
    /// Unlike cancellation this is not best-effort: without the reference
    /// the pool has no escrow, so a failed deployment surfaces as an
    /// external error.
    pub async fn deploy_escrow(&self, pool_id: PoolId) -> Result<Pool> {
        let mut pool = self.load_pool(pool_id).await?;
        if pool.status != PoolStatus::Active {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} is {:?}",
                pool.status
            )));
        }
        if pool.escrow.is_some() {
            return Err(TrellisError::precondition(format!(
                "pool {pool_id} already has a deployed escrow"
            )));
        }
        let reference = bounded(
            self.timeout,
            "escrow deploy",
            self.escrow
                .deploy(pool.total_size, pool.start_time, pool.end_time, &pool.name),
        )
        .await?;
        pool.escrow = Some(reference.clone());
        self.store.update_pool(pool.clone()).await?;
        self.audit(
            "escrow_deployed",
            format!("pool {pool_id} escrow {}", reference.escrow_id),
        )
        .await?;
        Ok(pool)
    }
}
