//! Bulk stream controls
//!
//! Privileged operations spanning every pool: pause-all, resume-all, and
//! emergency-stop. Each request is authenticated first (signed envelope,
//! freshness window), then applied pool-by-pool. Bulk actions are not
//! atomic across pools; partial completion is normal and comes back as an
//! itemized report, never as an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use trellis_authentication::{AdminAction, AdminCommandEnvelope, Authenticator};
use trellis_core::model::{AuditEntry, PoolStatus};
use trellis_core::types::PoolId;
use trellis_core::Result;
use trellis_store::VestingStore;

use crate::lifecycle::PoolLifecycle;

/// One pool a bulk action could not be applied to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkItemFailure {
    /// The pool
    pub pool_id: PoolId,
    /// Why it failed (guard violations included)
    pub reason: String,
}

/// Itemized outcome of one bulk action
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkReport {
    /// The authenticated action that ran
    pub action: AdminAction,
    /// Pools the action transitioned
    pub applied: Vec<PoolId>,
    /// Pools not in a state the action targets (already there, terminal)
    pub skipped: Vec<PoolId>,
    /// Pools the action failed on, with reasons
    pub failed: Vec<BulkItemFailure>,
}

/// Authenticated bulk operations across all pools
#[derive(Clone)]
pub struct BulkControls {
    store: Arc<dyn VestingStore>,
    lifecycle: PoolLifecycle,
    authenticator: Authenticator,
}

impl BulkControls {
    /// Wire the controls over the lifecycle machine and the authenticator
    pub fn new(
        store: Arc<dyn VestingStore>,
        lifecycle: PoolLifecycle,
        authenticator: Authenticator,
    ) -> Self {
        Self {
            store,
            lifecycle,
            authenticator,
        }
    }

    /// Verify the envelope at `now` and apply the requested action to
    /// every pool it targets
    pub async fn execute(
        &self,
        envelope: &AdminCommandEnvelope,
        now: DateTime<Utc>,
    ) -> Result<BulkReport> {
        let action = self.authenticator.verify(envelope, now)?;

        let mut report = BulkReport {
            action,
            applied: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        };

        for pool in self.store.list_pools().await? {
            let outcome = match action {
                AdminAction::PauseAll => {
                    if pool.status != PoolStatus::Active {
                        report.skipped.push(pool.id);
                        continue;
                    }
                    self.lifecycle.pause(pool.id).await.map(|_| ())
                }
                AdminAction::ResumeAll => {
                    if pool.status != PoolStatus::Paused {
                        report.skipped.push(pool.id);
                        continue;
                    }
                    self.lifecycle.resume(pool.id).await.map(|_| ())
                }
                AdminAction::EmergencyStop => {
                    if pool.status == PoolStatus::Cancelled {
                        report.skipped.push(pool.id);
                        continue;
                    }
                    self.lifecycle
                        .cancel(pool.id, "emergency stop")
                        .await
                        .map(|_| ())
                }
            };
            match outcome {
                Ok(()) => report.applied.push(pool.id),
                Err(err) => report.failed.push(BulkItemFailure {
                    pool_id: pool.id,
                    reason: err.to_string(),
                }),
            }
        }

        self.store
            .append_audit(AuditEntry::record(
                envelope.wallet.as_str(),
                format!("bulk_{action}"),
                format!(
                    "{} applied, {} skipped, {} failed",
                    report.applied.len(),
                    report.skipped.len(),
                    report.failed.len()
                ),
            ))
            .await?;
        tracing::info!(
            %action,
            applied = report.applied.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            "bulk action finished"
        );
        Ok(report)
    }
}
