//! Trellis Engine
//!
//! The vesting pool lifecycle and allocation reconciliation engine:
//!
//! - [`allocation`] — turns eligibility rules plus a pool size into
//!   per-wallet token amounts via the holder index collaborator
//! - [`commit`] — persists computed allocations with per-record failure
//!   isolation and idempotency
//! - [`lifecycle`] — pool status transitions, their guards, and their
//!   side effects on membership records
//! - [`dynamic`] — incremental re-evaluation of live dynamic pools
//! - [`treasury`] — solvency classification over allocations, claims,
//!   and the on-chain balance
//! - [`claims`] — claim settlement against a membership's remainder
//! - [`bulk`] — authenticated bulk stream controls with itemized results
//!
//! Components are constructed once with an injected store and collaborator
//! handles ([`Engine::new`] wires the full set) and may serve concurrent
//! requests; cross-record atomicity lives in the store contract, not here.

#![forbid(unsafe_code)]

use std::future::Future;
use std::time::Duration;

use trellis_core::{Result, TrellisError};

pub mod allocation;
pub mod bulk;
pub mod claims;
pub mod commit;
pub mod dynamic;
pub mod engine;
pub mod lifecycle;
pub mod treasury;

pub use allocation::{AllocationCalculator, AllocationSet, ComputedAllocation, SkippedRule};
pub use bulk::{BulkControls, BulkItemFailure, BulkReport};
pub use claims::ClaimLedger;
pub use commit::{CommitPipeline, CommitReport, WalletFailure};
pub use dynamic::{DynamicReconciler, SyncReport};
pub use engine::Engine;
pub use lifecycle::{NewPool, PoolLifecycle};
pub use treasury::{PoolBreakdown, TreasuryReconciler, TreasuryReport, TreasuryStatus};

/// Bound a collaborator call with the configured timeout, mapping a
/// timeout onto the external error taxonomy
pub(crate) async fn bounded<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(res) => res,
        Err(_) => Err(TrellisError::external(format!(
            "{what} timed out after {}ms",
            limit.as_millis()
        ))),
    }
}
