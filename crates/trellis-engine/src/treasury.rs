//! Treasury reconciler
//!
//! Aggregates allocations, claim history, and the on-chain treasury
//! balance into a solvency verdict. Every figure is recomputed on every
//! query; this report gates urgent operational decisions and must never
//! serve stale numbers. Base-unit inputs (ledger balance, claim amounts)
//! are converted to human units exactly once, at the aggregation
//! boundary.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use trellis_core::effects::LedgerBalance;
use trellis_core::model::PoolStatus;
use trellis_core::types::{MembershipId, PoolId, WalletId};
use trellis_core::units::to_human;
use trellis_core::{EngineConfig, Result};
use trellis_store::VestingStore;

use crate::bounded;

/// Solvency classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TreasuryStatus {
    /// Buffer covers at least 20% of what is still owed
    Healthy,
    /// Solvent, but the buffer is under 20% of what is still owed
    Warning,
    /// The treasury cannot honor outstanding claims
    Critical,
}

/// Per-pool share of the treasury's obligations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolBreakdown {
    /// The pool
    pub pool_id: PoolId,
    /// Pool name, for operator reports
    pub name: String,
    /// Active allocations, human units
    pub allocated: f64,
    /// Settled claims, human units
    pub claimed: f64,
    /// Still owed, human units
    pub outstanding: f64,
}

/// A point-in-time solvency report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreasuryReport {
    /// Treasury balance, human units
    pub balance: f64,
    /// Sum of active memberships across non-cancelled pools, human units
    pub total_allocated: f64,
    /// Sum of every claim record, human units
    pub total_claimed: f64,
    /// `total_allocated - total_claimed`
    pub remaining_needed: f64,
    /// `balance - remaining_needed`
    pub buffer: f64,
    /// Buffer as a percentage of what is still owed; 0 when nothing is
    pub buffer_pct: f64,
    /// Classification derived from the figures above
    pub status: TreasuryStatus,
    /// Per-pool breakdown, creation order
    pub pools: Vec<PoolBreakdown>,
}

/// Computes solvency reports on demand
#[derive(Clone)]
pub struct TreasuryReconciler {
    store: Arc<dyn VestingStore>,
    ledger: Arc<dyn LedgerBalance>,
    treasury_wallet: WalletId,
    token_mint: String,
    decimals: u32,
    timeout: Duration,
}

impl TreasuryReconciler {
    /// Wire the reconciler over its store and ledger collaborator
    pub fn new(
        store: Arc<dyn VestingStore>,
        ledger: Arc<dyn LedgerBalance>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            store,
            ledger,
            treasury_wallet: WalletId::new(config.treasury_wallet.clone()),
            token_mint: config.token_mint.clone(),
            decimals: config.token_decimals,
            timeout: config.collaborator_timeout(),
        }
    }

    /// Compute a fresh solvency report
    pub async fn report(&self) -> Result<TreasuryReport> {
        let balance_base = bounded(
            self.timeout,
            "treasury balance lookup",
            self.ledger
                .get_token_balance(&self.treasury_wallet, &self.token_mint),
        )
        .await?;
        let balance = to_human(balance_base, self.decimals);

        let pools = self.store.list_pools().await?;
        let mut breakdown = Vec::new();
        let mut membership_pool: HashMap<MembershipId, usize> = HashMap::new();
        let mut total_allocated = 0.0;

        for pool in &pools {
            if pool.status == PoolStatus::Cancelled {
                continue;
            }
            let memberships = self.store.memberships_for_pool(pool.id).await?;
            let allocated: f64 = memberships
                .iter()
                .filter(|m| m.is_active)
                .map(|m| m.amount)
                .sum();
            total_allocated += allocated;
            let row = breakdown.len();
            // claims settle against any membership of the pool, active or not
            for membership in &memberships {
                membership_pool.insert(membership.id, row);
            }
            breakdown.push(PoolBreakdown {
                pool_id: pool.id,
                name: pool.name.clone(),
                allocated,
                claimed: 0.0,
                outstanding: allocated,
            });
        }

        let mut total_claimed_base: u64 = 0;
        for claim in self.store.list_claims().await? {
            total_claimed_base = total_claimed_base.saturating_add(claim.amount_base);
            if let Some(&row) = membership_pool.get(&claim.membership_id) {
                breakdown[row].claimed += to_human(claim.amount_base, self.decimals);
            }
        }
        for row in &mut breakdown {
            row.outstanding = row.allocated - row.claimed;
        }
        let total_claimed = to_human(total_claimed_base, self.decimals);

        let remaining_needed = total_allocated - total_claimed;
        let buffer = balance - remaining_needed;
        let buffer_pct = if remaining_needed > 0.0 {
            buffer / remaining_needed * 100.0
        } else {
            0.0
        };
        let status = if buffer < 0.0 {
            TreasuryStatus::Critical
        } else if buffer >= 0.2 * remaining_needed {
            TreasuryStatus::Healthy
        } else {
            TreasuryStatus::Warning
        };

        tracing::debug!(
            balance,
            total_allocated,
            total_claimed,
            ?status,
            "treasury report computed"
        );
        Ok(TreasuryReport {
            balance,
            total_allocated,
            total_claimed,
            remaining_needed,
            buffer,
            buffer_pct,
            status,
            pools: breakdown,
        })
    }
}
