//! Allocation calculator
//!
//! Evaluates a pool's eligibility rules against current holder sets and
//! produces one computed allocation per qualifying wallet. Rules are
//! independent: each enumerates its collection's holders, filters by the
//! minimum-holding threshold, and grants its amount to every wallet that
//! clears it.
//!
//! PERCENTAGE semantics are per-wallet, not a cohort split: a 50% rule
//! grants half the pool size to EACH qualifying wallet. That is the
//! documented upstream behavior and is preserved exactly; the treasury
//! reconciler is where the resulting over-allocation becomes visible.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use trellis_core::effects::HolderIndex;
use trellis_core::model::{AllocationKind, Pool, PoolMode};
use trellis_core::types::{RuleId, WalletId};
use trellis_core::{EngineConfig, MergePolicy, Result, RuleFailurePolicy, TrellisError};

use crate::bounded;

/// One wallet's computed allocation before persistence
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedAllocation {
    /// Token amount, human units
    pub amount: f64,
    /// Share of the pool, percent (reporting only)
    pub share_pct: f64,
    /// Ordinal of the first contributing rule
    pub tier: u8,
    /// NFT count backing the allocation
    pub nft_count: u64,
    /// Every rule that qualified this wallet
    pub sources: Vec<RuleId>,
}

/// A rule dropped from a computation under [`RuleFailurePolicy::SkipRule`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRule {
    /// The rule that was skipped
    pub rule: RuleId,
    /// Collaborator-reported cause
    pub reason: String,
}

/// Result of one calculator run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AllocationSet {
    /// Wallet to computed allocation, deterministically ordered
    pub allocations: BTreeMap<WalletId, ComputedAllocation>,
    /// Rules dropped under the skip policy; empty under abort
    pub skipped_rules: Vec<SkippedRule>,
}

impl AllocationSet {
    /// Total token amount across all computed allocations
    pub fn total_amount(&self) -> f64 {
        self.allocations.values().map(|a| a.amount).sum()
    }
}

/// Turns rules plus a pool size into per-wallet amounts
#[derive(Clone)]
pub struct AllocationCalculator {
    holder_index: Arc<dyn HolderIndex>,
    timeout: Duration,
    merge_policy: MergePolicy,
}

impl AllocationCalculator {
    /// Create a calculator over the given holder index
    pub fn new(holder_index: Arc<dyn HolderIndex>, config: &EngineConfig) -> Self {
        Self {
            holder_index,
            timeout: config.collaborator_timeout(),
            merge_policy: config.merge_policy,
        }
    }

    /// Evaluate every enabled rule of `pool`.
    ///
    /// `failure_policy` decides what a failed holder enumeration does:
    /// abort the whole computation, or drop that rule's contribution and
    /// report it in the result.
    pub async fn compute(
        &self,
        pool: &Pool,
        failure_policy: RuleFailurePolicy,
    ) -> Result<AllocationSet> {
        if pool.mode == PoolMode::Manual {
            return Err(TrellisError::precondition(format!(
                "pool {} is manual; allocations are entered by the operator",
                pool.id
            )));
        }

        let mut set = AllocationSet::default();

        for (ordinal, rule) in pool.rules.iter().enumerate() {
            if !rule.enabled {
                continue;
            }

            let holders = match bounded(
                self.timeout,
                "holder enumeration",
                self.holder_index.get_holders(&rule.collection),
            )
            .await
            {
                Ok(holders) => holders,
                Err(err) => match failure_policy {
                    RuleFailurePolicy::Abort => return Err(err),
                    RuleFailurePolicy::SkipRule => {
                        tracing::warn!(
                            rule = %rule.id,
                            collection = %rule.collection,
                            error = %err,
                            "holder enumeration failed, skipping rule"
                        );
                        set.skipped_rules.push(SkippedRule {
                            rule: rule.id,
                            reason: err.to_string(),
                        });
                        continue;
                    }
                },
            };

            let tier = ordinal as u8;
            for holder in holders {
                if holder.held_count < rule.min_held {
                    continue;
                }

                let (amount, share_pct) = match rule.allocation {
                    // Per-wallet share of the pool; see module docs.
                    AllocationKind::Percentage(pct) => (pool.total_size * pct / 100.0, pct),
                    AllocationKind::Fixed(tokens) => {
                        let share = if pool.total_size > 0.0 {
                            tokens / pool.total_size * 100.0
                        } else {
                            0.0
                        };
                        (tokens, share)
                    }
                };

                match set.allocations.entry(holder.wallet.clone()) {
                    std::collections::btree_map::Entry::Vacant(slot) => {
                        slot.insert(ComputedAllocation {
                            amount,
                            share_pct,
                            tier,
                            nft_count: holder.held_count,
                            sources: vec![rule.id],
                        });
                    }
                    std::collections::btree_map::Entry::Occupied(mut slot) => {
                        let entry = slot.get_mut();
                        entry.sources.push(rule.id);
                        entry.tier = entry.tier.min(tier);
                        match self.merge_policy {
                            MergePolicy::HighestWins => {
                                if amount > entry.amount {
                                    entry.amount = amount;
                                    entry.share_pct = share_pct;
                                    entry.nft_count = holder.held_count;
                                }
                            }
                            MergePolicy::Sum => {
                                entry.amount += amount;
                                entry.share_pct += share_pct;
                                entry.nft_count += holder.held_count;
                            }
                        }
                    }
                }
            }
        }

        tracing::debug!(
            pool = %pool.id,
            wallets = set.allocations.len(),
            skipped_rules = set.skipped_rules.len(),
            "allocation computation finished"
        );
        Ok(set)
    }
}
