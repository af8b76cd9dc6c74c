//! Claim settlement
//!
//! Appends immutable claim records against a membership's unclaimed
//! remainder. The ledger transfer itself happens outside this engine;
//! settlement here is the bookkeeping that keeps "no claim exceeding
//! balance" true, so the ceiling check runs before anything is written.

use std::sync::Arc;

use chrono::Utc;

use trellis_core::model::{AuditEntry, Claim};
use trellis_core::types::{ClaimId, MembershipId};
use trellis_core::{Result, TrellisError};
use trellis_store::VestingStore;

/// Claim bookkeeping over the store
#[derive(Clone)]
pub struct ClaimLedger {
    store: Arc<dyn VestingStore>,
    decimals: u32,
}

impl ClaimLedger {
    /// Create a ledger writing through the given store
    pub fn new(store: Arc<dyn VestingStore>, decimals: u32) -> Self {
        Self { store, decimals }
    }

    /// Settle `amount_base` against a membership.
    ///
    /// Rejects inactive memberships and amounts above the unclaimed
    /// remainder; on success the claim record is appended and the
    /// membership's claimed total advances.
    pub async fn settle(
        &self,
        membership_id: MembershipId,
        amount_base: u64,
        tx_ref: &str,
    ) -> Result<Claim> {
        if amount_base == 0 {
            return Err(TrellisError::validation("claim amount must be positive"));
        }
        let mut membership = self
            .store
            .get_membership(membership_id)
            .await?
            .ok_or_else(|| TrellisError::not_found(format!("membership {membership_id}")))?;
        if !membership.is_active || membership.is_cancelled {
            return Err(TrellisError::precondition(format!(
                "membership {membership_id} is not active"
            )));
        }
        let remaining = membership.remaining_base(self.decimals);
        if amount_base > remaining {
            return Err(TrellisError::precondition(format!(
                "claim of {amount_base} exceeds unclaimed remainder {remaining}"
            )));
        }

        let claim = Claim {
            id: ClaimId::new(),
            membership_id,
            wallet: membership.wallet.clone(),
            amount_base,
            tx_ref: tx_ref.to_string(),
            at: Utc::now(),
        };
        self.store.append_claim(claim.clone()).await?;
        membership.claimed_base += amount_base;
        self.store.update_membership(membership).await?;

        self.store
            .append_audit(AuditEntry::record(
                "system",
                "claim_settled",
                format!("membership {membership_id} claimed {amount_base} base units ({tx_ref})"),
            ))
            .await?;
        tracing::info!(membership = %membership_id, amount_base, tx_ref, "claim settled");
        Ok(claim)
    }
}
