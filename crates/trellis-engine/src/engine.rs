//! Engine assembly
//!
//! Wires every component over one shared store and one set of
//! collaborator handles. Construct once at startup with the validated
//! config and pass the engine (or individual components) to whatever
//! transport fronts it.

use std::sync::Arc;

use trellis_authentication::Authenticator;
use trellis_core::effects::{EscrowProvider, HolderIndex, LedgerBalance};
use trellis_core::{EngineConfig, Result};
use trellis_store::VestingStore;

use crate::allocation::AllocationCalculator;
use crate::bulk::BulkControls;
use crate::claims::ClaimLedger;
use crate::dynamic::DynamicReconciler;
use crate::lifecycle::PoolLifecycle;
use crate::treasury::TreasuryReconciler;

/// The fully wired vesting engine
#[derive(Clone)]
pub struct Engine {
    /// Pool status transitions and structural mutations
    pub lifecycle: PoolLifecycle,
    /// Incremental growth of dynamic pools
    pub reconciler: DynamicReconciler,
    /// Solvency reporting
    pub treasury: TreasuryReconciler,
    /// Claim settlement
    pub claims: ClaimLedger,
    /// Authenticated bulk operations
    pub bulk: BulkControls,
}

impl Engine {
    /// Assemble the engine from its injected dependencies.
    ///
    /// Fails only on an invalid config (unparseable admin key).
    pub fn new(
        store: Arc<dyn VestingStore>,
        holder_index: Arc<dyn HolderIndex>,
        escrow: Arc<dyn EscrowProvider>,
        ledger: Arc<dyn LedgerBalance>,
        config: &EngineConfig,
    ) -> Result<Self> {
        let authenticator = Authenticator::from_config(config)?;
        let calculator = AllocationCalculator::new(holder_index, config);
        let lifecycle = PoolLifecycle::new(store.clone(), escrow, calculator.clone(), config);

        Ok(Self {
            reconciler: DynamicReconciler::new(store.clone(), calculator),
            treasury: TreasuryReconciler::new(store.clone(), ledger, config),
            claims: ClaimLedger::new(store.clone(), config.token_decimals),
            bulk: BulkControls::new(store, lifecycle.clone(), authenticator),
            lifecycle,
        })
    }
}
