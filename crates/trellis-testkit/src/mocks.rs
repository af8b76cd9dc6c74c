//! Scriptable mock collaborators and a fault-injecting store wrapper

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use trellis_core::effects::{
    CollectionStats, EscrowProvider, EscrowRef, EscrowStatus, HolderBalance, HolderIndex,
    LedgerBalance,
};
use trellis_core::model::{AuditEntry, Claim, Membership, Pool};
use trellis_core::types::{CollectionId, MembershipId, PoolId, WalletId};
use trellis_core::{Result, TrellisError};
use trellis_store::{MembershipInsert, VestingStore};

/// In-memory holder index with per-collection scripted failures.
///
/// Holder sets stay mutable after the engine takes its handle so tests
/// can grow a collection between reconciler runs.
#[derive(Default)]
pub struct MockHolderIndex {
    holders: Mutex<HashMap<CollectionId, Vec<HolderBalance>>>,
    failures: HashSet<CollectionId>,
}

impl MockHolderIndex {
    /// Empty index
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a collection with `(wallet, held_count)` pairs
    pub fn with_holders(self, collection: &CollectionId, holders: &[(&str, u64)]) -> Self {
        self.holders.lock().unwrap().insert(
            collection.clone(),
            holders
                .iter()
                .map(|(wallet, held_count)| HolderBalance {
                    wallet: WalletId::new(*wallet),
                    held_count: *held_count,
                })
                .collect(),
        );
        self
    }

    /// Make every lookup of `collection` fail
    pub fn with_failure(mut self, collection: &CollectionId) -> Self {
        self.failures.insert(collection.clone());
        self
    }

    /// Add one holder to a collection after construction
    pub fn add_holder(&self, collection: &CollectionId, wallet: &str, held_count: u64) {
        self.holders
            .lock()
            .unwrap()
            .entry(collection.clone())
            .or_default()
            .push(HolderBalance {
                wallet: WalletId::new(wallet),
                held_count,
            });
    }
}

#[async_trait]
impl HolderIndex for MockHolderIndex {
    async fn get_holders(&self, collection: &CollectionId) -> Result<Vec<HolderBalance>> {
        if self.failures.contains(collection) {
            return Err(TrellisError::external(format!(
                "holder index unavailable for {collection}"
            )));
        }
        Ok(self
            .holders
            .lock()
            .unwrap()
            .get(collection)
            .cloned()
            .unwrap_or_default())
    }

    async fn get_collection_stats(&self, collection: &CollectionId) -> Result<CollectionStats> {
        let holders = self.get_holders(collection).await?;
        Ok(CollectionStats {
            total_supply: holders.iter().map(|h| h.held_count).sum(),
            unique_holders: holders.len() as u64,
        })
    }
}

/// Escrow provider that records calls and can be scripted to fail
#[derive(Default)]
pub struct MockEscrowProvider {
    fail_cancel: bool,
    fail_deploy: bool,
    counter: AtomicU64,
    deployed: Mutex<Vec<EscrowRef>>,
    cancelled: Mutex<Vec<String>>,
}

impl MockEscrowProvider {
    /// Provider where every call succeeds
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `cancel` fail
    pub fn failing_cancel(mut self) -> Self {
        self.fail_cancel = true;
        self
    }

    /// Make `deploy` fail
    pub fn failing_deploy(mut self) -> Self {
        self.fail_deploy = true;
        self
    }

    /// Escrow ids cancellation was requested for
    pub fn cancelled(&self) -> Vec<String> {
        self.cancelled.lock().unwrap().clone()
    }

    /// References handed out by `deploy`
    pub fn deployed(&self) -> Vec<EscrowRef> {
        self.deployed.lock().unwrap().clone()
    }
}

#[async_trait]
impl EscrowProvider for MockEscrowProvider {
    async fn deploy(
        &self,
        _total: f64,
        _start: DateTime<Utc>,
        _end: DateTime<Utc>,
        _name: &str,
    ) -> Result<EscrowRef> {
        if self.fail_deploy {
            return Err(TrellisError::external("escrow deploy unavailable"));
        }
        let n = self.counter.fetch_add(1, Ordering::Relaxed);
        let reference = EscrowRef {
            escrow_id: format!("escrow-{n}"),
            tx_ref: format!("tx-{n}"),
        };
        self.deployed.lock().unwrap().push(reference.clone());
        Ok(reference)
    }

    async fn cancel(&self, escrow_id: &str) -> Result<()> {
        if self.fail_cancel {
            return Err(TrellisError::external("escrow cancel unavailable"));
        }
        self.cancelled.lock().unwrap().push(escrow_id.to_string());
        Ok(())
    }

    async fn get_status(&self, _escrow_id: &str) -> Result<EscrowStatus> {
        Ok(EscrowStatus {
            deposited_base: 0,
            withdrawn_base: 0,
        })
    }
}

/// Ledger with fixed balances; unseeded accounts read as 0
#[derive(Default)]
pub struct MockLedgerBalance {
    balances: HashMap<(String, String), u64>,
}

impl MockLedgerBalance {
    /// Empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a balance in base units
    pub fn with_balance(mut self, owner: &str, mint: &str, base: u64) -> Self {
        self.balances
            .insert((owner.to_string(), mint.to_string()), base);
        self
    }
}

#[async_trait]
impl LedgerBalance for MockLedgerBalance {
    async fn get_token_balance(&self, owner: &WalletId, mint: &str) -> Result<u64> {
        Ok(*self
            .balances
            .get(&(owner.as_str().to_string(), mint.to_string()))
            .unwrap_or(&0))
    }
}

/// Store wrapper that fails membership inserts for chosen wallets,
/// delegating everything else
pub struct FaultyStore {
    inner: Arc<dyn VestingStore>,
    fail_wallets: HashSet<String>,
}

impl FaultyStore {
    /// Wrap a store
    pub fn new(inner: Arc<dyn VestingStore>) -> Self {
        Self {
            inner,
            fail_wallets: HashSet::new(),
        }
    }

    /// Fail inserts for `wallet`
    pub fn fail_inserts_for(mut self, wallet: &str) -> Self {
        self.fail_wallets.insert(wallet.to_string());
        self
    }
}

#[async_trait]
impl VestingStore for FaultyStore {
    async fn create_pool(&self, pool: Pool) -> Result<()> {
        self.inner.create_pool(pool).await
    }

    async fn get_pool(&self, id: PoolId) -> Result<Option<Pool>> {
        self.inner.get_pool(id).await
    }

    async fn update_pool(&self, pool: Pool) -> Result<()> {
        self.inner.update_pool(pool).await
    }

    async fn list_pools(&self) -> Result<Vec<Pool>> {
        self.inner.list_pools().await
    }

    async fn insert_membership(&self, membership: Membership) -> Result<MembershipInsert> {
        if self.fail_wallets.contains(membership.wallet.as_str()) {
            return Err(TrellisError::storage(format!(
                "injected insert failure for {}",
                membership.wallet
            )));
        }
        self.inner.insert_membership(membership).await
    }

    async fn get_membership(&self, id: MembershipId) -> Result<Option<Membership>> {
        self.inner.get_membership(id).await
    }

    async fn update_membership(&self, membership: Membership) -> Result<()> {
        self.inner.update_membership(membership).await
    }

    async fn memberships_for_pool(&self, pool_id: PoolId) -> Result<Vec<Membership>> {
        self.inner.memberships_for_pool(pool_id).await
    }

    async fn active_membership(
        &self,
        pool_id: PoolId,
        wallet: &WalletId,
    ) -> Result<Option<Membership>> {
        self.inner.active_membership(pool_id, wallet).await
    }

    async fn append_claim(&self, claim: Claim) -> Result<()> {
        self.inner.append_claim(claim).await
    }

    async fn claims_for_membership(&self, id: MembershipId) -> Result<Vec<Claim>> {
        self.inner.claims_for_membership(id).await
    }

    async fn list_claims(&self) -> Result<Vec<Claim>> {
        self.inner.list_claims().await
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<()> {
        self.inner.append_audit(entry).await
    }

    async fn list_audit(&self) -> Result<Vec<AuditEntry>> {
        self.inner.list_audit().await
    }
}
