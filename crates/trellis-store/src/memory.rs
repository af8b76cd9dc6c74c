//! In-memory store backend
//!
//! Reference implementation of [`VestingStore`] used by tests and
//! single-process deployments. All state lives behind one `RwLock`;
//! `insert_membership` performs its uniqueness check and the insert under
//! a single write-lock acquisition, which is the atomicity the trait
//! demands.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use trellis_core::model::{AuditEntry, Claim, Membership, Pool};
use trellis_core::types::{MembershipId, PoolId, WalletId};
use trellis_core::{Result, TrellisError};

use crate::{MembershipInsert, VestingStore};

#[derive(Default)]
struct Inner {
    pools: HashMap<PoolId, Pool>,
    memberships: HashMap<MembershipId, Membership>,
    by_pool: HashMap<PoolId, Vec<MembershipId>>,
    claims: Vec<Claim>,
    audit: Vec<AuditEntry>,
}

/// In-memory [`VestingStore`] backend
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl VestingStore for MemoryStore {
    async fn create_pool(&self, pool: Pool) -> Result<()> {
        let mut inner = self.inner.write().await;
        if inner.pools.contains_key(&pool.id) {
            return Err(TrellisError::storage(format!(
                "pool {} already exists",
                pool.id
            )));
        }
        inner.pools.insert(pool.id, pool);
        Ok(())
    }

    async fn get_pool(&self, id: PoolId) -> Result<Option<Pool>> {
        let inner = self.inner.read().await;
        Ok(inner.pools.get(&id).cloned())
    }

    async fn update_pool(&self, pool: Pool) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.pools.get_mut(&pool.id) {
            Some(slot) => {
                *slot = pool;
                Ok(())
            }
            None => Err(TrellisError::not_found(format!("pool {}", pool.id))),
        }
    }

    async fn list_pools(&self) -> Result<Vec<Pool>> {
        let inner = self.inner.read().await;
        let mut pools: Vec<Pool> = inner.pools.values().cloned().collect();
        pools.sort_by_key(|p| (p.created_at, p.id));
        Ok(pools)
    }

    async fn insert_membership(&self, membership: Membership) -> Result<MembershipInsert> {
        // Single write-lock acquisition covers the check AND the insert;
        // concurrent committers cannot interleave between them.
        let mut inner = self.inner.write().await;
        let ids = inner
            .by_pool
            .get(&membership.pool_id)
            .cloned()
            .unwrap_or_default();
        let already_active = ids.iter().any(|id| {
            inner
                .memberships
                .get(id)
                .map(|m| m.is_active && m.wallet == membership.wallet)
                .unwrap_or(false)
        });
        if already_active {
            return Ok(MembershipInsert::AlreadyActive);
        }
        inner
            .by_pool
            .entry(membership.pool_id)
            .or_default()
            .push(membership.id);
        inner.memberships.insert(membership.id, membership);
        Ok(MembershipInsert::Inserted)
    }

    async fn get_membership(&self, id: MembershipId) -> Result<Option<Membership>> {
        let inner = self.inner.read().await;
        Ok(inner.memberships.get(&id).cloned())
    }

    async fn update_membership(&self, membership: Membership) -> Result<()> {
        let mut inner = self.inner.write().await;
        match inner.memberships.get_mut(&membership.id) {
            Some(slot) => {
                *slot = membership;
                Ok(())
            }
            None => Err(TrellisError::not_found(format!(
                "membership {}",
                membership.id
            ))),
        }
    }

    async fn memberships_for_pool(&self, pool_id: PoolId) -> Result<Vec<Membership>> {
        let inner = self.inner.read().await;
        let mut records: Vec<Membership> = inner
            .by_pool
            .get(&pool_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.memberships.get(id).cloned())
            .collect();
        records.sort_by_key(|m| (m.created_at, m.id));
        Ok(records)
    }

    async fn active_membership(
        &self,
        pool_id: PoolId,
        wallet: &WalletId,
    ) -> Result<Option<Membership>> {
        let inner = self.inner.read().await;
        Ok(inner
            .by_pool
            .get(&pool_id)
            .into_iter()
            .flatten()
            .filter_map(|id| inner.memberships.get(id))
            .find(|m| m.is_active && &m.wallet == wallet)
            .cloned())
    }

    async fn append_claim(&self, claim: Claim) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.claims.push(claim);
        Ok(())
    }

    async fn claims_for_membership(&self, id: MembershipId) -> Result<Vec<Claim>> {
        let inner = self.inner.read().await;
        Ok(inner
            .claims
            .iter()
            .filter(|c| c.membership_id == id)
            .cloned()
            .collect())
    }

    async fn list_claims(&self) -> Result<Vec<Claim>> {
        let inner = self.inner.read().await;
        Ok(inner.claims.clone())
    }

    async fn append_audit(&self, entry: AuditEntry) -> Result<()> {
        let mut inner = self.inner.write().await;
        inner.audit.push(entry);
        Ok(())
    }

    async fn list_audit(&self) -> Result<Vec<AuditEntry>> {
        let inner = self.inner.read().await;
        Ok(inner.audit.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use trellis_core::model::{CancelInfo, PoolMode, PoolStatus};
    use trellis_core::types::WalletId;

    fn pool() -> Pool {
        Pool {
            id: PoolId::new(),
            name: "test".into(),
            total_size: 1000.0,
            start_time: Utc::now(),
            end_time: Utc::now() + chrono::Duration::days(30),
            cliff_seconds: 0,
            mode: PoolMode::Dynamic,
            status: PoolStatus::Active,
            snapshot_taken: false,
            rules: vec![],
            escrow: None,
            created_at: Utc::now(),
            cancelled: None,
        }
    }

    fn membership(pool_id: PoolId, wallet: &str) -> Membership {
        Membership {
            id: MembershipId::new(),
            pool_id,
            wallet: WalletId::new(wallet),
            amount: 10.0,
            share_pct: 1.0,
            tier: 0,
            nft_count: 1,
            sources: vec![],
            is_active: true,
            is_cancelled: false,
            snapshot_locked: false,
            claimed_base: 0,
            created_at: Utc::now(),
            cancelled: None,
        }
    }

    #[tokio::test]
    async fn second_active_insert_is_rejected_without_writing() {
        let store = MemoryStore::new();
        let p = pool();
        store.create_pool(p.clone()).await.unwrap();

        let first = membership(p.id, "w1");
        assert_eq!(
            store.insert_membership(first).await.unwrap(),
            MembershipInsert::Inserted
        );
        assert_eq!(
            store.insert_membership(membership(p.id, "w1")).await.unwrap(),
            MembershipInsert::AlreadyActive
        );
        assert_eq!(store.memberships_for_pool(p.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn revoked_wallet_may_rejoin() {
        let store = MemoryStore::new();
        let p = pool();
        store.create_pool(p.clone()).await.unwrap();

        let mut m = membership(p.id, "w1");
        store.insert_membership(m.clone()).await.unwrap();
        m.is_active = false;
        m.is_cancelled = true;
        m.cancelled = Some(CancelInfo {
            at: Utc::now(),
            reason: "admin removal".into(),
        });
        store.update_membership(m).await.unwrap();

        assert_eq!(
            store.insert_membership(membership(p.id, "w1")).await.unwrap(),
            MembershipInsert::Inserted
        );
        // both records survive: logical deletion only
        assert_eq!(store.memberships_for_pool(p.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn update_missing_pool_is_not_found() {
        let store = MemoryStore::new();
        let err = store.update_pool(pool()).await.unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[tokio::test]
    async fn claims_are_append_only_and_filterable() {
        let store = MemoryStore::new();
        let p = pool();
        store.create_pool(p.clone()).await.unwrap();
        let m = membership(p.id, "w1");
        store.insert_membership(m.clone()).await.unwrap();

        let claim = Claim {
            id: trellis_core::types::ClaimId::new(),
            membership_id: m.id,
            wallet: m.wallet.clone(),
            amount_base: 5_000_000_000,
            tx_ref: "tx1".into(),
            at: Utc::now(),
        };
        store.append_claim(claim.clone()).await.unwrap();
        assert_eq!(store.claims_for_membership(m.id).await.unwrap(), vec![claim]);
    }
}
