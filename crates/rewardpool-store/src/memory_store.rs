use {
    crate::traits::SnapshotStore,
    anyhow::{anyhow, Result},
    async_trait::async_trait,
    rewardpool_common::Address,
    rewardpool_engine::PoolSnapshot,
    std::collections::HashMap,
    tokio::sync::RwLock,
};

/// Process-local store, mostly for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    snapshots: RwLock<HashMap<Address, PoolSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn save(&self, pool: &Address, snapshot: &PoolSnapshot) -> Result<()> {
        snapshot
            .check_invariants()
            .map_err(|violation| anyhow!("refusing to persist snapshot for {}: {}", pool, violation))?;
        self.snapshots.write().await.insert(*pool, snapshot.clone());
        Ok(())
    }

    async fn load(&self, pool: &Address) -> Result<Option<PoolSnapshot>> {
        Ok(self.snapshots.read().await.get(pool).cloned())
    }

    async fn list(&self) -> Result<Vec<Address>> {
        let mut pools: Vec<Address> = self.snapshots.read().await.keys().copied().collect();
        pools.sort();
        Ok(pools)
    }

    async fn remove(&self, pool: &Address) -> Result<()> {
        self.snapshots.write().await.remove(pool);
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
