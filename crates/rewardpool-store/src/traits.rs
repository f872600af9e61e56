use {
    anyhow::Result,
    async_trait::async_trait,
    rewardpool_common::Address,
    rewardpool_engine::PoolSnapshot,
    std::sync::Arc,
};

/// Persistence of whole pool footprints, keyed by pool address.
/// Backends are pluggable.
#[async_trait]
pub trait SnapshotStore: Send + Sync + 'static {
    /// Replace the stored snapshot for `pool`
    async fn save(&self, pool: &Address, snapshot: &PoolSnapshot) -> Result<()>;

    /// Latest snapshot for `pool`, if any
    async fn load(&self, pool: &Address) -> Result<Option<PoolSnapshot>>;

    /// Every pool with a stored snapshot
    async fn list(&self) -> Result<Vec<Address>>;

    /// Drop the snapshot for `pool`. Missing snapshots are not an error.
    async fn remove(&self, pool: &Address) -> Result<()>;

    /// Flush pending writes
    async fn close(&self) -> Result<()>;
}

/// Factory trait for creating store instances
#[async_trait]
pub trait SnapshotStoreFactory: Send + Sync + 'static {
    async fn create_store(&self) -> Result<Arc<dyn SnapshotStore>>;
}
