use {
    crate::{
        file_store::FileStore,
        memory_store::MemoryStore,
        traits::{SnapshotStore, SnapshotStoreFactory},
        StoreConfig, StoreType,
    },
    anyhow::{anyhow, Result},
    async_trait::async_trait,
    std::sync::Arc,
};

/// Builds the backend named by a [`StoreConfig`].
pub struct PoolStoreFactory {
    config: StoreConfig,
}

impl PoolStoreFactory {
    pub fn new(config: StoreConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SnapshotStoreFactory for PoolStoreFactory {
    async fn create_store(&self) -> Result<Arc<dyn SnapshotStore>> {
        match self.config.store_type {
            StoreType::Memory => Ok(Arc::new(MemoryStore::new())),
            StoreType::File => {
                let path = match &self.config.path {
                    Some(path) => path.clone(),
                    None => return Err(anyhow!("File store path not configured")),
                };
                Ok(Arc::new(FileStore::open(path)?))
            }
        }
    }
}
