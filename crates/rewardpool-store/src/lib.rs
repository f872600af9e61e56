//! Snapshot persistence for reward pools

pub mod factory;
pub mod file_store;
pub mod memory_store;
pub mod traits;

pub use factory::PoolStoreFactory;
pub use file_store::FileStore;
pub use memory_store::MemoryStore;
pub use traits::{SnapshotStore, SnapshotStoreFactory};

use {
    serde::{Deserialize, Serialize},
    std::path::PathBuf,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreType {
    Memory,
    File,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub store_type: StoreType,
    /// Snapshot directory for the file backend
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn memory() -> Self {
        Self {
            store_type: StoreType::Memory,
            path: None,
        }
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            store_type: StoreType::File,
            path: Some(path.into()),
        }
    }
}
