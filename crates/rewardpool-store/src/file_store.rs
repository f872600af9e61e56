use {
    crate::traits::SnapshotStore,
    anyhow::{anyhow, bail, Context, Result},
    async_trait::async_trait,
    rewardpool_common::{
        utils::{address_to_string, current_timestamp, format_timestamp, string_to_address},
        Address,
    },
    rewardpool_engine::PoolSnapshot,
    serde::{Deserialize, Serialize},
    std::{
        io::ErrorKind,
        path::{Path, PathBuf},
    },
    tracing::{debug, info},
};

const SNAPSHOT_EXTENSION: &str = "snap";
const FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    format_version: u32,
    saved_at: i64,
    snapshot: PoolSnapshot,
}

/// One bincode file per pool under a root directory. Writes go to a
/// temporary file that is renamed over the previous snapshot.
#[derive(Clone, Debug)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        if !root.exists() {
            std::fs::create_dir_all(&root)
                .with_context(|| format!("creating snapshot directory {}", root.display()))?;
        }
        info!("Snapshot store opened at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, pool: &Address) -> PathBuf {
        self.root
            .join(format!("{}.{}", address_to_string(pool), SNAPSHOT_EXTENSION))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn save(&self, pool: &Address, snapshot: &PoolSnapshot) -> Result<()> {
        snapshot
            .check_invariants()
            .map_err(|violation| anyhow!("refusing to persist snapshot for {}: {}", pool, violation))?;

        let file = SnapshotFile {
            format_version: FORMAT_VERSION,
            saved_at: current_timestamp(),
            snapshot: snapshot.clone(),
        };
        let bytes = bincode::serialize(&file).context("encoding snapshot")?;

        let path = self.path_for(pool);
        let tmp = path.with_extension(format!("{}.tmp", SNAPSHOT_EXTENSION));
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing {}", path.display()))?;

        debug!("Saved {} byte snapshot for {}", bytes.len(), pool);
        Ok(())
    }

    async fn load(&self, pool: &Address) -> Result<Option<PoolSnapshot>> {
        let path = self.path_for(pool);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };

        let file: SnapshotFile = bincode::deserialize(&bytes)
            .with_context(|| format!("decoding {}", path.display()))?;
        if file.format_version != FORMAT_VERSION {
            bail!(
                "{} has format version {}, expected {}",
                path.display(),
                file.format_version,
                FORMAT_VERSION
            );
        }
        if file.snapshot.state.address != *pool {
            bail!(
                "{} holds the snapshot of {}",
                path.display(),
                file.snapshot.state.address
            );
        }
        file.snapshot
            .check_invariants()
            .map_err(|violation| anyhow!("{} is inconsistent: {}", path.display(), violation))?;

        debug!(
            "Loaded snapshot for {} saved at {}",
            pool,
            format_timestamp(file.saved_at)
        );
        Ok(Some(file.snapshot))
    }

    async fn list(&self) -> Result<Vec<Address>> {
        let mut pools = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root)
            .await
            .with_context(|| format!("listing {}", self.root.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(stem) = name
                .to_str()
                .and_then(|n| n.strip_suffix(&format!(".{}", SNAPSHOT_EXTENSION)))
            else {
                continue;
            };
            match string_to_address(stem) {
                Ok(address) => pools.push(address),
                Err(e) => debug!("Skipping {:?}: {}", name, e),
            }
        }
        pools.sort();
        Ok(pools)
    }

    async fn remove(&self, pool: &Address) -> Result<()> {
        let path = self.path_for(pool);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing {}", path.display())),
        }
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rewardpool_common::{utils::address_from_label, AssetId, PoolConfig};
    use rewardpool_engine::StakerRecord;

    fn snapshot(label: &str) -> PoolSnapshot {
        let config = PoolConfig::new(AssetId(1), vec![AssetId(2)], address_from_label("admin"));
        let mut snapshot = PoolSnapshot::provision(address_from_label(label), &config);
        let mut record = StakerRecord::new(address_from_label("alice"));
        record.stake = 42;
        record.accrued[0] = 7;
        snapshot.registry.insert(record).unwrap();
        snapshot.state.total_staked = 42;
        snapshot.state.accrued_outstanding[0] = 7;
        snapshot.state.injected_rewards[0] = 3;
        snapshot
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let original = snapshot("pool");
        let pool = original.state.address;

        assert!(store.load(&pool).await.unwrap().is_none());
        store.save(&pool, &original).await.unwrap();
        assert_eq!(store.load(&pool).await.unwrap(), Some(original.clone()));

        let mut updated = original;
        updated.state.injected_rewards[0] = 99;
        store.save(&pool, &updated).await.unwrap();
        assert_eq!(store.load(&pool).await.unwrap(), Some(updated));
    }

    #[tokio::test]
    async fn test_rejects_inconsistent_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let mut broken = snapshot("pool");
        broken.state.total_staked += 1;

        let err = store.save(&broken.state.address, &broken).await.unwrap_err();
        assert!(err.to_string().contains("total_staked"));
        assert!(store.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_under_wrong_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let original = snapshot("pool");
        let other = address_from_label("other");

        store.save(&other, &original).await.unwrap();
        assert!(store.load(&other).await.is_err());
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let pool = address_from_label("pool");
        std::fs::write(store.path_for(&pool), b"not a snapshot").unwrap();

        assert!(store.load(&pool).await.is_err());
    }

    #[tokio::test]
    async fn test_list_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();
        let a = snapshot("a");
        let b = snapshot("b");
        store.save(&a.state.address, &a).await.unwrap();
        store.save(&b.state.address, &b).await.unwrap();
        std::fs::write(store.root().join("notes.txt"), b"ignored").unwrap();

        let mut expected = vec![a.state.address, b.state.address];
        expected.sort();
        assert_eq!(store.list().await.unwrap(), expected);

        store.remove(&a.state.address).await.unwrap();
        store.remove(&a.state.address).await.unwrap();
        assert_eq!(store.list().await.unwrap(), vec![b.state.address]);
    }
}
