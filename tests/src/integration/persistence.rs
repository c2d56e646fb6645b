//! # Persistence Flows
//!
//! dump/load through the filesystem backing store, and block recycling.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ekv_01_storage_block::{
        BlockConfig, BlockError, BlockManager, InProcessTransport, LocalFsBackingStore,
        PhaseStatus,
    };
    use shared_types::{ChainRole, WriteOp};

    use crate::integration::fixtures::Cluster;

    fn fs_manager(root: &std::path::Path, blocks: &[&str]) -> Arc<BlockManager> {
        let transport = Arc::new(InProcessTransport::new());
        let manager = Arc::new(BlockManager::new(
            BlockConfig::for_testing(),
            Arc::new(LocalFsBackingStore::new(root)),
            transport.clone(),
        ));
        for block in blocks {
            manager.add_block(*block).unwrap();
        }
        transport.register(manager.block_names(), &manager);
        manager
    }

    fn setup(manager: &BlockManager, block: &str, begin: u32, end: u32) {
        manager
            .setup_block(block, "local://ignored", begin, end, &[block.to_string()], false, ChainRole::Singleton, "")
            .unwrap();
    }

    #[tokio::test]
    async fn test_dump_then_load_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let manager = fs_manager(dir.path(), &["b"]);
        setup(&manager, "b", 0, 500);

        for i in 0..200u32 {
            let op = WriteOp::put(format!("key-{}", i), format!("value-{}", i * 7));
            manager.submit_write("b", i, op).await.unwrap();
        }
        manager
            .submit_write("b", 3, WriteOp::remove("key-3"))
            .await
            .unwrap();
        let size = manager.storage_size("b").unwrap();

        manager.dump("b", "local://snapshots/b").await.unwrap();
        assert!(dir.path().join("snapshots/b").exists());
        assert_eq!(manager.storage_size("b").unwrap(), 0);

        setup(&manager, "b", 0, 500);
        manager.load("b", "local://snapshots/b").await.unwrap();
        assert_eq!(manager.storage_size("b").unwrap(), size);
        for i in 0..200u32 {
            let expected = (i != 3).then(|| format!("value-{}", i * 7).into_bytes());
            assert_eq!(manager.read("b", i, format!("key-{}", i).as_bytes()).unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_load_into_smaller_range_drops_foreign_keys() {
        let dir = tempfile::tempdir().unwrap();
        let manager = fs_manager(dir.path(), &["b", "c"]);
        setup(&manager, "b", 0, 100);
        manager.submit_write("b", 10, WriteOp::put("low", "1")).await.unwrap();
        manager.submit_write("b", 90, WriteOp::put("high", "2")).await.unwrap();
        manager.sync("b", "local://b").await.unwrap();

        setup(&manager, "c", 0, 50);
        manager.load("c", "local://b").await.unwrap();
        assert_eq!(manager.read("c", 10, b"low").unwrap(), Some(b"1".to_vec()));
        assert_eq!(manager.storage_size("c").unwrap(), 4);
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let manager = fs_manager(dir.path(), &["b"]);
        setup(&manager, "b", 0, 100);
        manager.submit_write("b", 1, WriteOp::put("k", "v")).await.unwrap();

        assert!(matches!(
            manager.load("b", "local://nothing-here").await,
            Err(BlockError::Io(_))
        ));
        assert!(matches!(
            manager.load("b", "s3://bucket/b").await,
            Err(BlockError::Io(_))
        ));
        assert_eq!(manager.read("b", 1, b"k").unwrap(), Some(b"v".to_vec()));
    }

    /// A recycled block looks exactly like one that was never used.
    #[tokio::test]
    async fn test_reset_then_setup_matches_fresh_block() {
        let cluster = Cluster::new(&[&["used", "fresh", "peer"]]);
        cluster.setup_singleton("used", 0, 100);
        for i in 0..30u32 {
            cluster.put("used", i, &format!("k{}", i), "v").await.unwrap();
        }
        cluster.setup_singleton("peer", 100, 200);
        cluster.prepare_migration("peer", &["used"], 150, 200);

        let server = cluster.server("used");
        server.reset("used").unwrap();
        server.reset("used").unwrap();

        cluster.setup_singleton("used", 300, 400);
        cluster.setup_singleton("fresh", 300, 400);

        let mut used = server.status("used").unwrap();
        let fresh = server.status("fresh").unwrap();
        assert_eq!(used.phase, PhaseStatus::Regular);
        used.name = fresh.name.clone();
        used.path = fresh.path.clone();
        used.chain = fresh.chain.clone();
        assert_eq!(used, fresh);
        assert_eq!(cluster.get("used", 310, "k10"), None);
    }
}
