//! # Slot Migration Flows
//!
//! The export/import handshake between blocks hosted on different servers,
//! driven the way the rebalancing authority drives it.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ekv_01_storage_block::{BlockError, FaultPoint, PhaseStatus};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared_types::{SlotRange, SLOT_MAX};

    use crate::integration::fixtures::Cluster;

    fn range(begin: u32, end: u32) -> SlotRange {
        SlotRange::new(begin, end).unwrap()
    }

    #[tokio::test]
    async fn test_subrange_moves_between_servers() {
        let cluster = Cluster::new(&[&["s1:0"], &["s2:0"]]);
        cluster.setup_singleton("s1:0", 0, 100);
        cluster.setup_singleton("s2:0", 100, 200);
        for slot in 0..100 {
            cluster.put("s1:0", slot, &format!("k{}", slot), "v").await.unwrap();
        }
        let before = cluster.server("s1:0").storage_size("s1:0").unwrap();

        cluster.migrate("s1:0", &["s2:0"], 10, 20).await.unwrap();

        let source = cluster.server("s1:0").owned_slots("s1:0").unwrap();
        let target = cluster.server("s2:0").owned_slots("s2:0").unwrap();
        assert_eq!(source.ranges(), &[range(0, 10), range(20, 100)]);
        assert_eq!(target.ranges(), &[range(10, 20), range(100, 200)]);
        for slot in 10..20 {
            assert_eq!(cluster.get("s2:0", slot, &format!("k{}", slot)), Some("v".into()));
        }
        let after = cluster.server("s1:0").storage_size("s1:0").unwrap()
            + cluster.server("s2:0").storage_size("s2:0").unwrap();
        assert_eq!(before, after);
        assert!(cluster.check_single_ownership().is_ok());
    }

    #[tokio::test]
    async fn test_crash_before_confirmation_leaves_both_marks() {
        let cluster = Cluster::new(&[&["s1:0"], &["s2:0"]]);
        cluster.setup_singleton("s1:0", 0, 100);
        cluster.setup_singleton("s2:0", 100, 200);
        cluster.put("s1:0", 12, "key", "old").await.unwrap();

        cluster.prepare_migration("s1:0", &["s2:0"], 10, 20);
        cluster.transport.inject_fault("s2:0", FaultPoint::Confirm);
        let err = cluster.export("s1:0").await.unwrap_err();
        assert!(matches!(err, BlockError::MigrationAborted { .. }));

        // Reconciliation view: both still carry their provisional mark.
        let source = cluster.server("s1:0").status("s1:0").unwrap();
        let target = cluster.server("s2:0").status("s2:0").unwrap();
        assert!(matches!(
            source.phase,
            PhaseStatus::Exporting { range: r, committed: false, .. } if r == range(10, 20)
        ));
        assert!(matches!(
            target.phase,
            PhaseStatus::Importing { range: r, confirmed: false, .. } if r == range(10, 20)
        ));
        assert_eq!(cluster.server("s1:0").slot_range("s1:0").unwrap(), (0, 100));
        assert_eq!(cluster.server("s2:0").slot_range("s2:0").unwrap(), (10, 200));
        assert!(cluster.check_single_ownership().is_ok());

        // Source keeps serving the range until the retry.
        cluster.put("s1:0", 12, "key", "new").await.unwrap();

        cluster.transport.clear_faults();
        cluster.export("s1:0").await.unwrap();
        cluster.finalize_migration("s1:0", &["s2:0"], 10, 20);
        assert_eq!(cluster.get("s2:0", 12, "key"), Some("new".into()));
    }

    #[tokio::test]
    async fn test_importer_reset_aborts_and_authority_rolls_back() {
        let cluster = Cluster::new(&[&["s1:0"], &["s2:0"]]);
        cluster.setup_singleton("s1:0", 0, 100);
        cluster.put("s1:0", 15, "key", "v").await.unwrap();

        cluster.prepare_migration("s1:0", &["s2:0"], 10, 20);
        cluster.server("s2:0").reset("s2:0").unwrap();

        let err = cluster.export("s1:0").await.unwrap_err();
        assert!(matches!(err, BlockError::MigrationAborted { .. }));

        cluster.server("s1:0").set_regular("s1:0", 10, 20).unwrap();
        assert_eq!(
            cluster.server("s1:0").owned_slots("s1:0").unwrap().ranges(),
            &[range(0, 100)]
        );
        assert_eq!(cluster.get("s1:0", 15, "key"), Some("v".into()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_writes_during_export_are_not_lost() {
        let cluster = Arc::new(Cluster::new(&[&["s1:0"], &["s2:0"]]));
        cluster.setup_singleton("s1:0", 0, 100);
        for slot in 10..20 {
            cluster.put("s1:0", slot, &format!("seed{}", slot), "v").await.unwrap();
        }
        cluster.prepare_migration("s1:0", &["s2:0"], 10, 20);

        let writer = {
            let cluster = cluster.clone();
            tokio::spawn(async move {
                let mut accepted = Vec::new();
                for i in 0..300u32 {
                    let slot = 10 + i % 10;
                    let key = format!("live{}", i);
                    match cluster.put("s1:0", slot, &key, "v").await {
                        Ok(_) => accepted.push((slot, key)),
                        Err(BlockError::SlotNotReady { .. }) | Err(BlockError::Moved { .. }) => {}
                        Err(e) => panic!("unexpected write failure: {}", e),
                    }
                    tokio::task::yield_now().await;
                }
                accepted
            })
        };

        cluster.export("s1:0").await.unwrap();
        let accepted = writer.await.unwrap();
        cluster.finalize_migration("s1:0", &["s2:0"], 10, 20);

        for slot in 10..20 {
            assert_eq!(cluster.get("s2:0", slot, &format!("seed{}", slot)), Some("v".into()));
        }
        for (slot, key) in accepted {
            assert_eq!(cluster.get("s2:0", slot, &key), Some("v".into()), "{}", key);
        }
    }

    #[tokio::test]
    async fn test_export_to_replicated_target_chain() {
        let cluster = Cluster::new(&[&["s1:0"], &["s2:0", "s2:1"], &["s3:0"]]);
        cluster.setup_singleton("s1:0", 0, 100);
        for slot in 40..60 {
            cluster.put("s1:0", slot, &format!("k{}", slot), "v").await.unwrap();
        }

        cluster
            .migrate("s1:0", &["s2:0", "s3:0"], 50, 100)
            .await
            .unwrap();

        for block in ["s2:0", "s3:0"] {
            assert_eq!(cluster.server(block).slot_range(block).unwrap(), (50, 100));
            assert_eq!(cluster.get(block, 55, "k55"), Some("v".into()));
        }

        // The new chain takes writes at its head.
        cluster.put("s2:0", 70, "fresh", "v").await.unwrap();
        assert_eq!(cluster.get("s3:0", 70, "fresh"), Some("v".into()));
    }

    /// Repeatedly halve a random block's highest range into an unused
    /// block, sometimes crashing the first attempt.
    #[tokio::test]
    async fn test_random_splits_keep_single_ownership() {
        let blocks: Vec<String> = (0..12).map(|i| format!("s1:{}", i)).collect();
        let layout: Vec<&str> = blocks.iter().map(String::as_str).collect();
        let cluster = Cluster::new(&[&layout]);
        cluster.setup_singleton("s1:0", 0, SLOT_MAX);

        let mut rng = StdRng::seed_from_u64(7);
        for step in 1..blocks.len() {
            let target = blocks[step].as_str();
            let owners = cluster.ownership();
            let candidates: Vec<_> = owners
                .iter()
                .filter_map(|(name, owned)| {
                    let last = *owned.ranges().last()?;
                    last.halves().map(|(_, upper)| (name.clone(), upper))
                })
                .collect();
            let (source, moved) = candidates[rng.gen_range(0..candidates.len())].clone();
            let key = format!("step{}", step);
            cluster.put(&source, moved.begin(), &key, "v").await.unwrap();

            cluster.prepare_migration(&source, &[target], moved.begin(), moved.end());
            if rng.gen_bool(0.3) {
                cluster.transport.inject_fault(target, FaultPoint::Confirm);
                assert!(cluster.export(&source).await.is_err());
                assert!(cluster.check_single_ownership().is_ok());
                cluster.transport.clear_faults();
            }
            cluster.export(&source).await.unwrap();
            cluster.finalize_migration(&source, &[target], moved.begin(), moved.end());

            assert!(cluster.check_single_ownership().is_ok(), "step {}", step);
            assert!(cluster.covers_keyspace(), "step {}", step);
            assert_eq!(cluster.get(target, moved.begin(), &key), Some("v".into()));
        }
    }
}
