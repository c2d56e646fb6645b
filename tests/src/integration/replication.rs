//! # Chain Replication Flows
//!
//! Replica failure and the chain reconfiguration that follows, with each
//! replica on its own server.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use shared_types::ChainRole;

    use crate::integration::fixtures::{names, Cluster};

    fn three_server_chain() -> Cluster {
        let cluster = Cluster::new(&[&["a"], &["b"], &["c"]]);
        cluster.setup_chain(&["a", "b", "c"], 0, 1000);
        cluster
    }

    #[tokio::test]
    async fn test_writes_reach_every_replica() {
        let cluster = three_server_chain();
        for i in 0..20u32 {
            cluster.put("a", i, &format!("k{}", i), "v").await.unwrap();
        }

        for block in ["a", "b", "c"] {
            assert_eq!(cluster.get(block, 19, "k19"), Some("v".into()));
            let status = cluster.server(block).status(block).unwrap();
            assert_eq!(status.pending_writes, 0, "{}", block);
        }
        assert_eq!(cluster.transport.deliveries("c"), (0..20).collect::<Vec<u64>>());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_writes_arrive_in_sequence_order() {
        let cluster = Arc::new(three_server_chain());
        for seq in (0..200u64).step_by(7) {
            cluster
                .transport
                .delay_replicate("b", seq, Duration::from_millis(2));
        }

        let tasks: Vec<_> = (0..8u32)
            .map(|t| {
                let cluster = cluster.clone();
                tokio::spawn(async move {
                    for i in 0..25u32 {
                        let slot = t * 100 + i;
                        cluster.put("a", slot, &format!("k{}", slot), "v").await.unwrap();
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        let expected: Vec<u64> = (0..200).collect();
        assert_eq!(cluster.transport.deliveries("b"), expected);
        assert_eq!(cluster.transport.deliveries("c"), expected);
        for t in 0..8u32 {
            for i in 0..25u32 {
                let slot = t * 100 + i;
                assert_eq!(cluster.get("c", slot, &format!("k{}", slot)), Some("v".into()));
            }
        }
        for block in ["a", "b"] {
            assert_eq!(cluster.server(block).status(block).unwrap().pending_writes, 0);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_write_during_tail_dump_stays_buffered() {
        let cluster = Arc::new(Cluster::new(&[&["a"], &["b"]]));
        cluster.setup_chain(&["a", "b"], 0, 100);
        cluster.put("a", 1, "early", "v").await.unwrap();
        cluster.store.delay_writes(Some(Duration::from_millis(50)));

        let dump = {
            let cluster = cluster.clone();
            tokio::spawn(async move { cluster.server("b").dump("b", "local://b").await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        cluster.put("a", 2, "late", "v").await.unwrap();
        dump.await.unwrap().unwrap();
        cluster.store.delay_writes(None);

        assert_eq!(cluster.server("a").status("a").unwrap().pending_writes, 1);

        cluster.setup_singleton("b", 0, 100);
        cluster.server("b").load("b", "local://b").await.unwrap();
        assert_eq!(cluster.get("b", 1, "early"), Some("v".into()));
        assert_eq!(cluster.get("b", 2, "late"), None);
        assert_eq!(cluster.get("a", 2, "late"), Some("v".into()));
    }

    #[tokio::test]
    async fn test_middle_failure_replays_in_submission_order() {
        let cluster = three_server_chain();
        for i in 0..5u32 {
            cluster.put("a", i, &format!("k{}", i), "v").await.unwrap();
        }

        cluster.transport.isolate("b");
        for i in 5..15u32 {
            cluster.put("a", i, &format!("tag{}", i), "v").await.unwrap();
        }
        assert_eq!(cluster.server("a").status("a").unwrap().pending_writes, 10);
        assert_eq!(cluster.get("c", 7, "tag7"), None);

        // Authority splices b out of the chain.
        let chain = names(&["a", "c"]);
        cluster
            .server("c")
            .reconfigure_chain("c", &chain, ChainRole::Tail, "")
            .await
            .unwrap();
        cluster
            .server("a")
            .reconfigure_chain("a", &chain, ChainRole::Head, "c")
            .await
            .unwrap();
        assert_eq!(cluster.server("a").resend_pending("a").await.unwrap(), 10);

        let arrived = cluster.transport.deliveries("c");
        assert_eq!(arrived[5..], (5..15).collect::<Vec<u64>>()[..]);
        assert_eq!(cluster.get("c", 14, "tag14"), Some("v".into()));
        assert_eq!(cluster.server("a").status("a").unwrap().pending_writes, 0);

        cluster.put("a", 20, "after", "v").await.unwrap();
        assert_eq!(cluster.get("c", 20, "after"), Some("v".into()));
    }

    #[tokio::test]
    async fn test_tail_failure_promotes_middle() {
        let cluster = three_server_chain();
        cluster.transport.isolate("c");
        for i in 0..6u32 {
            cluster.put("a", i, &format!("k{}", i), "v").await.unwrap();
        }
        assert_eq!(cluster.server("a").status("a").unwrap().pending_writes, 6);
        assert_eq!(cluster.server("b").status("b").unwrap().pending_writes, 6);

        // b becomes the tail and acknowledges what it holds.
        cluster
            .server("b")
            .reconfigure_chain("b", &names(&["a", "b"]), ChainRole::Tail, "")
            .await
            .unwrap();
        cluster
            .server("a")
            .reconfigure_chain("a", &names(&["a", "b"]), ChainRole::Head, "b")
            .await
            .unwrap();

        assert_eq!(cluster.server("a").status("a").unwrap().pending_writes, 0);
        assert_eq!(cluster.server("b").status("b").unwrap().pending_writes, 0);
        assert_eq!(cluster.get("b", 5, "k5"), Some("v".into()));

        cluster.put("a", 9, "next", "v").await.unwrap();
        assert_eq!(cluster.get("b", 9, "next"), Some("v".into()));
    }

    #[tokio::test]
    async fn test_drain_before_dump() {
        let cluster = Cluster::new(&[&["a"], &["b"]]);
        cluster.setup_chain(&["a", "b"], 0, 100);
        cluster.transport.isolate("b");
        for i in 0..4u32 {
            cluster.put("a", i, &format!("k{}", i), "v").await.unwrap();
        }
        assert!(cluster.server("a").dump("a", "local://a").await.is_err());

        cluster.transport.clear_faults();
        assert_eq!(cluster.server("a").forward_all("a").await.unwrap(), 4);
        cluster.server("a").dump("a", "local://a").await.unwrap();
        assert!(cluster.store.contains("local://a"));
        assert_eq!(cluster.get("b", 3, "k3"), Some("v".into()));
    }
}
