//! # Allocation Flows
//!
//! The allocator as wired by the node: block names come from the hosted
//! manager, and `free` asks the manager whether the block was reset.

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::time::Duration;

    use ekv_02_block_allocator::{AllocatorError, BlockAllocationApi};
    use ekv_node::{NodeConfig, NodeRuntime};
    use rand::Rng;
    use shared_types::{ChainRole, WriteOp};

    fn node(dir: &std::path::Path, blocks: usize) -> NodeRuntime {
        NodeRuntime::new(NodeConfig {
            data_dir: dir.to_path_buf(),
            num_blocks: blocks,
            ..NodeConfig::default()
        })
        .unwrap()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_allocate_never_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let node = node(dir.path(), 32);
        let allocator = node.allocator();

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let allocator = allocator.clone();
                tokio::spawn(async move {
                    let mut got = Vec::new();
                    loop {
                        let pause = rand::thread_rng().gen_range(0..50);
                        tokio::time::sleep(Duration::from_micros(pause)).await;
                        match allocator.allocate() {
                            Ok(name) => got.push(name),
                            Err(AllocatorError::NoCapacity { .. }) => break,
                            Err(e) => panic!("unexpected: {}", e),
                        }
                    }
                    got
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for task in tasks {
            for name in task.await.unwrap() {
                assert!(seen.insert(name.clone()), "{} allocated twice", name);
            }
        }
        assert_eq!(seen.len(), 32);
        assert_eq!(allocator.num_allocated(), 32);
    }

    #[tokio::test]
    async fn test_chain_lifecycle_through_allocator() {
        let dir = tempfile::tempdir().unwrap();
        let node = node(dir.path(), 4);
        let allocator = node.allocator();
        let manager = node.manager();

        let chain = allocator.allocate_many(3, &[]).unwrap();
        for (i, block) in chain.iter().enumerate() {
            let next = chain.get(i + 1).map(String::as_str).unwrap_or("");
            manager
                .setup_block(
                    block,
                    &format!("local://{}", i),
                    0,
                    1000,
                    &chain,
                    true,
                    ChainRole::for_position(i, chain.len()),
                    next,
                )
                .unwrap();
        }
        manager
            .submit_write(&chain[0], 5, WriteOp::put("k", "v"))
            .await
            .unwrap();
        assert_eq!(manager.read(&chain[2], 5, b"k").unwrap(), Some(b"v".to_vec()));

        for block in &chain {
            assert_eq!(
                allocator.free(block),
                Err(AllocatorError::StillLive(block.clone()))
            );
        }

        for block in &chain {
            manager.reset(block).unwrap();
            allocator.free(block).unwrap();
        }
        assert_eq!(allocator.num_free(), 4);

        // Freed blocks go to the back of the queue.
        let next = allocator.allocate().unwrap();
        assert!(!chain.contains(&next));
    }

    #[tokio::test]
    async fn test_pool_grows_with_new_server_blocks() {
        let dir = tempfile::tempdir().unwrap();
        let node = node(dir.path(), 2);
        let allocator = node.allocator();

        allocator.allocate_many(2, &[]).unwrap();
        assert!(matches!(
            allocator.allocate(),
            Err(AllocatorError::NoCapacity { .. })
        ));

        allocator
            .add_blocks(&["10.0.0.2:9090:0".to_string()])
            .unwrap();
        assert_eq!(allocator.allocate().unwrap(), "10.0.0.2:9090:0");
        assert_eq!(allocator.num_total(), 3);
    }
}
