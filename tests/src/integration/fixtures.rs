//! # Test Fixtures
//!
//! A cluster of storage servers, each a `BlockManager`, sharing one
//! in-process transport and one in-memory backing store, plus the steps the
//! rebalancing authority takes to move a slot range.

use std::sync::Arc;

use ekv_01_storage_block::{
    invariant_full_coverage, invariant_no_double_ownership, BackingStore, BlockConfig,
    BlockError, BlockManager, DoubleOwnership, InMemoryBackingStore, InProcessTransport,
};
use shared_types::{BlockName, ChainRole, Slot, SlotSet, WriteOp};

/// Storage servers wired to a shared transport.
pub struct Cluster {
    pub transport: Arc<InProcessTransport>,
    pub store: Arc<InMemoryBackingStore>,
    servers: Vec<Arc<BlockManager>>,
}

impl Cluster {
    /// One server per entry of `layout`, hosting the listed blocks.
    pub fn new(layout: &[&[&str]]) -> Self {
        Self::with_config(BlockConfig::for_testing(), layout)
    }

    pub fn with_config(config: BlockConfig, layout: &[&[&str]]) -> Self {
        let transport = Arc::new(InProcessTransport::new());
        let store = Arc::new(InMemoryBackingStore::new());
        let backing: Arc<dyn BackingStore> = store.clone();

        let servers = layout
            .iter()
            .map(|blocks| {
                let manager = Arc::new(BlockManager::new(
                    config.clone(),
                    backing.clone(),
                    transport.clone(),
                ));
                for name in blocks.iter() {
                    manager
                        .add_block(*name)
                        .unwrap_or_else(|e| panic!("hosting {}: {}", name, e));
                }
                transport.register(manager.block_names(), &manager);
                manager
            })
            .collect();

        Self {
            transport,
            store,
            servers,
        }
    }

    /// Manager hosting `block`.
    pub fn server(&self, block: &str) -> &BlockManager {
        self.servers
            .iter()
            .find(|m| m.hosts(block))
            .unwrap_or_else(|| panic!("no server hosts {}", block))
    }

    /// Every hosted block name.
    pub fn block_names(&self) -> Vec<BlockName> {
        let mut names: Vec<_> = self.servers.iter().flat_map(|m| m.block_names()).collect();
        names.sort();
        names
    }

    /// Set up a standalone block owning `[begin, end)`.
    pub fn setup_singleton(&self, block: &str, begin: Slot, end: Slot) {
        self.server(block)
            .setup_block(
                block,
                &format!("local://{}", block),
                begin,
                end,
                &[block.to_string()],
                false,
                ChainRole::Singleton,
                "",
            )
            .unwrap();
    }

    /// Set up `members` as one chain owning `[begin, end)`.
    pub fn setup_chain(&self, members: &[&str], begin: Slot, end: Slot) {
        let chain = names(members);
        for (i, block) in members.iter().enumerate() {
            let role = ChainRole::for_position(i, members.len());
            let next = members.get(i + 1).copied().unwrap_or("");
            self.server(block)
                .setup_block(
                    block,
                    &format!("local://{}", block),
                    begin,
                    end,
                    &chain,
                    false,
                    role,
                    next,
                )
                .unwrap();
        }
    }

    pub async fn put(&self, block: &str, slot: Slot, key: &str, value: &str) -> Result<u64, BlockError> {
        self.server(block)
            .submit_write(block, slot, WriteOp::put(key.as_bytes(), value.as_bytes()))
            .await
    }

    pub fn get(&self, block: &str, slot: Slot, key: &str) -> Option<String> {
        self.server(block)
            .read(block, slot, key.as_bytes())
            .unwrap_or_else(|e| panic!("read {} on {}: {}", key, block, e))
            .map(|v| String::from_utf8_lossy(&v).into_owned())
    }

    /// Owned slots of every allocated block.
    pub fn ownership(&self) -> Vec<(BlockName, SlotSet)> {
        self.block_names()
            .into_iter()
            .filter_map(|name| {
                let owned = self.server(&name).owned_slots(&name).ok()?;
                Some((name, owned))
            })
            .collect()
    }

    pub fn check_single_ownership(&self) -> Result<(), DoubleOwnership> {
        invariant_no_double_ownership(&self.ownership())
    }

    pub fn covers_keyspace(&self) -> bool {
        invariant_full_coverage(&self.ownership())
    }

    /// Mark the target IMPORTING, then the source EXPORTING.
    pub fn prepare_migration(&self, source: &str, target: &[&str], begin: Slot, end: Slot) {
        for block in target {
            let server = self.server(block);
            if server.is_unallocated(block) {
                let chain = names(target);
                let position = target.iter().position(|b| b == block).unwrap_or(0);
                let next = target.get(position + 1).copied().unwrap_or("");
                server
                    .setup_and_set_importing(
                        block,
                        &format!("local://{}", block),
                        begin,
                        end,
                        &chain,
                        ChainRole::for_position(position, target.len()),
                        next,
                    )
                    .unwrap();
            } else {
                server.set_importing(block, begin, end).unwrap();
            }
        }
        self.server(source)
            .set_exporting(source, &names(target), begin, end)
            .unwrap();
    }

    pub async fn export(&self, source: &str) -> Result<(), BlockError> {
        self.server(source).export_slots(source).await
    }

    /// Clear the migration marks on both sides.
    pub fn finalize_migration(&self, source: &str, target: &[&str], begin: Slot, end: Slot) {
        self.server(source).set_regular(source, begin, end).unwrap();
        for block in target {
            self.server(block).set_regular(block, begin, end).unwrap();
        }
    }

    /// The four authority steps in order.
    pub async fn migrate(
        &self,
        source: &str,
        target: &[&str],
        begin: Slot,
        end: Slot,
    ) -> Result<(), BlockError> {
        self.prepare_migration(source, target, begin, end);
        self.export(source).await?;
        self.finalize_migration(source, target, begin, end);
        Ok(())
    }
}

pub fn names(list: &[&str]) -> Vec<BlockName> {
    list.iter().map(|s| s.to_string()).collect()
}
