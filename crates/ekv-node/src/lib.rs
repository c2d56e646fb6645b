//! # Elastic-KV Storage Node
//!
//! Wires one storage server: a `BlockManager` hosting `num_blocks` physical
//! blocks over a local filesystem backing store, and the `BlockAllocator`
//! pool those blocks are handed out from.
//!
//! ## Startup Sequence
//!
//! 1. Load configuration (defaults + `EKV_*` environment)
//! 2. Validate it
//! 3. Host the blocks, register them with the transport
//! 4. Seed the allocator with the block names, probing the manager on `free`
//! 5. Wait for Ctrl+C

pub mod adapters;
pub mod config;

use std::sync::Arc;

use anyhow::{Context, Result};
use ekv_01_storage_block::{BlockManager, InProcessTransport, LocalFsBackingStore};
use ekv_02_block_allocator::{AllocatorConfig, BlockAllocationApi, BlockAllocator};
use tracing::info;

pub use crate::adapters::ManagerResetProbe;
pub use crate::config::{load_config, load_config_from, ConfigError, NodeConfig};

/// One running storage server.
pub struct NodeRuntime {
    config: NodeConfig,
    manager: Arc<BlockManager>,
    allocator: Arc<BlockAllocator>,
    transport: Arc<InProcessTransport>,
}

impl NodeRuntime {
    /// Host the configured blocks and build the allocator over them.
    pub fn new(config: NodeConfig) -> Result<Self> {
        config.validate().context("invalid node configuration")?;

        let store = Arc::new(LocalFsBackingStore::new(config.data_dir.clone()));
        let transport = Arc::new(InProcessTransport::new());
        let manager = Arc::new(BlockManager::new(
            config.block.clone(),
            store,
            transport.clone(),
        ));

        let names = config.block_names();
        for name in &names {
            manager
                .add_block(name.clone())
                .with_context(|| format!("failed to host block {}", name))?;
        }
        transport.register(names.clone(), &manager);

        let probe = Arc::new(ManagerResetProbe::new(manager.clone()));
        let allocator = BlockAllocator::new(AllocatorConfig::with_blocks(names))
            .context("failed to seed block allocator")?
            .with_probe(probe);

        info!(
            "Node {}:{} hosting {} blocks under {}",
            config.host,
            config.port,
            config.num_blocks,
            config.data_dir.display()
        );

        Ok(Self {
            config,
            manager,
            allocator: Arc::new(allocator),
            transport,
        })
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn manager(&self) -> Arc<BlockManager> {
        Arc::clone(&self.manager)
    }

    pub fn allocator(&self) -> Arc<BlockAllocator> {
        Arc::clone(&self.allocator)
    }

    pub fn transport(&self) -> Arc<InProcessTransport> {
        Arc::clone(&self.transport)
    }

    /// Log what is still allocated; block state lives in memory and is
    /// only persisted by explicit `sync`/`dump` calls.
    pub fn shutdown(&self) {
        info!(
            "Shutting down: {} of {} blocks allocated",
            self.allocator.num_allocated(),
            self.allocator.num_total()
        );
    }
}
