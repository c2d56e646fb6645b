//! # Block Manager Service
//!
//! Hosts a set of named storage blocks and runs every operation against
//! them. Each block sits behind its own `RwLock`; there is no lock spanning
//! blocks. Guards are never held across an `.await`: operations that touch
//! the backing store or a peer split into short locked transitions around
//! the I/O, and re-check the block generation when they come back.
//!
//! Writes leave a block through its forwarding lane, an async mutex held
//! from the moment a write is sequenced until the successor has it. The
//! successor therefore sees one block's writes in sequence order.
//!
//! ## Modules
//!
//! - `lifecycle` - setup, reset, migration marks, queries
//! - `persistence` - load / sync / dump
//! - `migration` - export_slots and the import side of the handshake
//! - `replication` - client writes, chain forwarding, pending replay
//! - `api` - inbound port implementations

mod api;
mod lifecycle;
mod migration;
mod persistence;
mod replication;


use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use shared_types::BlockName;
use tokio::sync::Mutex as AsyncMutex;
use tracing::info;

use crate::domain::{BlockConfig, BlockError, StorageBlock};
use crate::ports::outbound::{AutoScaler, BackingStore, BlockTransport, NoopScaler};

type SharedBlock = Arc<RwLock<StorageBlock>>;
type ForwardLane = Arc<AsyncMutex<()>>;

/// Registry and driver of the blocks hosted by one storage server.
pub struct BlockManager {
    config: BlockConfig,
    blocks: RwLock<HashMap<BlockName, SharedBlock>>,
    lanes: RwLock<HashMap<BlockName, ForwardLane>>,
    store: Arc<dyn BackingStore>,
    transport: Arc<dyn BlockTransport>,
    scaler: Arc<dyn AutoScaler>,
}

impl BlockManager {
    /// Create a manager hosting no blocks.
    pub fn new(
        config: BlockConfig,
        store: Arc<dyn BackingStore>,
        transport: Arc<dyn BlockTransport>,
    ) -> Self {
        Self {
            config,
            blocks: RwLock::new(HashMap::new()),
            lanes: RwLock::new(HashMap::new()),
            store,
            transport,
            scaler: Arc::new(NoopScaler),
        }
    }

    /// Send auto-scale split requests to `scaler`.
    pub fn with_scaler(mut self, scaler: Arc<dyn AutoScaler>) -> Self {
        self.scaler = scaler;
        self
    }

    pub fn config(&self) -> &BlockConfig {
        &self.config
    }

    /// Host a new, unallocated block.
    pub fn add_block(&self, name: impl Into<BlockName>) -> Result<(), BlockError> {
        let name = name.into();
        let mut blocks = self.blocks.write();
        if blocks.contains_key(&name) {
            return Err(BlockError::state(&name, "add_block", "block is already hosted"));
        }
        let block = StorageBlock::new(name.clone(), self.config.clone());
        blocks.insert(name.clone(), Arc::new(RwLock::new(block)));
        self.lanes.write().insert(name.clone(), Arc::default());
        info!("[ekv-01] Hosting block {}", name);
        Ok(())
    }

    /// Names of hosted blocks, sorted.
    pub fn block_names(&self) -> Vec<BlockName> {
        let mut names: Vec<_> = self.blocks.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn hosts(&self, name: &str) -> bool {
        self.blocks.read().contains_key(name)
    }

    /// Check if a hosted block is unallocated. Unknown names count as not.
    pub fn is_unallocated(&self, name: &str) -> bool {
        self.block(name)
            .map(|block| !block.read().is_allocated())
            .unwrap_or(false)
    }

    fn lane(&self, name: &str) -> Result<ForwardLane, BlockError> {
        self.lanes
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BlockError::UnknownBlock(name.to_string()))
    }

    fn block(&self, name: &str) -> Result<SharedBlock, BlockError> {
        self.blocks
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| BlockError::UnknownBlock(name.to_string()))
    }
}
