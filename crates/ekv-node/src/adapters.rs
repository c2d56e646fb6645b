//! # Reset Probe Adapter
//!
//! Lets the allocator ask the local block manager whether a block it is
//! about to take back has really been reset.

use std::sync::Arc;

use ekv_01_storage_block::BlockManager;
use ekv_02_block_allocator::BlockResetProbe;

/// `BlockResetProbe` backed by a `BlockManager`.
pub struct ManagerResetProbe {
    manager: Arc<BlockManager>,
}

impl ManagerResetProbe {
    pub fn new(manager: Arc<BlockManager>) -> Self {
        Self { manager }
    }
}

impl BlockResetProbe for ManagerResetProbe {
    fn is_unallocated(&self, block_name: &str) -> bool {
        self.manager.is_unallocated(block_name)
    }
}
