use std::collections::HashSet;

use parking_lot::RwLock;
use shared_types::BlockName;

use crate::ports::outbound::BlockResetProbe;

/// Reset probe driven by hand: blocks are reset unless marked live.
#[derive(Debug, Default)]
pub struct StaticResetProbe {
    live: RwLock<HashSet<BlockName>>,
}

impl StaticResetProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_live(&self, block_name: &str) {
        self.live.write().insert(block_name.to_string());
    }

    pub fn mark_reset(&self, block_name: &str) {
        self.live.write().remove(block_name);
    }
}

impl BlockResetProbe for StaticResetProbe {
    fn is_unallocated(&self, block_name: &str) -> bool {
        !self.live.read().contains(block_name)
    }
}
