//! # Block Allocator Service
//!
//! Every pool mutation is one short critical section under the pool mutex.
//! The reset probe is consulted with the mutex released, so a slow block
//! lookup never stalls `allocate`. `free` asks it again after the release
//! to catch a block set up in between.


use std::sync::Arc;

use parking_lot::Mutex;
use shared_types::BlockName;
use tracing::{debug, info, warn};

use crate::domain::{AllocatorConfig, AllocatorError, BlockPool};
use crate::ports::inbound::BlockAllocationApi;
use crate::ports::outbound::BlockResetProbe;

/// Thread-safe pool of free storage blocks.
pub struct BlockAllocator {
    config: AllocatorConfig,
    pool: Mutex<BlockPool>,
    probe: Option<Arc<dyn BlockResetProbe>>,
}

impl BlockAllocator {
    /// Create an allocator seeded with `config.initial_blocks`.
    pub fn new(config: AllocatorConfig) -> Result<Self, AllocatorError> {
        let pool = BlockPool::with_blocks(&config.initial_blocks)?;
        info!(
            "[ekv-02] Block allocator started with {} free blocks",
            pool.num_free()
        );
        Ok(Self {
            config,
            pool: Mutex::new(pool),
            probe: None,
        })
    }

    /// Consult `probe` before returning blocks to the pool.
    pub fn with_probe(mut self, probe: Arc<dyn BlockResetProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn config(&self) -> &AllocatorConfig {
        &self.config
    }
}

impl BlockAllocationApi for BlockAllocator {
    fn allocate(&self) -> Result<BlockName, AllocatorError> {
        let name = self.pool.lock().allocate().inspect_err(|_| {
            warn!("[ekv-02] Allocation refused: no free blocks");
        })?;
        debug!("[ekv-02] Allocated block {}", name);
        Ok(name)
    }

    fn allocate_many(
        &self,
        count: usize,
        exclude: &[BlockName],
    ) -> Result<Vec<BlockName>, AllocatorError> {
        let names = self
            .pool
            .lock()
            .allocate_many(count, exclude)
            .inspect_err(|e| warn!("[ekv-02] Allocation of {} blocks refused: {}", count, e))?;
        debug!("[ekv-02] Allocated blocks {:?}", names);
        Ok(names)
    }

    /// The probe runs with the pool unlocked, so a block can be set up
    /// again between the check and the release. It is asked a second time
    /// after the release; if the block went live meanwhile it is taken back
    /// out of the free queue and `StillLive` is returned.
    fn free(&self, block_name: &str) -> Result<(), AllocatorError> {
        self.pool.lock().check_allocated(block_name)?;

        let probe = self
            .probe
            .as_ref()
            .filter(|_| self.config.strict_reset_check);
        if let Some(probe) = probe {
            if !probe.is_unallocated(block_name) {
                warn!(
                    "[ekv-02] Refusing to free {}: block has not been reset",
                    block_name
                );
                return Err(AllocatorError::StillLive(block_name.to_string()));
            }
        }

        self.pool.lock().release(block_name)?;

        if let Some(probe) = probe {
            if !probe.is_unallocated(block_name) {
                if self.pool.lock().reclaim(block_name) {
                    warn!(
                        "[ekv-02] Block {} was set up again while being freed, keeping it allocated",
                        block_name
                    );
                    return Err(AllocatorError::StillLive(block_name.to_string()));
                }
                // Already handed out again; the new owner set it up.
                debug!("[ekv-02] Block {} reallocated while being freed", block_name);
                return Ok(());
            }
        }
        debug!("[ekv-02] Freed block {}", block_name);
        Ok(())
    }

    fn add_blocks(&self, block_names: &[BlockName]) -> Result<(), AllocatorError> {
        self.pool.lock().add(block_names)?;
        info!("[ekv-02] Added {} blocks to the pool", block_names.len());
        Ok(())
    }

    fn remove_blocks(&self, block_names: &[BlockName]) -> Result<(), AllocatorError> {
        self.pool.lock().remove(block_names)?;
        info!("[ekv-02] Removed {} blocks from the pool", block_names.len());
        Ok(())
    }

    fn num_free(&self) -> usize {
        self.pool.lock().num_free()
    }

    fn num_allocated(&self) -> usize {
        self.pool.lock().num_allocated()
    }

    fn num_total(&self) -> usize {
        self.pool.lock().num_total()
    }
}
