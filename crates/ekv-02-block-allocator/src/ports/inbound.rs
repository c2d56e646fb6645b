//! # Inbound Port - BlockAllocationApi
//!
//! Driving port used by the partitioning authority to place block chains.

use shared_types::BlockName;

use crate::domain::AllocatorError;

/// Pool of physical storage blocks.
///
/// A block name is never both free and allocated, and is never handed out
/// twice without a `free` in between.
pub trait BlockAllocationApi: Send + Sync {
    /// Take one free block.
    ///
    /// # Errors
    /// - `NoCapacity`: the free pool is empty
    fn allocate(&self) -> Result<BlockName, AllocatorError>;

    /// Take `count` free blocks, none of them in `exclude`, or none at all.
    fn allocate_many(
        &self,
        count: usize,
        exclude: &[BlockName],
    ) -> Result<Vec<BlockName>, AllocatorError>;

    /// Return a block that has been reset.
    ///
    /// # Errors
    /// - `UnknownBlock`: name never registered
    /// - `NotAllocated`: block already free
    /// - `StillLive`: the block has not been reset
    fn free(&self, block_name: &str) -> Result<(), AllocatorError>;

    /// Register new free blocks, e.g. when a storage server joins.
    fn add_blocks(&self, block_names: &[BlockName]) -> Result<(), AllocatorError>;

    /// Unregister free blocks, e.g. when a storage server leaves.
    fn remove_blocks(&self, block_names: &[BlockName]) -> Result<(), AllocatorError>;

    fn num_free(&self) -> usize;

    fn num_allocated(&self) -> usize;

    fn num_total(&self) -> usize;
}
