//! Allocator error types.

use shared_types::BlockName;
use thiserror::Error;

/// Block allocator errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AllocatorError {
    /// Not enough free blocks for the request.
    #[error("No capacity: requested {requested} blocks, {available} available")]
    NoCapacity { requested: usize, available: usize },

    /// The name was never registered with the pool.
    #[error("Unknown block: {0}")]
    UnknownBlock(BlockName),

    /// The block is registered but currently free.
    #[error("Block not allocated: {0}")]
    NotAllocated(BlockName),

    /// The name is already registered with the pool.
    #[error("Block already registered: {0}")]
    AlreadyRegistered(BlockName),

    /// The block still holds a live allocation.
    #[error("Block still live: {0}")]
    StillLive(BlockName),
}
