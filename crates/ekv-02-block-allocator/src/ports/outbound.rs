//! # Outbound Ports (Driven Ports)

/// Reports whether a storage block has been reset.
///
/// Consulted by `free` to keep a block that still holds an allocation out
/// of the free pool.
///
/// Production: backed by the block manager hosting the block
/// Testing: `StaticResetProbe`
pub trait BlockResetProbe: Send + Sync {
    /// True when the named block is unallocated.
    fn is_unallocated(&self, block_name: &str) -> bool;
}
