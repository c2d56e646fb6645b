//! # Block Configuration
//!
//! Static budget and tuning knobs shared by every block a manager hosts.

use serde::{Deserialize, Serialize};

/// Default per-block capacity: 128 MiB.
pub const DEFAULT_CAPACITY_BYTES: usize = 128 * 1024 * 1024;

/// Default fraction of capacity at which an auto-scaling block asks for a split.
pub const DEFAULT_HIGH_THRESHOLD: f64 = 0.95;

/// Default bound on writes buffered while waiting for tail acknowledgement.
pub const DEFAULT_MAX_PENDING_WRITES: usize = 100_000;

/// Default number of entries pushed per import batch during export.
pub const DEFAULT_EXPORT_BATCH_SIZE: usize = 1024;

/// Configuration applied to every storage block of a manager.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BlockConfig {
    /// Static storage budget per block, in bytes.
    pub capacity_bytes: usize,
    /// Fraction of `capacity_bytes` that triggers a split request.
    pub high_threshold: f64,
    /// Maximum writes buffered in `pending_writes`.
    pub max_pending_writes: usize,
    /// Entries per import batch.
    pub export_batch_size: usize,
}

impl Default for BlockConfig {
    fn default() -> Self {
        Self {
            capacity_bytes: DEFAULT_CAPACITY_BYTES,
            high_threshold: DEFAULT_HIGH_THRESHOLD,
            max_pending_writes: DEFAULT_MAX_PENDING_WRITES,
            export_batch_size: DEFAULT_EXPORT_BATCH_SIZE,
        }
    }
}

impl BlockConfig {
    /// Create config for testing.
    pub fn for_testing() -> Self {
        Self {
            capacity_bytes: 4096,
            high_threshold: 0.75,
            max_pending_writes: 64,
            export_batch_size: 4,
        }
    }

    /// Size in bytes at which an auto-scaling block requests a split.
    pub fn split_threshold_bytes(&self) -> usize {
        (self.capacity_bytes as f64 * self.high_threshold) as usize
    }
}
