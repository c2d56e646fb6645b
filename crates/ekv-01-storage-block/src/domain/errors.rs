//! # Domain Errors
//!
//! Error types for the Storage Block subsystem.
//!
//! ## Taxonomy
//!
//! | Variant | Raised when |
//! |---------|-------------|
//! | `InvalidState` | operation illegal for the current phase or role |
//! | `InvalidRange` | malformed or non-owned slot range |
//! | `NotFound` | block addressed while unallocated |
//! | `SlotNotReady` | request against an importing (or sealed) range |
//! | `OutOfOrder` | replicated write arrives ahead of a missing one |
//! | `Io` | backing store failure |
//! | `MigrationAborted` | counterpart unreachable or reset during export |

use shared_types::{BlockName, Slot, SlotRangeError};
use thiserror::Error;

/// Backing store failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// Nothing stored at this path.
    #[error("No object at path {path}")]
    NotFound { path: String },

    /// The path scheme is not served by this adapter.
    #[error("Unsupported backing path scheme: {path}")]
    UnsupportedScheme { path: String },

    /// The path escapes the adapter root or is malformed.
    #[error("Invalid backing path: {path}")]
    InvalidPath { path: String },

    /// Underlying I/O failure.
    #[error("I/O error on {path}: {message}")]
    Io { path: String, message: String },
}

/// Storage block errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BlockError {
    /// The name is not hosted by this manager.
    #[error("Unknown block: {0}")]
    UnknownBlock(BlockName),

    /// The block exists but is not allocated.
    #[error("Block not allocated: {0}")]
    NotFound(BlockName),

    /// Operation illegal for the block's current phase or role.
    #[error("Invalid state for {operation} on {block}: {reason}")]
    InvalidState {
        /// Block addressed
        block: BlockName,
        /// Operation attempted
        operation: &'static str,
        /// Why it was refused
        reason: String,
    },

    /// Malformed or non-owned slot range.
    #[error("Invalid slot range on {block}: {reason}")]
    InvalidRange {
        /// Block addressed
        block: BlockName,
        /// Why the range was refused
        reason: String,
    },

    /// Slot belongs to a range that is still being imported.
    #[error("Slot {slot} not ready on {block}")]
    SlotNotReady {
        /// Block addressed
        block: BlockName,
        /// Slot requested
        slot: Slot,
    },

    /// Slot has been exported; the caller should retry against `target`.
    #[error("Slot {slot} moved from {block} to chain {target:?}")]
    Moved {
        /// Block addressed
        block: BlockName,
        /// Slot requested
        slot: Slot,
        /// Chain now serving the slot
        target: Vec<BlockName>,
    },

    /// Chain, role and successor arguments disagree.
    #[error("Invalid chain for {block}: {reason}")]
    InvalidChain {
        /// Block addressed
        block: BlockName,
        /// Inconsistency found
        reason: String,
    },

    /// Bounded replication buffer exhausted.
    #[error("Pending write buffer full on {block}: limit {limit}")]
    PendingFull {
        /// Block addressed
        block: BlockName,
        /// Configured bound
        limit: usize,
    },

    /// A replicated write skipped ahead of the next expected sequence.
    #[error("Write {seq} reached {block} ahead of expected write {expected}")]
    OutOfOrder {
        /// Block addressed
        block: BlockName,
        /// Next sequence the block can apply
        expected: u64,
        /// Sequence received
        seq: u64,
    },

    /// Backing store failure.
    #[error("Backing store error: {0}")]
    Io(#[from] StoreError),

    /// Persisted snapshot could not be decoded.
    #[error("Snapshot codec error: {0}")]
    Codec(String),

    /// A peer block could not be reached.
    #[error("Block unreachable: {0}")]
    Unreachable(BlockName),

    /// Export did not commit; the exporting mark is kept for retry.
    #[error("Migration aborted on {block}: {reason}")]
    MigrationAborted {
        /// Exporting block
        block: BlockName,
        /// Cause of the abort
        reason: String,
    },
}

impl BlockError {
    /// Wrap a slot range error for a given block.
    pub fn range(block: &str, err: SlotRangeError) -> Self {
        BlockError::InvalidRange {
            block: block.to_string(),
            reason: err.to_string(),
        }
    }

    /// Build an `InvalidState` error.
    pub fn state(block: &str, operation: &'static str, reason: impl Into<String>) -> Self {
        BlockError::InvalidState {
            block: block.to_string(),
            operation,
            reason: reason.into(),
        }
    }

    /// Build an `InvalidChain` error.
    pub fn chain(block: &str, reason: impl Into<String>) -> Self {
        BlockError::InvalidChain {
            block: block.to_string(),
            reason: reason.into(),
        }
    }
}
