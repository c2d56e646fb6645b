//! # Inbound Ports (Driving Ports)
//!
//! The management API driven by the partitioning authority, and the chain
//! data path driven by clients and peer blocks.
//!
//! Every call is keyed by `block_name`. Failures are returned unchanged to
//! the caller; nothing is retried here.

use async_trait::async_trait;
use shared_types::{
    BlockName, ChainRole, Slot, SlotRange, SlotSet, Value, WriteOp, WriteRecord,
};

use crate::domain::{BlockError, BlockStatus, ImportBatch, ImportReceipt, TransferId};

/// Block lifecycle, migration and persistence operations.
#[async_trait]
pub trait StorageManagementApi: Send + Sync {
    /// Bind an unallocated block to a slot range and a replica chain.
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: block already allocated
    /// - `InvalidRange`: `slot_begin >= slot_end` or beyond the keyspace
    /// - `InvalidChain`: chain, role and successor disagree
    #[allow(clippy::too_many_arguments)]
    fn setup_block(
        &self,
        block_name: &str,
        path: &str,
        slot_begin: Slot,
        slot_end: Slot,
        chain: &[BlockName],
        auto_scale: bool,
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<(), BlockError>;

    /// `(slot_begin, slot_end)` covering owned and importing slots.
    ///
    /// This is a span: after exporting from the middle of its range a block
    /// reports the whole span while owning a hole inside it. Reconciliation
    /// must compare `owned_slots` or `status` across blocks, not this.
    fn slot_range(&self, block_name: &str) -> Result<(Slot, Slot), BlockError>;

    /// Exact owned slots, possibly non-contiguous after an export.
    fn owned_slots(&self, block_name: &str) -> Result<SlotSet, BlockError>;

    /// Bound backing store path.
    fn path(&self, block_name: &str) -> Result<String, BlockError>;

    /// Populate contents from the backing store.
    ///
    /// On failure the block keeps its prior contents.
    async fn load(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError>;

    /// Persist contents; the block keeps serving.
    async fn sync(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError>;

    /// Persist contents, then release the block to UNALLOCATED.
    async fn dump(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError>;

    /// Return the block to UNALLOCATED. Succeeds when already unallocated.
    fn reset(&self, block_name: &str) -> Result<(), BlockError>;

    /// Mark `[slot_begin, slot_end)` as EXPORTING to the `target` chain.
    fn set_exporting(
        &self,
        block_name: &str,
        target: &[BlockName],
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<(), BlockError>;

    /// Create the block directly in IMPORTING for its whole range.
    fn setup_and_set_importing(
        &self,
        block_name: &str,
        path: &str,
        slot_begin: Slot,
        slot_end: Slot,
        chain: &[BlockName],
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<(), BlockError>;

    /// Mark a range next to current ownership as IMPORTING.
    fn set_importing(&self, block_name: &str, slot_begin: Slot, slot_end: Slot)
        -> Result<(), BlockError>;

    /// Push the exporting range to the target and flip ownership.
    ///
    /// ## Errors
    ///
    /// - `InvalidState`: block is not exporting
    /// - `MigrationAborted`: target unreachable, reset, or count mismatch;
    ///   the EXPORTING mark is kept for retry
    async fn export_slots(&self, block_name: &str) -> Result<(), BlockError>;

    /// Clear the EXPORTING or IMPORTING mark over `[slot_begin, slot_end)`.
    fn set_regular(&self, block_name: &str, slot_begin: Slot, slot_end: Slot)
        -> Result<(), BlockError>;

    fn storage_capacity(&self, block_name: &str) -> Result<usize, BlockError>;

    fn storage_size(&self, block_name: &str) -> Result<usize, BlockError>;

    /// Replay buffered writes to the current successor, in sequence order.
    /// Writes stay buffered until acknowledged. Returns the number sent.
    async fn resend_pending(&self, block_name: &str) -> Result<usize, BlockError>;

    /// Send every buffered write to the successor and clear the buffer.
    /// Returns the number sent.
    async fn forward_all(&self, block_name: &str) -> Result<usize, BlockError>;

    /// Replace the chain view after a role change.
    async fn reconfigure_chain(
        &self,
        block_name: &str,
        chain: &[BlockName],
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<(), BlockError>;

    /// Consistent snapshot for reconciliation.
    fn status(&self, block_name: &str) -> Result<BlockStatus, BlockError>;
}

/// Chain data path and the import side of the migration handshake.
#[async_trait]
pub trait ChainDataApi: Send + Sync {
    /// Client write entering at a chain head. Returns the assigned sequence.
    async fn submit_write(&self, block_name: &str, slot: Slot, op: WriteOp)
        -> Result<u64, BlockError>;

    /// Local read.
    fn read(&self, block_name: &str, slot: Slot, key: &[u8]) -> Result<Option<Value>, BlockError>;

    /// Write forwarded by the predecessor.
    ///
    /// Refused with `OutOfOrder` when an earlier write is missing, and with
    /// `InvalidState` while a dump is in flight; the predecessor keeps the
    /// write buffered in both cases.
    async fn replicate(&self, block_name: &str, record: WriteRecord) -> Result<(), BlockError>;

    /// Tail acknowledgement flowing upstream.
    async fn acknowledge(&self, block_name: &str, seq: u64) -> Result<(), BlockError>;

    /// Batch pushed by an exporting block.
    async fn receive_import(
        &self,
        block_name: &str,
        batch: ImportBatch,
    ) -> Result<ImportReceipt, BlockError>;

    /// Exporter's final count for a transfer.
    async fn confirm_import(
        &self,
        block_name: &str,
        transfer: TransferId,
        range: SlotRange,
        expected: u64,
    ) -> Result<(), BlockError>;
}
