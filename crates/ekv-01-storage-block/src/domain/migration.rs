//! # Slot Migration Phases
//!
//! Per-block state of the export/import handshake.
//!
//! ```text
//!   source (EXPORTING)                          target (IMPORTING)
//!   ──────────────────                          ──────────────────
//!   begin_export  ── ImportBatch × n ─────────→ receive_import
//!   drain_mirror  ── ImportBatch (mirror) ────→ receive_import
//!   seal          ── confirm(transfer, count) → confirm_import
//!   commit_export ←─ Ok ─────────────────────── (ledger confirmed)
//! ```
//!
//! The source drops the range only after the target confirmed the whole
//! transfer, so a slot is never absent from both sides. Every attempt runs
//! under a fresh `TransferId`; the importer discards data from superseded
//! attempts.

use serde::{Deserialize, Serialize};
use shared_types::{BlockName, SlotRange};
use uuid::Uuid;

use super::contents::MigratedEntry;

/// Identifier of one `export_slots` attempt.
pub type TransferId = Uuid;

/// Create a fresh transfer identifier.
pub fn new_transfer_id() -> TransferId {
    Uuid::new_v4()
}

/// Migration phase of an allocated block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationPhase {
    /// Steady state.
    Regular,
    /// A subrange is being handed to another chain.
    Exporting(ExportState),
    /// A subrange is being received from another chain.
    Importing(ImportState),
}

impl MigrationPhase {
    /// Short phase name for logs and errors.
    pub fn name(&self) -> &'static str {
        match self {
            MigrationPhase::Regular => "regular",
            MigrationPhase::Exporting(_) => "exporting",
            MigrationPhase::Importing(_) => "importing",
        }
    }
}

/// Source-side state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportState {
    /// Range being handed over.
    pub range: SlotRange,
    /// Target replica chain, head first.
    pub target: Vec<BlockName>,
    /// Attempt in flight, if any.
    pub transfer: Option<ActiveTransfer>,
    /// Ownership already flipped; waiting for `set_regular`.
    pub committed: bool,
}

impl ExportState {
    /// Create an uncommitted export with no attempt in flight.
    pub fn new(range: SlotRange, target: Vec<BlockName>) -> Self {
        Self {
            range,
            target,
            transfer: None,
            committed: false,
        }
    }

    /// Check if writes to the range are refused until the attempt ends.
    pub fn is_sealed(&self) -> bool {
        self.transfer.as_ref().is_some_and(|t| t.sealed)
    }
}

/// One export attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveTransfer {
    /// Attempt identifier.
    pub id: TransferId,
    /// Writes to the range applied since the snapshot was taken.
    pub mirror: Vec<MigratedEntry>,
    /// No more writes are accepted on the range.
    pub sealed: bool,
}

impl ActiveTransfer {
    /// Start a new attempt.
    pub fn new() -> Self {
        Self {
            id: new_transfer_id(),
            mirror: Vec::new(),
            sealed: false,
        }
    }
}

impl Default for ActiveTransfer {
    fn default() -> Self {
        Self::new()
    }
}

/// Target-side state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportState {
    /// Range being received.
    pub range: SlotRange,
    /// Block was created for this import and owned nothing before.
    pub fresh: bool,
    /// Progress of the latest transfer seen.
    pub ledger: Option<ImportLedger>,
}

impl ImportState {
    /// Create an import with nothing received yet.
    pub fn new(range: SlotRange, fresh: bool) -> Self {
        Self {
            range,
            fresh,
            ledger: None,
        }
    }

    /// Check if a transfer was confirmed complete.
    pub fn is_confirmed(&self) -> bool {
        self.ledger.as_ref().is_some_and(|l| l.confirmed)
    }
}

/// Receive counter of one transfer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportLedger {
    /// Transfer the counter belongs to.
    pub transfer: TransferId,
    /// Entries applied so far.
    pub received: u64,
    /// Source confirmed the count.
    pub confirmed: bool,
}

/// A batch of entries pushed from source to target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportBatch {
    /// Attempt identifier.
    pub transfer: TransferId,
    /// Range the entries belong to.
    pub range: SlotRange,
    /// Entries, possibly empty.
    pub entries: Vec<MigratedEntry>,
}

/// What the source needs to run one export attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportPlan {
    /// Attempt identifier.
    pub transfer: TransferId,
    /// Range being handed over.
    pub range: SlotRange,
    /// Target chain head batches are pushed to.
    pub target_head: BlockName,
    /// Snapshot of the range at the start of the attempt.
    pub entries: Vec<MigratedEntry>,
}

/// Importer's answer to a batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReceipt {
    /// Entries applied for this transfer so far.
    pub received: u64,
}
