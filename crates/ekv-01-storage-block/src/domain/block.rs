//! # Storage Block State Machine
//!
//! ```text
//!                   setup_block
//!   UNALLOCATED ─────────────────→ REGULAR ⇄ EXPORTING / IMPORTING
//!        ↑  │ setup_and_set_importing  ↑              │
//!        │  └──────────────→ IMPORTING └─ set_regular ┘
//!        └──────────── reset (from any state) ─────────
//! ```
//!
//! Every transition is a method on `StorageBlock` that either succeeds and
//! mutates the block, or fails and leaves it untouched. No method performs
//! I/O; the service layer runs backing store and transport calls between
//! transitions, using the block generation to detect a reset that happened
//! in the meantime.

use std::collections::BTreeMap;

use shared_types::{BlockName, ChainRole, Slot, SlotRange, SlotSet, Value, WriteOp, WriteRecord};

use super::chain::ChainTopology;
use super::config::BlockConfig;
use super::contents::{BlockContents, MigratedEntry};
use super::errors::BlockError;
use super::migration::{
    ActiveTransfer, ExportPlan, ExportState, ImportBatch, ImportLedger, ImportReceipt,
    ImportState, MigrationPhase, TransferId,
};
use super::snapshot::BlockSnapshot;

/// Arguments binding a block to a slot range and a chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockSetup {
    pub path: String,
    pub slot_begin: Slot,
    pub slot_end: Slot,
    pub chain: Vec<BlockName>,
    pub auto_scale: bool,
    pub role: ChainRole,
    pub next_block_name: String,
}

/// Request emitted when an auto-scaling block nears capacity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitRequest {
    /// Block asking to be split.
    pub block: BlockName,
    /// Its replica chain.
    pub chain: Vec<BlockName>,
    /// Span of its owned slots.
    pub slots: SlotRange,
    /// Live usage when the threshold was crossed.
    pub storage_size: usize,
    /// Static capacity.
    pub storage_capacity: usize,
}

/// Result of a client write accepted by a chain head.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientWrite {
    /// The sequenced record.
    pub record: WriteRecord,
    /// Successor the record must be forwarded to now.
    pub forward_to: Option<BlockName>,
    /// Split request to emit, if the write crossed the threshold.
    pub split: Option<SplitRequest>,
}

/// Result of a write arriving from a predecessor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReplicaStep {
    /// False when the record was already applied.
    pub applied: bool,
    /// Successor the record must be forwarded to now.
    pub forward_to: Option<BlockName>,
    /// Predecessor to acknowledge (tail only).
    pub ack_to: Option<BlockName>,
}

/// Result of `reconfigure_chain`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainChange {
    /// Buffered writes committed because the block lost its successor.
    pub released: Vec<u64>,
    /// Predecessor the released writes must be acknowledged to.
    pub ack_to: Option<BlockName>,
}

/// Result of `set_regular`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegularOutcome {
    /// Nothing was marked; ownership unchanged.
    Unchanged,
    /// Imported range folded into ownership.
    Absorbed(SlotRange),
    /// Exported range left ownership for good.
    Released(SlotRange),
    /// Unfinished migration cancelled; ownership as before it started.
    RolledBack(SlotRange),
}

/// Observable migration phase.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PhaseStatus {
    Unallocated,
    Regular,
    Exporting {
        range: SlotRange,
        target: Vec<BlockName>,
        committed: bool,
        in_flight: bool,
    },
    Importing {
        range: SlotRange,
        fresh: bool,
        received: u64,
        confirmed: bool,
    },
}

/// Consistent snapshot of a block, as seen by a reconciliation pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockStatus {
    pub name: BlockName,
    pub allocated: bool,
    pub path: Option<String>,
    pub owned: Vec<SlotRange>,
    pub phase: PhaseStatus,
    pub chain: Vec<BlockName>,
    pub role: Option<ChainRole>,
    pub next: Option<BlockName>,
    pub auto_scale: bool,
    pub pending_writes: usize,
    pub storage_size: usize,
    pub storage_capacity: usize,
}

enum BlockState {
    Unallocated,
    Allocated(Box<AllocatedBlock>),
}

struct AllocatedBlock {
    generation: u64,
    path: String,
    owned: SlotSet,
    chain: ChainTopology,
    auto_scale: bool,
    phase: MigrationPhase,
    contents: BlockContents,
    pending: BTreeMap<u64, WriteRecord>,
    next_seq: u64,
    /// A forward failed; later writes wait in `pending` for a resend.
    stalled: bool,
    draining: bool,
    split_requested: bool,
}

impl AllocatedBlock {
    fn apply_local(&mut self, record: &WriteRecord) {
        self.contents.apply(record.slot, &record.op);
        if let MigrationPhase::Exporting(state) = &mut self.phase {
            if let Some(transfer) = state.transfer.as_mut() {
                if state.range.contains(record.slot) {
                    transfer
                        .mirror
                        .push(MigratedEntry::from_op(record.slot, &record.op));
                }
            }
        }
    }

    fn check_slot(&self, name: &str, slot: Slot, write: bool) -> Result<(), BlockError> {
        match &self.phase {
            MigrationPhase::Importing(state) if state.range.contains(slot) => {
                return Err(BlockError::SlotNotReady {
                    block: name.to_string(),
                    slot,
                });
            }
            MigrationPhase::Exporting(state) if state.range.contains(slot) => {
                if state.committed {
                    return Err(BlockError::Moved {
                        block: name.to_string(),
                        slot,
                        target: state.target.clone(),
                    });
                }
                if write && state.is_sealed() {
                    return Err(BlockError::SlotNotReady {
                        block: name.to_string(),
                        slot,
                    });
                }
            }
            _ => {}
        }

        if !self.owned.contains(slot) {
            return Err(BlockError::InvalidRange {
                block: name.to_string(),
                reason: format!("slot {} is not owned", slot),
            });
        }
        Ok(())
    }

    fn check_split(&mut self, name: &str, config: &BlockConfig) -> Option<SplitRequest> {
        let size = self.contents.size_bytes();
        if size < config.split_threshold_bytes() {
            self.split_requested = false;
            return None;
        }
        if !self.auto_scale || self.split_requested {
            return None;
        }
        if !matches!(self.phase, MigrationPhase::Regular) {
            return None;
        }
        let slots = self.owned.span()?;
        self.split_requested = true;
        Some(SplitRequest {
            block: name.to_string(),
            chain: self.chain.chain().to_vec(),
            slots,
            storage_size: size,
            storage_capacity: config.capacity_bytes,
        })
    }

    fn make_room(&self, name: &str, limit: usize, seq: u64) -> Result<(), BlockError> {
        if self.pending.len() >= limit && !self.pending.contains_key(&seq) {
            return Err(BlockError::PendingFull {
                block: name.to_string(),
                limit,
            });
        }
        Ok(())
    }
}

fn allocated<'a>(name: &str, state: &'a BlockState) -> Result<&'a AllocatedBlock, BlockError> {
    match state {
        BlockState::Allocated(block) => Ok(block.as_ref()),
        BlockState::Unallocated => Err(BlockError::NotFound(name.to_string())),
    }
}

fn allocated_mut<'a>(
    name: &str,
    state: &'a mut BlockState,
) -> Result<&'a mut AllocatedBlock, BlockError> {
    match state {
        BlockState::Allocated(block) => Ok(block.as_mut()),
        BlockState::Unallocated => Err(BlockError::NotFound(name.to_string())),
    }
}

fn aborted(name: &str, reason: impl Into<String>) -> BlockError {
    BlockError::MigrationAborted {
        block: name.to_string(),
        reason: reason.into(),
    }
}

fn slot_range(name: &str, begin: Slot, end: Slot) -> Result<SlotRange, BlockError> {
    SlotRange::new(begin, end).map_err(|e| BlockError::range(name, e))
}

/// One physical storage block.
pub struct StorageBlock {
    name: BlockName,
    config: BlockConfig,
    generations: u64,
    state: BlockState,
}

impl StorageBlock {
    /// Create an unallocated block.
    pub fn new(name: impl Into<BlockName>, config: BlockConfig) -> Self {
        Self {
            name: name.into(),
            config,
            generations: 0,
            state: BlockState::Unallocated,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_allocated(&self) -> bool {
        matches!(self.state, BlockState::Allocated(_))
    }

    /// Generation of the current allocation. Bumped by every setup.
    pub fn generation(&self) -> Option<u64> {
        match &self.state {
            BlockState::Allocated(block) => Some(block.generation),
            BlockState::Unallocated => None,
        }
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Bind the block to a range and a chain.
    ///
    /// With `import` set the block starts IMPORTING its whole range and owns
    /// nothing until the import is folded in by `set_regular`.
    pub fn setup(&mut self, setup: BlockSetup, import: bool) -> Result<(), BlockError> {
        let operation = if import {
            "setup_and_set_importing"
        } else {
            "setup_block"
        };
        if self.is_allocated() {
            return Err(BlockError::state(
                &self.name,
                operation,
                "block is already allocated",
            ));
        }

        let range = slot_range(&self.name, setup.slot_begin, setup.slot_end)?;
        let chain = ChainTopology::new(&self.name, &setup.chain, setup.role, &setup.next_block_name)?;

        let (owned, phase) = if import {
            (
                SlotSet::new(),
                MigrationPhase::Importing(ImportState::new(range, true)),
            )
        } else {
            (SlotSet::from_range(range), MigrationPhase::Regular)
        };

        self.generations += 1;
        self.state = BlockState::Allocated(Box::new(AllocatedBlock {
            generation: self.generations,
            path: setup.path,
            owned,
            chain,
            auto_scale: setup.auto_scale && !import,
            phase,
            contents: BlockContents::new(),
            pending: BTreeMap::new(),
            next_seq: 0,
            stalled: false,
            draining: false,
            split_requested: false,
        }));
        Ok(())
    }

    /// Return to UNALLOCATED. Returns whether the block was allocated.
    pub fn reset(&mut self) -> bool {
        let was_allocated = self.is_allocated();
        self.state = BlockState::Unallocated;
        was_allocated
    }

    // =========================================================================
    // QUERIES
    // =========================================================================

    /// Smallest range covering owned and importing slots. Holes left by
    /// an export are not visible here; see `owned_slots`.
    pub fn slot_range(&self) -> Result<SlotRange, BlockError> {
        let block = allocated(&self.name, &self.state)?;
        let owned = block.owned.span();
        let importing = match &block.phase {
            MigrationPhase::Importing(state) => Some(state.range),
            _ => None,
        };

        let span = match (owned, importing) {
            (Some(a), Some(b)) => SlotRange::new(a.begin().min(b.begin()), a.end().max(b.end()))
                .map_err(|e| BlockError::range(&self.name, e))?,
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => {
                return Err(BlockError::state(
                    &self.name,
                    "slot_range",
                    "block owns no slots",
                ))
            }
        };
        Ok(span)
    }

    /// Exact owned slots.
    pub fn owned_slots(&self) -> Result<SlotSet, BlockError> {
        Ok(allocated(&self.name, &self.state)?.owned.clone())
    }

    pub fn path(&self) -> Result<&str, BlockError> {
        Ok(&allocated(&self.name, &self.state)?.path)
    }

    pub fn storage_capacity(&self) -> usize {
        self.config.capacity_bytes
    }

    /// Exact live usage; zero while unallocated.
    pub fn storage_size(&self) -> usize {
        match &self.state {
            BlockState::Allocated(block) => block.contents.size_bytes(),
            BlockState::Unallocated => 0,
        }
    }

    pub fn pending_len(&self) -> usize {
        match &self.state {
            BlockState::Allocated(block) => block.pending.len(),
            BlockState::Unallocated => 0,
        }
    }

    pub fn status(&self) -> BlockStatus {
        let mut status = BlockStatus {
            name: self.name.clone(),
            allocated: false,
            path: None,
            owned: Vec::new(),
            phase: PhaseStatus::Unallocated,
            chain: Vec::new(),
            role: None,
            next: None,
            auto_scale: false,
            pending_writes: 0,
            storage_size: 0,
            storage_capacity: self.config.capacity_bytes,
        };

        if let BlockState::Allocated(block) = &self.state {
            status.allocated = true;
            status.path = Some(block.path.clone());
            status.owned = block.owned.ranges().to_vec();
            status.phase = match &block.phase {
                MigrationPhase::Regular => PhaseStatus::Regular,
                MigrationPhase::Exporting(state) => PhaseStatus::Exporting {
                    range: state.range,
                    target: state.target.clone(),
                    committed: state.committed,
                    in_flight: state.transfer.is_some(),
                },
                MigrationPhase::Importing(state) => PhaseStatus::Importing {
                    range: state.range,
                    fresh: state.fresh,
                    received: state.ledger.as_ref().map_or(0, |l| l.received),
                    confirmed: state.is_confirmed(),
                },
            };
            status.chain = block.chain.chain().to_vec();
            status.role = Some(block.chain.role());
            status.next = block.chain.next().cloned();
            status.auto_scale = block.auto_scale;
            status.pending_writes = block.pending.len();
            status.storage_size = block.contents.size_bytes();
        }
        status
    }

    // =========================================================================
    // MIGRATION MARKS
    // =========================================================================

    /// Mark an owned subrange as EXPORTING to `target`.
    pub fn set_exporting(
        &mut self,
        target: &[BlockName],
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<(), BlockError> {
        let range = slot_range(&self.name, slot_begin, slot_end)?;
        let block = allocated_mut(&self.name, &mut self.state)?;

        if !matches!(block.phase, MigrationPhase::Regular) {
            return Err(BlockError::state(
                &self.name,
                "set_exporting",
                format!("block is {}", block.phase.name()),
            ));
        }
        if block.draining {
            return Err(BlockError::state(&self.name, "set_exporting", "block is draining"));
        }
        if target.is_empty() {
            return Err(BlockError::chain(&self.name, "empty export target chain"));
        }
        if target.iter().any(|t| t == &self.name) {
            return Err(BlockError::chain(&self.name, "cannot export to itself"));
        }
        if !block.owned.contains_range(&range) {
            return Err(BlockError::InvalidRange {
                block: self.name.clone(),
                reason: format!("{} is not within owned slots {}", range, block.owned),
            });
        }

        block.phase = MigrationPhase::Exporting(ExportState::new(range, target.to_vec()));
        Ok(())
    }

    /// Mark a range adjacent to current ownership as IMPORTING (grow case).
    pub fn set_importing(&mut self, slot_begin: Slot, slot_end: Slot) -> Result<(), BlockError> {
        let range = slot_range(&self.name, slot_begin, slot_end)?;
        let block = allocated_mut(&self.name, &mut self.state)?;

        if !matches!(block.phase, MigrationPhase::Regular) {
            return Err(BlockError::state(
                &self.name,
                "set_importing",
                format!("block is {}", block.phase.name()),
            ));
        }
        if block.draining {
            return Err(BlockError::state(&self.name, "set_importing", "block is draining"));
        }
        if block.owned.overlaps(&range) {
            return Err(BlockError::InvalidRange {
                block: self.name.clone(),
                reason: format!("{} overlaps owned slots {}", range, block.owned),
            });
        }

        block.phase = MigrationPhase::Importing(ImportState::new(range, false));
        Ok(())
    }

    /// Clear the transient mark over `[slot_begin, slot_end)`.
    ///
    /// A confirmed import is folded into ownership; a committed export is
    /// finalized. An unfinished migration is rolled back instead. On a
    /// REGULAR block the call is a no-op when the range is wholly owned or
    /// wholly foreign.
    pub fn set_regular(
        &mut self,
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<RegularOutcome, BlockError> {
        let range = slot_range(&self.name, slot_begin, slot_end)?;
        let block = allocated_mut(&self.name, &mut self.state)?;

        let mismatch = |marked: SlotRange| BlockError::InvalidRange {
            block: self.name.clone(),
            reason: format!("{} does not match marked range {}", range, marked),
        };

        let phase = std::mem::replace(&mut block.phase, MigrationPhase::Regular);
        match phase {
            MigrationPhase::Regular => {
                if block.owned.contains_range(&range) || !block.owned.overlaps(&range) {
                    Ok(RegularOutcome::Unchanged)
                } else {
                    Err(BlockError::InvalidRange {
                        block: self.name.clone(),
                        reason: format!("{} is partially owned", range),
                    })
                }
            }
            MigrationPhase::Importing(state) => {
                if state.range != range {
                    let err = mismatch(state.range);
                    block.phase = MigrationPhase::Importing(state);
                    return Err(err);
                }
                if state.is_confirmed() {
                    block
                        .owned
                        .insert(range)
                        .map_err(|e| BlockError::range(&self.name, e))?;
                    Ok(RegularOutcome::Absorbed(range))
                } else {
                    block.contents.remove_range(&range);
                    Ok(RegularOutcome::RolledBack(range))
                }
            }
            MigrationPhase::Exporting(state) => {
                if state.range != range {
                    let err = mismatch(state.range);
                    block.phase = MigrationPhase::Exporting(state);
                    return Err(err);
                }
                if state.committed {
                    Ok(RegularOutcome::Released(range))
                } else {
                    Ok(RegularOutcome::RolledBack(range))
                }
            }
        }
    }

    // =========================================================================
    // EXPORT (source side)
    // =========================================================================

    /// Start a new export attempt. `None` when the export already committed.
    pub fn begin_export(&mut self) -> Result<Option<ExportPlan>, BlockError> {
        let block = allocated_mut(&self.name, &mut self.state)?;
        let phase_name = block.phase.name();
        if block.draining {
            return Err(BlockError::state(&self.name, "export_slots", "block is draining"));
        }
        let MigrationPhase::Exporting(state) = &mut block.phase else {
            return Err(BlockError::state(
                &self.name,
                "export_slots",
                format!("block is {}", phase_name),
            ));
        };
        if state.committed {
            return Ok(None);
        }

        let target_head = state
            .target
            .first()
            .cloned()
            .ok_or_else(|| BlockError::chain(&self.name, "empty export target chain"))?;
        let transfer = ActiveTransfer::new();
        let id = transfer.id;
        state.transfer = Some(transfer);

        Ok(Some(ExportPlan {
            transfer: id,
            range: state.range,
            target_head,
            entries: block.contents.extract_range(&state.range),
        }))
    }

    /// Take writes mirrored since the last call, or seal the range when
    /// there are none.
    pub fn drain_mirror(
        &mut self,
        transfer: TransferId,
    ) -> Result<Option<Vec<MigratedEntry>>, BlockError> {
        let active = self.active_transfer(transfer)?;
        if active.mirror.is_empty() {
            active.sealed = true;
            Ok(None)
        } else {
            Ok(Some(std::mem::take(&mut active.mirror)))
        }
    }

    /// Flip ownership after the target confirmed the transfer.
    pub fn commit_export(&mut self, transfer: TransferId) -> Result<SlotRange, BlockError> {
        {
            let active = self.active_transfer(transfer)?;
            if !active.sealed || !active.mirror.is_empty() {
                return Err(aborted(
                    &self.name,
                    "writes reached the range after it was sealed",
                ));
            }
        }

        let block = allocated_mut(&self.name, &mut self.state)?;
        let MigrationPhase::Exporting(state) = &mut block.phase else {
            return Err(aborted(&self.name, "export mark lost"));
        };
        block
            .owned
            .remove(&state.range)
            .map_err(|e| aborted(&self.name, e.to_string()))?;
        block.contents.remove_range(&state.range);
        state.transfer = None;
        state.committed = true;
        let range = state.range;

        if block.contents.size_bytes() < self.config.split_threshold_bytes() {
            block.split_requested = false;
        }
        Ok(range)
    }

    /// Drop a failed attempt and reopen the range. Returns whether the
    /// attempt was still current.
    pub fn abort_export(&mut self, transfer: TransferId) -> bool {
        let BlockState::Allocated(block) = &mut self.state else {
            return false;
        };
        let MigrationPhase::Exporting(state) = &mut block.phase else {
            return false;
        };
        match &state.transfer {
            Some(active) if active.id == transfer => {
                state.transfer = None;
                true
            }
            _ => false,
        }
    }

    fn active_transfer(&mut self, transfer: TransferId) -> Result<&mut ActiveTransfer, BlockError> {
        let block = match &mut self.state {
            BlockState::Allocated(block) => block,
            BlockState::Unallocated => return Err(aborted(&self.name, "block was reset")),
        };
        let MigrationPhase::Exporting(state) = &mut block.phase else {
            return Err(aborted(&self.name, "block is no longer exporting"));
        };
        match state.transfer.as_mut() {
            Some(active) if active.id == transfer => Ok(active),
            _ => Err(aborted(&self.name, "transfer superseded")),
        }
    }

    // =========================================================================
    // IMPORT (target side)
    // =========================================================================

    /// Apply a batch pushed by the exporter. Returns the receipt and the
    /// successor the batch must be passed on to.
    pub fn receive_import(
        &mut self,
        batch: ImportBatch,
    ) -> Result<(ImportReceipt, Option<BlockName>), BlockError> {
        let block = allocated_mut(&self.name, &mut self.state)?;
        if block.draining {
            return Err(BlockError::state(&self.name, "import", "block is draining"));
        }
        let phase_name = block.phase.name();
        let MigrationPhase::Importing(state) = &mut block.phase else {
            return Err(BlockError::state(
                &self.name,
                "import",
                format!("block is {}", phase_name),
            ));
        };
        if state.range != batch.range {
            return Err(BlockError::InvalidRange {
                block: self.name.clone(),
                reason: format!("{} is not the importing range {}", batch.range, state.range),
            });
        }
        if let Some(entry) = batch.entries.iter().find(|e| !state.range.contains(e.slot)) {
            return Err(BlockError::InvalidRange {
                block: self.name.clone(),
                reason: format!("slot {} outside importing range {}", entry.slot, state.range),
            });
        }

        let current = state
            .ledger
            .as_ref()
            .is_some_and(|l| l.transfer == batch.transfer);
        if !current {
            block.contents.remove_range(&state.range);
            state.ledger = Some(ImportLedger {
                transfer: batch.transfer,
                received: 0,
                confirmed: false,
            });
        }

        let count = batch.entries.len() as u64;
        for entry in batch.entries {
            block.contents.apply_migrated(entry);
        }

        let received = match state.ledger.as_mut() {
            Some(ledger) => {
                ledger.received += count;
                ledger.received
            }
            None => count,
        };
        Ok((ImportReceipt { received }, block.chain.next().cloned()))
    }

    /// Check the exporter's final count and mark the transfer complete.
    pub fn confirm_import(
        &mut self,
        transfer: TransferId,
        range: SlotRange,
        expected: u64,
    ) -> Result<Option<BlockName>, BlockError> {
        let block = match &mut self.state {
            BlockState::Allocated(block) => block,
            BlockState::Unallocated => return Err(aborted(&self.name, "importer was reset")),
        };
        let MigrationPhase::Importing(state) = &mut block.phase else {
            return Err(aborted(&self.name, "block is no longer importing"));
        };
        if state.range != range {
            return Err(aborted(
                &self.name,
                format!("{} is not the importing range {}", range, state.range),
            ));
        }
        let ledger = match state.ledger.as_mut() {
            Some(ledger) if ledger.transfer == transfer => ledger,
            _ => return Err(aborted(&self.name, "unknown transfer")),
        };
        if ledger.received != expected {
            return Err(aborted(
                &self.name,
                format!("received {} entries, expected {}", ledger.received, expected),
            ));
        }
        ledger.confirmed = true;
        Ok(block.chain.next().cloned())
    }

    // =========================================================================
    // DATA PATH
    // =========================================================================

    /// Accept a client write at the chain head.
    pub fn apply_client_write(&mut self, slot: Slot, op: WriteOp) -> Result<ClientWrite, BlockError> {
        let limit = self.config.max_pending_writes;
        let block = allocated_mut(&self.name, &mut self.state)?;

        let role = block.chain.role();
        if !role.accepts_client_writes() {
            return Err(BlockError::state(
                &self.name,
                "submit_write",
                format!("{} does not accept client writes", role),
            ));
        }
        if block.draining {
            return Err(BlockError::state(&self.name, "submit_write", "block is draining"));
        }
        block.check_slot(&self.name, slot, true)?;

        let seq = block.next_seq;
        let successor = block.chain.next().cloned();
        if successor.is_some() {
            block.make_room(&self.name, limit, seq)?;
        }

        let record = WriteRecord::new(seq, slot, op);
        block.next_seq += 1;
        block.apply_local(&record);

        let forward_to = match successor {
            Some(next) => {
                block.pending.insert(seq, record.clone());
                (!block.stalled).then_some(next)
            }
            None => None,
        };
        let split = block.check_split(&self.name, &self.config);

        Ok(ClientWrite {
            record,
            forward_to,
            split,
        })
    }

    /// Accept a write forwarded by the predecessor.
    ///
    /// Writes are applied strictly in sequence. A sequence below
    /// `next_seq` was applied before and is only passed on again; one above
    /// it is refused with `OutOfOrder`, leaving it buffered upstream until a
    /// resend fills the gap.
    pub fn replicate(&mut self, record: &WriteRecord) -> Result<ReplicaStep, BlockError> {
        let limit = self.config.max_pending_writes;
        let block = allocated_mut(&self.name, &mut self.state)?;

        let role = block.chain.role();
        if !role.has_predecessor() {
            return Err(BlockError::state(
                &self.name,
                "replicate",
                format!("{} has no predecessor", role),
            ));
        }
        if block.draining {
            return Err(BlockError::state(&self.name, "replicate", "block is draining"));
        }
        if record.seq > block.next_seq {
            return Err(BlockError::OutOfOrder {
                block: self.name.clone(),
                expected: block.next_seq,
                seq: record.seq,
            });
        }

        let successor = block.chain.next().cloned();
        if successor.is_some() {
            block.make_room(&self.name, limit, record.seq)?;
        }

        let applied = record.seq == block.next_seq;
        if applied {
            block.apply_local(record);
            block.next_seq += 1;
        }

        let (forward_to, ack_to) = match successor {
            Some(next) => {
                block.pending.insert(record.seq, record.clone());
                ((!block.stalled).then_some(next), None)
            }
            None => (None, block.chain.predecessor().cloned()),
        };

        Ok(ReplicaStep {
            applied,
            forward_to,
            ack_to,
        })
    }

    /// Drop an acknowledged write. Returns the predecessor the ack must be
    /// passed on to.
    pub fn acknowledge(&mut self, seq: u64) -> Result<Option<BlockName>, BlockError> {
        let block = allocated_mut(&self.name, &mut self.state)?;
        block.pending.remove(&seq);
        Ok(block.chain.predecessor().cloned())
    }

    /// Buffered writes with a sequence above `after`, in order, kept
    /// buffered. When there are none, held-back forwarding resumes.
    pub fn pending_after(
        &mut self,
        after: Option<u64>,
    ) -> Result<(Option<BlockName>, Vec<WriteRecord>), BlockError> {
        let block = allocated_mut(&self.name, &mut self.state)?;
        let records: Vec<WriteRecord> = match after {
            Some(seq) => block
                .pending
                .range(seq.saturating_add(1)..)
                .filter(|(s, _)| **s > seq)
                .map(|(_, r)| r.clone())
                .collect(),
            None => block.pending.values().cloned().collect(),
        };
        if records.is_empty() {
            block.stalled = false;
        }
        Ok((block.chain.next().cloned(), records))
    }

    /// Buffered writes in order, removed from the buffer. When there are
    /// none, held-back forwarding resumes.
    pub fn take_pending(&mut self) -> Result<(Option<BlockName>, Vec<WriteRecord>), BlockError> {
        let block = allocated_mut(&self.name, &mut self.state)?;
        let records: Vec<WriteRecord> = std::mem::take(&mut block.pending).into_values().collect();
        if records.is_empty() {
            block.stalled = false;
        }
        Ok((block.chain.next().cloned(), records))
    }

    /// Put back writes that could not be forwarded and hold back further
    /// forwarding until they are replayed.
    pub fn restore_pending(&mut self, records: Vec<WriteRecord>) {
        if let BlockState::Allocated(block) = &mut self.state {
            for record in records {
                block.pending.insert(record.seq, record);
            }
            block.stalled = true;
        }
    }

    /// Hold back forwarding until the buffer is replayed.
    pub fn mark_stalled(&mut self) {
        if let BlockState::Allocated(block) = &mut self.state {
            block.stalled = true;
        }
    }

    /// Replace the chain view after a role change.
    pub fn reconfigure_chain(
        &mut self,
        chain: &[BlockName],
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<ChainChange, BlockError> {
        let topology = ChainTopology::new(&self.name, chain, role, next_block_name)?;
        let block = allocated_mut(&self.name, &mut self.state)?;

        let mut change = ChainChange::default();
        if topology.next().is_none() {
            change.released = std::mem::take(&mut block.pending).into_keys().collect();
            change.ack_to = topology.predecessor().cloned();
            block.stalled = false;
        }
        block.chain = topology;
        Ok(change)
    }

    /// Local read.
    pub fn read(&self, slot: Slot, key: &[u8]) -> Result<Option<Value>, BlockError> {
        let block = allocated(&self.name, &self.state)?;
        block.check_slot(&self.name, slot, false)?;
        Ok(block.contents.get(slot, key).cloned())
    }

    // =========================================================================
    // PERSISTENCE
    // =========================================================================

    /// Check a load may start. Returns the generation to install into.
    pub fn begin_load(&self) -> Result<u64, BlockError> {
        let block = allocated(&self.name, &self.state)?;
        if !matches!(block.phase, MigrationPhase::Regular) {
            return Err(BlockError::state(
                &self.name,
                "load",
                format!("block is {}", block.phase.name()),
            ));
        }
        if block.draining {
            return Err(BlockError::state(&self.name, "load", "block is draining"));
        }
        Ok(block.generation)
    }

    /// Replace contents with loaded data. Entries outside owned slots are
    /// dropped. Returns the number of keys installed.
    pub fn install_contents(
        &mut self,
        generation: u64,
        contents: BlockContents,
    ) -> Result<usize, BlockError> {
        let block = allocated_mut(&self.name, &mut self.state)?;
        if block.generation != generation {
            return Err(BlockError::state(&self.name, "load", "block was reset during load"));
        }
        if !matches!(block.phase, MigrationPhase::Regular) {
            return Err(BlockError::state(
                &self.name,
                "load",
                format!("block became {} during load", block.phase.name()),
            ));
        }

        let owned = &block.owned;
        let installed = BlockContents::from_entries(
            contents
                .iter()
                .filter(|(slot, _, _)| owned.contains(*slot))
                .map(|(slot, key, value)| (slot, key.clone(), value.clone())),
        );
        let count = installed.len();
        block.contents = installed;
        block.split_requested = false;
        Ok(count)
    }

    /// Encoded snapshot of the contents.
    pub fn encode_snapshot(&self) -> Result<Vec<u8>, BlockError> {
        let block = allocated(&self.name, &self.state)?;
        BlockSnapshot::capture(&block.contents).encode()
    }

    /// Start a dump: refuse new writes and capture the contents.
    pub fn begin_dump(&mut self) -> Result<(u64, Vec<u8>), BlockError> {
        let block = allocated_mut(&self.name, &mut self.state)?;
        if !matches!(block.phase, MigrationPhase::Regular) {
            return Err(BlockError::state(
                &self.name,
                "dump",
                format!("block is {}", block.phase.name()),
            ));
        }
        if block.draining {
            return Err(BlockError::state(&self.name, "dump", "dump already in progress"));
        }
        if !block.pending.is_empty() {
            return Err(BlockError::state(
                &self.name,
                "dump",
                format!("{} writes still pending; forward them first", block.pending.len()),
            ));
        }

        let bytes = BlockSnapshot::capture(&block.contents).encode()?;
        block.draining = true;
        Ok((block.generation, bytes))
    }

    /// Finish a dump. On success the block returns to UNALLOCATED; on
    /// failure it keeps serving. Returns whether the block was released.
    pub fn finish_dump(&mut self, generation: u64, written: bool) -> bool {
        let BlockState::Allocated(block) = &mut self.state else {
            return false;
        };
        if block.generation != generation {
            return false;
        }
        if written {
            self.state = BlockState::Unallocated;
            true
        } else {
            block.draining = false;
            false
        }
    }
}
