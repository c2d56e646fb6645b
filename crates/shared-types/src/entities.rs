//! # Core Entities
//!
//! Defines the slot keyspace, block naming and replica-chain vocabulary.
//!
//! ## Clusters
//!
//! - **Keyspace**: `Slot`, `SlotRange`, `SlotSet`
//! - **Replication**: `BlockName`, `ChainRole`
//! - **Writes**: `WriteOp`, `WriteRecord`

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::{SlotRangeError, UnknownRole};

// =============================================================================
// CLUSTER A: THE KEYSPACE
// =============================================================================

/// A hash slot. Keys are mapped to slots outside this crate.
pub type Slot = u32;

/// Total number of hash slots in the keyspace.
pub const SLOT_MAX: Slot = 65_536;

/// Opaque, cluster-unique block identifier chosen by the partitioning authority.
pub type BlockName = String;

/// Raw key bytes.
pub type Key = Vec<u8>;

/// Raw value bytes.
pub type Value = Vec<u8>;

/// Half-open, non-empty interval of slots: `[begin, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotRange {
    begin: Slot,
    end: Slot,
}

impl SlotRange {
    /// Create a range, rejecting empty or out-of-keyspace intervals.
    pub fn new(begin: Slot, end: Slot) -> Result<Self, SlotRangeError> {
        if begin >= end {
            return Err(SlotRangeError::Empty { begin, end });
        }
        if end > SLOT_MAX {
            return Err(SlotRangeError::OutOfKeyspace {
                begin,
                end,
                max: SLOT_MAX,
            });
        }
        Ok(Self { begin, end })
    }

    /// The whole keyspace.
    pub fn full() -> Self {
        Self {
            begin: 0,
            end: SLOT_MAX,
        }
    }

    /// First slot of the range.
    pub fn begin(&self) -> Slot {
        self.begin
    }

    /// One past the last slot of the range.
    pub fn end(&self) -> Slot {
        self.end
    }

    /// Number of slots covered.
    pub fn slot_count(&self) -> u32 {
        self.end - self.begin
    }

    /// `(begin, end)` pair as exposed at the service boundary.
    pub fn as_tuple(&self) -> (Slot, Slot) {
        (self.begin, self.end)
    }

    /// Check if a slot falls in this range.
    pub fn contains(&self, slot: Slot) -> bool {
        self.begin <= slot && slot < self.end
    }

    /// Check if `other` lies entirely inside this range.
    pub fn contains_range(&self, other: &SlotRange) -> bool {
        self.begin <= other.begin && other.end <= self.end
    }

    /// Check if the two ranges share at least one slot.
    pub fn overlaps(&self, other: &SlotRange) -> bool {
        self.begin < other.end && other.begin < self.end
    }

    /// Split into two halves at the midpoint.
    ///
    /// Returns `None` for single-slot ranges.
    pub fn halves(&self) -> Option<(SlotRange, SlotRange)> {
        if self.slot_count() < 2 {
            return None;
        }
        let mid = self.begin + self.slot_count() / 2;
        Some((
            SlotRange {
                begin: self.begin,
                end: mid,
            },
            SlotRange {
                begin: mid,
                end: self.end,
            },
        ))
    }
}

impl fmt::Display for SlotRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.begin, self.end)
    }
}

/// A set of slots kept as sorted, disjoint, coalesced ranges.
///
/// Adjacent ranges are merged on insert, so any contiguous subset of the set
/// lies inside exactly one stored range.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSet {
    ranges: Vec<SlotRange>,
}

impl SlotSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a set holding a single range.
    pub fn from_range(range: SlotRange) -> Self {
        Self {
            ranges: vec![range],
        }
    }

    /// The stored ranges in ascending order.
    pub fn ranges(&self) -> &[SlotRange] {
        &self.ranges
    }

    /// Check if the set holds no slot.
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// Total number of slots held.
    pub fn slot_count(&self) -> u64 {
        self.ranges.iter().map(|r| u64::from(r.slot_count())).sum()
    }

    /// Check if a slot is held.
    pub fn contains(&self, slot: Slot) -> bool {
        self.ranges.iter().any(|r| r.contains(slot))
    }

    /// Check if every slot of `range` is held.
    pub fn contains_range(&self, range: &SlotRange) -> bool {
        self.ranges.iter().any(|r| r.contains_range(range))
    }

    /// Check if any slot of `range` is held.
    pub fn overlaps(&self, range: &SlotRange) -> bool {
        self.ranges.iter().any(|r| r.overlaps(range))
    }

    /// Smallest single range covering the whole set.
    pub fn span(&self) -> Option<SlotRange> {
        let first = self.ranges.first()?;
        let last = self.ranges.last()?;
        Some(SlotRange {
            begin: first.begin,
            end: last.end,
        })
    }

    /// Add a range that shares no slot with the set.
    pub fn insert(&mut self, range: SlotRange) -> Result<(), SlotRangeError> {
        if self.overlaps(&range) {
            return Err(SlotRangeError::Overlap {
                begin: range.begin,
                end: range.end,
            });
        }
        self.ranges.push(range);
        self.ranges.sort();
        self.coalesce();
        Ok(())
    }

    /// Remove a range that is fully held by the set.
    pub fn remove(&mut self, range: &SlotRange) -> Result<(), SlotRangeError> {
        let idx = self
            .ranges
            .iter()
            .position(|r| r.contains_range(range))
            .ok_or(SlotRangeError::NotContained {
                begin: range.begin,
                end: range.end,
            })?;

        let owner = self.ranges.remove(idx);
        let mut remainder = Vec::with_capacity(2);
        if owner.begin < range.begin {
            remainder.push(SlotRange {
                begin: owner.begin,
                end: range.begin,
            });
        }
        if range.end < owner.end {
            remainder.push(SlotRange {
                begin: range.end,
                end: owner.end,
            });
        }
        for (offset, piece) in remainder.into_iter().enumerate() {
            self.ranges.insert(idx + offset, piece);
        }
        Ok(())
    }

    /// Drop every range.
    pub fn clear(&mut self) {
        self.ranges.clear();
    }

    fn coalesce(&mut self) {
        let mut merged: Vec<SlotRange> = Vec::with_capacity(self.ranges.len());
        for range in self.ranges.drain(..) {
            match merged.last_mut() {
                Some(prev) if prev.end == range.begin => prev.end = range.end,
                _ => merged.push(range),
            }
        }
        self.ranges = merged;
    }
}

impl fmt::Display for SlotSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ranges.is_empty() {
            return write!(f, "{{}}");
        }
        for (i, range) in self.ranges.iter().enumerate() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}", range)?;
        }
        Ok(())
    }
}

// =============================================================================
// CLUSTER B: REPLICATION
// =============================================================================

/// Position of a block in its replica chain.
///
/// Wire values follow the partitioning authority: 0 singleton, 1 head,
/// 2 middle, 3 tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChainRole {
    /// Only replica: head and tail at once.
    Singleton,
    /// Accepts client writes and forwards them.
    Head,
    /// Receives from a predecessor and forwards to a successor.
    Middle,
    /// Receives from a predecessor and acknowledges upstream.
    Tail,
}

impl ChainRole {
    /// Role implied by a position in a chain of `len` replicas.
    pub fn for_position(index: usize, len: usize) -> Self {
        match (index, len) {
            (_, 0 | 1) => Self::Singleton,
            (0, _) => Self::Head,
            (i, n) if i + 1 >= n => Self::Tail,
            _ => Self::Middle,
        }
    }

    /// Check if client writes may enter the chain here.
    pub fn accepts_client_writes(&self) -> bool {
        matches!(self, Self::Singleton | Self::Head)
    }

    /// Check if writes continue to a successor.
    pub fn has_successor(&self) -> bool {
        matches!(self, Self::Head | Self::Middle)
    }

    /// Check if writes arrive from a predecessor.
    pub fn has_predecessor(&self) -> bool {
        matches!(self, Self::Middle | Self::Tail)
    }
}

impl TryFrom<i32> for ChainRole {
    type Error = UnknownRole;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::Singleton),
            1 => Ok(Self::Head),
            2 => Ok(Self::Middle),
            3 => Ok(Self::Tail),
            other => Err(UnknownRole(other)),
        }
    }
}

impl From<ChainRole> for i32 {
    fn from(role: ChainRole) -> Self {
        match role {
            ChainRole::Singleton => 0,
            ChainRole::Head => 1,
            ChainRole::Middle => 2,
            ChainRole::Tail => 3,
        }
    }
}

impl fmt::Display for ChainRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Singleton => "singleton",
            Self::Head => "head",
            Self::Middle => "middle",
            Self::Tail => "tail",
        };
        f.write_str(name)
    }
}

// =============================================================================
// CLUSTER C: WRITES
// =============================================================================

/// A single mutation of block contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteOp {
    /// Insert or overwrite a key.
    Put { key: Key, value: Value },
    /// Delete a key.
    Remove { key: Key },
}

impl WriteOp {
    /// Create a Put operation.
    pub fn put(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        WriteOp::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Create a Remove operation.
    pub fn remove(key: impl Into<Vec<u8>>) -> Self {
        WriteOp::Remove { key: key.into() }
    }

    /// Key touched by this operation.
    pub fn key(&self) -> &[u8] {
        match self {
            WriteOp::Put { key, .. } | WriteOp::Remove { key } => key,
        }
    }
}

/// A sequenced write travelling down a replica chain.
///
/// `seq` is assigned by the chain head and preserved by every replica.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteRecord {
    /// Head-assigned sequence number.
    pub seq: u64,
    /// Slot the key hashes to.
    pub slot: Slot,
    /// The mutation itself.
    pub op: WriteOp,
}

impl WriteRecord {
    /// Create a new record.
    pub fn new(seq: u64, slot: Slot, op: WriteOp) -> Self {
        Self { seq, slot, op }
    }
}
