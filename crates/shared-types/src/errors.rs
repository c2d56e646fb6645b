//! # Error Types
//!
//! Errors raised while building or combining slot ranges.

use thiserror::Error;

use crate::entities::Slot;

/// Errors produced by `SlotRange` and `SlotSet` operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotRangeError {
    /// `begin >= end`: the interval holds no slot.
    #[error("Empty slot range: [{begin}, {end})")]
    Empty { begin: Slot, end: Slot },

    /// The interval reaches past the keyspace.
    #[error("Slot range [{begin}, {end}) exceeds keyspace of {max} slots")]
    OutOfKeyspace { begin: Slot, end: Slot, max: Slot },

    /// The interval intersects slots already present in the set.
    #[error("Slot range [{begin}, {end}) overlaps existing ownership")]
    Overlap { begin: Slot, end: Slot },

    /// The interval is not fully contained in the set.
    #[error("Slot range [{begin}, {end}) is not owned")]
    NotContained { begin: Slot, end: Slot },
}

/// Errors parsing a wire-level chain role.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown chain role: {0}")]
pub struct UnknownRole(pub i32);
