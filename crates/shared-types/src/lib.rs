//! # Shared Types Crate
//!
//! Vocabulary shared by every Elastic-KV crate: block names, hash slots,
//! slot ranges, replication roles and the write records that travel down a
//! replica chain.
//!
//! ## Design Principles
//!
//! - **Opaque names**: block names are defined by the partitioning authority;
//!   nothing here parses them.
//! - **Half-open ranges**: every slot interval is `[begin, end)` and is never
//!   empty once constructed.
//! - **Disjoint ownership**: a `SlotSet` keeps its ranges sorted, disjoint and
//!   coalesced, so ownership questions have a single answer.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
