//! # EKV-02 Block Allocator
//!
//! Pool of physical storage blocks handed out to the partitioning
//! authority when it builds or extends a block chain.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | FREE and ALLOCATED are disjoint | `BlockPool` moves names between the two under one lock |
//! | No double hand-out | `allocate` pops from FREE; only `free` puts a name back |
//! | Free only after reset | `free` consults `BlockResetProbe` when strict checking is on |
//!
//! ## Usage
//!
//! ```ignore
//! use ekv_02_block_allocator::{AllocatorConfig, BlockAllocationApi, BlockAllocator};
//!
//! let allocator = BlockAllocator::new(AllocatorConfig::with_blocks(names))?
//!     .with_probe(probe);
//! let chain = allocator.allocate_many(3, &[])?;
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::StaticResetProbe;
pub use domain::{AllocatorConfig, AllocatorError, BlockPool};
pub use ports::inbound::BlockAllocationApi;
pub use ports::outbound::BlockResetProbe;
pub use service::BlockAllocator;
