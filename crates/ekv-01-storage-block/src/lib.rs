//! # EKV-01 Storage Block
//!
//! Per-block control plane of the elastic key-value store: slot ownership,
//! chain replication role, slot migration and persistence.
//!
//! **Subsystem ID:** 1
//! **Architecture:** Hexagonal (Domain + Ports/Adapters)
//!
//! ## Block State Machine
//!
//! ```text
//! UNALLOCATED ──setup_block──→ REGULAR ⇄ {EXPORTING, IMPORTING} ──set_regular──→ REGULAR
//!      ↑                                                                          │
//!      └──────────────────────────── reset / dump ───────────────────────────────┘
//! ```
//!
//! ## Invariants
//!
//! | Invariant | Enforcement |
//! |-----------|-------------|
//! | No double ownership | exporter drops a range only after the importer confirmed it |
//! | No partial load | snapshot verified and decoded before anything is installed |
//! | Ordered replay | pending writes kept in head-assigned sequence order |
//! | Lock locality | one lock per block, never held across backing store or peer I/O |
//!
//! ## Crate Structure
//!
//! ```text
//! ekv-01-storage-block/
//! ├── domain/     # StorageBlock, ChainTopology, migration phases, snapshot codec
//! ├── ports/      # StorageManagementApi, ChainDataApi + BackingStore, BlockTransport, AutoScaler
//! ├── adapters/   # in-memory / local fs stores, in-process transport, recording scaler
//! └── service/    # BlockManager
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use ekv_01_storage_block::{BlockConfig, BlockManager, InMemoryBackingStore, InProcessTransport};
//!
//! let transport = Arc::new(InProcessTransport::new());
//! let manager = Arc::new(BlockManager::new(
//!     BlockConfig::default(),
//!     Arc::new(InMemoryBackingStore::new()),
//!     transport.clone(),
//! ));
//! manager.add_block("node1:9090:0")?;
//! transport.register(manager.block_names(), &manager);
//!
//! manager.setup_block("node1:9090:0", "local://b0", 0, 65_536, &chain, true, ChainRole::Singleton, "")?;
//! ```

#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

// Re-exports
pub use adapters::{
    FaultPoint, InMemoryBackingStore, InProcessTransport, LocalFsBackingStore, RecordingScaler,
    LOCAL_SCHEME,
};
pub use domain::{
    invariant_full_coverage, invariant_no_double_ownership, BlockConfig, BlockContents,
    BlockError, BlockSnapshot, BlockStatus, ChainTopology, DoubleOwnership, ImportBatch,
    ImportReceipt, MigratedEntry, PhaseStatus, SplitRequest, StoreError, TransferId,
};
pub use ports::inbound::{ChainDataApi, StorageManagementApi};
pub use ports::outbound::{AutoScaler, BackingStore, BlockTransport, NoopScaler};
pub use service::BlockManager;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
