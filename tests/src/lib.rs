//! # Elastic-KV Test Suite
//!
//! Unified test crate for flows that span more than one block, manager or
//! crate.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── src/integration/
//! │   ├── fixtures.rs      # multi-server cluster harness, authority steps
//! │   ├── migration.rs     # export/import handshake, crash + retry, random splits
//! │   ├── replication.rs   # chain failover, ordered replay
//! │   ├── persistence.rs   # dump/load on the filesystem store, reset equivalence
//! │   └── allocation.rs    # allocator concurrency, allocate → setup → reset → free
//! └── benches/
//!     └── block_benchmarks.rs
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p ekv-tests
//! cargo test -p ekv-tests integration::migration::
//! cargo bench -p ekv-tests
//! ```

pub mod integration;
