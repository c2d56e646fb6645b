//! # Domain Layer for Storage Blocks
//!
//! Pure state and rules with no I/O dependencies.
//!
//! ## Contents
//!
//! - **block**: the per-block state machine (`StorageBlock`)
//! - **chain**: replica chain view (`ChainTopology`)
//! - **migration**: export/import phases and transfer messages
//! - **contents**: key-value data with exact size accounting
//! - **snapshot**: persisted snapshot codec
//! - **invariants**: ownership checks across blocks
//! - **config** / **errors**

mod block;
mod chain;
mod config;
mod contents;
mod errors;
mod invariants;
mod migration;
mod snapshot;

pub use block::*;
pub use chain::*;
pub use config::*;
pub use contents::*;
pub use errors::*;
pub use invariants::*;
pub use migration::*;
pub use snapshot::*;
