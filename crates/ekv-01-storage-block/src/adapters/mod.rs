//! # Adapters Layer
//!
//! Implementations of the outbound ports.
//!
//! - `backing_store` - in-memory and local filesystem `BackingStore`s
//! - `transport` - in-process `BlockTransport` routing to hosted managers
//! - `scaler` - `AutoScaler` that records split requests

pub mod backing_store;
pub mod scaler;
pub mod transport;

pub use backing_store::{InMemoryBackingStore, LocalFsBackingStore, LOCAL_SCHEME};
pub use scaler::RecordingScaler;
pub use transport::{FaultPoint, InProcessTransport};
