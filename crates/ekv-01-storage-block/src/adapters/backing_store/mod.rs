//! Backing store adapters.

mod local_fs;
mod memory;

pub use local_fs::{LocalFsBackingStore, LOCAL_SCHEME};
pub use memory::InMemoryBackingStore;
