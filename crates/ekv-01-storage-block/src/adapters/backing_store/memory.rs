use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::domain::StoreError;
use crate::ports::outbound::BackingStore;

/// In-memory backing store for tests and single-process runs.
///
/// Objects are replaced whole under a write lock, which gives the
/// per-path atomicity the port requires. Reads and writes can be made to
/// fail on demand, and writes can be slowed down.
#[derive(Default)]
pub struct InMemoryBackingStore {
    objects: RwLock<HashMap<String, Vec<u8>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    write_delay: RwLock<Option<Duration>>,
}

impl InMemoryBackingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent read fail with `StoreError::Io`.
    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write fail with `StoreError::Io`.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent write take at least `delay`.
    pub fn delay_writes(&self, delay: Option<Duration>) {
        *self.write_delay.write() = delay;
    }

    /// Check if an object exists at `path`.
    pub fn contains(&self, path: &str) -> bool {
        self.objects.read().contains_key(path)
    }

    /// Overwrite raw bytes, bypassing the codec.
    pub fn put_raw(&self, path: &str, bytes: Vec<u8>) {
        self.objects.write().insert(path.to_string(), bytes);
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl BackingStore for InMemoryBackingStore {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError> {
        let delay = *self.write_delay.read();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: path.to_string(),
                message: "injected write failure".to_string(),
            });
        }
        self.objects.write().insert(path.to_string(), bytes);
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                path: path.to_string(),
                message: "injected read failure".to_string(),
            });
        }
        self.objects
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                path: path.to_string(),
            })
    }
}
