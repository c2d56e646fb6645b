//! # Outbound Ports (Driven Ports)
//!
//! Dependencies the block service requires from its host.

use async_trait::async_trait;
use shared_types::{BlockName, SlotRange, WriteRecord};

use crate::domain::{BlockError, ImportBatch, ImportReceipt, SplitRequest, StoreError, TransferId};

/// Durable byte storage keyed by path.
///
/// Both operations are atomic at path granularity: a reader sees either
/// the previous object or the new one, never a mix.
///
/// Production: `LocalFsBackingStore`
/// Testing: `InMemoryBackingStore`
#[async_trait]
pub trait BackingStore: Send + Sync {
    /// Replace the object at `path`.
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<(), StoreError>;

    /// Read the object at `path`.
    async fn read(&self, path: &str) -> Result<Vec<u8>, StoreError>;
}

/// Messages a block sends to peer blocks, addressed by name.
///
/// Any failure to reach `target` is reported as `BlockError::Unreachable`;
/// errors raised by the peer itself are passed through.
#[async_trait]
pub trait BlockTransport: Send + Sync {
    /// Forward a sequenced write to the successor.
    async fn replicate(&self, target: &str, record: WriteRecord) -> Result<(), BlockError>;

    /// Acknowledge a write to the predecessor.
    async fn acknowledge(&self, target: &str, seq: u64) -> Result<(), BlockError>;

    /// Push an export batch to an importing block.
    async fn import(&self, target: &str, batch: ImportBatch) -> Result<ImportReceipt, BlockError>;

    /// Ask an importing block to confirm a finished transfer.
    async fn confirm_import(
        &self,
        target: &str,
        transfer: TransferId,
        range: SlotRange,
        expected: u64,
    ) -> Result<(), BlockError>;
}

/// Receiver of auto-scale split requests (the partitioning authority).
#[async_trait]
pub trait AutoScaler: Send + Sync {
    async fn request_split(&self, request: SplitRequest) -> Result<(), BlockError>;
}

/// Scaler that drops every request.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopScaler;

#[async_trait]
impl AutoScaler for NoopScaler {
    async fn request_split(&self, _request: SplitRequest) -> Result<(), BlockError> {
        Ok(())
    }
}

/// Error a transport reports when `target` cannot be reached.
pub fn unreachable(target: &str) -> BlockError {
    BlockError::Unreachable(BlockName::from(target))
}
