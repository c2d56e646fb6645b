//! # Block Snapshot Codec
//!
//! Persisted form of a block's contents.
//!
//! Layout: \[MAGIC 8\]\[VERSION u16\]\[CRC32 u32\]\[LEN u64\]\[bincode payload\],
//! integers little-endian. The whole header and checksum are verified before
//! the payload is decoded, so a torn or foreign object never reaches the
//! block.

use serde::{Deserialize, Serialize};
use shared_types::{Key, Slot, Value};

use super::contents::BlockContents;
use super::errors::BlockError;

/// Magic bytes of a block snapshot.
const SNAPSHOT_MAGIC: &[u8; 8] = b"EKVSNAP\x01";

/// Current snapshot format version.
pub const SNAPSHOT_VERSION: u16 = 1;

const HEADER_LEN: usize = 8 + 2 + 4 + 8;

/// One persisted key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotEntry {
    pub slot: Slot,
    pub key: Key,
    pub value: Value,
}

/// Serialized contents of a block.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockSnapshot {
    pub entries: Vec<SnapshotEntry>,
}

impl BlockSnapshot {
    /// Capture the given contents.
    pub fn capture(contents: &BlockContents) -> Self {
        Self {
            entries: contents
                .iter()
                .map(|(slot, key, value)| SnapshotEntry {
                    slot,
                    key: key.clone(),
                    value: value.clone(),
                })
                .collect(),
        }
    }

    /// Rebuild contents from the snapshot.
    pub fn into_contents(self) -> BlockContents {
        BlockContents::from_entries(
            self.entries
                .into_iter()
                .map(|entry| (entry.slot, entry.key, entry.value)),
        )
    }

    /// Encode with header and checksum.
    pub fn encode(&self) -> Result<Vec<u8>, BlockError> {
        let payload = bincode::serialize(self).map_err(|e| BlockError::Codec(e.to_string()))?;

        let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
        buf.extend_from_slice(SNAPSHOT_MAGIC);
        buf.extend_from_slice(&SNAPSHOT_VERSION.to_le_bytes());
        buf.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
        buf.extend_from_slice(&(payload.len() as u64).to_le_bytes());
        buf.extend_from_slice(&payload);
        Ok(buf)
    }

    /// Verify and decode.
    pub fn decode(data: &[u8]) -> Result<Self, BlockError> {
        if data.len() < HEADER_LEN {
            return Err(BlockError::Codec(format!(
                "snapshot truncated: {} bytes",
                data.len()
            )));
        }

        let (magic, rest) = data.split_at(8);
        if magic != SNAPSHOT_MAGIC {
            return Err(BlockError::Codec("invalid magic".to_string()));
        }

        let (version, rest) = rest.split_at(2);
        let version = u16::from_le_bytes([version[0], version[1]]);
        if version != SNAPSHOT_VERSION {
            return Err(BlockError::Codec(format!(
                "unsupported snapshot version {}",
                version
            )));
        }

        let (checksum, rest) = rest.split_at(4);
        let checksum = u32::from_le_bytes([checksum[0], checksum[1], checksum[2], checksum[3]]);

        let (len, payload) = rest.split_at(8);
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(len);
        let len = u64::from_le_bytes(len_bytes);
        if payload.len() as u64 != len {
            return Err(BlockError::Codec(format!(
                "payload length {} does not match header {}",
                payload.len(),
                len
            )));
        }

        if crc32fast::hash(payload) != checksum {
            return Err(BlockError::Codec("checksum mismatch".to_string()));
        }

        bincode::deserialize(payload).map_err(|e| BlockError::Codec(e.to_string()))
    }
}
