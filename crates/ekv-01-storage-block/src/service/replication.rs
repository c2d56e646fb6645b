//! Chain data path and pending-write replay.
//!
//! Writes enter at the head, are applied locally, buffered, and forwarded
//! down the chain; the tail acknowledges upstream and every replica drops
//! the acknowledged write from its buffer. When a forward fails the block
//! stops forwarding new writes and keeps them buffered, so a later replay
//! delivers them in sequence order.
//!
//! Sequencing and sending happen under the block's forwarding lane, so two
//! concurrent writes can never overtake each other on the way down.

use shared_types::{BlockName, ChainRole, Slot, Value, WriteOp, WriteRecord};
use tracing::{debug, info, warn};

use super::{BlockManager, SharedBlock};
use crate::domain::BlockError;

impl BlockManager {
    pub async fn submit_write(
        &self,
        block_name: &str,
        slot: Slot,
        op: WriteOp,
    ) -> Result<u64, BlockError> {
        let block = self.block(block_name)?;
        let lane = self.lane(block_name)?;
        let order = lane.lock().await;

        let write = block.write().apply_client_write(slot, op)?;
        let seq = write.record.seq;
        debug!("[ekv-01] Block {} accepted write {} on slot {}", block_name, seq, slot);

        if let Some(next) = write.forward_to {
            self.forward(&block, block_name, &next, write.record).await;
        }
        drop(order);

        if let Some(split) = write.split {
            info!(
                "[ekv-01] Block {} reached {}/{} bytes, requesting split of {}",
                block_name, split.storage_size, split.storage_capacity, split.slots
            );
            if let Err(e) = self.scaler.request_split(split).await {
                warn!("[ekv-01] Split request for {} failed: {}", block_name, e);
            }
        }
        Ok(seq)
    }

    pub fn read(&self, block_name: &str, slot: Slot, key: &[u8]) -> Result<Option<Value>, BlockError> {
        let block = self.block(block_name)?;
        let value = block.read().read(slot, key)?;
        Ok(value)
    }

    pub async fn replicate(&self, block_name: &str, record: WriteRecord) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let lane = self.lane(block_name)?;
        let order = lane.lock().await;

        let step = block.write().replicate(&record)?;
        let seq = record.seq;
        if !step.applied {
            debug!("[ekv-01] Block {} already applied write {}", block_name, seq);
        }

        if let Some(next) = step.forward_to {
            self.forward(&block, block_name, &next, record).await;
        }
        drop(order);
        if let Some(predecessor) = step.ack_to {
            if let Err(e) = self.transport.acknowledge(&predecessor, seq).await {
                warn!(
                    "[ekv-01] Block {} could not acknowledge write {} to {}: {}",
                    block_name, seq, predecessor, e
                );
            }
        }
        Ok(())
    }

    pub async fn acknowledge(&self, block_name: &str, seq: u64) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let upstream = block.write().acknowledge(seq)?;
        if let Some(predecessor) = upstream {
            self.transport.acknowledge(&predecessor, seq).await?;
        }
        Ok(())
    }

    pub async fn resend_pending(&self, block_name: &str) -> Result<usize, BlockError> {
        let block = self.block(block_name)?;
        let lane = self.lane(block_name)?;
        let _order = lane.lock().await;
        let mut sent = 0usize;
        let mut last: Option<u64> = None;

        loop {
            let (next, records) = block.write().pending_after(last)?;
            if records.is_empty() {
                break;
            }
            let next = next.ok_or_else(|| {
                BlockError::state(block_name, "resend_pending", "no successor to resend to")
            })?;

            for record in records {
                let seq = record.seq;
                if let Err(e) = self.transport.replicate(&next, record).await {
                    block.write().mark_stalled();
                    warn!(
                        "[ekv-01] Resend from {} stopped at write {} ({} sent): {}",
                        block_name, seq, sent, e
                    );
                    return Err(e);
                }
                sent += 1;
                last = Some(seq);
            }
        }

        if sent > 0 {
            info!("[ekv-01] Block {} resent {} pending writes", block_name, sent);
        }
        Ok(sent)
    }

    pub async fn forward_all(&self, block_name: &str) -> Result<usize, BlockError> {
        let block = self.block(block_name)?;
        let lane = self.lane(block_name)?;
        let _order = lane.lock().await;
        let mut sent = 0usize;

        loop {
            let (next, records) = block.write().take_pending()?;
            if records.is_empty() {
                break;
            }
            let Some(next) = next else {
                block.write().restore_pending(records);
                return Err(BlockError::state(
                    block_name,
                    "forward_all",
                    "no successor to forward to",
                ));
            };

            let mut records = records.into_iter();
            while let Some(record) = records.next() {
                let seq = record.seq;
                if let Err(e) = self.transport.replicate(&next, record.clone()).await {
                    let mut unsent = vec![record];
                    unsent.extend(records);
                    block.write().restore_pending(unsent);
                    warn!(
                        "[ekv-01] Forwarding from {} stopped at write {} ({} sent): {}",
                        block_name, seq, sent, e
                    );
                    return Err(e);
                }
                sent += 1;
            }
        }

        if sent > 0 {
            info!("[ekv-01] Block {} forwarded {} buffered writes", block_name, sent);
        }
        Ok(sent)
    }

    pub async fn reconfigure_chain(
        &self,
        block_name: &str,
        chain: &[BlockName],
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let change = block.write().reconfigure_chain(chain, role, next_block_name)?;
        info!(
            "[ekv-01] Block {} is now {} in {:?}",
            block_name, role, chain
        );

        if let Some(predecessor) = change.ack_to {
            for seq in change.released {
                if let Err(e) = self.transport.acknowledge(&predecessor, seq).await {
                    warn!(
                        "[ekv-01] Block {} could not acknowledge write {} to {}: {}",
                        block_name, seq, predecessor, e
                    );
                    break;
                }
            }
        }
        Ok(())
    }

    async fn forward(&self, block: &SharedBlock, block_name: &str, next: &str, record: WriteRecord) {
        let seq = record.seq;
        if let Err(e) = self.transport.replicate(next, record).await {
            block.write().mark_stalled();
            warn!(
                "[ekv-01] Block {} holding write {} for resend, {} unreachable: {}",
                block_name, seq, next, e
            );
        }
    }
}
