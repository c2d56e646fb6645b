//! Export/import handshake.
//!
//! The exporter pushes its range to the target chain head in batches,
//! drains writes mirrored meanwhile, seals the range, and asks the target
//! to confirm the total. Ownership flips on the exporter only after that
//! confirmation; any failure before it drops the attempt and leaves the
//! EXPORTING mark in place. Importers pass every batch and confirmation on
//! to their successor so the whole target chain holds the data.

use shared_types::SlotRange;
use tracing::{debug, info, warn};

use super::{BlockManager, SharedBlock};
use crate::domain::{
    BlockError, ExportPlan, ImportBatch, ImportReceipt, MigratedEntry, TransferId,
};

impl BlockManager {
    pub async fn export_slots(&self, block_name: &str) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let plan = block.write().begin_export()?;
        let Some(plan) = plan else {
            debug!(
                "[ekv-01] Export on {} already committed; waiting for set_regular",
                block_name
            );
            return Ok(());
        };

        let transfer = plan.transfer;
        info!(
            "[ekv-01] Block {} exporting {} ({} keys) to {} [transfer {}]",
            block_name,
            plan.range,
            plan.entries.len(),
            plan.target_head,
            transfer
        );

        match self.run_transfer(&block, plan).await {
            Ok(range) => {
                info!(
                    "[ekv-01] Block {} handed over {} [transfer {}]",
                    block_name, range, transfer
                );
                Ok(())
            }
            Err(err) => {
                let reopened = block.write().abort_export(transfer);
                warn!(
                    "[ekv-01] Export from {} aborted [transfer {}]: {}{}",
                    block_name,
                    transfer,
                    err,
                    if reopened { "" } else { " (attempt already gone)" }
                );
                Err(match err {
                    BlockError::MigrationAborted { .. } => err,
                    other => BlockError::MigrationAborted {
                        block: block_name.to_string(),
                        reason: other.to_string(),
                    },
                })
            }
        }
    }

    async fn run_transfer(
        &self,
        block: &SharedBlock,
        plan: ExportPlan,
    ) -> Result<SlotRange, BlockError> {
        let ExportPlan {
            transfer,
            range,
            target_head,
            entries,
        } = plan;

        let mut shipped = self
            .push_entries(&target_head, transfer, range, entries, 0)
            .await?;

        loop {
            let mirrored = block.write().drain_mirror(transfer)?;
            match mirrored {
                Some(entries) => {
                    debug!(
                        "[ekv-01] Shipping {} mirrored writes [transfer {}]",
                        entries.len(),
                        transfer
                    );
                    shipped = self
                        .push_entries(&target_head, transfer, range, entries, shipped)
                        .await?;
                }
                None => break,
            }
        }

        self.transport
            .confirm_import(&target_head, transfer, range, shipped)
            .await?;

        let committed = block.write().commit_export(transfer)?;
        Ok(committed)
    }

    /// Push `entries` in batches. Always sends at least one batch so the
    /// importer learns about the transfer. Returns the running total.
    async fn push_entries(
        &self,
        target: &str,
        transfer: TransferId,
        range: SlotRange,
        entries: Vec<MigratedEntry>,
        shipped: u64,
    ) -> Result<u64, BlockError> {
        let batch_size = self.config.export_batch_size.max(1);
        let mut batches: Vec<Vec<MigratedEntry>> = Vec::new();
        let mut entries = entries.into_iter().peekable();
        while entries.peek().is_some() {
            batches.push(entries.by_ref().take(batch_size).collect());
        }
        if batches.is_empty() {
            batches.push(Vec::new());
        }

        let mut total = shipped;
        for batch in batches {
            total += batch.len() as u64;
            let receipt = self
                .transport
                .import(
                    target,
                    ImportBatch {
                        transfer,
                        range,
                        entries: batch,
                    },
                )
                .await?;
            if receipt.received != total {
                return Err(BlockError::MigrationAborted {
                    block: target.to_string(),
                    reason: format!("importer holds {} entries, sent {}", receipt.received, total),
                });
            }
        }
        Ok(total)
    }

    pub async fn receive_import(
        &self,
        block_name: &str,
        batch: ImportBatch,
    ) -> Result<ImportReceipt, BlockError> {
        let block = self.block(block_name)?;
        let downstream = batch.clone();
        let (receipt, next) = block.write().receive_import(batch)?;
        debug!(
            "[ekv-01] Block {} received import batch ({} total) [transfer {}]",
            block_name, receipt.received, downstream.transfer
        );

        if let Some(next) = next {
            let forwarded = self.transport.import(&next, downstream).await?;
            if forwarded.received != receipt.received {
                return Err(BlockError::MigrationAborted {
                    block: next,
                    reason: format!(
                        "replica holds {} entries, expected {}",
                        forwarded.received, receipt.received
                    ),
                });
            }
        }
        Ok(receipt)
    }

    pub async fn confirm_import(
        &self,
        block_name: &str,
        transfer: TransferId,
        range: SlotRange,
        expected: u64,
    ) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let next = block.write().confirm_import(transfer, range, expected)?;
        info!(
            "[ekv-01] Block {} confirmed import of {} ({} entries) [transfer {}]",
            block_name, range, expected, transfer
        );

        if let Some(next) = next {
            self.transport
                .confirm_import(&next, transfer, range, expected)
                .await?;
        }
        Ok(())
    }
}
