use async_trait::async_trait;
use shared_types::{BlockName, ChainRole, Slot, SlotRange, SlotSet, Value, WriteOp, WriteRecord};

use super::BlockManager;
use crate::domain::{BlockError, BlockStatus, ImportBatch, ImportReceipt, TransferId};
use crate::ports::inbound::{ChainDataApi, StorageManagementApi};

#[async_trait]
impl StorageManagementApi for BlockManager {
    fn setup_block(
        &self,
        block_name: &str,
        path: &str,
        slot_begin: Slot,
        slot_end: Slot,
        chain: &[BlockName],
        auto_scale: bool,
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<(), BlockError> {
        BlockManager::setup_block(
            self,
            block_name,
            path,
            slot_begin,
            slot_end,
            chain,
            auto_scale,
            role,
            next_block_name,
        )
    }

    fn slot_range(&self, block_name: &str) -> Result<(Slot, Slot), BlockError> {
        BlockManager::slot_range(self, block_name)
    }

    fn owned_slots(&self, block_name: &str) -> Result<SlotSet, BlockError> {
        BlockManager::owned_slots(self, block_name)
    }

    fn path(&self, block_name: &str) -> Result<String, BlockError> {
        BlockManager::path(self, block_name)
    }

    async fn load(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError> {
        BlockManager::load(self, block_name, backing_path).await
    }

    async fn sync(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError> {
        BlockManager::sync(self, block_name, backing_path).await
    }

    async fn dump(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError> {
        BlockManager::dump(self, block_name, backing_path).await
    }

    fn reset(&self, block_name: &str) -> Result<(), BlockError> {
        BlockManager::reset(self, block_name)
    }

    fn set_exporting(
        &self,
        block_name: &str,
        target: &[BlockName],
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<(), BlockError> {
        BlockManager::set_exporting(self, block_name, target, slot_begin, slot_end)
    }

    fn setup_and_set_importing(
        &self,
        block_name: &str,
        path: &str,
        slot_begin: Slot,
        slot_end: Slot,
        chain: &[BlockName],
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<(), BlockError> {
        BlockManager::setup_and_set_importing(
            self,
            block_name,
            path,
            slot_begin,
            slot_end,
            chain,
            role,
            next_block_name,
        )
    }

    fn set_importing(
        &self,
        block_name: &str,
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<(), BlockError> {
        BlockManager::set_importing(self, block_name, slot_begin, slot_end)
    }

    async fn export_slots(&self, block_name: &str) -> Result<(), BlockError> {
        BlockManager::export_slots(self, block_name).await
    }

    fn set_regular(
        &self,
        block_name: &str,
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<(), BlockError> {
        BlockManager::set_regular(self, block_name, slot_begin, slot_end)
    }

    fn storage_capacity(&self, block_name: &str) -> Result<usize, BlockError> {
        BlockManager::storage_capacity(self, block_name)
    }

    fn storage_size(&self, block_name: &str) -> Result<usize, BlockError> {
        BlockManager::storage_size(self, block_name)
    }

    async fn resend_pending(&self, block_name: &str) -> Result<usize, BlockError> {
        BlockManager::resend_pending(self, block_name).await
    }

    async fn forward_all(&self, block_name: &str) -> Result<usize, BlockError> {
        BlockManager::forward_all(self, block_name).await
    }

    async fn reconfigure_chain(
        &self,
        block_name: &str,
        chain: &[BlockName],
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<(), BlockError> {
        BlockManager::reconfigure_chain(self, block_name, chain, role, next_block_name).await
    }

    fn status(&self, block_name: &str) -> Result<BlockStatus, BlockError> {
        BlockManager::status(self, block_name)
    }
}

#[async_trait]
impl ChainDataApi for BlockManager {
    async fn submit_write(
        &self,
        block_name: &str,
        slot: Slot,
        op: WriteOp,
    ) -> Result<u64, BlockError> {
        BlockManager::submit_write(self, block_name, slot, op).await
    }

    fn read(&self, block_name: &str, slot: Slot, key: &[u8]) -> Result<Option<Value>, BlockError> {
        BlockManager::read(self, block_name, slot, key)
    }

    async fn replicate(&self, block_name: &str, record: WriteRecord) -> Result<(), BlockError> {
        BlockManager::replicate(self, block_name, record).await
    }

    async fn acknowledge(&self, block_name: &str, seq: u64) -> Result<(), BlockError> {
        BlockManager::acknowledge(self, block_name, seq).await
    }

    async fn receive_import(
        &self,
        block_name: &str,
        batch: ImportBatch,
    ) -> Result<ImportReceipt, BlockError> {
        BlockManager::receive_import(self, block_name, batch).await
    }

    async fn confirm_import(
        &self,
        block_name: &str,
        transfer: TransferId,
        range: SlotRange,
        expected: u64,
    ) -> Result<(), BlockError> {
        BlockManager::confirm_import(self, block_name, transfer, range, expected).await
    }
}
