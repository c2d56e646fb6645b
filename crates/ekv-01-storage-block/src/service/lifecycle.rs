use shared_types::{BlockName, ChainRole, Slot, SlotSet};
use tracing::{info, warn};

use super::BlockManager;
use crate::domain::{BlockError, BlockSetup, BlockStatus, RegularOutcome};

impl BlockManager {
    #[allow(clippy::too_many_arguments)]
    pub fn setup_block(
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
        let setup = BlockSetup {
            path: path.to_string(),
            slot_begin,
            slot_end,
            chain: chain.to_vec(),
            auto_scale,
            role,
            next_block_name: next_block_name.to_string(),
        };
        self.setup(block_name, setup, false)
    }

    pub fn setup_and_set_importing(
        &self,
        block_name: &str,
        path: &str,
        slot_begin: Slot,
        slot_end: Slot,
        chain: &[BlockName],
        role: ChainRole,
        next_block_name: &str,
    ) -> Result<(), BlockError> {
        let setup = BlockSetup {
            path: path.to_string(),
            slot_begin,
            slot_end,
            chain: chain.to_vec(),
            auto_scale: false,
            role,
            next_block_name: next_block_name.to_string(),
        };
        self.setup(block_name, setup, true)
    }

    fn setup(&self, block_name: &str, setup: BlockSetup, import: bool) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let (begin, end, role) = (setup.slot_begin, setup.slot_end, setup.role);
        block.write().setup(setup, import)?;
        info!(
            "[ekv-01] Block {} set up as {} for [{}, {}){}",
            block_name,
            role,
            begin,
            end,
            if import { ", importing" } else { "" }
        );
        Ok(())
    }

    pub fn reset(&self, block_name: &str) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        if block.write().reset() {
            info!("[ekv-01] Block {} reset", block_name);
        }
        Ok(())
    }

    pub fn set_exporting(
        &self,
        block_name: &str,
        target: &[BlockName],
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        block.write().set_exporting(target, slot_begin, slot_end)?;
        info!(
            "[ekv-01] Block {} exporting [{}, {}) to {:?}",
            block_name, slot_begin, slot_end, target
        );
        Ok(())
    }

    pub fn set_importing(
        &self,
        block_name: &str,
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        block.write().set_importing(slot_begin, slot_end)?;
        info!(
            "[ekv-01] Block {} importing [{}, {})",
            block_name, slot_begin, slot_end
        );
        Ok(())
    }

    pub fn set_regular(
        &self,
        block_name: &str,
        slot_begin: Slot,
        slot_end: Slot,
    ) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let outcome = block.write().set_regular(slot_begin, slot_end)?;
        match outcome {
            RegularOutcome::Unchanged => {}
            RegularOutcome::Absorbed(range) => {
                info!("[ekv-01] Block {} now owns {}", block_name, range)
            }
            RegularOutcome::Released(range) => {
                info!("[ekv-01] Block {} released {}", block_name, range)
            }
            RegularOutcome::RolledBack(range) => {
                warn!(
                    "[ekv-01] Block {} rolled back unfinished migration of {}",
                    block_name, range
                )
            }
        }
        Ok(())
    }

    pub fn slot_range(&self, block_name: &str) -> Result<(Slot, Slot), BlockError> {
        let block = self.block(block_name)?;
        let range = block.read().slot_range()?;
        Ok(range.as_tuple())
    }

    pub fn owned_slots(&self, block_name: &str) -> Result<SlotSet, BlockError> {
        let block = self.block(block_name)?;
        let owned = block.read().owned_slots()?;
        Ok(owned)
    }

    pub fn path(&self, block_name: &str) -> Result<String, BlockError> {
        let block = self.block(block_name)?;
        let path = block.read().path()?.to_string();
        Ok(path)
    }

    pub fn storage_capacity(&self, block_name: &str) -> Result<usize, BlockError> {
        let block = self.block(block_name)?;
        let capacity = block.read().storage_capacity();
        Ok(capacity)
    }

    pub fn storage_size(&self, block_name: &str) -> Result<usize, BlockError> {
        let block = self.block(block_name)?;
        let size = block.read().storage_size();
        Ok(size)
    }

    pub fn status(&self, block_name: &str) -> Result<BlockStatus, BlockError> {
        let block = self.block(block_name)?;
        let status = block.read().status();
        Ok(status)
    }
}
