//! load / sync / dump.
//!
//! The block lock is released while the backing store works; the block
//! generation taken before the I/O is checked again afterwards, so a reset
//! in between is never overwritten by stale data.

use tracing::{debug, info, warn};

use super::BlockManager;
use crate::domain::{BlockError, BlockSnapshot};

impl BlockManager {
    pub async fn load(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let generation = block.read().begin_load()?;

        let bytes = self.store.read(backing_path).await?;
        let contents = BlockSnapshot::decode(&bytes)?.into_contents();
        let total = contents.len();

        let installed = block.write().install_contents(generation, contents)?;
        if installed < total {
            warn!(
                "[ekv-01] Block {} dropped {} loaded keys outside its slots",
                block_name,
                total - installed
            );
        }
        info!(
            "[ekv-01] Block {} loaded {} keys from {}",
            block_name, installed, backing_path
        );
        Ok(())
    }

    pub async fn sync(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let bytes = block.read().encode_snapshot()?;
        let len = bytes.len();

        self.store.write(backing_path, bytes).await?;
        debug!(
            "[ekv-01] Block {} synced {} bytes to {}",
            block_name, len, backing_path
        );
        Ok(())
    }

    pub async fn dump(&self, block_name: &str, backing_path: &str) -> Result<(), BlockError> {
        let block = self.block(block_name)?;
        let (generation, bytes) = block.write().begin_dump()?;

        let written = self.store.write(backing_path, bytes).await;
        let released = block.write().finish_dump(generation, written.is_ok());

        match written {
            Ok(()) if released => {
                info!("[ekv-01] Block {} dumped to {}", block_name, backing_path);
                Ok(())
            }
            Ok(()) => {
                warn!(
                    "[ekv-01] Block {} was reset while dumping to {}",
                    block_name, backing_path
                );
                Ok(())
            }
            Err(e) => {
                warn!("[ekv-01] Dump of block {} failed: {}", block_name, e);
                Err(e.into())
            }
        }
    }
}
