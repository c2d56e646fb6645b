//! # Block Pool
//!
//! FREE and ALLOCATED sets of physical block names.
//!
//! Free blocks are handed out in FIFO order: a freed block goes to the back
//! of the queue, so a block that was just reset is the last one reused.
//! Every registered name is in exactly one of the two sets.

use std::collections::{HashSet, VecDeque};

use shared_types::BlockName;

use super::errors::AllocatorError;

/// Free and allocated block names.
#[derive(Debug, Default)]
pub struct BlockPool {
    free: VecDeque<BlockName>,
    allocated: HashSet<BlockName>,
}

impl BlockPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pool with `names` free, in order. Duplicates are rejected.
    pub fn with_blocks(names: &[BlockName]) -> Result<Self, AllocatorError> {
        let mut pool = Self::new();
        pool.add(names)?;
        Ok(pool)
    }

    pub fn num_free(&self) -> usize {
        self.free.len()
    }

    pub fn num_allocated(&self) -> usize {
        self.allocated.len()
    }

    pub fn num_total(&self) -> usize {
        self.free.len() + self.allocated.len()
    }

    pub fn is_free(&self, name: &str) -> bool {
        self.free.iter().any(|n| n == name)
    }

    pub fn is_allocated(&self, name: &str) -> bool {
        self.allocated.contains(name)
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.is_allocated(name) || self.is_free(name)
    }

    /// Take the oldest free block.
    pub fn allocate(&mut self) -> Result<BlockName, AllocatorError> {
        let name = self.free.pop_front().ok_or(AllocatorError::NoCapacity {
            requested: 1,
            available: 0,
        })?;
        self.allocated.insert(name.clone());
        Ok(name)
    }

    /// Take `count` free blocks none of which is in `exclude`. Nothing is
    /// taken unless all of them can be.
    pub fn allocate_many(
        &mut self,
        count: usize,
        exclude: &[BlockName],
    ) -> Result<Vec<BlockName>, AllocatorError> {
        let picked: Vec<usize> = self
            .free
            .iter()
            .enumerate()
            .filter(|(_, name)| !exclude.contains(name))
            .map(|(i, _)| i)
            .take(count)
            .collect();

        if picked.len() < count {
            let available = self.free.iter().filter(|n| !exclude.contains(n)).count();
            return Err(AllocatorError::NoCapacity {
                requested: count,
                available,
            });
        }

        // Remove back to front so earlier indices stay valid.
        let mut names = Vec::with_capacity(count);
        for &i in picked.iter().rev() {
            if let Some(name) = self.free.remove(i) {
                names.push(name);
            }
        }
        names.reverse();
        for name in &names {
            self.allocated.insert(name.clone());
        }
        Ok(names)
    }

    /// Check that `name` is currently allocated.
    pub fn check_allocated(&self, name: &str) -> Result<(), AllocatorError> {
        if self.allocated.contains(name) {
            Ok(())
        } else if self.is_free(name) {
            Err(AllocatorError::NotAllocated(name.to_string()))
        } else {
            Err(AllocatorError::UnknownBlock(name.to_string()))
        }
    }

    /// Return an allocated block to the back of the free queue.
    pub fn release(&mut self, name: &str) -> Result<(), AllocatorError> {
        self.check_allocated(name)?;
        self.allocated.remove(name);
        self.free.push_back(name.to_string());
        Ok(())
    }

    /// Move a just-released block back to ALLOCATED. Returns false when it
    /// has already been handed out again.
    pub fn reclaim(&mut self, name: &str) -> bool {
        let Some(i) = self.free.iter().position(|n| n == name) else {
            return false;
        };
        if let Some(name) = self.free.remove(i) {
            self.allocated.insert(name);
        }
        true
    }

    /// Register new free blocks. Nothing is added if any name is taken.
    pub fn add(&mut self, names: &[BlockName]) -> Result<(), AllocatorError> {
        let mut seen = HashSet::new();
        for name in names {
            if self.is_registered(name) || !seen.insert(name.as_str()) {
                return Err(AllocatorError::AlreadyRegistered(name.clone()));
            }
        }
        self.free.extend(names.iter().cloned());
        Ok(())
    }

    /// Unregister free blocks. Nothing is removed if any name is allocated
    /// or unknown.
    pub fn remove(&mut self, names: &[BlockName]) -> Result<(), AllocatorError> {
        for name in names {
            if self.allocated.contains(name) {
                return Err(AllocatorError::StillLive(name.clone()));
            }
            if !self.is_free(name) {
                return Err(AllocatorError::UnknownBlock(name.clone()));
            }
        }
        self.free.retain(|n| !names.contains(n));
        Ok(())
    }
}
