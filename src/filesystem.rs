//! The container owning the block pool and its raw backing storage.

use crate::error::Result;
use crate::index_block::{self, IndexBlock};
use crate::param::BLOCK_SIZE;
use crate::pool::{BlockIndex, BlockPool};

/// Owns the flat byte storage backing every block, plus the pool tracking
/// which of those blocks are in use.
///
/// This is the in-memory stand-in for what the file-handle layer's
/// superblock would otherwise own on disk; persistence and on-disk image
/// format are out of scope here.
#[derive(Debug)]
pub struct Filesystem {
    pool: BlockPool,
    storage: Vec<u8>,
}

impl Filesystem {
    /// Builds a filesystem with `total_blocks` blocks of `BLOCK_SIZE` bytes
    /// each, including the reserved block `0`.
    pub fn new(total_blocks: usize) -> Self {
        Self {
            pool: BlockPool::new(total_blocks),
            storage: vec![0u8; total_blocks * BLOCK_SIZE],
        }
    }

    pub fn pool(&self) -> &BlockPool {
        &self.pool
    }

    pub fn pool_mut(&mut self) -> &mut BlockPool {
        &mut self.pool
    }

    pub fn storage(&self) -> &[u8] {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut [u8] {
        &mut self.storage
    }

    /// Raw bytes of `block`. Panics if `block` is out of range for this
    /// filesystem's capacity.
    pub fn block_bytes(&self, block: BlockIndex) -> &[u8] {
        self.pool.block_bytes(&self.storage, block)
    }

    /// Mutable raw bytes of `block`.
    pub fn block_bytes_mut(&mut self, block: BlockIndex) -> &mut [u8] {
        self.pool.block_bytes_mut(&mut self.storage, block)
    }

    /// Number of free blocks, not counting the reserved block `0`.
    pub fn available_count(&self) -> usize {
        self.pool.available_count()
    }

    /// Total block capacity, including the reserved block `0`.
    pub fn total_blocks(&self) -> usize {
        self.pool.total_blocks()
    }

    /// Claims a block and zeroes its on-block encoding so it can
    /// immediately be interpreted as an empty index block (an
    /// uninitialized block would otherwise have garbage slots).
    pub(crate) fn claim_zeroed_index_block(&mut self) -> Result<BlockIndex> {
        let block = self.pool.claim()?;
        index_block::encode(
            &IndexBlock::default(),
            self.pool.block_bytes_mut(&mut self.storage, block),
        );
        Ok(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_reserves_block_zero() {
        let fs = Filesystem::new(8);
        assert_eq!(fs.total_blocks(), 8);
        assert_eq!(fs.available_count(), 7);
    }
}
