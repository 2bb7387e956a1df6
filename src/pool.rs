//! The block pool: a flat array of fixed-size blocks and an availability map.

use core::num::NonZeroU32;

use crate::error::{Error, Result};

/// A 1-based reference to a block in a [`BlockPool`].
///
/// Block `0` is reserved by the pool itself as the "no block" sentinel; a
/// `BlockIndex` can therefore never observe it, which is why this wraps
/// [`NonZeroU32`] rather than `u32`. Absence is expressed by wrapping the
/// whole type in `Option`, not by an in-band value.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct BlockIndex(NonZeroU32);

impl BlockIndex {
    fn new(raw: u32) -> Self {
        Self(NonZeroU32::new(raw).expect("BlockIndex::new called with 0"))
    }

    /// Reconstructs a `BlockIndex` from a raw nonzero value read back out of
    /// an index block's on-block encoding. Every such value was itself
    /// produced by `claim` before being written there, so this is not a
    /// fresh allocation, but decoding, and is restricted to [`crate::
    /// index_block`].
    pub(crate) fn from_raw(raw: NonZeroU32) -> Self {
        Self(raw)
    }

    /// The index as used to subscript the pool's backing storage.
    pub fn get(self) -> usize {
        self.0.get() as usize
    }
}

/// The fixed-size block store shared by every inode in a [`crate::
/// filesystem::Filesystem`].
///
/// `claim`/`release` are the only mutators; everything else in the engine
/// reaches the pool through them. Block `0` is marked permanently allocated
/// at construction and is never returned by `claim`.
#[derive(Debug)]
pub struct BlockPool {
    total_blocks: usize,
    allocated: Vec<bool>,
}

impl BlockPool {
    /// Builds a pool of `total_blocks` blocks, including the reserved
    /// block `0`. `total_blocks` must be at least 1.
    pub fn new(total_blocks: usize) -> Self {
        assert!(total_blocks >= 1, "a pool needs at least the reserved block");
        let mut allocated = vec![false; total_blocks];
        allocated[0] = true;
        Self {
            total_blocks,
            allocated,
        }
    }

    /// Total capacity of the pool, including the reserved block `0`.
    pub fn total_blocks(&self) -> usize {
        self.total_blocks
    }

    /// Number of blocks currently free for `claim`.
    pub fn available_count(&self) -> usize {
        self.allocated.iter().filter(|&&a| !a).count()
    }

    /// Allocates the lowest-indexed free block and returns its index.
    pub fn claim(&mut self) -> Result<BlockIndex> {
        let idx = self
            .allocated
            .iter()
            .position(|&a| !a)
            .ok_or(Error::OutOfBlocks)?;
        self.allocated[idx] = true;
        log::trace!("pool: claimed block {}", idx);
        Ok(BlockIndex::new(idx as u32))
    }

    /// Returns a block to the pool.
    ///
    /// # Panics
    ///
    /// Panics if the block is already free. Releasing a free block is a
    /// caller bug (a double-free of the same slot), not a recoverable
    /// runtime condition.
    pub fn release(&mut self, block: BlockIndex) {
        let idx = block.get();
        assert!(self.allocated[idx], "pool: freeing free block {}", idx);
        self.allocated[idx] = false;
        log::trace!("pool: released block {}", idx);
    }

    /// Raw bytes of a block, for reading file contents or decoding an index
    /// block.
    pub fn block_bytes<'a>(&self, storage: &'a [u8], block: BlockIndex) -> &'a [u8] {
        let start = block.get() * crate::param::BLOCK_SIZE;
        &storage[start..start + crate::param::BLOCK_SIZE]
    }

    /// Mutable raw bytes of a block.
    pub fn block_bytes_mut<'a>(&self, storage: &'a mut [u8], block: BlockIndex) -> &'a mut [u8] {
        let start = block.get() * crate::param::BLOCK_SIZE;
        &mut storage[start..start + crate::param::BLOCK_SIZE]
    }
}
