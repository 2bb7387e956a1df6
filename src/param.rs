//! Shape constants for the engine.
//!
//! These are fixed at compile time because the on-block layout ([`crate::
//! index_block::IndexBlockRepr`]) is baked into their relationship: changing
//! `BLOCK_SIZE` or `DIRECT_COUNT` changes `SLOTS_PER_INDEX`. The *number* of
//! blocks a concrete filesystem holds is not one of these. It's a runtime
//! parameter to [`crate::filesystem::Filesystem::new`].

use core::mem;
use static_assertions::const_assert;

/// Size in bytes of a single block, data or index alike.
pub const BLOCK_SIZE: usize = 64;

/// Number of direct block pointers held inline in an inode.
pub const DIRECT_COUNT: usize = 4;

/// Size in bytes of a single block index as stored on a block.
const INDEX_SIZE: usize = mem::size_of::<u32>();

/// Number of data-block slots in one index block, after reserving one slot
/// for the "next index block" pointer.
pub const SLOTS_PER_INDEX: usize = BLOCK_SIZE / INDEX_SIZE - 1;

const_assert!(SLOTS_PER_INDEX == 15);
const_assert!(BLOCK_SIZE % INDEX_SIZE == 0);

/// Direct capacity of an inode, in bytes, before the indirect chain is used.
pub const DIRECT_CAPACITY: usize = DIRECT_COUNT * BLOCK_SIZE;
