//! In-memory inode shape and the offset-to-block addressing scheme.

use crate::error::{Error, Result};
use crate::filesystem::Filesystem;
use crate::index_block;
use crate::param::{BLOCK_SIZE, DIRECT_CAPACITY, DIRECT_COUNT, SLOTS_PER_INDEX};
use crate::pool::BlockIndex;

/// A single inode's book-keeping: its logical size and the blocks reachable
/// from it.
///
/// `Inode` owns no bytes itself; the bytes live in the owning
/// [`Filesystem`]'s block storage. `Inode` is only the addressing
/// structure: which blocks, in which order, hold this file's content.
#[derive(Clone, Debug, Default)]
pub struct Inode {
    pub(crate) file_size: usize,
    pub(crate) direct: [Option<BlockIndex>; DIRECT_COUNT],
    pub(crate) indirect_head: Option<BlockIndex>,
}

impl Inode {
    /// Logical length of the inode's byte sequence. Bytes at positions
    /// `>= file_size` are don't-care, even if a block backs them.
    pub fn file_size(&self) -> usize {
        self.file_size
    }
}

/// Where a single byte offset falls within the addressing structure, before
/// any block has necessarily been allocated for it.
enum Position {
    /// `direct[index]`.
    Direct { index: usize },
    /// The `slot`-th data pointer of the index block `chain_hops` links from
    /// the head of the indirect chain.
    Indirect { chain_hops: usize, slot: usize },
}

/// Splits a logical byte offset into (which slot holds it, offset within
/// that slot's block). This is the part of addressing that is pure
/// arithmetic and carries no side effects; [`locate_readonly`] and
/// [`locate_alloc`] differ only in what they do when the named slot turns
/// out to be empty.
fn split_offset(byte_offset: usize) -> (Position, usize) {
    let in_block = byte_offset % BLOCK_SIZE;
    if byte_offset < DIRECT_CAPACITY {
        (Position::Direct { index: byte_offset / BLOCK_SIZE }, in_block)
    } else {
        let t = byte_offset - DIRECT_CAPACITY;
        let chain_hops = t / (SLOTS_PER_INDEX * BLOCK_SIZE);
        let slot = (t / BLOCK_SIZE) % SLOTS_PER_INDEX;
        (Position::Indirect { chain_hops, slot }, in_block)
    }
}

/// The resolved physical location of a logical byte offset.
#[derive(Copy, Clone, Debug)]
pub struct Location {
    pub block: BlockIndex,
    pub in_block_offset: usize,
}

/// Resolves `byte_offset` against `inode` without allocating.
///
/// Returns [`Error::NotPresent`] if the offset falls on a slot that has no
/// block behind it yet. Used by [`crate::ops::read`].
pub fn locate_readonly(fs: &Filesystem, inode: &Inode, byte_offset: usize) -> Result<Location> {
    let (position, in_block_offset) = split_offset(byte_offset);
    let block = match position {
        Position::Direct { index } => inode.direct[index].ok_or(Error::NotPresent)?,
        Position::Indirect { chain_hops, slot } => {
            let mut current = inode.indirect_head.ok_or(Error::NotPresent)?;
            for _ in 0..chain_hops {
                let view = index_block::decode(fs.block_bytes(current));
                current = view.next.ok_or(Error::NotPresent)?;
            }
            let view = index_block::decode(fs.block_bytes(current));
            view.slots[slot].ok_or(Error::NotPresent)?
        }
    };
    Ok(Location { block, in_block_offset })
}

/// Resolves `byte_offset` against `inode`, allocating any data block or
/// index block needed to back it.
///
/// On [`Error::OutOfBlocks`] any index blocks already installed during the
/// walk are retained (the non-strict rollback policy: index blocks already
/// installed stay put). Only the caller's `file_size` snapshot, not this
/// function, is responsible for undoing partial progress.
pub fn locate_alloc(
    fs: &mut Filesystem,
    inode: &mut Inode,
    byte_offset: usize,
) -> Result<Location> {
    let (position, in_block_offset) = split_offset(byte_offset);
    let block = match position {
        Position::Direct { index } => {
            if let Some(b) = inode.direct[index] {
                b
            } else {
                let b = fs.pool_mut().claim()?;
                inode.direct[index] = Some(b);
                b
            }
        }
        Position::Indirect { chain_hops, slot } => {
            let mut current = match inode.indirect_head {
                Some(b) => b,
                None => {
                    let b = fs.claim_zeroed_index_block()?;
                    inode.indirect_head = Some(b);
                    b
                }
            };
            for _ in 0..chain_hops {
                let view = index_block::decode(fs.block_bytes(current));
                current = match view.next {
                    Some(next) => next,
                    None => {
                        let next = fs.claim_zeroed_index_block()?;
                        let mut view = view;
                        view.next = Some(next);
                        index_block::encode(&view, fs.block_bytes_mut(current));
                        next
                    }
                };
            }
            let mut view = index_block::decode(fs.block_bytes(current));
            match view.slots[slot] {
                Some(b) => b,
                None => {
                    let b = fs.pool_mut().claim()?;
                    view.slots[slot] = Some(b);
                    index_block::encode(&view, fs.block_bytes_mut(current));
                    b
                }
            }
        }
    };
    Ok(Location { block, in_block_offset })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::Filesystem;

    #[test]
    fn direct_offsets_split_correctly() {
        let (pos, in_block) = split_offset(70);
        match pos {
            Position::Direct { index } => assert_eq!(index, 1),
            _ => panic!("expected direct"),
        }
        assert_eq!(in_block, 70 - BLOCK_SIZE);
    }

    #[test]
    fn indirect_offsets_split_correctly() {
        let (pos, _) = split_offset(DIRECT_CAPACITY + 20 * BLOCK_SIZE);
        match pos {
            Position::Indirect { chain_hops, slot } => {
                assert_eq!(chain_hops, 1);
                assert_eq!(slot, 20 - SLOTS_PER_INDEX);
            }
            _ => panic!("expected indirect"),
        }
    }

    #[test]
    fn locate_readonly_fails_on_empty_slot() {
        let fs = Filesystem::new(16);
        let inode = Inode::default();
        assert_eq!(
            locate_readonly(&fs, &inode, 0).unwrap_err(),
            Error::NotPresent
        );
    }

    #[test]
    fn locate_alloc_then_readonly_agree() {
        let mut fs = Filesystem::new(16);
        let mut inode = Inode::default();
        let alloc = locate_alloc(&mut fs, &mut inode, 10).unwrap();
        let ro = locate_readonly(&fs, &inode, 10).unwrap();
        assert_eq!(alloc.block, ro.block);
        assert_eq!(alloc.in_block_offset, ro.in_block_offset);
    }
}
