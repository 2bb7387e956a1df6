//! The public data operations: `write_append`, `read`, `modify`, `shrink`,
//! `release`.

use crate::error::{Error, Result};
use crate::filesystem::Filesystem;
use crate::index_block;
use crate::inode::{self, Inode};
use crate::param::{BLOCK_SIZE, DIRECT_COUNT, SLOTS_PER_INDEX};
use crate::pool::BlockIndex;

fn ceil_div(a: usize, b: usize) -> usize {
    (a + b - 1) / b
}

fn data_blocks_for_size(size: usize) -> usize {
    ceil_div(size, BLOCK_SIZE)
}

fn index_blocks_for_data_blocks(data_blocks: usize) -> usize {
    if data_blocks <= DIRECT_COUNT {
        0
    } else {
        ceil_div(data_blocks - DIRECT_COUNT, SLOTS_PER_INDEX)
    }
}

/// Total blocks (data + index) an inode of this logical size needs reachable
/// from it. This is the quantity the capacity pre-check in
/// `modify`/`write_append` compares against [`Filesystem::available_count`].
fn total_blocks_for_size(size: usize) -> usize {
    let data = data_blocks_for_size(size);
    data + index_blocks_for_data_blocks(data)
}

/// Appends `buf` at the current end of `inode`.
///
/// Implemented as the `offset == file_size` case of [`modify`]: append
/// shares the same capacity pre-check and walk-and-copy loop rather than
/// duplicating them.
pub fn write_append(fs: &mut Filesystem, inode: &mut Inode, buf: &[u8]) -> Result<()> {
    modify(fs, inode, inode.file_size(), buf)
}

/// Overwrites `buf.len()` bytes starting at `offset`, extending `file_size`
/// if the write reaches past the current end of file.
///
/// `offset` must not be past the current `file_size`: writing strictly
/// past EOF is rejected rather than leaving a silent hole. On
/// [`Error::OutOfBlocks`] the inode is left exactly as it was before the
/// call.
pub fn modify(fs: &mut Filesystem, inode: &mut Inode, offset: usize, buf: &[u8]) -> Result<()> {
    if offset > inode.file_size {
        return Err(Error::InvalidInput);
    }

    let final_size = inode.file_size.max(offset + buf.len());
    let needed = total_blocks_for_size(final_size)
        .saturating_sub(total_blocks_for_size(inode.file_size));
    if needed > fs.available_count() {
        log::debug!(
            "modify: need {} blocks, {} available",
            needed,
            fs.available_count()
        );
        return Err(Error::OutOfBlocks);
    }

    let original_size = inode.file_size;
    match write_range(fs, inode, offset, buf) {
        Ok(()) => {
            inode.file_size = final_size;
            Ok(())
        }
        Err(e) => {
            inode.file_size = original_size;
            Err(e)
        }
    }
}

fn write_range(fs: &mut Filesystem, inode: &mut Inode, offset: usize, buf: &[u8]) -> Result<()> {
    let mut written = 0;
    while written < buf.len() {
        let current_offset = offset + written;
        let location = inode::locate_alloc(fs, inode, current_offset)?;
        let chunk_len = (BLOCK_SIZE - location.in_block_offset).min(buf.len() - written);
        let block = fs.block_bytes_mut(location.block);
        block[location.in_block_offset..location.in_block_offset + chunk_len]
            .copy_from_slice(&buf[written..written + chunk_len]);
        written += chunk_len;
        if current_offset + chunk_len > inode.file_size {
            inode.file_size = current_offset + chunk_len;
        }
    }
    Ok(())
}

/// Reads up to `buf.len()` bytes starting at `offset`, returning the number
/// of bytes actually copied.
///
/// `offset >= file_size` is a valid, non-error call that reads zero bytes.
/// A read that runs past `file_size` is silently clamped (short read, not
/// an error), mirroring POSIX `read(2)`.
pub fn read(fs: &Filesystem, inode: &Inode, offset: usize, buf: &mut [u8]) -> Result<usize> {
    if offset >= inode.file_size {
        return Ok(0);
    }
    let n = buf.len().min(inode.file_size - offset);

    let mut done = 0;
    while done < n {
        let current_offset = offset + done;
        let location = match inode::locate_readonly(fs, inode, current_offset) {
            Ok(location) => location,
            Err(Error::NotPresent) => {
                log::warn!(
                    "read: offset {} within file_size {} has no backing block; short read",
                    current_offset,
                    inode.file_size
                );
                break;
            }
            Err(e) => return Err(e),
        };
        let chunk_len = (BLOCK_SIZE - location.in_block_offset).min(n - done);
        let block = fs.block_bytes(location.block);
        buf[done..done + chunk_len]
            .copy_from_slice(&block[location.in_block_offset..location.in_block_offset + chunk_len]);
        done += chunk_len;
    }
    Ok(done)
}

/// Reduces `file_size` to `new_size`, releasing any data or index blocks no
/// longer reachable within the new size. `new_size` must not exceed the
/// current `file_size`.
pub fn shrink(fs: &mut Filesystem, inode: &mut Inode, new_size: usize) -> Result<()> {
    if new_size > inode.file_size {
        return Err(Error::InvalidInput);
    }
    if new_size == inode.file_size {
        return Ok(());
    }

    let needed_data_blocks = data_blocks_for_size(new_size);
    let direct_needed = needed_data_blocks.min(DIRECT_COUNT);

    for i in (direct_needed..DIRECT_COUNT).rev() {
        if let Some(b) = inode.direct[i].take() {
            fs.pool_mut().release(b);
        }
    }

    if needed_data_blocks <= DIRECT_COUNT {
        if let Some(head) = inode.indirect_head.take() {
            release_chain(fs, head);
        }
    } else {
        shrink_chain(fs, inode, needed_data_blocks - DIRECT_COUNT);
    }

    inode.file_size = new_size;
    Ok(())
}

/// `release` is `shrink(inode, 0)`: it empties the inode and returns every
/// block it referenced to the pool.
pub fn release(fs: &mut Filesystem, inode: &mut Inode) -> Result<()> {
    shrink(fs, inode, 0)
}

fn collect_chain(fs: &Filesystem, head: BlockIndex) -> Vec<BlockIndex> {
    let mut chain = vec![head];
    let mut current = head;
    loop {
        let view = index_block::decode(fs.block_bytes(current));
        match view.next {
            Some(next) => {
                chain.push(next);
                current = next;
            }
            None => break,
        }
    }
    chain
}

fn release_chain(fs: &mut Filesystem, head: BlockIndex) {
    for block in collect_chain(fs, head) {
        let view = index_block::decode(fs.block_bytes(block));
        for slot in view.slots.iter().flatten() {
            fs.pool_mut().release(*slot);
        }
        fs.pool_mut().release(block);
    }
}

/// Keeps only the first `keep_slots` data slots across the indirect chain,
/// releasing every slot and index block beyond that, and truncates the
/// chain's `next` pointer at the new end.
fn shrink_chain(fs: &mut Filesystem, inode: &mut Inode, keep_slots: usize) {
    let head = inode
        .indirect_head
        .expect("file_size implies a non-empty indirect chain");
    let chain = collect_chain(fs, head);
    let index_blocks_needed = ceil_div(keep_slots, SLOTS_PER_INDEX).max(1);

    for (i, &block) in chain.iter().enumerate() {
        if i >= index_blocks_needed {
            let view = index_block::decode(fs.block_bytes(block));
            for slot in view.slots.iter().flatten() {
                fs.pool_mut().release(*slot);
            }
            fs.pool_mut().release(block);
            continue;
        }

        let mut view = index_block::decode(fs.block_bytes(block));
        let slot_start = i * SLOTS_PER_INDEX;
        let keep_here = keep_slots.saturating_sub(slot_start).min(SLOTS_PER_INDEX);
        let mut changed = false;

        for (s, slot) in view.slots.iter_mut().enumerate() {
            if s >= keep_here {
                if let Some(b) = slot.take() {
                    fs.pool_mut().release(b);
                    changed = true;
                }
            }
        }
        if i == index_blocks_needed - 1 && view.next.is_some() {
            view.next = None;
            changed = true;
        }
        if changed {
            index_block::encode(&view, fs.block_bytes_mut(block));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::Filesystem;
    use rstest::rstest;

    fn fresh(total_blocks: usize) -> (Filesystem, Inode) {
        (Filesystem::new(total_blocks), Inode::default())
    }

    #[test]
    fn append_then_read_round_trips() {
        let (mut fs, mut inode) = fresh(16);
        let payload: Vec<u8> = (0..100).collect();
        write_append(&mut fs, &mut inode, &payload).unwrap();
        assert_eq!(inode.file_size(), 100);

        let mut buf = vec![0u8; 100];
        let n = read(&fs, &inode, 0, &mut buf).unwrap();
        assert_eq!(n, 100);
        assert_eq!(buf, payload);
    }

    #[test]
    fn scenario_100_bytes_uses_two_direct_blocks() {
        let (mut fs, mut inode) = fresh(16);
        let before = fs.available_count();
        write_append(&mut fs, &mut inode, &vec![1u8; 100]).unwrap();
        assert_eq!(inode.file_size(), 100);
        assert!(inode.indirect_head.is_none());
        assert_eq!(before - fs.available_count(), 2);
    }

    #[test]
    fn scenario_crossing_into_indirect_chain() {
        let (mut fs, mut inode) = fresh(16);
        write_append(&mut fs, &mut inode, &vec![1u8; 256]).unwrap();
        assert!(inode.indirect_head.is_none());

        write_append(&mut fs, &mut inode, &[1u8]).unwrap();
        assert_eq!(inode.file_size(), 257);
        assert!(inode.indirect_head.is_some());
    }

    #[test]
    fn scenario_second_index_block_allocated_after_first_fills() {
        let (mut fs, mut inode) = fresh(64);
        write_append(&mut fs, &mut inode, &vec![1u8; 256 + 15 * 64]).unwrap();
        let head = inode.indirect_head.unwrap();
        let view = index_block::decode(fs.block_bytes(head));
        assert!(view.next.is_none());

        write_append(&mut fs, &mut inode, &[9u8]).unwrap();
        let view = index_block::decode(fs.block_bytes(head));
        assert!(view.next.is_some());
    }

    #[test]
    fn modify_in_place_preserves_surrounding_bytes() {
        let (mut fs, mut inode) = fresh(16);
        write_append(&mut fs, &mut inode, &vec![0u8; 40]).unwrap();
        let payload: Vec<u8> = (0..100).collect();
        modify(&mut fs, &mut inode, 30, &payload).unwrap();
        assert_eq!(inode.file_size(), 130);

        let mut buf = vec![0u8; 130];
        read(&fs, &inode, 0, &mut buf).unwrap();
        assert_eq!(&buf[0..30], &vec![0u8; 30][..]);
        assert_eq!(&buf[30..130], &payload[..]);
    }

    #[test]
    fn modify_past_eof_is_rejected() {
        let (mut fs, mut inode) = fresh(16);
        write_append(&mut fs, &mut inode, &vec![0u8; 10]).unwrap();
        let err = modify(&mut fs, &mut inode, 20, &[1u8; 5]).unwrap_err();
        assert_eq!(err, Error::InvalidInput);
    }

    #[test]
    fn out_of_blocks_leaves_inode_untouched() {
        let (mut fs, mut inode) = fresh(2);
        write_append(&mut fs, &mut inode, &vec![1u8; 64]).unwrap();
        let snapshot_size = inode.file_size();
        let snapshot_direct = inode.direct;

        let err = write_append(&mut fs, &mut inode, &vec![1u8; 65]).unwrap_err();
        assert_eq!(err, Error::OutOfBlocks);
        assert_eq!(inode.file_size(), snapshot_size);
        assert_eq!(inode.direct, snapshot_direct);
    }

    #[test]
    fn shrink_below_direct_capacity_drops_indirect_chain() {
        let (mut fs, mut inode) = fresh(64);
        write_append(&mut fs, &mut inode, &vec![1u8; 256 + 15 * 64]).unwrap();
        let before = fs.available_count();

        shrink(&mut fs, &mut inode, 100).unwrap();

        assert_eq!(inode.file_size(), 100);
        assert!(inode.indirect_head.is_none());
        assert!(inode.direct[2].is_none());
        assert!(inode.direct[3].is_none());
        assert!(fs.available_count() > before);
    }

    #[test]
    fn shrink_is_idempotent() {
        let (mut fs, mut inode) = fresh(16);
        write_append(&mut fs, &mut inode, &vec![1u8; 100]).unwrap();
        shrink(&mut fs, &mut inode, 50).unwrap();
        let available_after_first = fs.available_count();
        shrink(&mut fs, &mut inode, 50).unwrap();
        assert_eq!(fs.available_count(), available_after_first);
        assert_eq!(inode.file_size(), 50);
    }

    #[test]
    fn release_empties_the_inode() {
        let (mut fs, mut inode) = fresh(16);
        let before = fs.available_count();
        write_append(&mut fs, &mut inode, &vec![1u8; 256]).unwrap();

        release(&mut fs, &mut inode).unwrap();

        assert_eq!(inode.file_size(), 0);
        assert!(inode.direct.iter().all(Option::is_none));
        assert!(inode.indirect_head.is_none());
        assert_eq!(fs.available_count(), before);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(63)]
    #[case(64)]
    #[case(65)]
    #[case(256)]
    #[case(257)]
    fn append_read_agree_at_boundary_sizes(#[case] size: usize) {
        let (mut fs, mut inode) = fresh(64);
        let payload: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
        write_append(&mut fs, &mut inode, &payload).unwrap();

        let mut buf = vec![0u8; size];
        let n = read(&fs, &inode, 0, &mut buf).unwrap();
        assert_eq!(n, size);
        assert_eq!(buf, payload);
    }

    fn reachable_blocks(fs: &Filesystem, inode: &Inode) -> Vec<BlockIndex> {
        let mut blocks: Vec<BlockIndex> = inode.direct.iter().flatten().copied().collect();
        if let Some(head) = inode.indirect_head {
            blocks.push(head);
            for block in collect_chain(fs, head) {
                if block != head {
                    blocks.push(block);
                }
                let view = index_block::decode(fs.block_bytes(block));
                blocks.extend(view.slots.iter().flatten().copied());
            }
        }
        blocks
    }

    #[test]
    fn split_append_matches_single_append() {
        let payload: Vec<u8> = (0..400).map(|i| (i % 251) as u8).collect();
        let (head, tail) = payload.split_at(137);

        let (mut fs_a, mut inode_a) = fresh(64);
        write_append(&mut fs_a, &mut inode_a, &payload).unwrap();

        let (mut fs_b, mut inode_b) = fresh(64);
        write_append(&mut fs_b, &mut inode_b, head).unwrap();
        write_append(&mut fs_b, &mut inode_b, tail).unwrap();

        assert_eq!(inode_a.file_size(), inode_b.file_size());
        let mut buf_a = vec![0u8; payload.len()];
        let mut buf_b = vec![0u8; payload.len()];
        read(&fs_a, &inode_a, 0, &mut buf_a).unwrap();
        read(&fs_b, &inode_b, 0, &mut buf_b).unwrap();
        assert_eq!(buf_a, buf_b);
        assert_eq!(buf_a, payload);
    }

    #[test]
    fn available_count_plus_reachable_blocks_conserves_total() {
        let (mut fs, mut inode) = fresh(64);
        write_append(&mut fs, &mut inode, &vec![1u8; 1216]).unwrap();

        let reachable = reachable_blocks(&fs, &inode).len();
        assert_eq!(fs.available_count() + reachable + 1, fs.total_blocks());

        shrink(&mut fs, &mut inode, 100).unwrap();
        let reachable = reachable_blocks(&fs, &inode).len();
        assert_eq!(fs.available_count() + reachable + 1, fs.total_blocks());
    }

    #[test]
    fn two_inodes_never_share_a_reachable_block() {
        let mut fs = Filesystem::new(64);
        let mut inode_a = Inode::default();
        let mut inode_b = Inode::default();

        write_append(&mut fs, &mut inode_a, &vec![1u8; 300]).unwrap();
        write_append(&mut fs, &mut inode_b, &vec![2u8; 300]).unwrap();

        let blocks_a = reachable_blocks(&fs, &inode_a);
        let blocks_b = reachable_blocks(&fs, &inode_b);
        assert!(blocks_a.iter().all(|b| !blocks_b.contains(b)));
    }
}
