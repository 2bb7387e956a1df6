//! The on-block encoding of an index block.
//!
//! An index block is an ordinary data block reinterpreted as
//! `SLOTS_PER_INDEX` data-block pointers followed by one "next index block"
//! pointer, all as native-endian `u32`s with `0` meaning absent (there is no
//! cross-host persistence to make byte order observable). This is the
//! in-memory layout actually stored in the block's bytes; [`decode`]/[`encode`]
//! convert to and from the `Option<BlockIndex>` view the rest of the engine
//! works with.

use zerocopy::{AsBytes, FromBytes};

use crate::param::SLOTS_PER_INDEX;
use crate::pool::BlockIndex;

#[repr(C)]
#[derive(Copy, Clone, AsBytes, FromBytes)]
pub struct IndexBlockRepr {
    slots: [u32; SLOTS_PER_INDEX],
    next: u32,
}

/// The decoded, typed view of an index block used by the addressing layer.
#[derive(Copy, Clone, Debug, Default)]
pub struct IndexBlock {
    pub slots: [Option<BlockIndex>; SLOTS_PER_INDEX],
    pub next: Option<BlockIndex>,
}

fn raw_to_block_index(raw: u32) -> Option<BlockIndex> {
    core::num::NonZeroU32::new(raw).map(BlockIndex::from_raw)
}

/// Decodes a raw block's bytes into the typed view.
pub fn decode(bytes: &[u8]) -> IndexBlock {
    let repr = IndexBlockRepr::read_from(bytes).expect("index block has the wrong size");
    let mut slots = [None; SLOTS_PER_INDEX];
    for (slot, raw) in slots.iter_mut().zip(repr.slots.iter()) {
        *slot = raw_to_block_index(*raw);
    }
    IndexBlock {
        slots,
        next: raw_to_block_index(repr.next),
    }
}

/// Encodes the typed view back into a raw block's bytes.
pub fn encode(view: &IndexBlock, bytes: &mut [u8]) {
    let mut repr = IndexBlockRepr {
        slots: [0; SLOTS_PER_INDEX],
        next: view.next.map(|b| b.get() as u32).unwrap_or(0),
    };
    for (raw, slot) in repr.slots.iter_mut().zip(view.slots.iter()) {
        *raw = slot.map(|b| b.get() as u32).unwrap_or(0);
    }
    repr.write_to(bytes).expect("index block has the wrong size");
}
