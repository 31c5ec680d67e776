//! Binary layout of the shared region.
//!
//! Every process mapping the region agrees on these offsets regardless of
//! how it was compiled: all structs are `repr(C)` with fixed-width fields
//! and their sizes are checked at compile time.
//!
//! ```text
//! offset  size  field
//! 0       8     magic          b"FASRING\0"
//! 8       4     version        LAYOUT_VERSION
//! 12      4     capacity       ring slots
//! 16      4     max_fas_len    edges per slot
//! 20      4     active         1 while the search runs
//! 24      4     write_index    next slot a producer writes
//! 28      4     read_index     next slot the consumer reads
//! 32      8     committed      slots published since creation
//! 40      8     consumed       slots popped since creation
//! 48      4     writer_pid     producer inside the push critical section, 0 if none
//! 52      4     slot_size      bytes per RawSlot
//! 56      8     reserved
//! 64      ...   capacity × RawSlot
//! ```

use std::mem::{align_of, size_of};
use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64};

use fas_core::{Edge, FasSlot, SlotError, MAX_FAS_LEN};

/// Magic bytes identifying a FAS ring region.
pub const REGION_MAGIC: [u8; 8] = *b"FASRING\0";

/// Version of the layout described in this module.
pub const LAYOUT_VERSION: u32 = 1;

/// Size of [`RegionHeader`] in bytes.
pub const HEADER_SIZE: usize = 64;

/// Size of [`RawSlot`] in bytes.
pub const SLOT_SIZE: usize = 4 + MAX_FAS_LEN * 8;

/// Largest ring the layout supports. Keeps `region_size` far from
/// overflow and the mapping within a few megabytes.
pub const MAX_CAPACITY: u32 = 65_536;

/// Fixed header at offset 0 of the region.
#[repr(C)]
pub struct RegionHeader {
    pub(crate) magic: [u8; 8],
    pub(crate) version: u32,
    pub(crate) capacity: u32,
    pub(crate) max_fas_len: u32,
    pub(crate) active: AtomicU32,
    pub(crate) write_index: AtomicU32,
    pub(crate) read_index: AtomicU32,
    pub(crate) committed: AtomicU64,
    pub(crate) consumed: AtomicU64,
    pub(crate) writer_pid: AtomicI32,
    pub(crate) slot_size: u32,
    _reserved: [u8; 8],
}

/// An edge as stored in shared memory.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RawEdge {
    start: i32,
    end: i32,
}

/// A ring slot as stored in shared memory.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawSlot {
    size: u32,
    edges: [RawEdge; MAX_FAS_LEN],
}

const _: () = assert!(size_of::<RegionHeader>() == HEADER_SIZE);
const _: () = assert!(size_of::<RawSlot>() == SLOT_SIZE);
const _: () = assert!(HEADER_SIZE % align_of::<RawSlot>() == 0);

impl RawSlot {
    /// Encode a validated slot for storage.
    pub fn encode(slot: &FasSlot) -> Self {
        let mut edges = [RawEdge::default(); MAX_FAS_LEN];
        for (raw, e) in edges.iter_mut().zip(slot.raw_edges()) {
            *raw = RawEdge {
                start: e.start,
                end: e.end,
            };
        }
        Self {
            size: slot.size(),
            edges,
        }
    }

    /// Decode a stored slot, rejecting a size outside `[0, MAX_FAS_LEN]`.
    pub fn decode(&self) -> Result<FasSlot, SlotError> {
        let mut edges = [Edge::default(); MAX_FAS_LEN];
        for (e, raw) in edges.iter_mut().zip(&self.edges) {
            *e = Edge::new(raw.start, raw.end);
        }
        FasSlot::from_raw_parts(self.size, edges)
    }

    /// The stored size field, valid or not.
    pub fn size(&self) -> u32 {
        self.size
    }

    #[cfg(test)]
    pub(crate) fn with_size(size: u32) -> Self {
        Self {
            size,
            edges: [RawEdge::default(); MAX_FAS_LEN],
        }
    }
}

/// Total mapping size for a ring of `capacity` slots.
pub const fn region_size(capacity: u32) -> usize {
    HEADER_SIZE + capacity as usize * SLOT_SIZE
}

/// Byte offset of slot `index` from the start of the region.
pub const fn slot_offset(index: u32) -> usize {
    HEADER_SIZE + index as usize * SLOT_SIZE
}
