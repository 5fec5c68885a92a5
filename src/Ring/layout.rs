use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicU32, AtomicU64};

/// A "magic number" to identify the memory region as a ring channel ("FDBRING\0").
pub const RING_MAGIC: u64 = 0x4644_4252_494E_4700;

/// The version of the memory layout.
pub const RING_VERSION: u32 = 1;

/// Smallest accepted data area, in bytes.
pub const MIN_CAPACITY: usize = 64;

/// Largest accepted data area, in bytes (1 GiB).
pub const MAX_CAPACITY: usize = 1 << 30;

/// Size of the per-record header preceding every payload.
pub const RECORD_HEADER_SIZE: usize = 8;

/// Records (header + payload) start on this alignment.
pub const RECORD_ALIGN: usize = 8;

/// Set in a record's length word while the writer still owns it.
pub const RECORD_BUSY_BIT: u32 = 1 << 31;

/// Set in a record's length word when the writer gave the space back
/// without publishing data. Readers skip such records.
pub const RECORD_DISCARD_BIT: u32 = 1 << 30;

/// Payload length bits of the length word.
pub const RECORD_LEN_MASK: u32 = RECORD_DISCARD_BIT - 1;

/// Global header located at the very beginning of the shared region.
///
/// The data area of `capacity` bytes follows immediately after the header.
/// `consumer_pos` and `producer_pos` are monotonic byte counters; the index
/// into the data area is `pos & (capacity - 1)`. Only the reader advances
/// `consumer_pos` and only the writer advances `producer_pos`.
#[repr(C, align(128))]
pub struct RingHeader {
    /// Must equal [`RING_MAGIC`].
    pub magic: u64,

    /// Must equal [`RING_VERSION`].
    pub version: u32,

    /// Which side writes records (see `ChannelKind`).
    pub kind: u32,

    /// Size of the data area in bytes. Always a power of two.
    pub capacity: u64,

    /// Non-zero once either side has torn the channel down.
    pub closed: AtomicU32,

    pub reserved: u32,

    /// Reader cursor. Padded to prevent false sharing with the writer cursor.
    pub consumer_pos: CachePadded<AtomicU64>,

    /// Writer cursor. Padded to prevent false sharing with the reader cursor.
    pub producer_pos: CachePadded<AtomicU64>,
}

/// Byte offset of the data area from the start of the region.
pub const DATA_OFFSET: usize = std::mem::size_of::<RingHeader>();

/// Total region size needed for a data area of `capacity` bytes.
#[inline]
pub const fn region_size(capacity: usize) -> usize {
    DATA_OFFSET + capacity
}

/// Space a record of `len` payload bytes occupies in the data area.
#[inline]
pub const fn record_footprint(len: usize) -> usize {
    (RECORD_HEADER_SIZE + len + RECORD_ALIGN - 1) & !(RECORD_ALIGN - 1)
}

/// Per-record header. Lives at an 8-byte aligned offset in the data area.
#[repr(C)]
pub struct RecordHeader {
    /// Payload length in the low 30 bits plus `BUSY`/`DISCARD` flags.
    pub len: AtomicU32,

    pub reserved: u32,
}
