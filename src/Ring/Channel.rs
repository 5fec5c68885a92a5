// Handle to one shared single-producer/single-consumer byte ring

use super::layout::RingHeader;
use crate::Core::SharedMemory::SharedMemoryBackend;
use std::path::PathBuf;

/// Which side of the privilege boundary writes records into the ring.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ChannelKind {
    /// The privileged context produces, this process consumes.
    KernelWritable = 1,
    /// This process produces, the privileged context consumes.
    UserWritable = 2,
}

impl ChannelKind {
    pub(crate) fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            1 => Some(ChannelKind::KernelWritable),
            2 => Some(ChannelKind::UserWritable),
            _ => None,
        }
    }
}

/// Lifecycle of a handle: `Created -> Published -> Open -> Closed`.
///
/// `Published` is skipped for channels that are never given a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Created,
    Published,
    Open,
    Closed,
}

/// A bounded circular buffer in shared memory.
///
/// This struct is NOT stored in shared memory. It is a process-local view
/// holding the mapping and pointers into it. Exactly one handle per ring may
/// act as reader and one as writer at any time.
///
/// Handles are either *owned* (created by this process, closed and
/// unpublished on drop) or *attached* (opened by name, only unmapped on drop).
pub struct RingChannel {
    /// Keeps the mapping alive; `header` and `data` point into it.
    pub(crate) shm: Box<dyn SharedMemoryBackend>,

    pub(crate) header: *const RingHeader,

    /// Start of the data area.
    pub(crate) data: *mut u8,

    /// Size of the data area in bytes (power of two).
    pub(crate) capacity: usize,

    /// `capacity - 1`, used to wrap positions into the data area.
    pub(crate) mask: usize,

    pub(crate) kind: ChannelKind,
    pub(crate) state: ChannelState,

    /// Directory holding published names.
    pub(crate) namespace: PathBuf,

    /// Published name, if any.
    pub(crate) name: Option<String>,

    /// Private backing file of an owned, not yet published channel.
    pub(crate) staging: Option<PathBuf>,

    pub(crate) owner: bool,

    /// Leave the published name in place when an owned handle is dropped.
    pub(crate) keep_published: bool,
}

unsafe impl Send for RingChannel {}

impl RingChannel {
    pub fn kind(&self) -> ChannelKind {
        self.kind
    }

    /// Size of the data area in bytes.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn state(&self) -> ChannelState {
        self.state
    }

    /// True if this process created the ring (as opposed to attaching to it).
    pub fn is_owner(&self) -> bool {
        self.owner
    }

    /// Full path of the published name, if any.
    pub fn published_path(&self) -> Option<PathBuf> {
        self.name.as_ref().map(|n| self.namespace.join(n))
    }

    pub fn set_keep_published(&mut self, keep: bool) {
        self.keep_published = keep;
    }

    #[inline]
    pub(crate) fn header(&self) -> &RingHeader {
        // Safety: `header` points into `shm`, which lives as long as `self`
        unsafe { &*self.header }
    }
}
