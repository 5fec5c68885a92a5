use crate::Ring::RingChannel;
use std::fmt;
use std::sync::atomic::Ordering;

/// Debug function for RingChannel
///
/// Shows:
/// - Kind, state and published name
/// - Capacity and shared cursor positions
/// - Mapping address (not dereferenced beyond the header)
pub fn debug_ring_channel(channel: &RingChannel, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let header = channel.header();
    f.debug_struct("RingChannel")
        .field("kind", &channel.kind())
        .field("state", &channel.state())
        .field("name", &channel.name())
        .field("owner", &channel.is_owner())
        .field("capacity", &channel.capacity())
        .field("consumer_pos", &header.consumer_pos.load(Ordering::Relaxed))
        .field("producer_pos", &header.producer_pos.load(Ordering::Relaxed))
        .field("shm", &format_args!("0x{:x}", channel.shm.as_ptr() as usize))
        .finish()
}

impl fmt::Debug for RingChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        debug_ring_channel(self, f)
    }
}
