mod builder;

pub use builder::{RingBuilder, DEFAULT_CAPACITY, DEFAULT_NAMESPACE};

#[allow(non_snake_case)]
pub mod Channel;
#[allow(non_snake_case)]
pub mod Channel_impl;
pub mod layout;

pub use Channel::{ChannelKind, ChannelState, RingChannel};
pub use Channel_impl::Reservation;
