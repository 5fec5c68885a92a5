// Module naming follows project convention (Core = shared memory plumbing,
// Ring = SPSC byte ring, Codec = schema-driven records, Bridge = forwarding loop)
#[allow(non_snake_case)]
pub mod Core;
#[allow(non_snake_case)]
pub mod Ring;
#[allow(non_snake_case)]
pub mod Codec;
#[allow(non_snake_case)]
pub mod Bridge;
#[allow(non_snake_case)]
mod Debug {
    pub mod StructDebug;
}

pub mod error;

pub use error::{ChannelError, CodecError, Error, Result, SchemaError};
