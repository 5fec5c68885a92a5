pub mod codec;
pub mod schema;
pub mod value;

pub use codec::Codec;
pub use schema::{
    ByteOrder, FieldDescriptor, FieldKind, FieldLayout, Schema, SchemaBuilder, MAX_RECORD_SIZE,
};
pub use value::{Event, FieldValue};
