pub mod SharedMemory;

pub use SharedMemory::{attach_shared_memory, create_shared_memory, RawHandle, SharedMemoryBackend};
