mod bridge;
mod config;
mod shutdown;
mod transform;

pub use bridge::{Bridge, PassStats};
pub use config::{BackpressurePolicy, BridgeConfig};
pub use shutdown::Shutdown;
pub use transform::{
    fdb_entry_schema, format_mac, FdbOffloadTransform, Transform, SWITCHDEV_FDB_ADD_TO_DEVICE,
    SWITCHDEV_FDB_DEL_TO_DEVICE,
};
