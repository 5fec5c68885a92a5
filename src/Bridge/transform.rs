// FDB offload policy applied between decode and encode

use crate::error::SchemaError;
use crate::Codec::{ByteOrder, Event, FieldValue, Schema};

/// Field rewrites applied to every event on its way through the bridge.
pub trait Transform {
    fn apply(&self, event: &mut Event);
}

impl<F> Transform for F
where
    F: Fn(&mut Event),
{
    fn apply(&self, event: &mut Event) {
        self(event)
    }
}

/// `switchdev_notifier_type` value for an FDB entry added to a device.
pub const SWITCHDEV_FDB_ADD_TO_DEVICE: u64 = 3;
/// `switchdev_notifier_type` value for an FDB entry removed from a device.
pub const SWITCHDEV_FDB_DEL_TO_DEVICE: u64 = 4;

/// Layout of `struct bpfnic_fdb_entry` (18 bytes, packed).
pub fn fdb_entry_schema() -> Result<Schema, SchemaError> {
    Schema::builder()
        .unsigned("ifindex", 4)
        .array("addr", 1, 6)
        .unsigned("added_by_user", 1)
        .unsigned("offloaded", 1)
        .unsigned("vid", 2)
        .unsigned("event", 2)
        .byte_order(ByteOrder::Little)
        .build()
}

/// Render a hardware address as lowercase colon-separated hex.
pub fn format_mac(addr: &[u8]) -> String {
    addr.iter()
        .map(|b| format!("{:02x}", b))
        .collect::<Vec<_>>()
        .join(":")
}

/// Clears `offloaded` and adds display-only `addr_str` / `event_name`
/// fields. The display fields are ignored when the event is re-encoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct FdbOffloadTransform;

impl Transform for FdbOffloadTransform {
    fn apply(&self, event: &mut Event) {
        if let Some(FieldValue::Scalar { bits, .. }) = event.get_mut("offloaded") {
            *bits = 0;
        }

        if let Some(addr) = event.get("addr").and_then(FieldValue::as_bytes) {
            event.insert("addr_str", FieldValue::text(format_mac(&addr)));
        }

        let name = match event.get("event").and_then(FieldValue::as_u64) {
            Some(SWITCHDEV_FDB_ADD_TO_DEVICE) => Some("fdb_add"),
            Some(SWITCHDEV_FDB_DEL_TO_DEVICE) => Some("fdb_del"),
            _ => None,
        };
        if let Some(name) = name {
            event.insert("event_name", FieldValue::text(name));
        }
    }
}
