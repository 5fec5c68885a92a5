// Schema-driven record encoder/decoder

use super::schema::{ByteOrder, FieldKind, FieldLayout, Schema};
use super::value::{width_mask, Event, FieldValue};
use crate::error::CodecError;

/// Decodes raw records into [`Event`]s and encodes them back, per one
/// [`Schema`].
#[derive(Debug, Clone)]
pub struct Codec {
    schema: Schema,
}

#[inline]
fn read_uint(bytes: &[u8], order: ByteOrder) -> u64 {
    let mut buf = [0u8; 8];
    match order {
        ByteOrder::Little => {
            buf[..bytes.len()].copy_from_slice(bytes);
            u64::from_le_bytes(buf)
        }
        ByteOrder::Big => {
            buf[8 - bytes.len()..].copy_from_slice(bytes);
            u64::from_be_bytes(buf)
        }
    }
}

#[inline]
fn write_uint(out: &mut [u8], value: u64, order: ByteOrder) {
    let width = out.len();
    match order {
        ByteOrder::Little => out.copy_from_slice(&value.to_le_bytes()[..width]),
        ByteOrder::Big => out.copy_from_slice(&value.to_be_bytes()[8 - width..]),
    }
}

impl Codec {
    pub fn new(schema: Schema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Size in bytes of every record this codec reads or writes.
    pub fn record_size(&self) -> usize {
        self.schema.total_size()
    }

    /// Decode one record. Total for inputs of exactly `record_size()` bytes.
    pub fn decode(&self, raw: &[u8]) -> Result<Event, CodecError> {
        let expected = self.schema.total_size();
        if raw.len() != expected {
            return Err(CodecError::RecordSizeMismatch {
                expected,
                actual: raw.len(),
            });
        }

        let order = self.schema.byte_order();
        let mut event = Event::with_capacity(self.schema.len());
        for field in self.schema.fields() {
            let bytes = &raw[field.offset..field.offset + field.kind.size()];
            let value = match field.kind {
                FieldKind::Scalar { width, signed } => FieldValue::Scalar {
                    width,
                    signed,
                    bits: read_uint(bytes, order),
                },
                FieldKind::Array { element_width, .. } => FieldValue::Array {
                    element_width,
                    values: bytes
                        .chunks_exact(element_width)
                        .map(|chunk| read_uint(chunk, order))
                        .collect(),
                },
            };
            event.insert(field.name.clone(), value);
        }
        Ok(event)
    }

    /// Encode `event` into a freshly allocated record.
    pub fn encode(&self, event: &Event) -> Result<Vec<u8>, CodecError> {
        let mut out = vec![0u8; self.schema.total_size()];
        self.encode_into(event, &mut out)?;
        Ok(out)
    }

    /// Encode `event` into `out`, which must be exactly `record_size()` bytes.
    ///
    /// Every schema field must be present with a matching kind; fields the
    /// schema does not know are ignored. On error `out` may be partially
    /// written.
    pub fn encode_into(&self, event: &Event, out: &mut [u8]) -> Result<(), CodecError> {
        let expected = self.schema.total_size();
        if out.len() != expected {
            return Err(CodecError::RecordSizeMismatch {
                expected,
                actual: out.len(),
            });
        }

        let order = self.schema.byte_order();
        for field in self.schema.fields() {
            let value = event
                .get(&field.name)
                .ok_or_else(|| CodecError::MissingField(field.name.clone()))?;
            let dst = &mut out[field.offset..field.offset + field.kind.size()];

            match (field.kind, value) {
                (
                    FieldKind::Scalar { width, signed },
                    FieldValue::Scalar {
                        width: w,
                        signed: s,
                        bits,
                    },
                ) if width == *w && signed == *s && bits & !width_mask(width) == 0 => {
                    write_uint(dst, *bits, order);
                }
                (
                    FieldKind::Array {
                        element_width,
                        count,
                    },
                    FieldValue::Array {
                        element_width: w,
                        values,
                    },
                ) if element_width == *w
                    && values.len() == count
                    && values.iter().all(|v| v & !width_mask(element_width) == 0) =>
                {
                    for (chunk, v) in dst.chunks_exact_mut(element_width).zip(values) {
                        write_uint(chunk, *v, order);
                    }
                }
                _ => return Err(mismatch(field, value)),
            }
        }
        Ok(())
    }
}

fn mismatch(field: &FieldLayout, found: &FieldValue) -> CodecError {
    let expected = match field.kind {
        FieldKind::Scalar {
            width,
            signed: true,
        } => format!("i{}", width * 8),
        FieldKind::Scalar { width, .. } => format!("u{}", width * 8),
        FieldKind::Array {
            element_width,
            count,
        } => format!("[u{}; {}]", element_width * 8, count),
    };
    let mut found_desc = found.describe();
    if found_desc == expected {
        // Same shape, so a value did not fit its width.
        found_desc.push_str(" (value out of range)");
    }
    CodecError::TypeMismatch {
        field: field.name.clone(),
        expected,
        found: found_desc,
    }
}
