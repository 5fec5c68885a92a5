// Decoded field values and the per-record event map

use std::fmt;

/// One decoded field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Integer of `width` bytes. `bits` holds the raw two's complement value,
    /// zero-extended to 64 bits.
    Scalar { width: usize, signed: bool, bits: u64 },
    /// Fixed-length sequence of unsigned elements of `element_width` bytes
    Array { element_width: usize, values: Vec<u64> },
    /// Display-only value added after decoding. Never encodable.
    Text(String),
}

#[inline]
pub(crate) fn width_mask(width: usize) -> u64 {
    if width >= 8 {
        u64::MAX
    } else {
        (1u64 << (width * 8)) - 1
    }
}

impl FieldValue {
    pub fn u8(v: u8) -> Self {
        Self::unsigned(1, v as u64)
    }

    pub fn u16(v: u16) -> Self {
        Self::unsigned(2, v as u64)
    }

    pub fn u32(v: u32) -> Self {
        Self::unsigned(4, v as u64)
    }

    pub fn u64(v: u64) -> Self {
        Self::unsigned(8, v)
    }

    pub fn i8(v: i8) -> Self {
        Self::signed(1, v as i64)
    }

    pub fn i16(v: i16) -> Self {
        Self::signed(2, v as i64)
    }

    pub fn i32(v: i32) -> Self {
        Self::signed(4, v as i64)
    }

    pub fn i64(v: i64) -> Self {
        Self::signed(8, v)
    }

    /// Unsigned scalar; `value` is kept as-is so an out-of-range value is
    /// caught by the encoder rather than silently truncated.
    pub fn unsigned(width: usize, value: u64) -> Self {
        FieldValue::Scalar {
            width,
            signed: false,
            bits: value,
        }
    }

    /// Signed scalar stored as `width`-byte two's complement.
    pub fn signed(width: usize, value: i64) -> Self {
        FieldValue::Scalar {
            width,
            signed: true,
            bits: value as u64 & width_mask(width),
        }
    }

    pub fn bytes(values: &[u8]) -> Self {
        FieldValue::Array {
            element_width: 1,
            values: values.iter().map(|&b| b as u64).collect(),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        FieldValue::Text(s.into())
    }

    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            FieldValue::Scalar { bits, .. } => Some(bits),
            _ => None,
        }
    }

    /// Sign-extends signed scalars.
    pub fn as_i64(&self) -> Option<i64> {
        match *self {
            FieldValue::Scalar {
                width,
                signed: true,
                bits,
            } if width < 8 => {
                let shift = 64 - width * 8;
                Some(((bits << shift) as i64) >> shift)
            }
            FieldValue::Scalar { bits, .. } => Some(bits as i64),
            _ => None,
        }
    }

    /// Byte view of a one-byte-wide array.
    pub fn as_bytes(&self) -> Option<Vec<u8>> {
        match self {
            FieldValue::Array {
                element_width: 1,
                values,
            } => Some(values.iter().map(|&v| v as u8).collect()),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Short description used in type mismatch reports.
    pub(crate) fn describe(&self) -> String {
        match self {
            FieldValue::Scalar {
                width,
                signed: true,
                ..
            } => format!("i{}", width * 8),
            FieldValue::Scalar { width, .. } => format!("u{}", width * 8),
            FieldValue::Array {
                element_width,
                values,
            } => format!("[u{}; {}]", element_width * 8, values.len()),
            FieldValue::Text(_) => "text".to_string(),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Scalar { signed: true, .. } => {
                write!(f, "{}", self.as_i64().unwrap_or_default())
            }
            FieldValue::Scalar { bits, .. } => write!(f, "{}", bits),
            FieldValue::Array { values, .. } => {
                f.write_str("[")?;
                for (i, v) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                f.write_str("]")
            }
            FieldValue::Text(s) => f.write_str(s),
        }
    }
}

/// Named fields of one record.
///
/// Iteration and `Display` follow insertion order. Equality does not: two
/// events are equal when they hold the same names with the same values.
#[derive(Debug, Clone, Default)]
pub struct Event {
    fields: Vec<(String, FieldValue)>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            fields: Vec::with_capacity(capacity),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut FieldValue> {
        self.fields
            .iter_mut()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Overwrites an existing field in place or appends a new one.
    /// Returns the previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        let name = name.into();
        match self.get_mut(&name) {
            Some(slot) => Some(std::mem::replace(slot, value)),
            None => {
                self.fields.push((name, value));
                None
            }
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<FieldValue> {
        let idx = self.fields.iter().position(|(n, _)| n == name)?;
        Some(self.fields.remove(idx).1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(n, v)| (n.as_str(), v))
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        // Names are unique within an event, so equal lengths plus a match
        // for every name covers both directions.
        self.len() == other.len()
            && self
                .fields
                .iter()
                .all(|(name, value)| other.get(name) == Some(value))
    }
}

impl Eq for Event {}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: {}", name, value)?;
        }
        f.write_str("}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_values_sign_extend() {
        assert_eq!(FieldValue::i8(-1).as_u64(), Some(0xff));
        assert_eq!(FieldValue::i8(-1).as_i64(), Some(-1));
        assert_eq!(FieldValue::i16(-300).as_i64(), Some(-300));
        assert_eq!(FieldValue::i64(i64::MIN).as_i64(), Some(i64::MIN));
        assert_eq!(FieldValue::u16(0xffff).as_i64(), Some(0xffff));
    }

    #[test]
    fn insert_overwrites_in_place() {
        let mut ev = Event::new();
        ev.insert("a", FieldValue::u8(1));
        ev.insert("b", FieldValue::u8(2));
        assert_eq!(ev.insert("a", FieldValue::u8(9)), Some(FieldValue::u8(1)));
        let names: Vec<_> = ev.iter().map(|(n, _)| n).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(ev.get("a"), Some(&FieldValue::u8(9)));
    }

    #[test]
    fn equality_ignores_insertion_order() {
        let mut ab = Event::new();
        ab.insert("a", FieldValue::u8(1));
        ab.insert("b", FieldValue::u8(2));
        let mut ba = Event::new();
        ba.insert("b", FieldValue::u8(2));
        ba.insert("a", FieldValue::u8(1));
        assert_eq!(ab, ba);
        assert_ne!(ab.to_string(), ba.to_string());

        ba.insert("b", FieldValue::u8(3));
        assert_ne!(ab, ba);

        ba.insert("b", FieldValue::u8(2));
        ba.insert("c", FieldValue::u8(0));
        assert_ne!(ab, ba);
        assert_ne!(ba, ab);
    }

    #[test]
    fn display_renders_all_kinds() {
        let mut ev = Event::new();
        ev.insert("n", FieldValue::i16(-2));
        ev.insert("arr", FieldValue::bytes(&[1, 2]));
        ev.insert("s", FieldValue::text("hi"));
        assert_eq!(ev.to_string(), "{n: -2, arr: [1, 2], s: hi}");
    }
}
