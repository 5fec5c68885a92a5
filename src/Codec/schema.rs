// Fixed binary record layout shared by decode and encode

use crate::error::SchemaError;
use std::collections::HashSet;
use std::sync::Arc;

/// Byte order of every multi-byte field in a record.
///
/// Pinned on the schema so that layout never depends on the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
}

/// Shape of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Integer of `width` bytes
    Scalar { width: usize, signed: bool },
    /// `count` consecutive unsigned elements of `element_width` bytes each
    Array { element_width: usize, count: usize },
}

impl FieldKind {
    /// Bytes occupied by a field of this kind. Saturates for arrays too large
    /// to address; [`Schema::new`] rejects those.
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    fn checked_size(&self) -> Option<usize> {
        match *self {
            FieldKind::Scalar { width, .. } => Some(width),
            FieldKind::Array {
                element_width,
                count,
            } => element_width.checked_mul(count),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// A field together with its precomputed byte offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub name: String,
    pub kind: FieldKind,
    pub offset: usize,
}

#[derive(Debug, PartialEq, Eq)]
struct SchemaInner {
    fields: Vec<FieldLayout>,
    total_size: usize,
    byte_order: ByteOrder,
}

/// Validated, immutable record layout.
///
/// Fields are packed in declaration order with no padding. Cloning is cheap;
/// all clones share the same offset table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    inner: Arc<SchemaInner>,
}

const SUPPORTED_WIDTHS: [usize; 4] = [1, 2, 4, 8];

/// Largest record a schema may describe: the most a ring record can carry.
pub const MAX_RECORD_SIZE: usize = crate::Ring::layout::RECORD_LEN_MASK as usize;

impl Schema {
    /// Validate `fields` and compute offsets.
    pub fn new(fields: Vec<FieldDescriptor>, byte_order: ByteOrder) -> Result<Self, SchemaError> {
        let mut seen = HashSet::with_capacity(fields.len());
        let mut layouts = Vec::with_capacity(fields.len());
        let mut offset = 0usize;

        for field in fields {
            let width = match field.kind {
                FieldKind::Scalar { width, .. } => width,
                FieldKind::Array {
                    element_width,
                    count,
                } => {
                    if count == 0 {
                        return Err(SchemaError::EmptyArray(field.name));
                    }
                    element_width
                }
            };
            if !SUPPORTED_WIDTHS.contains(&width) {
                return Err(SchemaError::InvalidWidth {
                    field: field.name,
                    width,
                });
            }
            if !seen.insert(field.name.clone()) {
                return Err(SchemaError::DuplicateField(field.name));
            }

            let end = field
                .kind
                .checked_size()
                .and_then(|size| offset.checked_add(size))
                .filter(|&end| end <= MAX_RECORD_SIZE);
            let Some(end) = end else {
                return Err(SchemaError::TooLarge {
                    field: field.name,
                    max: MAX_RECORD_SIZE,
                });
            };
            layouts.push(FieldLayout {
                name: field.name,
                kind: field.kind,
                offset,
            });
            offset = end;
        }

        if offset == 0 {
            return Err(SchemaError::Empty);
        }

        Ok(Self {
            inner: Arc::new(SchemaInner {
                fields: layouts,
                total_size: offset,
                byte_order,
            }),
        })
    }

    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Fields in declaration (and byte) order.
    pub fn fields(&self) -> &[FieldLayout] {
        &self.inner.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldLayout> {
        self.inner.fields.iter().find(|f| f.name == name)
    }

    pub fn offset_of(&self, name: &str) -> Option<usize> {
        self.field(name).map(|f| f.offset)
    }

    /// Size in bytes of one record.
    pub fn total_size(&self) -> usize {
        self.inner.total_size
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.inner.byte_order
    }

    pub fn len(&self) -> usize {
        self.inner.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.fields.is_empty()
    }
}

/// Incremental construction of a [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<FieldDescriptor>,
    byte_order: ByteOrder,
}

impl SchemaBuilder {
    pub fn scalar(mut self, name: impl Into<String>, width: usize, signed: bool) -> Self {
        self.fields
            .push(FieldDescriptor::new(name, FieldKind::Scalar { width, signed }));
        self
    }

    pub fn unsigned(self, name: impl Into<String>, width: usize) -> Self {
        self.scalar(name, width, false)
    }

    pub fn signed(self, name: impl Into<String>, width: usize) -> Self {
        self.scalar(name, width, true)
    }

    pub fn array(mut self, name: impl Into<String>, element_width: usize, count: usize) -> Self {
        self.fields.push(FieldDescriptor::new(
            name,
            FieldKind::Array {
                element_width,
                count,
            },
        ));
        self
    }

    pub fn byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    pub fn build(self) -> Result<Schema, SchemaError> {
        Schema::new(self.fields, self.byte_order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_packed_in_order() {
        let schema = Schema::builder()
            .unsigned("a", 4)
            .array("b", 1, 6)
            .unsigned("c", 1)
            .signed("d", 2)
            .build()
            .unwrap();

        assert_eq!(schema.offset_of("a"), Some(0));
        assert_eq!(schema.offset_of("b"), Some(4));
        assert_eq!(schema.offset_of("c"), Some(10));
        assert_eq!(schema.offset_of("d"), Some(11));
        assert_eq!(schema.total_size(), 13);
        assert_eq!(schema.len(), 4);
        assert_eq!(schema.byte_order(), ByteOrder::Little);
    }

    #[test]
    fn rejects_bad_layouts() {
        let err = Schema::builder().unsigned("x", 3).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidWidth { width: 3, .. }));

        let err = Schema::builder().array("x", 16, 2).build().unwrap_err();
        assert!(matches!(err, SchemaError::InvalidWidth { width: 16, .. }));

        let err = Schema::builder().array("x", 1, 0).build().unwrap_err();
        assert_eq!(err, SchemaError::EmptyArray("x".into()));

        let err = Schema::builder()
            .unsigned("x", 1)
            .unsigned("x", 2)
            .build()
            .unwrap_err();
        assert_eq!(err, SchemaError::DuplicateField("x".into()));

        assert_eq!(Schema::builder().build().unwrap_err(), SchemaError::Empty);

        let err = Schema::builder()
            .array("big", 8, usize::MAX)
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            SchemaError::TooLarge {
                field: "big".into(),
                max: MAX_RECORD_SIZE
            }
        );

        // Each field fits on its own; the running offset does not
        let err = Schema::builder()
            .array("head", 8, MAX_RECORD_SIZE / 8)
            .unsigned("tail", 8)
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::TooLarge { ref field, .. } if field == "tail"));

        assert_eq!(
            FieldKind::Array {
                element_width: 8,
                count: usize::MAX
            }
            .size(),
            usize::MAX
        );
    }
}
