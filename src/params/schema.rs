//! Static parameter schemas.
//!
//! A schema is the ordered list of typed fields of one resource. The same
//! order defines the editable layout and the byte layout on the wire, so
//! schemas are declared once as `static` tables and never derived.

use super::FieldType;

/// One named, typed field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field {
    /// Display name.
    pub name: &'static str,
    /// Scalar type and width.
    pub ty: FieldType,
}

impl Field {
    /// 32-bit float field.
    pub const fn f32(name: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::F32,
        }
    }

    /// 16-bit unsigned field.
    pub const fn u16(name: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::U16,
        }
    }

    /// 8-bit unsigned field.
    pub const fn u8(name: &'static str) -> Self {
        Self {
            name,
            ty: FieldType::U8,
        }
    }
}

/// Ordered field list of one resource.
#[derive(Debug, PartialEq, Eq)]
pub struct Schema {
    /// Resource name used in logs and errors.
    pub name: &'static str,
    /// Fields in wire order.
    pub fields: &'static [Field],
}

impl Schema {
    /// Number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Check if the schema has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Raw byte length of a block with this schema.
    pub fn byte_len(&self) -> usize {
        self.fields.iter().map(|f| f.ty.width()).sum()
    }

    /// Position of a field by name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Byte offset of the field at `index`.
    pub fn offset_of(&self, index: usize) -> usize {
        self.fields[..index].iter().map(|f| f.ty.width()).sum()
    }
}
