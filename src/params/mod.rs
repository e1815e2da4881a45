//! Parameter serialization.
//!
//! Converts between typed parameter vectors and the raw little-endian bytes
//! the firmware stores them as. Each resource has exactly one [`Schema`];
//! a [`ParameterBlock`] is a full set of values for it.
//!
//! # Example
//!
//! ```
//! use punck_link::catalog::{ResourceCatalog, Voice};
//! use punck_link::params::{FieldValue, ParameterBlock};
//!
//! let schema = ResourceCatalog::PUNCK.voice_schema(Voice::Kick).unwrap();
//! let mut block = ParameterBlock::zeroed(schema);
//! block.set("Fast Sine Freq", FieldValue::F32(130.0)).unwrap();
//!
//! let bytes = block.encode();
//! assert_eq!(bytes.len(), schema.byte_len());
//! assert_eq!(ParameterBlock::decode(schema, &bytes).unwrap(), block);
//! ```

mod schema;

pub use schema::{Field, Schema};

use crate::error::{PunckError, Result};

/// Encode a float as 4 little-endian IEEE-754 bytes.
#[inline]
pub fn float_to_bytes(value: f32) -> [u8; 4] {
    value.to_le_bytes()
}

/// Decode 4 little-endian IEEE-754 bytes.
#[inline]
pub fn bytes_to_float(bytes: [u8; 4]) -> f32 {
    f32::from_le_bytes(bytes)
}

/// Encode a 16-bit unsigned value, little-endian.
#[inline]
pub fn uint16_to_bytes(value: u16) -> [u8; 2] {
    value.to_le_bytes()
}

/// Decode a 16-bit unsigned value, little-endian.
#[inline]
pub fn bytes_to_uint16(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// Scalar type of a schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    F32,
    U16,
    U8,
}

impl FieldType {
    /// Width in raw bytes.
    #[inline]
    pub fn width(self) -> usize {
        match self {
            FieldType::F32 => 4,
            FieldType::U16 => 2,
            FieldType::U8 => 1,
        }
    }

    /// All-zero value of this type.
    pub fn zero(self) -> FieldValue {
        match self {
            FieldType::F32 => FieldValue::F32(0.0),
            FieldType::U16 => FieldValue::U16(0),
            FieldType::U8 => FieldValue::U8(0),
        }
    }
}

/// A typed field value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue {
    F32(f32),
    U16(u16),
    U8(u8),
}

impl FieldValue {
    /// Type of this value.
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::F32(_) => FieldType::F32,
            FieldValue::U16(_) => FieldType::U16,
            FieldValue::U8(_) => FieldType::U8,
        }
    }

    /// Value widened to f64, for display or sliders.
    pub fn as_f64(&self) -> f64 {
        match *self {
            FieldValue::F32(v) => v as f64,
            FieldValue::U16(v) => v as f64,
            FieldValue::U8(v) => v as f64,
        }
    }

    /// Display form: floats truncated to 6 decimal places.
    ///
    /// Cosmetic only. The wire value is always the exact stored value.
    pub fn display(&self) -> String {
        match *self {
            FieldValue::F32(v) => {
                let truncated = (v as f64 * 1_000_000.0).trunc() / 1_000_000.0;
                format!("{}", truncated)
            }
            FieldValue::U16(v) => v.to_string(),
            FieldValue::U8(v) => v.to_string(),
        }
    }

    fn write_into(&self, out: &mut Vec<u8>) {
        match *self {
            FieldValue::F32(v) => out.extend_from_slice(&float_to_bytes(v)),
            FieldValue::U16(v) => out.extend_from_slice(&uint16_to_bytes(v)),
            FieldValue::U8(v) => out.push(v),
        }
    }

    fn read(ty: FieldType, bytes: &[u8]) -> Self {
        match ty {
            FieldType::F32 => {
                FieldValue::F32(bytes_to_float([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            FieldType::U16 => FieldValue::U16(bytes_to_uint16([bytes[0], bytes[1]])),
            FieldType::U8 => FieldValue::U8(bytes[0]),
        }
    }
}

/// A complete set of values for one schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterBlock {
    schema: &'static Schema,
    values: Vec<FieldValue>,
}

impl ParameterBlock {
    /// Block with every field zeroed.
    pub fn zeroed(schema: &'static Schema) -> Self {
        Self {
            schema,
            values: schema.fields.iter().map(|f| f.ty.zero()).collect(),
        }
    }

    /// Build a block from values, checking count and types against the schema.
    pub fn from_values(schema: &'static Schema, values: Vec<FieldValue>) -> Result<Self> {
        if values.len() != schema.len() {
            return Err(PunckError::OutOfRange(format!(
                "{} expects {} values, got {}",
                schema.name,
                schema.len(),
                values.len()
            )));
        }
        for (field, value) in schema.fields.iter().zip(&values) {
            if field.ty != value.field_type() {
                return Err(PunckError::FieldTypeMismatch {
                    field: field.name,
                    expected: field.ty,
                });
            }
        }
        Ok(Self { schema, values })
    }

    /// Decode raw bytes in schema order.
    ///
    /// Trailing bytes beyond the schema are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`PunckError::PayloadTooShort`] if `bytes` does not cover every field.
    pub fn decode(schema: &'static Schema, bytes: &[u8]) -> Result<Self> {
        let expected = schema.byte_len();
        if bytes.len() < expected {
            return Err(PunckError::PayloadTooShort {
                expected,
                actual: bytes.len(),
            });
        }

        let mut offset = 0;
        let mut values = Vec::with_capacity(schema.len());
        for field in schema.fields {
            let width = field.ty.width();
            values.push(FieldValue::read(field.ty, &bytes[offset..offset + width]));
            offset += width;
        }

        Ok(Self { schema, values })
    }

    /// Encode every field in schema order.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.schema.byte_len());
        for value in &self.values {
            value.write_into(&mut out);
        }
        out
    }

    /// Schema of this block.
    #[inline]
    pub fn schema(&self) -> &'static Schema {
        self.schema
    }

    /// Values in schema order.
    #[inline]
    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    /// Value of a field by name.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.schema.index_of(name).map(|i| self.values[i])
    }

    /// Set a field by name.
    pub fn set(&mut self, name: &str, value: FieldValue) -> Result<()> {
        let index = self
            .schema
            .index_of(name)
            .ok_or_else(|| PunckError::UnknownField(name.to_string()))?;
        self.set_index(index, value)
    }

    /// Set a field by position.
    pub fn set_index(&mut self, index: usize, value: FieldValue) -> Result<()> {
        let field = self.schema.fields.get(index).ok_or_else(|| {
            PunckError::OutOfRange(format!("{} has no field {}", self.schema.name, index))
        })?;
        if field.ty != value.field_type() {
            return Err(PunckError::FieldTypeMismatch {
                field: field.name,
                expected: field.ty,
            });
        }
        self.values[index] = value;
        Ok(())
    }

    /// Iterate over `(field, value)` pairs in wire order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static Field, FieldValue)> + '_ {
        self.schema.fields.iter().zip(self.values.iter().copied())
    }
}
