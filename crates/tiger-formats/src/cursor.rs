//! Little-endian binary cursor over tag bytes
//!
//! The cursor only reads forward from an explicit position and never touches
//! storage. Arrays are stored as a `(count: u64, offset: u64)` pair where the
//! offset is relative to the position of the offset field itself; the
//! elements are decoded by a forked cursor so the parent only advances past
//! the 16-byte pair.

use crate::hash::{ContentId, StringHash, TagHash};
use crate::schema::{FieldType, Record, Schema, Value};
use thiserror::Error;

/// Errors produced while decoding bytes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// Not enough bytes left for a read
    #[error("out of bounds: wanted {wanted} bytes at offset {offset:#x}, {available} available")]
    OutOfBounds {
        /// Position the read started at
        offset: usize,
        /// Bytes the read needed
        wanted: usize,
        /// Bytes actually left
        available: usize,
    },

    /// A record does not carry the requested field
    #[error("record {schema} has no field {field}")]
    MissingField {
        /// Schema name of the record
        schema: &'static str,
        /// Field that was requested
        field: &'static str,
    },

    /// A field holds a different value kind than requested
    #[error("field {field} is not a {expected}")]
    FieldType {
        /// Field that was requested
        field: &'static str,
        /// Value kind the caller asked for
        expected: &'static str,
    },
}

/// Result type for cursor operations
pub type Result<T> = std::result::Result<T, CursorError>;

/// Forward-only reader with an explicit position
#[derive(Debug, Clone)]
pub struct BinaryCursor<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> BinaryCursor<'a> {
    /// Create a cursor at the start of `data`
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    /// Current position
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes left after the current position
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Total length of the underlying buffer
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the underlying buffer is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// New cursor over the same bytes at an absolute position
    pub fn fork_at(&self, position: usize) -> Result<Self> {
        if position > self.data.len() {
            return Err(CursorError::OutOfBounds {
                offset: position,
                wanted: 0,
                available: 0,
            });
        }
        Ok(Self {
            data: self.data,
            position,
        })
    }

    fn take(&mut self, wanted: usize) -> Result<&'a [u8]> {
        let available = self.remaining();
        if wanted > available {
            return Err(CursorError::OutOfBounds {
                offset: self.position,
                wanted,
                available,
            });
        }
        let start = self.position;
        self.position += wanted;
        Ok(&self.data[start..start + wanted])
    }

    fn take_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    /// Advance without reading
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Borrow the next `count` bytes
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        self.take(count)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take_array::<1>()?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        Ok(u16::from_le_bytes(self.take_array()?))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.take_array()?))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        Ok(u64::from_le_bytes(self.take_array()?))
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(i16::from_le_bytes(self.take_array()?))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(i32::from_le_bytes(self.take_array()?))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(f32::from_le_bytes(self.take_array()?))
    }

    pub fn read_vec2(&mut self) -> Result<[f32; 2]> {
        Ok([self.read_f32()?, self.read_f32()?])
    }

    pub fn read_vec3(&mut self) -> Result<[f32; 3]> {
        Ok([self.read_f32()?, self.read_f32()?, self.read_f32()?])
    }

    pub fn read_vec4(&mut self) -> Result<[f32; 4]> {
        Ok([
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
            self.read_f32()?,
        ])
    }

    /// 32-bit package-relative hash
    pub fn read_tag_hash(&mut self) -> Result<TagHash> {
        self.read_u32().map(TagHash)
    }

    /// 16-byte wide hash: `hash32`, `is_hash32`, `hash64`
    pub fn read_tag_hash64(&mut self) -> Result<ContentId> {
        let hash32 = self.read_u32()?;
        let is_hash32 = self.read_u32()?;
        let hash64 = self.read_u64()?;
        Ok(ContentId::from_wide(hash32, is_hash32, hash64))
    }

    pub fn read_string_hash(&mut self) -> Result<StringHash> {
        self.read_u32().map(StringHash)
    }

    /// Read an array header and return `(count, absolute element position)`.
    ///
    /// Fails before any allocation when `count` elements of `element_size`
    /// bytes cannot fit between the target and the end of the buffer.
    pub fn read_array_header(&mut self, element_size: usize) -> Result<(usize, usize)> {
        let count = self.read_u64()?;
        let field_position = self.position;
        let relative = self.read_u64()?;

        let target = usize::try_from(relative)
            .ok()
            .and_then(|relative| field_position.checked_add(relative))
            .filter(|&target| target <= self.data.len())
            .ok_or(CursorError::OutOfBounds {
                offset: field_position,
                wanted: usize::try_from(relative).unwrap_or(usize::MAX),
                available: self.data.len().saturating_sub(field_position),
            })?;

        let available = self.data.len() - target;
        let count = usize::try_from(count).unwrap_or(usize::MAX);
        let wanted = count.saturating_mul(element_size.max(1));
        if wanted > available {
            return Err(CursorError::OutOfBounds {
                offset: target,
                wanted,
                available,
            });
        }

        Ok((count, target))
    }

    /// Read an array of records described by `schema`
    pub fn read_array(&mut self, schema: &Schema) -> Result<Vec<Record>> {
        let (count, target) = self.read_array_header(schema.size())?;
        let mut fork = self.fork_at(target)?;
        let mut records = Vec::with_capacity(count);
        for _ in 0..count {
            records.push(fork.read_record(schema)?);
        }
        Ok(records)
    }

    /// Decode one record with `schema` starting at the current position
    pub fn read_record(&mut self, schema: &Schema) -> Result<Record> {
        let mut record = Record::new(schema.name);
        for field in schema.fields {
            if let Some(value) = self.read_value(&field.ty)? {
                record.push(field.name, value);
            }
        }
        Ok(record)
    }

    fn read_value(&mut self, ty: &FieldType) -> Result<Option<Value>> {
        let value = match ty {
            FieldType::U8 => Value::U8(self.read_u8()?),
            FieldType::U16 => Value::U16(self.read_u16()?),
            FieldType::U32 => Value::U32(self.read_u32()?),
            FieldType::U64 => Value::U64(self.read_u64()?),
            FieldType::I16 => Value::I16(self.read_i16()?),
            FieldType::I32 => Value::I32(self.read_i32()?),
            FieldType::F32 => Value::F32(self.read_f32()?),
            FieldType::Vec2 => Value::Vec2(self.read_vec2()?),
            FieldType::Vec3 => Value::Vec3(self.read_vec3()?),
            FieldType::Vec4 => Value::Vec4(self.read_vec4()?),
            FieldType::TagHash => Value::TagHash(self.read_tag_hash()?),
            FieldType::TagHash64 => Value::TagHash64(self.read_tag_hash64()?),
            FieldType::StringHash => Value::StringHash(self.read_string_hash()?),
            FieldType::Padding(count) => {
                self.skip(*count)?;
                return Ok(None);
            }
            FieldType::Struct(schema) => Value::Struct(self.read_record(schema)?),
            FieldType::Array(schema) => Value::Array(self.read_array(schema)?),
        };
        Ok(Some(value))
    }
}
