//! Declarative tag header layouts
//!
//! A [`Schema`] is static data describing the fields of a tag header in
//! declaration order. [`BinaryCursor::read_record`](crate::cursor::BinaryCursor::read_record)
//! turns bytes into a [`Record`] of named [`Value`]s. Padding fields are
//! consumed but not stored.

use crate::cursor::{CursorError, Result};
use crate::hash::{ContentId, StringHash, TagHash};

/// Wire type of a single field
#[derive(Debug, Clone, Copy)]
pub enum FieldType {
    U8,
    U16,
    U32,
    U64,
    I16,
    I32,
    F32,
    Vec2,
    Vec3,
    Vec4,
    /// 32-bit package-relative hash
    TagHash,
    /// 16-byte wide hash (`hash32`, `is_hash32`, `hash64`)
    TagHash64,
    StringHash,
    /// Skipped bytes
    Padding(usize),
    /// Inline nested record
    Struct(&'static Schema),
    /// `(count: u64, offset: u64)` pair pointing at packed elements
    Array(&'static Schema),
}

impl FieldType {
    /// Inline size in bytes
    pub fn size(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::I16 => 2,
            Self::U32 | Self::I32 | Self::F32 | Self::TagHash | Self::StringHash => 4,
            Self::U64 | Self::Vec2 => 8,
            Self::Vec3 => 12,
            Self::Vec4 | Self::TagHash64 | Self::Array(_) => 16,
            Self::Padding(count) => *count,
            Self::Struct(schema) => schema.size(),
        }
    }
}

/// Named field
#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub ty: FieldType,
}

impl Field {
    pub const fn new(name: &'static str, ty: FieldType) -> Self {
        Self { name, ty }
    }
}

/// Ordered field layout of a record
#[derive(Debug)]
pub struct Schema {
    pub name: &'static str,
    pub fields: &'static [Field],
}

impl Schema {
    pub const fn new(name: &'static str, fields: &'static [Field]) -> Self {
        Self { name, fields }
    }

    /// Packed size of one record, arrays counted as their 16-byte header
    pub fn size(&self) -> usize {
        self.fields.iter().map(|field| field.ty.size()).sum()
    }
}

/// Decoded field value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    I16(i16),
    I32(i32),
    F32(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    TagHash(TagHash),
    TagHash64(ContentId),
    StringHash(StringHash),
    Struct(Record),
    Array(Vec<Record>),
}

/// Decoded record: field values in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    schema: &'static str,
    fields: Vec<(&'static str, Value)>,
}

macro_rules! accessor {
    ($name:ident, $variant:ident, $ty:ty) => {
        #[doc = concat!("Read field `name` as `", stringify!($ty), "`")]
        pub fn $name(&self, name: &'static str) -> Result<$ty> {
            match self.field(name)? {
                Value::$variant(value) => Ok(*value),
                _ => Err(CursorError::FieldType {
                    field: name,
                    expected: stringify!($variant),
                }),
            }
        }
    };
}

impl Record {
    pub(crate) fn new(schema: &'static str) -> Self {
        Self {
            schema,
            fields: Vec::new(),
        }
    }

    pub(crate) fn push(&mut self, name: &'static str, value: Value) {
        self.fields.push((name, value));
    }

    /// Name of the schema that produced this record
    pub fn schema(&self) -> &'static str {
        self.schema
    }

    /// Field value by name
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| *field == name)
            .map(|(_, value)| value)
    }

    /// Fields in declaration order, padding excluded
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.fields.iter().map(|(name, value)| (*name, value))
    }

    fn field(&self, name: &'static str) -> Result<&Value> {
        self.get(name).ok_or(CursorError::MissingField {
            schema: self.schema,
            field: name,
        })
    }

    accessor!(u8, U8, u8);
    accessor!(u16, U16, u16);
    accessor!(u32, U32, u32);
    accessor!(u64, U64, u64);
    accessor!(i16, I16, i16);
    accessor!(i32, I32, i32);
    accessor!(f32, F32, f32);
    accessor!(vec2, Vec2, [f32; 2]);
    accessor!(vec3, Vec3, [f32; 3]);
    accessor!(vec4, Vec4, [f32; 4]);
    accessor!(tag_hash, TagHash, TagHash);
    accessor!(string_hash, StringHash, StringHash);

    /// Either hash shape as a [`ContentId`]
    pub fn content_id(&self, name: &'static str) -> Result<ContentId> {
        match self.field(name)? {
            Value::TagHash(hash) => Ok(ContentId::Local(*hash)),
            Value::TagHash64(id) => Ok(*id),
            _ => Err(CursorError::FieldType {
                field: name,
                expected: "hash",
            }),
        }
    }

    pub fn record(&self, name: &'static str) -> Result<&Self> {
        match self.field(name)? {
            Value::Struct(record) => Ok(record),
            _ => Err(CursorError::FieldType {
                field: name,
                expected: "Struct",
            }),
        }
    }

    pub fn array(&self, name: &'static str) -> Result<&[Self]> {
        match self.field(name)? {
            Value::Array(records) => Ok(records),
            _ => Err(CursorError::FieldType {
                field: name,
                expected: "Array",
            }),
        }
    }

    /// Every non-absent byte-addressing hash in this record, nested records
    /// and arrays included, in declaration order
    pub fn references(&self) -> Vec<ContentId> {
        let mut out = Vec::new();
        self.collect_references(&mut out);
        out
    }

    fn collect_references(&self, out: &mut Vec<ContentId>) {
        for (_, value) in &self.fields {
            match value {
                Value::TagHash(hash) if hash.is_valid() => out.push(ContentId::Local(*hash)),
                Value::TagHash64(id) if !id.is_absent() => out.push(*id),
                Value::Struct(record) => record.collect_references(out),
                Value::Array(records) => {
                    for record in records {
                        record.collect_references(out);
                    }
                }
                _ => {}
            }
        }
    }
}
