use crate::graph::ResolveContext;
use crate::types::TEXTURE_TYPE;
use crate::{Result, Tag};
use async_trait::async_trait;
use bytes::Bytes;
use tiger_formats::{Field, FieldType, Record, Schema, TagHash};

const HEADER: Schema = Schema::new(
    "Texture",
    &[
        Field::new("data_size", FieldType::U32),
        Field::new("format", FieldType::U16),
        Field::new("_pad", FieldType::Padding(2)),
        Field::new("width", FieldType::U16),
        Field::new("height", FieldType::U16),
        Field::new("depth", FieldType::U16),
        Field::new("array_size", FieldType::U16),
        Field::new("large_buffer", FieldType::TagHash),
    ],
);

/// Texture header; pixel data lives in separate buffers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Texture {
    pub data_size: u32,
    /// DXGI format id
    pub format: u16,
    pub width: u16,
    pub height: u16,
    pub depth: u16,
    pub array_size: u16,
    /// High resolution mip buffer, absent for small textures
    pub large_buffer: TagHash,
}

impl Texture {
    pub fn has_large_buffer(&self) -> bool {
        self.large_buffer.is_valid()
    }

    pub fn is_cubemap(&self) -> bool {
        self.array_size == 6
    }
}

#[async_trait]
impl Tag for Texture {
    const NAME: &'static str = "Texture";
    const TYPE_TAG: u32 = TEXTURE_TYPE;
    const SCHEMA: &'static Schema = &HEADER;

    async fn assemble(record: Record, _bytes: Bytes, _ctx: &ResolveContext<'_>) -> Result<Self> {
        Ok(Self {
            data_size: record.u32("data_size")?,
            format: record.u16("format")?,
            width: record.u16("width")?,
            height: record.u16("height")?,
            depth: record.u16("depth")?,
            array_size: record.u16("array_size")?,
            large_buffer: record.tag_hash("large_buffer")?,
        })
    }
}
