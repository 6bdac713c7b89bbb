use crate::graph::ResolveContext;
use crate::types::{MATERIAL_TYPE, ShaderBytecode, Texture};
use crate::{Result, Tag};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;
use tiger_formats::{CursorError, Field, FieldType, Record, Schema, TagHash};

const TEXTURE_SLOT: Schema = Schema::new(
    "TextureSlot",
    &[
        Field::new("slot", FieldType::U32),
        Field::new("texture", FieldType::TagHash),
    ],
);

const HEADER: Schema = Schema::new(
    "Material",
    &[
        Field::new("file_size", FieldType::U64),
        Field::new("flags", FieldType::U32),
        Field::new("vertex_shader", FieldType::TagHash),
        Field::new("pixel_shader", FieldType::TagHash),
        Field::new("_pad", FieldType::Padding(4)),
        Field::new("vs_textures", FieldType::Array(&TEXTURE_SLOT)),
        Field::new("ps_textures", FieldType::Array(&TEXTURE_SLOT)),
    ],
);

/// Texture bound to a shader slot
#[derive(Debug, Clone)]
pub struct TextureSlot {
    pub slot: u32,
    pub hash: TagHash,
    pub texture: Option<Arc<Texture>>,
}

/// Shader pair plus texture bindings
#[derive(Debug)]
pub struct Material {
    pub file_size: u64,
    pub flags: u32,
    pub vertex_shader: Option<Arc<ShaderBytecode>>,
    pub pixel_shader: Option<Arc<ShaderBytecode>>,
    pub vs_textures: Vec<TextureSlot>,
    pub ps_textures: Vec<TextureSlot>,
}

async fn resolve_slots(
    record: &Record,
    name: &'static str,
    ctx: &ResolveContext<'_>,
) -> Result<Vec<TextureSlot>> {
    let slots = record
        .array(name)?
        .iter()
        .map(|slot| Ok((slot.u32("slot")?, slot.tag_hash("texture")?)))
        .collect::<std::result::Result<Vec<_>, CursorError>>()?;

    let textures = join_all(
        slots
            .iter()
            .map(|&(_, hash)| ctx.resolve_optional::<Texture>(hash)),
    )
    .await;

    Ok(slots
        .into_iter()
        .zip(textures)
        .map(|((slot, hash), texture)| TextureSlot {
            slot,
            hash,
            texture,
        })
        .collect())
}

#[async_trait]
impl Tag for Material {
    const NAME: &'static str = "Material";
    const TYPE_TAG: u32 = MATERIAL_TYPE;
    const SCHEMA: &'static Schema = &HEADER;

    async fn assemble(record: Record, _bytes: Bytes, ctx: &ResolveContext<'_>) -> Result<Self> {
        let vs_hash = record.tag_hash("vertex_shader")?;
        let ps_hash = record.tag_hash("pixel_shader")?;
        let (vertex_shader, pixel_shader, vs_textures, ps_textures) = futures::join!(
            ctx.resolve_optional::<ShaderBytecode>(vs_hash),
            ctx.resolve_optional::<ShaderBytecode>(ps_hash),
            resolve_slots(&record, "vs_textures", ctx),
            resolve_slots(&record, "ps_textures", ctx),
        );

        Ok(Self {
            file_size: record.u64("file_size")?,
            flags: record.u32("flags")?,
            vertex_shader,
            pixel_shader,
            vs_textures: vs_textures?,
            ps_textures: ps_textures?,
        })
    }
}

impl Material {
    /// Every resolved texture, vertex stage first
    pub fn textures(&self) -> impl Iterator<Item = &Arc<Texture>> {
        self.vs_textures
            .iter()
            .chain(&self.ps_textures)
            .filter_map(|slot| slot.texture.as_ref())
    }
}
