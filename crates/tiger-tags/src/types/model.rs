use crate::graph::ResolveContext;
use crate::types::{MODEL_TYPE, Material, PHYSICS_MODEL_TYPE};
use crate::{Result, Tag};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use std::ops::Deref;
use std::sync::Arc;
use tiger_formats::{CursorError, Field, FieldType, Record, Schema, TagHash};

const MESH: Schema = Schema::new(
    "MeshPart",
    &[
        Field::new("vertex_buffer", FieldType::TagHash),
        Field::new("index_buffer", FieldType::TagHash),
        Field::new("index_start", FieldType::U32),
        Field::new("index_count", FieldType::U32),
        Field::new("lod", FieldType::U8),
        Field::new("_pad", FieldType::Padding(3)),
    ],
);

const MATERIAL_REF: Schema = Schema::new(
    "MaterialRef",
    &[Field::new("material", FieldType::TagHash)],
);

const HEADER: Schema = Schema::new(
    "Model",
    &[
        Field::new("file_size", FieldType::U64),
        Field::new("bounds_min", FieldType::Vec4),
        Field::new("bounds_max", FieldType::Vec4),
        Field::new("meshes", FieldType::Array(&MESH)),
        Field::new("materials", FieldType::Array(&MATERIAL_REF)),
    ],
);

/// Draw range of one mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeshPart {
    pub vertex_buffer: TagHash,
    pub index_buffer: TagHash,
    pub index_start: u32,
    pub index_count: u32,
    pub lod: u8,
}

/// Renderable geometry with its materials
#[derive(Debug)]
pub struct Model {
    pub file_size: u64,
    pub bounds_min: [f32; 4],
    pub bounds_max: [f32; 4],
    pub meshes: Vec<MeshPart>,
    /// Material references in file order; `None` where a reference is
    /// absent or failed to resolve
    pub materials: Vec<Option<Arc<Material>>>,
    /// Raw material hashes, same order as `materials`
    pub material_hashes: Vec<TagHash>,
}

impl Model {
    async fn build(record: &Record, ctx: &ResolveContext<'_>) -> Result<Self> {
        let meshes = record
            .array("meshes")?
            .iter()
            .map(|mesh| {
                Ok(MeshPart {
                    vertex_buffer: mesh.tag_hash("vertex_buffer")?,
                    index_buffer: mesh.tag_hash("index_buffer")?,
                    index_start: mesh.u32("index_start")?,
                    index_count: mesh.u32("index_count")?,
                    lod: mesh.u8("lod")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, CursorError>>()?;

        let material_hashes = record
            .array("materials")?
            .iter()
            .map(|slot| slot.tag_hash("material"))
            .collect::<std::result::Result<Vec<_>, CursorError>>()?;

        let materials = join_all(
            material_hashes
                .iter()
                .map(|&hash| ctx.resolve_optional::<Material>(hash)),
        )
        .await;

        Ok(Self {
            file_size: record.u64("file_size")?,
            bounds_min: record.vec4("bounds_min")?,
            bounds_max: record.vec4("bounds_max")?,
            meshes,
            materials,
            material_hashes,
        })
    }

    /// Meshes of one level of detail
    pub fn lod_meshes(&self, lod: u8) -> impl Iterator<Item = &MeshPart> {
        self.meshes.iter().filter(move |mesh| mesh.lod == lod)
    }

    /// Meshes of one level of detail with the material at the same index
    pub fn lod_parts(
        &self,
        lod: u8,
    ) -> impl Iterator<Item = (MeshPart, Option<Arc<Material>>)> + '_ {
        self.meshes
            .iter()
            .enumerate()
            .filter(move |(_, mesh)| mesh.lod == lod)
            .map(move |(index, mesh)| (*mesh, self.materials.get(index).cloned().flatten()))
    }

    /// Total index count over all meshes
    pub fn index_count(&self) -> u64 {
        self.meshes.iter().map(|mesh| u64::from(mesh.index_count)).sum()
    }
}

#[async_trait]
impl Tag for Model {
    const NAME: &'static str = "Model";
    const TYPE_TAG: u32 = MODEL_TYPE;
    const SCHEMA: &'static Schema = &HEADER;

    async fn assemble(record: Record, _bytes: Bytes, ctx: &ResolveContext<'_>) -> Result<Self> {
        Self::build(&record, ctx).await
    }
}

/// Collision geometry; same layout as [`Model`]
#[derive(Debug)]
pub struct PhysicsModel {
    pub model: Model,
}

impl Deref for PhysicsModel {
    type Target = Model;

    fn deref(&self) -> &Model {
        &self.model
    }
}

#[async_trait]
impl Tag for PhysicsModel {
    const NAME: &'static str = "PhysicsModel";
    const TYPE_TAG: u32 = PHYSICS_MODEL_TYPE;
    const SCHEMA: &'static Schema = &HEADER;

    async fn assemble(record: Record, _bytes: Bytes, ctx: &ResolveContext<'_>) -> Result<Self> {
        Ok(Self {
            model: Model::build(&record, ctx).await?,
        })
    }
}
