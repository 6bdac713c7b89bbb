use crate::graph::ResolveContext;
use crate::registry::TypedTag;
use crate::types::{ControlRig, ENTITY_TYPE, Material, MeshPart, Model, PhysicsModel, Skeleton};
use crate::{Result, Tag};
use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use std::sync::Arc;
use tiger_formats::{Field, FieldType, Record, Schema, TagHash};
use tracing::debug;

const RESOURCE: Schema = Schema::new(
    "EntityResource",
    &[
        Field::new("type_tag", FieldType::U32),
        Field::new("resource", FieldType::TagHash),
    ],
);

const HEADER: Schema = Schema::new(
    "Entity",
    &[
        Field::new("file_size", FieldType::U64),
        Field::new("resources", FieldType::Array(&RESOURCE)),
    ],
);

/// One slot of an entity's resource list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceRef {
    /// Kind of the referenced tag
    pub type_tag: u32,
    pub resource: TagHash,
}

/// A placeable object: a bundle of model, physics, skeleton and rig
#[derive(Debug)]
pub struct Entity {
    pub file_size: u64,
    /// Resource list in file order
    pub resources: Vec<ResourceRef>,
    pub model: Option<Arc<Model>>,
    pub physics_model: Option<Arc<PhysicsModel>>,
    pub skeleton: Option<Arc<Skeleton>>,
    pub control_rig: Option<Arc<ControlRig>>,
    /// Resolved resources of other known kinds, and earlier resources of a
    /// kind whose slot a later resource took
    pub other: Vec<TypedTag>,
}

/// One drawable piece of an entity at a given level of detail
#[derive(Debug, Clone)]
pub struct EntityPart {
    pub mesh: MeshPart,
    pub material: Option<Arc<Material>>,
    /// Whether the part comes from the physics model
    pub physics: bool,
}

#[async_trait]
impl Tag for Entity {
    const NAME: &'static str = "Entity";
    const TYPE_TAG: u32 = ENTITY_TYPE;
    const SCHEMA: &'static Schema = &HEADER;

    async fn assemble(record: Record, _bytes: Bytes, ctx: &ResolveContext<'_>) -> Result<Self> {
        let resources = record
            .array("resources")?
            .iter()
            .map(|slot| {
                Ok(ResourceRef {
                    type_tag: slot.u32("type_tag")?,
                    resource: slot.tag_hash("resource")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, tiger_formats::CursorError>>()?;

        let resolved = join_all(
            resources
                .iter()
                .map(|slot| ctx.resolve_as_optional(slot.type_tag, slot.resource)),
        )
        .await;

        let mut entity = Self {
            file_size: record.u64("file_size")?,
            resources,
            model: None,
            physics_model: None,
            skeleton: None,
            control_rig: None,
            other: Vec::new(),
        };

        for (slot, value) in entity.resources.iter().zip(resolved) {
            match value {
                TypedTag::Model(model) => {
                    if let Some(previous) = entity.model.replace(model) {
                        entity.other.push(TypedTag::Model(previous));
                    }
                }
                TypedTag::PhysicsModel(model) => {
                    if let Some(previous) = entity.physics_model.replace(model) {
                        entity.other.push(TypedTag::PhysicsModel(previous));
                    }
                }
                TypedTag::Skeleton(skeleton) => {
                    if let Some(previous) = entity.skeleton.replace(skeleton) {
                        entity.other.push(TypedTag::Skeleton(previous));
                    }
                }
                TypedTag::ControlRig(rig) => {
                    if let Some(previous) = entity.control_rig.replace(rig) {
                        entity.other.push(TypedTag::ControlRig(previous));
                    }
                }
                TypedTag::Unknown(type_tag) => {
                    debug!("Skipping resource {} ({:#010x})", slot.resource, type_tag);
                }
                TypedTag::Empty => {}
                other => entity.other.push(other),
            }
        }

        Ok(entity)
    }
}

impl Entity {
    /// Mesh parts of one level of detail, physics model first, each paired
    /// with its material
    pub fn parts(&self, lod: u8) -> Vec<EntityPart> {
        let physics = self
            .physics_model
            .iter()
            .flat_map(|model| model.lod_parts(lod))
            .map(|(mesh, material)| EntityPart {
                mesh,
                material,
                physics: true,
            });
        let render = self
            .model
            .iter()
            .flat_map(|model| model.lod_parts(lod))
            .map(|(mesh, material)| EntityPart {
                mesh,
                material,
                physics: false,
            });
        physics.chain(render).collect()
    }

    /// Number of resource slots that resolved to a value
    pub fn resolved_count(&self) -> usize {
        [
            self.model.is_some(),
            self.physics_model.is_some(),
            self.skeleton.is_some(),
            self.control_rig.is_some(),
        ]
        .into_iter()
        .filter(|&filled| filled)
        .count()
            + self.other.len()
    }
}
