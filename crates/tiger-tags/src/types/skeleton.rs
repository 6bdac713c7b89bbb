use crate::graph::ResolveContext;
use crate::types::SKELETON_TYPE;
use crate::{Result, Tag};
use async_trait::async_trait;
use bytes::Bytes;
use tiger_formats::{CursorError, Field, FieldType, Record, Schema, StringHash};

const BONE: Schema = Schema::new(
    "Bone",
    &[
        Field::new("name", FieldType::StringHash),
        Field::new("parent", FieldType::I32),
        Field::new("rotation", FieldType::Vec4),
        Field::new("translation", FieldType::Vec3),
        Field::new("scale", FieldType::F32),
    ],
);

const HEADER: Schema = Schema::new(
    "Skeleton",
    &[
        Field::new("file_size", FieldType::U64),
        Field::new("bones", FieldType::Array(&BONE)),
    ],
);

/// Bind pose of one bone
#[derive(Debug, Clone, PartialEq)]
pub struct Bone {
    pub name: StringHash,
    /// Index of the parent bone, `None` for roots
    pub parent: Option<usize>,
    /// Quaternion `x, y, z, w`
    pub rotation: [f32; 4],
    pub translation: [f32; 3],
    pub scale: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Skeleton {
    pub file_size: u64,
    pub bones: Vec<Bone>,
}

impl Skeleton {
    /// Indices of bones without a parent
    pub fn roots(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones
            .iter()
            .enumerate()
            .filter(|(_, bone)| bone.parent.is_none())
            .map(|(index, _)| index)
    }

    /// Index of the bone named `name`
    pub fn find(&self, name: &str) -> Option<usize> {
        let hash = StringHash::from_text(name);
        self.bones.iter().position(|bone| bone.name == hash)
    }
}

#[async_trait]
impl Tag for Skeleton {
    const NAME: &'static str = "Skeleton";
    const TYPE_TAG: u32 = SKELETON_TYPE;
    const SCHEMA: &'static Schema = &HEADER;

    async fn assemble(record: Record, _bytes: Bytes, _ctx: &ResolveContext<'_>) -> Result<Self> {
        let bones = record
            .array("bones")?
            .iter()
            .map(|bone| {
                Ok(Bone {
                    name: bone.string_hash("name")?,
                    parent: usize::try_from(bone.i32("parent")?).ok(),
                    rotation: bone.vec4("rotation")?,
                    translation: bone.vec3("translation")?,
                    scale: bone.f32("scale")?,
                })
            })
            .collect::<std::result::Result<Vec<_>, CursorError>>()?;

        Ok(Self {
            file_size: record.u64("file_size")?,
            bones,
        })
    }
}
