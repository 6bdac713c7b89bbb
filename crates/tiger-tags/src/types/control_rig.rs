use crate::graph::ResolveContext;
use crate::types::{CONTROL_RIG_TYPE, Skeleton};
use crate::{Result, Tag};
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;
use tiger_formats::{CursorError, Field, FieldType, Record, Schema, StringHash};

const CONTROL: Schema = Schema::new(
    "Control",
    &[
        Field::new("name", FieldType::StringHash),
        Field::new("bone", FieldType::I32),
    ],
);

const HEADER: Schema = Schema::new(
    "ControlRig",
    &[
        Field::new("file_size", FieldType::U64),
        Field::new("skeleton", FieldType::TagHash),
        Field::new("_pad", FieldType::Padding(4)),
        Field::new("controls", FieldType::Array(&CONTROL)),
    ],
);

/// Animation control bound to a bone
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Control {
    pub name: StringHash,
    /// Bone index in the rig's skeleton, `None` when unbound
    pub bone: Option<usize>,
}

#[derive(Debug)]
pub struct ControlRig {
    pub file_size: u64,
    pub skeleton: Option<Arc<Skeleton>>,
    pub controls: Vec<Control>,
}

impl ControlRig {
    /// Bone driven by the control named `name`
    pub fn bone_for(&self, name: &str) -> Option<usize> {
        let hash = StringHash::from_text(name);
        self.controls
            .iter()
            .find(|control| control.name == hash)
            .and_then(|control| control.bone)
    }
}

#[async_trait]
impl Tag for ControlRig {
    const NAME: &'static str = "ControlRig";
    const TYPE_TAG: u32 = CONTROL_RIG_TYPE;
    const SCHEMA: &'static Schema = &HEADER;

    async fn assemble(record: Record, _bytes: Bytes, ctx: &ResolveContext<'_>) -> Result<Self> {
        let controls = record
            .array("controls")?
            .iter()
            .map(|control| {
                Ok(Control {
                    name: control.string_hash("name")?,
                    bone: usize::try_from(control.i32("bone")?).ok(),
                })
            })
            .collect::<std::result::Result<Vec<_>, CursorError>>()?;

        Ok(Self {
            file_size: record.u64("file_size")?,
            skeleton: ctx
                .resolve_optional::<Skeleton>(record.tag_hash("skeleton")?)
                .await,
            controls,
        })
    }
}
