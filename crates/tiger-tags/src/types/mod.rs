//! Domain tag types
//!
//! Every type declares its header layout as a [`Schema`](tiger_formats::Schema)
//! and builds itself from the decoded record. Referenced tags are resolved
//! through the graph, so shared references point at one cached value.

mod control_rig;
mod entity;
mod material;
mod model;
mod shader;
mod skeleton;
mod texture;

pub use control_rig::{Control, ControlRig};
pub use entity::{Entity, EntityPart, ResourceRef};
pub use material::{Material, TextureSlot};
pub use model::{MeshPart, Model, PhysicsModel};
pub use shader::ShaderBytecode;
pub use skeleton::{Bone, Skeleton};
pub use texture::Texture;

/// Class hash of [`Entity`]
pub const ENTITY_TYPE: u32 = 0x8080_9AD8;

/// Class hash of [`Model`]
pub const MODEL_TYPE: u32 = 0x8080_6D8A;

/// Class hash of [`PhysicsModel`]
pub const PHYSICS_MODEL_TYPE: u32 = 0x8080_6D5B;

/// Class hash of [`Skeleton`]
pub const SKELETON_TYPE: u32 = 0x8080_81DD;

/// Class hash of [`ControlRig`]
pub const CONTROL_RIG_TYPE: u32 = 0x8080_8B66;

/// Class hash of [`Material`]
pub const MATERIAL_TYPE: u32 = 0x8080_6DAA;

/// Class hash of [`Texture`]
pub const TEXTURE_TYPE: u32 = 0x8080_6D44;

/// Class hash of [`ShaderBytecode`]
pub const SHADER_BYTECODE_TYPE: u32 = 0x8080_6D30;
