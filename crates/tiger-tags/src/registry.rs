//! Type-tag dispatch table

use crate::types::{
    ControlRig, Entity, Material, Model, PhysicsModel, ShaderBytecode, Skeleton, Texture,
};
use crate::Tag;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Domain types the graph knows how to build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Entity,
    Model,
    PhysicsModel,
    Skeleton,
    ControlRig,
    Material,
    Texture,
    ShaderBytecode,
}

impl TagKind {
    /// Every kind, in declaration order
    pub const ALL: [Self; 8] = [
        Self::Entity,
        Self::Model,
        Self::PhysicsModel,
        Self::Skeleton,
        Self::ControlRig,
        Self::Material,
        Self::Texture,
        Self::ShaderBytecode,
    ];

    /// Default type-tag of this kind
    pub const fn type_tag(self) -> u32 {
        match self {
            Self::Entity => Entity::TYPE_TAG,
            Self::Model => Model::TYPE_TAG,
            Self::PhysicsModel => PhysicsModel::TYPE_TAG,
            Self::Skeleton => Skeleton::TYPE_TAG,
            Self::ControlRig => ControlRig::TYPE_TAG,
            Self::Material => Material::TYPE_TAG,
            Self::Texture => Texture::TYPE_TAG,
            Self::ShaderBytecode => ShaderBytecode::TYPE_TAG,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Entity => Entity::NAME,
            Self::Model => Model::NAME,
            Self::PhysicsModel => PhysicsModel::NAME,
            Self::Skeleton => Skeleton::NAME,
            Self::ControlRig => ControlRig::NAME,
            Self::Material => Material::NAME,
            Self::Texture => Texture::NAME,
            Self::ShaderBytecode => ShaderBytecode::NAME,
        }
    }
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Maps type-tags to [`TagKind`]s.
///
/// The default table holds the built-in type-tags; [`TagRegistry::register`]
/// adds aliases, e.g. class hashes of other game builds.
#[derive(Debug, Clone)]
pub struct TagRegistry {
    kinds: HashMap<u32, TagKind>,
}

impl Default for TagRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        for kind in TagKind::ALL {
            registry.register(kind.type_tag(), kind);
        }
        registry
    }
}

impl TagRegistry {
    /// Registry with no entries; every type-tag is unknown
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    /// Map `type_tag` to `kind`, returning the previous mapping
    pub fn register(&mut self, type_tag: u32, kind: TagKind) -> Option<TagKind> {
        self.kinds.insert(type_tag, kind)
    }

    /// Kind registered for `type_tag`
    pub fn lookup(&self, type_tag: u32) -> Option<TagKind> {
        self.kinds.get(&type_tag).copied()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }
}

/// A resolved tag of any known kind
#[derive(Debug, Clone)]
pub enum TypedTag {
    Entity(Arc<Entity>),
    Model(Arc<Model>),
    PhysicsModel(Arc<PhysicsModel>),
    Skeleton(Arc<Skeleton>),
    ControlRig(Arc<ControlRig>),
    Material(Arc<Material>),
    Texture(Arc<Texture>),
    ShaderBytecode(Arc<ShaderBytecode>),
    /// Type-tag has no registered kind, or the entry failed to decode
    Unknown(u32),
    /// Identifier was absent
    Empty,
}

impl TypedTag {
    /// Kind of the resolved value, `None` for `Unknown` and `Empty`
    pub fn kind(&self) -> Option<TagKind> {
        Some(match self {
            Self::Entity(_) => TagKind::Entity,
            Self::Model(_) => TagKind::Model,
            Self::PhysicsModel(_) => TagKind::PhysicsModel,
            Self::Skeleton(_) => TagKind::Skeleton,
            Self::ControlRig(_) => TagKind::ControlRig,
            Self::Material(_) => TagKind::Material,
            Self::Texture(_) => TagKind::Texture,
            Self::ShaderBytecode(_) => TagKind::ShaderBytecode,
            Self::Unknown(_) | Self::Empty => return None,
        })
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}
