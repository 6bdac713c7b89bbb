//! Typed tag graph over Tiger package stores
//!
//! A tag is one package entry decoded into a domain value. [`TagGraph`]
//! resolves identifiers into shared `Arc` values, parses every hash at most
//! once per store generation, and resolves the references inside a tag
//! concurrently.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tiger_formats::TagHash;
//! use tiger_storage::{PackageStore, StoreConfig};
//! use tiger_tags::{Entity, TagGraph};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = PackageStore::open(StoreConfig::new("packages")).await?;
//! let graph = TagGraph::new(Arc::new(store));
//!
//! let tag: TagHash = "E5C9A780".parse()?;
//! if let Some(entity) = graph.resolve::<Entity>(tag).await? {
//!     println!("model: {}", entity.model.is_some());
//! }
//! # Ok(())
//! # }
//! ```

mod error;
pub mod graph;
pub mod registry;
mod tag;
pub mod types;

pub use error::{Result, TagError};
pub use graph::{GraphStats, ResolveContext, TagGraph};
pub use registry::{TagKind, TagRegistry, TypedTag};
pub use tag::Tag;
pub use types::{
    Bone, Control, ControlRig, Entity, EntityPart, Material, MeshPart, Model, PhysicsModel, ResourceRef,
    ShaderBytecode, Skeleton, Texture, TextureSlot,
};
