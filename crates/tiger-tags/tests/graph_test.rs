//! Tag graph resolution over on-disk package sets

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use tempfile::TempDir;
use tiger_formats::package::PackageBuilder;
use tiger_formats::{ContentId, Field, FieldType, Record, Schema, StringHash, TagHash, TagHash64};
use tiger_tags::types::{
    CONTROL_RIG_TYPE, ENTITY_TYPE, MATERIAL_TYPE, MODEL_TYPE, PHYSICS_MODEL_TYPE,
    SHADER_BYTECODE_TYPE, SKELETON_TYPE, TEXTURE_TYPE,
};
use tiger_tags::{
    Entity, Material, Model, ResolveContext, Tag, TagError, TagGraph, TagKind, TagRegistry,
    Texture, TypedTag,
};

use common::{TagWriter, control_rig, entity, material, model, open, skeleton, texture, write};

const UNKNOWN_TYPE: u32 = 0x8080_FFFF;
const TEXTURE_HASH64: u64 = 0xABCD_0000_0000_0042;

struct World {
    dir: TempDir,
    entity: TagHash,
    model: TagHash,
    skeleton: TagHash,
    rig: TagHash,
    material: TagHash,
    vertex_shader: TagHash,
    pixel_shader: TagHash,
    texture: TagHash,
}

/// Leaves in package 0x10, the entity and its direct resources in 0x11
fn world() -> World {
    let dir = TempDir::new().unwrap();

    let mut leaves = PackageBuilder::new(0x10);
    let vertex_shader = leaves
        .add_entry(SHADER_BYTECODE_TYPE, b"DXBC vertex".to_vec())
        .unwrap();
    let pixel_shader = leaves
        .add_entry(SHADER_BYTECODE_TYPE, b"DXBC pixel".to_vec())
        .unwrap();
    let texture_hash = leaves.add_entry(TEXTURE_TYPE, texture(256, 128)).unwrap();
    let material_hash = leaves
        .add_entry(
            MATERIAL_TYPE,
            material(vertex_shader, pixel_shader, &[(0, texture_hash), (1, TagHash::NONE)]),
        )
        .unwrap();
    let skeleton_hash = leaves
        .add_entry(SKELETON_TYPE, skeleton(&[("root", -1), ("spine", 0), ("head", 1)]))
        .unwrap();
    leaves.add_hash64(TEXTURE_HASH64, texture_hash);
    write(dir.path(), "w64_leaves_0010_0.pkg", &leaves);

    let mut main = PackageBuilder::new(0x11);
    let rig = main
        .add_entry(
            CONTROL_RIG_TYPE,
            control_rig(skeleton_hash, &[("look_at", 2), ("unbound", -1)]),
        )
        .unwrap();
    let model_hash = main
        .add_entry(MODEL_TYPE, model(&[material_hash, TagHash::NONE]))
        .unwrap();
    let unknown = main.add_entry(UNKNOWN_TYPE, vec![0xEE; 16]).unwrap();
    let entity_hash = main
        .add_entry(
            ENTITY_TYPE,
            entity(&[
                (MODEL_TYPE, model_hash),
                (SKELETON_TYPE, skeleton_hash),
                (CONTROL_RIG_TYPE, rig),
                (UNKNOWN_TYPE, unknown),
                (MODEL_TYPE, TagHash::NONE),
            ]),
        )
        .unwrap();
    write(dir.path(), "w64_main_0011_0.pkg", &main);

    World {
        dir,
        entity: entity_hash,
        model: model_hash,
        skeleton: skeleton_hash,
        rig,
        material: material_hash,
        vertex_shader,
        pixel_shader,
        texture: texture_hash,
    }
}

async fn graph(dir: &TempDir) -> TagGraph {
    TagGraph::new(Arc::new(open(dir.path()).await))
}

#[tokio::test]
async fn test_entity_end_to_end() {
    let w = world();
    let graph = graph(&w.dir).await;

    let entity = graph.resolve::<Entity>(w.entity).await.unwrap().unwrap();

    assert_eq!(entity.resources.len(), 5);
    assert_eq!(entity.resources[0].resource, w.model);
    assert!(entity.physics_model.is_none());
    assert!(entity.other.is_empty());
    assert_eq!(entity.resolved_count(), 3);

    let model = entity.model.as_ref().unwrap();
    assert_eq!(model.meshes.len(), 2);
    assert_eq!(model.lod_meshes(0).count(), 1);
    assert_eq!(model.index_count(), 48);
    assert_eq!(model.material_hashes, vec![w.material, TagHash::NONE]);
    assert!(model.materials[1].is_none());

    let material = model.materials[0].as_ref().unwrap();
    assert_eq!(material.flags, 0x11);
    assert_eq!(
        &material.vertex_shader.as_ref().unwrap().data[..],
        b"DXBC vertex"
    );
    assert_eq!(
        &material.pixel_shader.as_ref().unwrap().data[..],
        b"DXBC pixel"
    );
    assert!(material.vs_textures.is_empty());
    assert_eq!(material.ps_textures.len(), 2);
    assert_eq!(material.ps_textures[0].hash, w.texture);
    assert!(material.ps_textures[1].texture.is_none());
    let texture = material.textures().next().unwrap();
    assert_eq!((texture.width, texture.height), (256, 128));
    assert!(!texture.has_large_buffer());

    let skeleton = entity.skeleton.as_ref().unwrap();
    assert_eq!(skeleton.bones.len(), 3);
    assert_eq!(skeleton.roots().collect::<Vec<_>>(), vec![0]);
    assert_eq!(skeleton.find("head"), Some(2));
    assert_eq!(skeleton.bones[2].parent, Some(1));

    let rig = entity.control_rig.as_ref().unwrap();
    assert!(Arc::ptr_eq(rig.skeleton.as_ref().unwrap(), skeleton));
    assert_eq!(rig.bone_for("look_at"), Some(2));
    assert_eq!(rig.bone_for("unbound"), None);
    assert_eq!(rig.controls[0].name, StringHash::from_text("look_at"));

    // entity, model, skeleton, rig, material, two shaders, texture
    let stats = graph.stats();
    assert_eq!(stats.parses, 8);
    assert_eq!(stats.cached, 8);
    assert_eq!(graph.store().stats().file_reads, 8);
}

#[tokio::test]
async fn test_entity_with_model_and_unknown_fetches_twice() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x12);
    let model_hash = builder.add_entry(MODEL_TYPE, model(&[])).unwrap();
    let unknown = builder.add_entry(UNKNOWN_TYPE, vec![0; 8]).unwrap();
    let entity_hash = builder
        .add_entry(
            ENTITY_TYPE,
            entity(&[(MODEL_TYPE, model_hash), (UNKNOWN_TYPE, unknown)]),
        )
        .unwrap();
    write(dir.path(), "w64_pair_0012_0.pkg", &builder);

    let graph = graph(&dir).await;
    let entity = graph.resolve::<Entity>(entity_hash).await.unwrap().unwrap();

    assert!(entity.model.is_some());
    assert!(entity.other.is_empty());
    assert_eq!(entity.resources.len(), 2);
    assert_eq!(graph.store().stats().file_reads, 2);
    assert_eq!(graph.stats().parses, 2);
}

#[tokio::test]
async fn test_second_resolve_is_shared() {
    let w = world();
    let graph = graph(&w.dir).await;

    let first = graph.resolve::<Entity>(w.entity).await.unwrap().unwrap();
    let second = graph.resolve::<Entity>(w.entity).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let model = graph.resolve::<Model>(w.model).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(first.model.as_ref().unwrap(), &model));

    let stats = graph.stats();
    assert_eq!(stats.parses, 8);
    // second entity, the model, and the skeleton shared with the rig
    assert_eq!(stats.hits, 3);
    assert_eq!(graph.store().stats().file_reads, 8);
}

#[tokio::test]
async fn test_concurrent_resolves_parse_once() {
    let w = world();
    let graph = Arc::new(graph(&w.dir).await);

    let tasks = (0..16).map(|_| {
        let graph = graph.clone();
        let tag = w.entity;
        tokio::spawn(async move { graph.resolve::<Entity>(tag).await.unwrap().unwrap() })
    });
    let entities: Vec<Arc<Entity>> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    for entity in &entities[1..] {
        assert!(Arc::ptr_eq(&entities[0], entity));
    }
    // 15 waits on the entity plus the skeleton shared with the rig
    assert_eq!(graph.stats().parses, 8);
    assert_eq!(graph.stats().hits, 16);
    assert_eq!(graph.store().stats().file_reads, 8);
}

#[tokio::test]
async fn test_absent_and_invalid_identifiers() {
    let w = world();
    let graph = graph(&w.dir).await;

    assert!(graph.resolve::<Entity>(TagHash::NONE).await.unwrap().is_none());
    assert!(
        graph
            .resolve::<Entity>(TagHash64::NONE)
            .await
            .unwrap()
            .is_none()
    );
    assert!(graph.resolve_typed(TagHash::NONE).await.unwrap().is_empty());
    assert!(
        graph
            .resolve_as(ENTITY_TYPE, TagHash::NONE)
            .await
            .unwrap()
            .is_empty()
    );

    assert!(graph.resolve::<Texture>(TagHash(0)).await.unwrap().is_none());
    assert!(matches!(
        graph.resolve::<Texture>(StringHash::from_text("name")).await,
        Err(TagError::InvalidIdentifier(_))
    ));

    let missing = TagHash::encode(0x10, 0x100).unwrap();
    let err = graph.resolve::<Texture>(missing).await.unwrap_err();
    assert!(matches!(err, TagError::NotFound(_)));
    assert!(err.is_absent());
    assert!(graph.resolve_optional::<Texture>(missing).await.is_none());

    assert_eq!(graph.stats().cached, 0);
    assert_eq!(graph.store().stats().file_reads, 0);
}

#[tokio::test]
async fn test_global_hash_resolves_through_table() {
    let w = world();
    let graph = graph(&w.dir).await;

    let by_global = graph
        .resolve::<Texture>(TagHash64(TEXTURE_HASH64))
        .await
        .unwrap()
        .unwrap();
    let by_local = graph.resolve::<Texture>(w.texture).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(&by_global, &by_local));
    assert_eq!(graph.stats().parses, 1);

    assert!(matches!(
        graph.resolve::<Texture>(TagHash64(0x1234)).await,
        Err(TagError::NotFound(ContentId::Global(_)))
    ));
}

#[tokio::test]
async fn test_type_mismatch() {
    let w = world();
    let graph = graph(&w.dir).await;

    let err = graph.resolve::<Model>(w.texture).await.unwrap_err();
    assert!(matches!(
        err,
        TagError::TypeMismatch {
            expected: "Model",
            ..
        }
    ));
    assert_eq!(graph.store().stats().file_reads, 0);

    // the failed attempt leaves nothing behind
    let texture = graph.resolve::<Texture>(w.texture).await.unwrap();
    assert!(texture.is_some());
    assert_eq!(graph.stats().cached, 1);
}

#[tokio::test]
async fn test_typed_dispatch() {
    let w = world();
    let graph = graph(&w.dir).await;

    let typed = graph.resolve_typed(w.skeleton).await.unwrap();
    assert_eq!(typed.kind(), Some(TagKind::Skeleton));

    match graph.resolve_as(TEXTURE_TYPE, w.texture).await.unwrap() {
        TypedTag::Texture(texture) => assert_eq!(texture.width, 256),
        other => panic!("unexpected {other:?}"),
    }

    for shader in [w.vertex_shader, w.pixel_shader] {
        let typed = graph.resolve_typed(shader).await.unwrap();
        assert_eq!(typed.kind(), Some(TagKind::ShaderBytecode));
    }

    let rig = graph.resolve_typed(w.rig).await.unwrap();
    assert_eq!(rig.kind(), Some(TagKind::ControlRig));
}

#[tokio::test]
async fn test_unknown_type_tag_is_not_fetched() {
    let w = world();
    let graph = graph(&w.dir).await;

    let typed = graph.resolve_as(UNKNOWN_TYPE, w.texture).await.unwrap();
    assert!(matches!(typed, TypedTag::Unknown(UNKNOWN_TYPE)));
    assert_eq!(graph.store().stats().file_reads, 0);
    assert_eq!(graph.stats().parses, 0);
}

#[tokio::test]
async fn test_reload_starts_fresh_generation() {
    let w = world();
    let graph = graph(&w.dir).await;

    let before = graph.resolve::<Texture>(w.texture).await.unwrap().unwrap();
    graph.store().reload().await.unwrap();
    let after = graph.resolve::<Texture>(w.texture).await.unwrap().unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert_eq!(*before, *after);
    assert_eq!(graph.stats().parses, 2);
    assert_eq!(graph.stats().cached, 1);
}

#[tokio::test]
async fn test_clear_reparses_from_byte_cache() {
    let w = world();
    let graph = graph(&w.dir).await;

    graph.resolve::<Material>(w.material).await.unwrap().unwrap();
    let reads = graph.store().stats().file_reads;
    assert_eq!(graph.stats().cached, 4);

    graph.clear();
    assert_eq!(graph.stats().cached, 0);

    graph.resolve::<Material>(w.material).await.unwrap().unwrap();
    assert_eq!(graph.stats().parses, 8);
    assert_eq!(graph.store().stats().file_reads, reads);
}

#[tokio::test]
async fn test_malformed_sibling_does_not_abort_parent() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x20);
    let good = builder
        .add_entry(
            MATERIAL_TYPE,
            material(TagHash::NONE, TagHash::NONE, &[]),
        )
        .unwrap();
    let truncated = builder.add_entry(MATERIAL_TYPE, vec![0; 6]).unwrap();
    let model_hash = builder
        .add_entry(MODEL_TYPE, model(&[truncated, good]))
        .unwrap();
    write(dir.path(), "w64_broken_0020_0.pkg", &builder);

    let graph = graph(&dir).await;
    let model = graph.resolve::<Model>(model_hash).await.unwrap().unwrap();
    assert!(model.materials[0].is_none());
    assert!(model.materials[1].is_some());

    assert!(matches!(
        graph.resolve::<Material>(truncated).await,
        Err(TagError::Decode(_))
    ));
}

#[tokio::test]
async fn test_malformed_entity_resource_reads_as_unknown() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x21);
    let broken = builder.add_entry(MODEL_TYPE, vec![0xFF; 12]).unwrap();
    let bones = builder
        .add_entry(SKELETON_TYPE, skeleton(&[("root", -1)]))
        .unwrap();
    let entity_hash = builder
        .add_entry(
            ENTITY_TYPE,
            entity(&[(MODEL_TYPE, broken), (SKELETON_TYPE, bones)]),
        )
        .unwrap();
    write(dir.path(), "w64_entity_0021_0.pkg", &builder);

    let graph = graph(&dir).await;
    let entity = graph.resolve::<Entity>(entity_hash).await.unwrap().unwrap();
    assert!(entity.model.is_none());
    assert_eq!(entity.skeleton.as_ref().unwrap().bones.len(), 1);

    let direct = graph.resolve_as(MODEL_TYPE, broken).await;
    assert!(matches!(direct, Err(TagError::Decode(_))));
}

#[tokio::test]
async fn test_entity_parts_per_lod() {
    let w = world();
    let mut builder = PackageBuilder::new(0x22);
    let physics = builder
        .add_entry(PHYSICS_MODEL_TYPE, model(&[TagHash::NONE]))
        .unwrap();
    let entity_hash = builder
        .add_entry(
            ENTITY_TYPE,
            entity(&[(MODEL_TYPE, w.model), (PHYSICS_MODEL_TYPE, physics)]),
        )
        .unwrap();
    write(w.dir.path(), "w64_parts_0022_0.pkg", &builder);

    let graph = graph(&w.dir).await;
    let entity = graph.resolve::<Entity>(entity_hash).await.unwrap().unwrap();

    let parts = entity.parts(0);
    assert_eq!(parts.len(), 2);
    assert!(parts[0].physics);
    assert!(parts[0].material.is_none());
    assert!(!parts[1].physics);
    assert_eq!(parts[1].mesh.index_count, 36);
    let material = parts[1].material.as_ref().unwrap();
    assert!(Arc::ptr_eq(
        material,
        entity.model.as_ref().unwrap().materials[0].as_ref().unwrap()
    ));

    // the second mesh has no material at its index
    let parts = entity.parts(1);
    assert_eq!(parts.len(), 2);
    assert!(parts.iter().all(|part| part.material.is_none()));
    assert!(entity.parts(2).is_empty());
}

#[tokio::test]
async fn test_later_resource_takes_the_slot() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x23);
    let first = builder
        .add_entry(SKELETON_TYPE, skeleton(&[("root", -1)]))
        .unwrap();
    let second = builder
        .add_entry(SKELETON_TYPE, skeleton(&[("root", -1), ("tail", 0)]))
        .unwrap();
    let entity_hash = builder
        .add_entry(
            ENTITY_TYPE,
            entity(&[(SKELETON_TYPE, first), (SKELETON_TYPE, second)]),
        )
        .unwrap();
    write(dir.path(), "w64_slots_0023_0.pkg", &builder);

    let graph = graph(&dir).await;
    let entity = graph.resolve::<Entity>(entity_hash).await.unwrap().unwrap();

    assert_eq!(entity.skeleton.as_ref().unwrap().bones.len(), 2);
    assert_eq!(entity.other.len(), 1);
    assert_eq!(entity.other[0].kind(), Some(TagKind::Skeleton));
    assert_eq!(entity.resolved_count(), 2);
}

#[tokio::test]
async fn test_registered_alias_dispatches() {
    const MODEL_ALIAS: u32 = 0x8080_1234;

    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x24);
    let aliased = builder.add_entry(MODEL_ALIAS, model(&[])).unwrap();
    let entity_hash = builder
        .add_entry(ENTITY_TYPE, entity(&[(MODEL_ALIAS, aliased)]))
        .unwrap();
    write(dir.path(), "w64_alias_0024_0.pkg", &builder);

    let store = Arc::new(open(dir.path()).await);
    let mut registry = TagRegistry::default();
    registry.register(MODEL_ALIAS, TagKind::Model);
    let graph = TagGraph::with_registry(store.clone(), registry);

    let typed = graph.resolve_typed(aliased).await.unwrap();
    assert_eq!(typed.kind(), Some(TagKind::Model));
    let model = graph.resolve::<Model>(aliased).await.unwrap().unwrap();
    assert_eq!(model.meshes.len(), 2);

    let entity = graph.resolve::<Entity>(entity_hash).await.unwrap().unwrap();
    assert!(Arc::ptr_eq(entity.model.as_ref().unwrap(), &model));

    // the alias maps to Model only
    assert!(matches!(
        graph.resolve::<Texture>(aliased).await,
        Err(TagError::TypeMismatch { .. })
    ));

    // without the alias the entry stays unknown
    let plain = TagGraph::new(store);
    assert!(matches!(
        plain.resolve_typed(aliased).await.unwrap(),
        TypedTag::Unknown(MODEL_ALIAS)
    ));
}

#[tokio::test]
async fn test_sibling_cycle_resolves() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x33);
    let a = TagHash::encode(0x33, 0).unwrap();
    let b = TagHash::encode(0x33, 1).unwrap();
    builder
        .add_entry(ENTITY_TYPE, entity(&[(ENTITY_TYPE, b)]))
        .unwrap();
    builder
        .add_entry(ENTITY_TYPE, entity(&[(ENTITY_TYPE, a)]))
        .unwrap();
    let root = builder
        .add_entry(ENTITY_TYPE, entity(&[(ENTITY_TYPE, a), (ENTITY_TYPE, b)]))
        .unwrap();
    write(dir.path(), "w64_loop_0033_0.pkg", &builder);

    let graph = graph(&dir).await;
    let entity = tokio::time::timeout(Duration::from_secs(5), graph.resolve::<Entity>(root))
        .await
        .expect("sibling loop must not deadlock")
        .unwrap()
        .unwrap();
    assert_eq!(entity.other.len(), 2);

    // exactly one side of the loop was cut
    let nested: usize = entity
        .other
        .iter()
        .map(|value| match value {
            TypedTag::Entity(child) => child.other.len(),
            other => panic!("unexpected {other:?}"),
        })
        .sum();
    assert_eq!(nested, 1);
    assert_eq!(graph.stats().cached, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_cross_task_cycle_resolves() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x34);
    let a = TagHash::encode(0x34, 0).unwrap();
    let b = TagHash::encode(0x34, 1).unwrap();
    builder
        .add_entry(ENTITY_TYPE, entity(&[(ENTITY_TYPE, b)]))
        .unwrap();
    builder
        .add_entry(ENTITY_TYPE, entity(&[(ENTITY_TYPE, a)]))
        .unwrap();
    write(dir.path(), "w64_tasks_0034_0.pkg", &builder);

    let graph = Arc::new(graph(&dir).await);
    let tasks: Vec<_> = [a, b, a, b]
        .into_iter()
        .map(|tag| {
            let graph = graph.clone();
            tokio::spawn(async move { graph.resolve::<Entity>(tag).await })
        })
        .collect();

    let results = tokio::time::timeout(Duration::from_secs(5), join_all(tasks))
        .await
        .expect("loop across tasks must not deadlock");
    for result in results {
        assert!(result.unwrap().unwrap().is_some());
    }
}

/// Test-only tag that references another node
#[derive(Debug)]
struct Node {
    next: Option<Arc<Node>>,
}

const NODE_TYPE: u32 = 0x8080_1111;

const NODE: Schema = Schema::new("Node", &[Field::new("next", FieldType::TagHash)]);

#[async_trait]
impl Tag for Node {
    const NAME: &'static str = "Node";
    const TYPE_TAG: u32 = NODE_TYPE;
    const SCHEMA: &'static Schema = &NODE;

    async fn assemble(
        record: Record,
        _bytes: Bytes,
        ctx: &ResolveContext<'_>,
    ) -> tiger_tags::Result<Self> {
        Ok(Self {
            next: ctx.resolve::<Node>(record.tag_hash("next")?).await?,
        })
    }
}

#[tokio::test]
async fn test_reference_cycle_is_reported() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x30);
    let first = builder.next_hash().unwrap();
    let second = TagHash::encode(0x30, 1).unwrap();
    builder
        .add_entry(NODE_TYPE, TagWriter::new().tag(second).finish())
        .unwrap();
    builder
        .add_entry(NODE_TYPE, TagWriter::new().tag(first).finish())
        .unwrap();
    let tail = builder
        .add_entry(NODE_TYPE, TagWriter::new().tag(TagHash::NONE).finish())
        .unwrap();
    let head = builder
        .add_entry(NODE_TYPE, TagWriter::new().tag(tail).finish())
        .unwrap();
    write(dir.path(), "w64_nodes_0030_0.pkg", &builder);

    let graph = graph(&dir).await;
    let result = tokio::time::timeout(Duration::from_secs(5), graph.resolve::<Node>(first))
        .await
        .expect("cycle must not deadlock");
    assert!(matches!(result, Err(TagError::Cycle(tag)) if tag == first));
    assert_eq!(graph.stats().cached, 0);

    let chain = graph.resolve::<Node>(head).await.unwrap().unwrap();
    assert!(chain.next.as_ref().unwrap().next.is_none());
}

#[tokio::test]
async fn test_self_referencing_entity_resolves() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x31);
    let own = builder.next_hash().unwrap();
    builder
        .add_entry(ENTITY_TYPE, entity(&[(ENTITY_TYPE, own)]))
        .unwrap();
    write(dir.path(), "w64_self_0031_0.pkg", &builder);

    let graph = graph(&dir).await;
    let entity = tokio::time::timeout(Duration::from_secs(5), graph.resolve::<Entity>(own))
        .await
        .expect("self reference must not deadlock")
        .unwrap()
        .unwrap();
    assert_eq!(entity.resolved_count(), 0);
    assert_eq!(entity.resources.len(), 1);
}

static SLOW_BLOCKED: AtomicBool = AtomicBool::new(true);

/// Test-only tag whose assembly stalls while `SLOW_BLOCKED` is set
#[derive(Debug)]
struct Slow;

const SLOW: Schema = Schema::new("Slow", &[]);

#[async_trait]
impl Tag for Slow {
    const NAME: &'static str = "Slow";
    const TYPE_TAG: u32 = 0x8080_2222;
    const SCHEMA: &'static Schema = &SLOW;

    async fn assemble(
        _record: Record,
        _bytes: Bytes,
        _ctx: &ResolveContext<'_>,
    ) -> tiger_tags::Result<Self> {
        if SLOW_BLOCKED.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        Ok(Self)
    }
}

#[tokio::test]
async fn test_cancelled_resolve_leaves_no_value() {
    let dir = TempDir::new().unwrap();
    let mut builder = PackageBuilder::new(0x32);
    let tag = builder.add_entry(Slow::TYPE_TAG, vec![1, 2, 3]).unwrap();
    write(dir.path(), "w64_slow_0032_0.pkg", &builder);

    let graph = graph(&dir).await;
    let cancelled =
        tokio::time::timeout(Duration::from_millis(50), graph.resolve::<Slow>(tag)).await;
    assert!(cancelled.is_err());
    assert_eq!(graph.stats().cached, 0);
    assert_eq!(graph.stats().parses, 0);

    SLOW_BLOCKED.store(false, Ordering::SeqCst);
    assert!(graph.resolve::<Slow>(tag).await.unwrap().is_some());
    assert_eq!(graph.stats().parses, 1);
    assert_eq!(graph.stats().cached, 1);
}
