//! `tiger entity`: resolve an entity and print its resource graph

use crate::output::{OutputStyle, count_cell};
use crate::{CommandContext, OutputFormat, StoreArgs, parse_content_id, print_json};
use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tiger_formats::TagHash;
use tiger_tags::{Entity, Material, Model, TagGraph, TypedTag};

/// Bytes of shader byte-code shown in previews
const SHADER_PREVIEW_BYTES: usize = 16;

#[derive(Debug, Serialize)]
pub struct ResourceRow {
    pub index: usize,
    pub type_tag: String,
    pub kind: Option<&'static str>,
    pub hash: String,
    pub resolved: bool,
}

#[derive(Debug, Serialize)]
pub struct MaterialSummary {
    pub hash: String,
    pub resolved: bool,
    pub flags: Option<u32>,
    pub textures: usize,
    pub vertex_shader_bytes: Option<usize>,
    pub pixel_shader_preview: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ModelSummary {
    pub meshes: usize,
    pub indices: u64,
    pub materials: Vec<MaterialSummary>,
}

#[derive(Debug, Serialize)]
pub struct EntityReport {
    pub tag: String,
    pub file_size: u64,
    pub resources: Vec<ResourceRow>,
    pub model: Option<ModelSummary>,
    pub physics_meshes: Option<usize>,
    pub bones: Option<usize>,
    pub controls: Option<usize>,
    pub other: Vec<&'static str>,
    pub parses: u64,
}

fn material_summary(hash: TagHash, material: Option<&Arc<Material>>) -> MaterialSummary {
    MaterialSummary {
        hash: hash.to_string(),
        resolved: material.is_some(),
        flags: material.map(|material| material.flags),
        textures: material.map_or(0, |material| material.textures().count()),
        vertex_shader_bytes: material
            .and_then(|material| material.vertex_shader.as_ref())
            .map(|shader| shader.len()),
        pixel_shader_preview: material
            .and_then(|material| material.pixel_shader.as_ref())
            .map(|shader| {
                let end = shader.len().min(SHADER_PREVIEW_BYTES);
                hex::encode(&shader.data[..end])
            }),
    }
}

fn model_summary(model: &Model) -> ModelSummary {
    ModelSummary {
        meshes: model.meshes.len(),
        indices: model.index_count(),
        materials: model
            .material_hashes
            .iter()
            .zip(&model.materials)
            .map(|(&hash, material)| material_summary(hash, material.as_ref()))
            .collect(),
    }
}

/// Resolve the entity `text` names and summarize its graph
pub async fn build_report(graph: &TagGraph, text: &str, big_endian: bool) -> Result<EntityReport> {
    let id = parse_content_id(text, big_endian)?;
    let tag = graph.store().canonicalize(id)?;
    let entity: Arc<Entity> = graph
        .resolve::<Entity>(tag)
        .await?
        .with_context(|| format!("{text} is absent"))?;

    let mut resources = Vec::with_capacity(entity.resources.len());
    for (index, slot) in entity.resources.iter().enumerate() {
        let typed = graph.resolve_as(slot.type_tag, slot.resource).await;
        let resolved = matches!(&typed, Ok(value) if value.kind().is_some());
        resources.push(ResourceRow {
            index,
            type_tag: format!("{:#010x}", slot.type_tag),
            kind: graph
                .registry()
                .lookup(slot.type_tag)
                .map(|kind| kind.name()),
            hash: slot.resource.to_string(),
            resolved,
        });
    }

    Ok(EntityReport {
        tag: tag.to_string(),
        file_size: entity.file_size,
        resources,
        model: entity.model.as_deref().map(model_summary),
        physics_meshes: entity.physics_model.as_ref().map(|model| model.meshes.len()),
        bones: entity.skeleton.as_ref().map(|skeleton| skeleton.bones.len()),
        controls: entity.control_rig.as_ref().map(|rig| rig.controls.len()),
        other: entity
            .other
            .iter()
            .filter_map(TypedTag::kind)
            .map(|kind| kind.name())
            .collect(),
        parses: graph.stats().parses,
    })
}

pub async fn handle(
    text: &str,
    big_endian: bool,
    store_args: &StoreArgs,
    ctx: &CommandContext,
) -> Result<()> {
    let store = Arc::new(store_args.open().await?);
    let graph = TagGraph::new(store);
    let report = build_report(&graph, text, big_endian).await?;
    if ctx.format != OutputFormat::Text {
        return print_json(&report, ctx.format);
    }

    let style = OutputStyle::from_context(ctx);
    println!("{}", style.section(&format!("Entity {}", report.tag)));
    println!("{}", style.field("File size", report.file_size));

    let mut table = style.table(&["#", "Type", "Kind", "Hash", "Resolved"]);
    for row in &report.resources {
        table.add_row(vec![
            count_cell(row.index),
            style.hash_cell(&row.type_tag),
            style.kind_cell(row.kind),
            style.hash_cell(&row.hash),
            style.resolved_cell(row.resolved),
        ]);
    }
    println!("{table}");

    match &report.model {
        Some(model) => {
            println!("{}", style.section("Model"));
            println!(
                "{}",
                style.field(
                    "Meshes",
                    format!("{} ({} indices)", model.meshes, model.indices)
                )
            );
            for material in &model.materials {
                if !material.resolved {
                    println!(
                        "{}",
                        style.warning(&format!("Material {} unresolved", material.hash))
                    );
                    continue;
                }
                println!(
                    "{}",
                    style.field(
                        &format!("Material {}", material.hash),
                        format!(
                            "{} textures, ps {}",
                            material.textures,
                            material.pixel_shader_preview.as_deref().unwrap_or("-")
                        )
                    )
                );
            }
        }
        None => println!("{}", style.warning("No model")),
    }

    if let Some(bones) = report.bones {
        println!("{}", style.field("Bones", bones));
    }
    if let Some(controls) = report.controls {
        println!("{}", style.field("Controls", controls));
    }
    if let Some(meshes) = report.physics_meshes {
        println!("{}", style.field("Physics meshes", meshes));
    }
    if !report.other.is_empty() {
        println!("{}", style.field("Other", report.other.join(", ")));
    }
    Ok(())
}
