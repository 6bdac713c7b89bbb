//! `tiger meta`: entry metadata lookup

use crate::output::OutputStyle;
use crate::{CommandContext, OutputFormat, StoreArgs, parse_content_id, print_json};
use anyhow::Result;
use serde::Serialize;
use tiger_storage::{EntryMetadata, PackageStore};
use tiger_tags::TagRegistry;

#[derive(Debug, Serialize)]
pub struct MetaReport {
    pub tag: String,
    pub package_id: u16,
    pub entry_index: u16,
    pub offset: u32,
    pub size: u32,
    pub type_tag: String,
    pub kind: Option<&'static str>,
    pub file_type: u8,
    pub file_subtype: u8,
    pub compressed: bool,
    pub redirect: Option<String>,
}

impl MetaReport {
    fn new(meta: &EntryMetadata, registry: &TagRegistry) -> Self {
        Self {
            tag: meta.tag_hash().to_string(),
            package_id: meta.package_id,
            entry_index: meta.entry_index,
            offset: meta.offset,
            size: meta.size,
            type_tag: format!("{:#010x}", meta.type_tag),
            kind: registry.lookup(meta.type_tag).map(|kind| kind.name()),
            file_type: meta.file_type,
            file_subtype: meta.file_subtype,
            compressed: meta.is_compressed(),
            redirect: meta
                .is_redirect()
                .then(|| meta.reference.to_string()),
        }
    }
}

/// Metadata of the entry `text` names
pub fn lookup(store: &PackageStore, text: &str, big_endian: bool) -> Result<MetaReport> {
    let id = parse_content_id(text, big_endian)?;
    let tag = store.canonicalize(id)?;
    let meta = store.metadata(tag)?;
    Ok(MetaReport::new(&meta, &TagRegistry::default()))
}

pub async fn handle(
    text: &str,
    big_endian: bool,
    store_args: &StoreArgs,
    ctx: &CommandContext,
) -> Result<()> {
    let store = store_args.open().await?;
    let report = lookup(&store, text, big_endian)?;
    if ctx.format != OutputFormat::Text {
        return print_json(&report, ctx.format);
    }

    let style = OutputStyle::from_context(ctx);
    let kind = report.kind.unwrap_or("unknown");
    for (key, value) in [
        ("Tag", report.tag.clone()),
        ("Package", format!("{:#06x}", report.package_id)),
        ("Entry", report.entry_index.to_string()),
        ("Offset", format!("{:#x}", report.offset)),
        ("Size", report.size.to_string()),
        ("Type", format!("{} ({kind})", report.type_tag)),
        (
            "File type",
            format!("{}/{}", report.file_type, report.file_subtype),
        ),
        ("Compressed", report.compressed.to_string()),
    ] {
        println!("{}", style.field(key, value));
    }
    if let Some(target) = &report.redirect {
        println!("{}", style.field("Redirects to", target));
    }
    Ok(())
}
