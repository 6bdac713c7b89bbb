//! `tiger stats`: package-set summary

use crate::output::{OutputStyle, count_cell};
use crate::{CommandContext, OutputFormat, StoreArgs, print_json};
use anyhow::Result;
use serde::Serialize;
use tiger_storage::PackageStore;

#[derive(Debug, Serialize)]
pub struct PackageRow {
    pub package_id: u16,
    pub patch_id: u16,
    pub entries: usize,
    pub hash64: u32,
    pub file_size: u64,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub packages: usize,
    pub entries: usize,
    pub hash64: usize,
    pub generation: u64,
    pub package_rows: Vec<PackageRow>,
}

pub fn collect(store: &PackageStore) -> StatsReport {
    let mut package_rows: Vec<PackageRow> = store
        .packages()
        .iter()
        .map(|info| PackageRow {
            package_id: info.header.package_id,
            patch_id: info.header.patch_id,
            entries: info.entries.len(),
            hash64: info.header.hash64_count,
            file_size: info.file_size,
            path: info.path.display().to_string(),
        })
        .collect();
    package_rows.sort_by_key(|row| row.package_id);

    StatsReport {
        packages: store.package_count(),
        entries: store.entry_count(),
        hash64: store.hash64_count(),
        generation: store.generation(),
        package_rows,
    }
}

pub async fn handle(store_args: &StoreArgs, ctx: &CommandContext) -> Result<()> {
    let store = store_args.open().await?;
    let report = collect(&store);
    if ctx.format != OutputFormat::Text {
        return print_json(&report, ctx.format);
    }

    let style = OutputStyle::from_context(ctx);
    println!("{}", style.field("Packages", report.packages));
    println!("{}", style.field("Entries", report.entries));
    println!("{}", style.field("Hash64 rows", report.hash64));

    let mut table = style.table(&["Package", "Patch", "Entries", "Hash64", "Size", "Path"]);
    for row in &report.package_rows {
        table.add_row(vec![
            style.hash_cell(&format!("{:#06x}", row.package_id)),
            count_cell(row.patch_id),
            count_cell(row.entries),
            count_cell(row.hash64),
            count_cell(row.file_size),
            comfy_table::Cell::new(&row.path),
        ]);
    }
    println!("{table}");
    Ok(())
}
