//! `tiger hash`: decode hash text without touching a package set

use crate::output::OutputStyle;
use crate::{CommandContext, OutputFormat, parse_content_id, print_json};
use anyhow::Result;
use serde::Serialize;
use tiger_formats::{ContentId, StringHash};

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HashReport {
    Local {
        raw: String,
        display: String,
        valid: bool,
        package_id: Option<u16>,
        entry_index: Option<u16>,
    },
    Global {
        raw: String,
        valid: bool,
    },
    String {
        text: String,
        hash: String,
    },
}

/// Describe `text` as a hash, or as a name to hash when `string` is set
pub fn describe(text: &str, big_endian: bool, string: bool) -> Result<HashReport> {
    if string {
        return Ok(HashReport::String {
            text: text.to_string(),
            hash: StringHash::from_text(text).to_string(),
        });
    }

    Ok(match parse_content_id(text, big_endian)? {
        ContentId::Local(hash) => {
            let decoded = hash.decode().ok();
            HashReport::Local {
                raw: format!("{:#010x}", hash.raw()),
                display: hash.to_string(),
                valid: hash.is_valid(),
                package_id: decoded.map(|(package, _)| package),
                entry_index: decoded.map(|(_, entry)| entry),
            }
        }
        ContentId::Global(hash) => HashReport::Global {
            raw: hash.to_string(),
            valid: hash.is_valid(),
        },
        ContentId::String(hash) => HashReport::String {
            text: text.to_string(),
            hash: hash.to_string(),
        },
    })
}

pub fn handle(text: &str, big_endian: bool, string: bool, ctx: &CommandContext) -> Result<()> {
    let report = describe(text, big_endian, string)?;
    if ctx.format != OutputFormat::Text {
        return print_json(&report, ctx.format);
    }

    let style = OutputStyle::from_context(ctx);
    match report {
        HashReport::Local {
            raw,
            display,
            valid,
            package_id,
            entry_index,
        } => {
            println!("{}", style.field("Raw", raw));
            println!("{}", style.field("Display", display));
            println!("{}", style.field("Valid", if valid { "yes" } else { "no" }));
            match (package_id, entry_index) {
                (Some(package), Some(entry)) => {
                    println!("{}", style.field("Package", format!("{package:#06x}")));
                    println!("{}", style.field("Entry", format!("{entry:#06x}")));
                }
                _ => println!("{}", style.warning("Absent hash")),
            }
        }
        HashReport::Global { raw, valid } => {
            println!("{}", style.field("Global", raw));
            if !valid {
                println!("{}", style.warning("Absent hash"));
            }
        }
        HashReport::String { text, hash } => {
            println!("{}", style.field("Text", text));
            println!("{}", style.field("Hash", hash));
        }
    }
    Ok(())
}
