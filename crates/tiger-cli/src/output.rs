//! Terminal presentation for the text output format

use crate::CommandContext;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table, presets};
use owo_colors::OwoColorize;

/// Widest table the text format renders
const TABLE_WIDTH: u16 = 120;

/// Color decision for one command run
#[derive(Debug, Clone, Copy)]
pub struct OutputStyle {
    pub use_color: bool,
}

impl OutputStyle {
    /// Colors unless `--no-color` was passed or `NO_COLOR` is set
    pub fn from_context(ctx: &CommandContext) -> Self {
        Self {
            use_color: !ctx.no_color && std::env::var_os("NO_COLOR").is_none(),
        }
    }

    pub const fn plain() -> Self {
        Self { use_color: false }
    }

    /// `key: value` line
    pub fn field(&self, key: &str, value: impl std::fmt::Display) -> String {
        if self.use_color {
            format!("{}: {value}", key.cyan())
        } else {
            format!("{key}: {value}")
        }
    }

    pub fn warning(&self, text: &str) -> String {
        if self.use_color {
            text.yellow().to_string()
        } else {
            text.to_string()
        }
    }

    /// Underlined section title, preceded by a blank line
    pub fn section(&self, title: &str) -> String {
        let rule = "=".repeat(title.len());
        if self.use_color {
            format!("\n{}\n{}", title.bold().bright_blue(), rule.bright_blue())
        } else {
            format!("\n{title}\n{rule}")
        }
    }

    /// Table with bold headers; ASCII borders without color
    pub fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        if self.use_color {
            table
                .load_preset(presets::UTF8_FULL)
                .apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
        } else {
            table.load_preset(presets::ASCII_FULL);
        }
        table
            .set_content_arrangement(ContentArrangement::Dynamic)
            .set_width(TABLE_WIDTH)
            .set_header(headers.iter().map(|header| {
                let cell = Cell::new(header).add_attribute(Attribute::Bold);
                if self.use_color { cell.fg(Color::Cyan) } else { cell }
            }));
        table
    }

    /// Hash or type-tag, dimmed
    pub fn hash_cell(&self, text: &str) -> Cell {
        self.tint(Cell::new(text), Color::Grey)
    }

    /// Tag kind name, `unknown` when the type-tag is not registered
    pub fn kind_cell(&self, kind: Option<&str>) -> Cell {
        match kind {
            Some(kind) => Cell::new(kind),
            None => self.tint(Cell::new("unknown"), Color::DarkGrey),
        }
    }

    pub fn resolved_cell(&self, resolved: bool) -> Cell {
        if resolved {
            self.tint(Cell::new("OK"), Color::Green)
        } else {
            self.tint(Cell::new("-"), Color::Yellow)
        }
    }

    fn tint(&self, cell: Cell, color: Color) -> Cell {
        if self.use_color { cell.fg(color) } else { cell }
    }
}

/// Right-aligned number
pub fn count_cell(value: impl ToString) -> Cell {
    Cell::new(value.to_string()).set_alignment(CellAlignment::Right)
}
