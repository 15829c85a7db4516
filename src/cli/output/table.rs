//! Table output formatting for CLI commands using comfy-table

use std::env;

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use crate::domain::models::{CatalogEntry, ToleranceFlag};

/// Table formatter for CLI output
pub struct TableFormatter {
    use_colors: bool,
}

impl Default for TableFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl TableFormatter {
    pub fn new() -> Self {
        Self {
            use_colors: supports_color(),
        }
    }

    pub const fn with_colors(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// Catalog entries; values are omitted when `with_values` is false
    pub fn format_catalog(&self, entries: &[CatalogEntry], with_values: bool) -> String {
        let mut table = Self::base_table();

        let mut header = vec![
            Cell::new("Noll").add_attribute(Attribute::Bold),
            Cell::new("Polynomial").add_attribute(Attribute::Bold),
        ];
        if with_values {
            header.push(Cell::new("Value / λ").add_attribute(Attribute::Bold));
        }
        table.set_header(header);

        for entry in entries {
            let mut name = Cell::new(entry.name);
            if entry.is_salient() {
                name = name.add_attribute(Attribute::Bold);
            }
            let mut row = vec![Cell::new(entry.order), name];

            if with_values {
                let mut value =
                    Cell::new(format!("{:.2}", entry.value)).set_alignment(CellAlignment::Right);
                if self.use_colors {
                    if let Some(color) = flag_color(entry.tolerance_flag) {
                        value = value.fg(color);
                    }
                }
                row.push(value);
            }
            table.add_row(row);
        }

        table.to_string()
    }

    fn base_table() -> Table {
        let mut table = Table::new();
        table
            .load_preset(presets::UTF8_FULL_CONDENSED)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table
    }
}

const fn flag_color(flag: ToleranceFlag) -> Option<Color> {
    match flag {
        ToleranceFlag::Within => Some(Color::Green),
        ToleranceFlag::Outside => Some(Color::Red),
        ToleranceFlag::Unclassified => None,
    }
}

/// Colors unless NO_COLOR is set
fn supports_color() -> bool {
    env::var_os("NO_COLOR").is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::ZernikeCatalog;

    #[test]
    fn test_catalog_table_lists_every_entry() {
        let catalog = ZernikeCatalog::initialize();
        let table = TableFormatter::with_colors(false).format_catalog(catalog.entries(), true);
        assert!(table.contains("Primary spherical"));
        assert!(table.contains("Oblique quadrafoil"));
        assert!(table.contains("0.00"));
    }

    #[test]
    fn test_catalog_without_values() {
        let catalog = ZernikeCatalog::initialize();
        let table = TableFormatter::with_colors(false).format_catalog(catalog.entries(), false);
        assert!(!table.contains("Value"));
    }
}
