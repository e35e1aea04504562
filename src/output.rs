//! Output formatting utilities

use crate::comparison::{CellChange, ComparisonSummary};
use crate::error::Result;
use crate::table::Table;
use std::path::Path;

/// Cell changes listed in the pretty report before eliding the rest
const CHANGE_SAMPLE: usize = 5;

/// Pretty printer for tablebridge output
pub struct PrettyPrinter;

impl PrettyPrinter {
    /// Print comparison partitions and a sample of changed cells
    pub fn print_comparison(summary: &ComparisonSummary, changes: &[CellChange]) {
        println!(
            "🔍 Comparison on '{}' ({} new-table rows, {} old-table rows)",
            summary.id_column, summary.new_table_rows, summary.old_table_rows
        );
        println!("├─ New rows: {}", summary.new);
        println!("├─ Removed rows: {}", summary.removed);

        if summary.changed > 0 {
            println!("├─ ❌ Changed rows: {}", summary.changed);
            Self::print_cell_changes(changes, "│  ");
        } else {
            println!("├─ ✅ Changed rows: 0");
        }

        println!("└─ Unchanged rows: {}", summary.unchanged);
    }

    fn print_cell_changes(changes: &[CellChange], prefix: &str) {
        let shown = changes.len().min(CHANGE_SAMPLE);
        for (i, change) in changes.iter().take(shown).enumerate() {
            let is_last = i == shown - 1 && changes.len() <= CHANGE_SAMPLE;
            let marker = if is_last { "└─" } else { "├─" };
            println!(
                "{}{} {} {}: '{}' → '{}'",
                prefix, marker, change.id, change.column, change.old, change.new
            );
        }

        if changes.len() > CHANGE_SAMPLE {
            println!("{}└─ ... and {} more", prefix, changes.len() - CHANGE_SAMPLE);
        }
    }

    /// Print where a written table came from
    pub fn print_written(action: &str, input: &Path, output: &Path, table: &Table) {
        println!("✅ {} {} → {}", action, input.display(), output.display());
        println!("├─ Rows: {}", table.len());
        println!("└─ Columns: {}", table.column_names().join(", "));
    }
}

/// JSON formatter for machine-readable output
pub struct JsonFormatter;

impl JsonFormatter {
    /// Format any serializable data as JSON
    pub fn format<T: serde::Serialize + ?Sized>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }

    pub fn format_comparison(summary: &ComparisonSummary, changes: &[CellChange]) -> Result<String> {
        let json = serde_json::json!({
            "summary": summary,
            "cell_changes": changes,
        });
        Ok(serde_json::to_string_pretty(&json)?)
    }
}
