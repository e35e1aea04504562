//! File sources and sinks using DuckDB

use crate::error::{Result, TablebridgeError};
use crate::table::Table;
use crate::validation::{process_records, ValidationMap};
use crate::value::Value;
use duckdb::types::ValueRef;
use duckdb::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How to read a source file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceOptions {
    /// Explicit column names. For delimited files these replace the header
    /// names; for other formats they select and order columns.
    pub columns: Option<Vec<String>>,
    /// Whether delimited files start with a header row
    pub header: bool,
    /// Leading lines of a delimited file to skip before the header
    pub skip_rows: usize,
    pub validation: ValidationMap,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            columns: None,
            header: true,
            skip_rows: 0,
            validation: ValidationMap::new(),
        }
    }
}

/// Loader backed by an in-memory DuckDB connection
pub struct DataProcessor {
    connection: Connection,
}

impl DataProcessor {
    pub fn new() -> Result<Self> {
        let connection = Connection::open_in_memory()?;
        connection.execute("SET enable_progress_bar=false", [])?;
        Ok(Self { connection })
    }

    /// Check if file format is supported
    pub fn is_supported_format(file_path: &Path) -> bool {
        matches!(
            extension(file_path).as_deref(),
            Some("csv" | "tsv" | "json" | "jsonl" | "parquet")
        )
    }

    /// Load a file into a table, applying the validation map to every cell.
    ///
    /// Delimited files are read as raw text so validators see the cells as
    /// written; JSON and Parquet keep their native types.
    pub fn load_table(&self, file_path: &Path, options: &SourceOptions) -> Result<Table> {
        if !file_path.is_file() {
            return Err(TablebridgeError::invalid_input(format!(
                "File not found: {}",
                file_path.display()
            )));
        }
        if !Self::is_supported_format(file_path) {
            return Err(TablebridgeError::invalid_input(format!(
                "Unsupported file format: {}",
                file_path.display()
            )));
        }

        let delimited = is_delimited(file_path);
        let create_view_sql = format!(
            "CREATE OR REPLACE VIEW data_view AS SELECT * FROM {}",
            source_sql(file_path, options)
        );
        self.connection
            .execute(&create_view_sql, [])
            .map_err(|e| convert_duckdb_error(e, file_path))?;

        let columns = self.column_names()?;
        for column in options.validation.keys() {
            if !columns.contains(column) {
                log::warn!(
                    "Validator for '{}' ignored: no such column in {}",
                    column,
                    file_path.display()
                );
            }
        }

        let rows = self.extract_rows(columns.len())?;
        let mut table = process_records(rows, &columns, &options.validation)?;

        if !delimited {
            if let Some(wanted) = &options.columns {
                table = table.select(wanted)?;
            }
        }

        log::debug!(
            "Loaded {} rows x {} columns from {}",
            table.len(),
            table.width(),
            file_path.display()
        );
        Ok(table)
    }

    /// Column names of the current view, in file order
    fn column_names(&self) -> Result<Vec<String>> {
        let mut stmt = self.connection.prepare("DESCRIBE data_view")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut columns = Vec::new();
        for row in rows {
            columns.push(row?);
        }
        Ok(columns)
    }

    fn extract_rows(&self, column_count: usize) -> Result<Vec<Vec<Value>>> {
        if column_count == 0 {
            return Ok(Vec::new());
        }

        let mut stmt = self.connection.prepare("SELECT * FROM data_view")?;
        let rows = stmt.query_map([], |row| {
            let mut values = Vec::with_capacity(column_count);
            for i in 0..column_count {
                values.push(cell_value(row.get_ref(i)?));
            }
            Ok(values)
        })?;

        let mut data = Vec::new();
        for row in rows {
            data.push(row?);
        }
        Ok(data)
    }
}

/// Write a table as JSON records (`.json`) or delimited text (anything else)
pub fn write_table(table: &Table, file_path: &Path) -> Result<()> {
    let content = match extension(file_path).as_deref() {
        Some("json") => serde_json::to_string_pretty(table)?,
        Some("tsv") => delimited_content(table, '\t'),
        _ => delimited_content(table, ','),
    };
    std::fs::write(file_path, content)?;
    log::debug!("Wrote {} rows to {}", table.len(), file_path.display());
    Ok(())
}

/// Delimited text with a header row. Missing cells are empty.
pub fn delimited_content(table: &Table, delimiter: char) -> String {
    let mut content = String::new();

    let headers: Vec<String> = table.columns().map(|c| escape_field(c, delimiter)).collect();
    content.push_str(&headers.join(&delimiter.to_string()));
    content.push('\n');

    for row in table.rows() {
        let fields: Vec<String> = row
            .values()
            .iter()
            .map(|value| escape_field(&value.to_string(), delimiter))
            .collect();
        content.push_str(&fields.join(&delimiter.to_string()));
        content.push('\n');
    }

    content
}

fn escape_field(value: &str, delimiter: char) -> String {
    if value.contains(delimiter) || value.contains(&['"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn extension(file_path: &Path) -> Option<String> {
    file_path
        .extension()
        .and_then(|s| s.to_str())
        .map(str::to_lowercase)
}

fn is_delimited(file_path: &Path) -> bool {
    matches!(extension(file_path).as_deref(), Some("csv" | "tsv"))
}

fn quote_literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn source_sql(file_path: &Path, options: &SourceOptions) -> String {
    let path = quote_literal(&file_path.to_string_lossy());

    match extension(file_path).as_deref() {
        Some(ext @ ("csv" | "tsv")) => {
            let delimiter = if ext == "tsv" { "\t" } else { "," };
            let mut sql = format!(
                "read_csv({}, all_varchar = true, header = {}, skip = {}, delim = {}, null_padding = true",
                path,
                options.header,
                options.skip_rows,
                quote_literal(delimiter)
            );
            if let Some(names) = &options.columns {
                let names: Vec<String> = names.iter().map(|n| quote_literal(n)).collect();
                sql.push_str(&format!(", names = [{}]", names.join(", ")));
            }
            sql.push(')');
            sql
        }
        Some("json" | "jsonl") => format!("read_json_auto({})", path),
        _ => path,
    }
}

fn cell_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Missing,
        ValueRef::Boolean(b) => Value::Bool(b),
        ValueRef::TinyInt(i) => Value::Int(i64::from(i)),
        ValueRef::SmallInt(i) => Value::Int(i64::from(i)),
        ValueRef::Int(i) => Value::Int(i64::from(i)),
        ValueRef::BigInt(i) => Value::Int(i),
        ValueRef::HugeInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string())),
        ValueRef::UTinyInt(i) => Value::Int(i64::from(i)),
        ValueRef::USmallInt(i) => Value::Int(i64::from(i)),
        ValueRef::UInt(i) => Value::Int(i64::from(i)),
        ValueRef::UBigInt(i) => i64::try_from(i)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::Text(i.to_string())),
        ValueRef::Float(f) => Value::from(f64::from(f)),
        ValueRef::Double(f) => Value::from(f),
        ValueRef::Decimal(d) => {
            let text = d.to_string();
            text.parse::<f64>().map(Value::from).unwrap_or(Value::Text(text))
        }
        ValueRef::Text(s) => Value::Text(String::from_utf8_lossy(s).to_string()),
        ValueRef::Blob(b) => Value::Text(format!("<blob:{} bytes>", b.len())),
        other => Value::Text(format!("{:?}", other)),
    }
}

fn convert_duckdb_error(error: duckdb::Error, file_path: &Path) -> TablebridgeError {
    let error_msg = error.to_string();

    if error_msg.contains("CSV Error")
        || error_msg.contains("Could not convert")
        || error_msg.contains("Unterminated quoted field")
    {
        TablebridgeError::invalid_input(format!(
            "Malformed delimited file '{}': {}",
            file_path.display(),
            error_msg
        ))
    } else if error_msg.contains("JSON") {
        TablebridgeError::invalid_input(format!(
            "Malformed JSON file '{}': {}",
            file_path.display(),
            error_msg
        ))
    } else {
        TablebridgeError::DuckDb(error)
    }
}
