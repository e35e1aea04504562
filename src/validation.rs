//! Cell validators applied to raw values as they enter from a source

use crate::error::Result;
use crate::table::Table;
use crate::value::{integral_float, Value};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Column name → validator. Columns without an entry pass through.
pub type ValidationMap = IndexMap<String, Validator>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    /// Integer, or missing if the cell is not one
    Int,
    /// Unsigned 64-bit integer; values too large for `i64` are kept as text
    Uint64,
    /// Three integers separated by commas or whitespace, e.g. `"12, 40 7"`
    Point,
    /// Empty strings become missing
    Text,
    #[default]
    PassThrough,
}

impl Validator {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "int" | "integer" => Ok(Self::Int),
            "uint64" | "uint" => Ok(Self::Uint64),
            "point" => Ok(Self::Point),
            "text" | "str" => Ok(Self::Text),
            "pass_through" | "none" => Ok(Self::PassThrough),
            _ => Err(format!(
                "Invalid validator: {}. Use 'int', 'uint64', 'point', 'text' or 'pass_through'",
                s
            )),
        }
    }

    /// Validate one cell. Failures yield missing.
    pub fn apply(&self, raw: &Value) -> Value {
        if *self == Self::PassThrough {
            return raw.clone();
        }
        if raw.is_missing() {
            return Value::Missing;
        }

        match self {
            Self::Int => match raw {
                Value::Int(i) => Value::Int(*i),
                Value::Bool(b) => Value::Int(i64::from(*b)),
                Value::Float(x) => integral_float(*x).map(Value::Int).unwrap_or_default(),
                Value::Text(s) => s.trim().parse::<i64>().map(Value::Int).unwrap_or_default(),
                _ => Value::Missing,
            },
            Self::Uint64 => match raw {
                Value::Int(i) if *i >= 0 => Value::Int(*i),
                Value::Text(s) => match s.trim().parse::<u64>() {
                    Ok(n) => i64::try_from(n)
                        .map(Value::Int)
                        .unwrap_or_else(|_| Value::Text(n.to_string())),
                    Err(_) => Value::Missing,
                },
                _ => Value::Missing,
            },
            Self::Point => match raw {
                Value::Text(s) => parse_point(s)
                    .map(|coords| Value::List(coords.into_iter().map(Value::Int).collect()))
                    .unwrap_or_default(),
                Value::List(items) if items.len() == 3 && items.iter().all(|v| matches!(v, Value::Int(_))) => {
                    raw.clone()
                }
                _ => Value::Missing,
            },
            Self::Text => match raw {
                Value::Text(s) if s.is_empty() => Value::Missing,
                _ => raw.clone(),
            },
            Self::PassThrough => raw.clone(),
        }
    }
}

/// Parse a `COLUMN=KIND` assignment as given on the command line
pub fn parse_assignment(s: &str) -> std::result::Result<(String, Validator), String> {
    let (column, kind) = s
        .split_once('=')
        .ok_or_else(|| format!("Expected COLUMN=KIND, got '{}'", s))?;
    let column = column.trim();
    if column.is_empty() {
        return Err(format!("Missing column name in '{}'", s));
    }
    Ok((column.to_string(), Validator::parse(kind.trim())?))
}

/// Build a table from raw source rows.
///
/// Rows shorter than `columns` are padded with missing cells, extra cells are
/// dropped, and each cell goes through its column's validator.
pub fn process_records<R, S>(rows: R, columns: &[S], validation: &ValidationMap) -> Result<Table>
where
    R: IntoIterator<Item = Vec<Value>>,
    S: AsRef<str>,
{
    let validators: Vec<Validator> = columns
        .iter()
        .map(|column| validation.get(column.as_ref()).copied().unwrap_or_default())
        .collect();

    let mut table = Table::new(columns.iter().map(|c| c.as_ref().to_string()))?;
    for raw in rows {
        let row = raw
            .iter()
            .zip(&validators)
            .map(|(cell, validator)| validator.apply(cell))
            .collect();
        table.push_row(row)?;
    }

    log::debug!(
        "Processed {} records over {} columns ({} validated)",
        table.len(),
        columns.len(),
        validators.iter().filter(|v| **v != Validator::PassThrough).count()
    );
    Ok(table)
}

fn point_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(\d+)[,\s]*(\d+)[,\s]*(\d+)").ok())
        .as_ref()
}

/// First three digit runs joined only by commas or whitespace
fn parse_point(text: &str) -> Option<Vec<i64>> {
    let captures = point_pattern()?.captures(text)?;
    (1..=3)
        .map(|i| captures.get(i)?.as_str().parse::<i64>().ok())
        .collect()
}
