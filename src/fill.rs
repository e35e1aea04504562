//! Forward-filling of missing cells down a column

use crate::error::{Result, TablebridgeError};
use crate::table::Table;
use crate::value::Value;

/// One or more column names to operate on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelection(Vec<String>);

impl ColumnSelection {
    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for ColumnSelection {
    fn from(name: &str) -> Self {
        Self(vec![name.to_string()])
    }
}

impl From<String> for ColumnSelection {
    fn from(name: String) -> Self {
        Self(vec![name])
    }
}

impl From<Vec<String>> for ColumnSelection {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl From<Vec<&str>> for ColumnSelection {
    fn from(names: Vec<&str>) -> Self {
        Self(names.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for ColumnSelection {
    fn from(names: &[&str]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

impl<const N: usize> From<[&str; N]> for ColumnSelection {
    fn from(names: [&str; N]) -> Self {
        Self(names.iter().map(|s| s.to_string()).collect())
    }
}

/// Return a copy of `table` with missing cells in `columns` filled from the
/// nearest non-missing cell above.
///
/// Leading missing cells take `starting_value` when given and stay missing
/// otherwise.
pub fn fill_from_above(
    table: &Table,
    columns: impl Into<ColumnSelection>,
    starting_value: Option<Value>,
) -> Result<Table> {
    let mut filled = table.clone();
    fill_from_above_in_place(&mut filled, columns, starting_value)?;
    Ok(filled)
}

/// In-place variant of [`fill_from_above`]
pub fn fill_from_above_in_place(
    table: &mut Table,
    columns: impl Into<ColumnSelection>,
    starting_value: Option<Value>,
) -> Result<()> {
    let selection = columns.into();

    // Resolve every column first so a bad name leaves the table untouched
    let indices = selection
        .names()
        .iter()
        .map(|name| {
            table
                .column_index(name)
                .ok_or_else(|| TablebridgeError::schema(format!("Column '{}' not found", name)))
        })
        .collect::<Result<Vec<_>>>()?;

    let starting_value = starting_value.filter(Value::is_present);

    for (name, column) in selection.names().iter().zip(indices) {
        let mut carry = starting_value.clone();
        let mut filled = 0usize;

        for row in 0..table.len() {
            if let Some(cell) = table.cell_mut(row, column) {
                if cell.is_missing() {
                    if let Some(value) = &carry {
                        *cell = value.clone();
                        filled += 1;
                    }
                } else {
                    carry = Some(cell.clone());
                }
            }
        }

        log::debug!("Filled {} missing cells in column '{}'", filled, name);
    }

    Ok(())
}
