//! In-memory tables with named, ordered columns

use crate::error::{Result, TablebridgeError};
use crate::value::Value;
use blake3::Hasher;
use indexmap::{IndexMap, IndexSet};
use serde::ser::{Serialize, Serializer};

/// A row as a column name → value mapping
pub type Row = IndexMap<String, Value>;

static MISSING: Value = Value::Missing;

/// Ordered rows over a fixed, ordered set of column names
#[derive(Debug, Clone, Default)]
pub struct Table {
    columns: IndexSet<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given columns
    pub fn new<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = IndexSet::new();
        for column in columns {
            let column = column.into();
            if names.contains(&column) {
                return Err(TablebridgeError::invalid_input(format!(
                    "Duplicate column name '{}'",
                    column
                )));
            }
            names.insert(column);
        }

        Ok(Self {
            columns: names,
            rows: Vec::new(),
        })
    }

    /// Create a table from positional rows
    pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut table = Self::new(columns)?;
        table.rows.reserve(rows.len());
        for row in rows {
            table.push_row(row)?;
        }
        Ok(table)
    }

    /// Create a table from name-keyed records. Keys absent from a record
    /// become missing; keys outside `columns` are ignored.
    pub fn from_records<I, S, R>(columns: I, records: R) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        R: IntoIterator<Item = Row>,
    {
        let mut table = Self::new(columns)?;
        for record in records {
            let row = table
                .columns
                .iter()
                .map(|column| record.get(column).cloned().unwrap_or_default())
                .collect();
            table.rows.push(row);
        }
        Ok(table)
    }

    /// Create a table from whole columns of equal length
    pub fn from_columns(columns: Vec<(String, Vec<Value>)>) -> Result<Self> {
        let height = columns.first().map(|(_, values)| values.len()).unwrap_or(0);
        Self::from_columns_with_len(height, columns)
    }

    /// Create a table of `height` rows from whole columns. With no columns the
    /// table still has `height` (empty) rows.
    pub fn from_columns_with_len(height: usize, columns: Vec<(String, Vec<Value>)>) -> Result<Self> {
        if let Some((name, values)) = columns.iter().find(|(_, values)| values.len() != height) {
            return Err(TablebridgeError::invalid_input(format!(
                "Column '{}' has {} values, expected {}",
                name,
                values.len(),
                height
            )));
        }

        let mut table = Self::new(columns.iter().map(|(name, _)| name.clone()))?;
        let mut rows: Vec<Vec<Value>> = (0..height)
            .map(|_| Vec::with_capacity(columns.len()))
            .collect();
        for (_, values) in columns {
            for (row, value) in rows.iter_mut().zip(values) {
                row.push(value);
            }
        }
        table.rows = rows;
        Ok(table)
    }

    /// Append a positional row, padding it with missing cells if it is short
    pub fn push_row(&mut self, mut values: Vec<Value>) -> Result<()> {
        if values.len() > self.columns.len() {
            return Err(TablebridgeError::invalid_input(format!(
                "Row has {} values but the table has {} columns",
                values.len(),
                self.columns.len()
            )));
        }
        values.resize(self.columns.len(), Value::Missing);
        self.rows.push(values);
        Ok(())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.columns.iter().map(String::as_str)
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().cloned().collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.get_index_of(name)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<RowRef<'_>> {
        self.rows.get(index).map(|values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = RowRef<'_>> + '_ {
        self.rows.iter().map(move |values| RowRef {
            columns: &self.columns,
            values,
        })
    }

    /// All values of one column, top to bottom
    pub fn column_values(&self, name: &str) -> Option<impl Iterator<Item = &Value> + '_> {
        let index = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[index]))
    }

    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let index = self.column_index(column)?;
        self.rows.get(row).map(|values| &values[index])
    }

    pub(crate) fn cell_mut(&mut self, row: usize, column: usize) -> Option<&mut Value> {
        self.rows.get_mut(row).and_then(|values| values.get_mut(column))
    }

    /// Project onto the given columns, in the given order
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Result<Table> {
        let indices = columns
            .iter()
            .map(|column| {
                self.column_index(column.as_ref()).ok_or_else(|| {
                    TablebridgeError::schema(format!("Column '{}' not found", column.as_ref()))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let mut table = Table::new(columns.iter().map(|c| c.as_ref().to_string()))?;
        table.rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(table)
    }

    /// Keep the rows matching `keep`, preserving columns and row order
    pub fn filter_rows<F>(&self, mut keep: F) -> Table
    where
        F: FnMut(&RowRef<'_>) -> bool,
    {
        let rows = self
            .rows()
            .filter(|row| keep(row))
            .map(|row| row.values.to_vec())
            .collect();

        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Rows at `indices`, in that order. Out-of-range indices are skipped.
    pub fn take<I: IntoIterator<Item = usize>>(&self, indices: I) -> Table {
        let rows = indices
            .into_iter()
            .filter_map(|i| self.rows.get(i).cloned())
            .collect();

        Table {
            columns: self.columns.clone(),
            rows,
        }
    }

    pub(crate) fn from_parts(columns: IndexSet<String>, rows: Vec<Vec<Value>>) -> Self {
        debug_assert!(rows.iter().all(|row| row.len() == columns.len()));
        Self { columns, rows }
    }

    pub fn to_records(&self) -> Vec<Row> {
        self.rows().map(|row| row.to_record()).collect()
    }

    /// Same columns in the same order and identical cells, missing matching missing
    pub fn same_contents(&self, other: &Table) -> bool {
        self.columns.iter().eq(other.columns.iter())
            && self.rows.len() == other.rows.len()
            && self
                .rows
                .iter()
                .zip(&other.rows)
                .all(|(a, b)| a.iter().zip(b).all(|(x, y)| x.identical(y)))
    }

    /// Content digest of columns and cells
    pub fn fingerprint(&self) -> String {
        let mut hasher = Hasher::new();
        for column in &self.columns {
            hasher.update(column.as_bytes());
            hasher.update(b"|");
        }
        hasher.update(b"||");

        for row in &self.rows {
            for value in row {
                hasher.update(value.type_name().as_bytes());
                hasher.update(b":");
                hasher.update(value.to_string().as_bytes());
                hasher.update(b"|");
            }
            hasher.update(b"\n");
        }

        hasher.finalize().to_hex().to_string()
    }
}

impl Serialize for Table {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

/// Borrowed view of a single table row
#[derive(Debug, Clone, Copy)]
pub struct RowRef<'a> {
    columns: &'a IndexSet<String>,
    values: &'a [Value],
}

impl<'a> RowRef<'a> {
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.columns.get_index_of(column).map(|i| &self.values[i])
    }

    /// Value of `column`, or missing if the row has no such column
    pub fn value(&self, column: &str) -> &'a Value {
        self.get(column).unwrap_or(&MISSING)
    }

    pub fn values(&self) -> &'a [Value] {
        self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'a str, &'a Value)> + 'a {
        let columns = self.columns;
        let values = self.values;
        columns.iter().map(String::as_str).zip(values.iter())
    }

    pub fn to_record(&self) -> Row {
        self.iter()
            .map(|(column, value)| (column.to_string(), value.clone()))
            .collect()
    }
}

impl Serialize for RowRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.iter())
    }
}
