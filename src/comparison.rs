//! Versioned comparison of two identity-keyed tables
//!
//! Rows are matched 1:1 on the identity column and split into four
//! partitions: new, removed, changed and unchanged. Partitions and joined
//! views are computed on first access and cached.

use crate::error::{Result, TablebridgeError};
use crate::predicate::{cells_differ, row_differs};
use crate::table::Table;
use crate::value::{IdentityKey, Value};
use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;
use std::cell::OnceCell;
use std::collections::HashMap;

pub const NEW_SUFFIX: &str = "_new";
pub const OLD_SUFFIX: &str = "_old";

#[derive(Debug)]
pub struct TableComparison {
    new: Table,
    old: Table,
    id_column: String,
    data_columns: Vec<String>,
    joined_columns: IndexSet<String>,
    new_keys: Vec<IdentityKey>,
    old_keys: Vec<IdentityKey>,
    new_index: HashMap<IdentityKey, usize>,
    old_index: HashMap<IdentityKey, usize>,
    /// (new row, old row) pairs sharing an identity, in new-table order
    matched: Vec<(usize, usize)>,
    changed_flags: OnceCell<Vec<bool>>,
    outer: OnceCell<Table>,
    inner: OnceCell<Table>,
    new_rows: OnceCell<Table>,
    removed_rows: OnceCell<Table>,
    changed_rows: OnceCell<Table>,
    unchanged_rows: OnceCell<Table>,
}

impl TableComparison {
    /// Validate both snapshots and index them by identity
    pub fn new(new_table: Table, old_table: Table, id_column: impl Into<String>) -> Result<Self> {
        let id_column = id_column.into();

        for (table, side) in [(&new_table, "new"), (&old_table, "old")] {
            if !table.has_column(&id_column) {
                return Err(TablebridgeError::configuration(format!(
                    "Identity column '{}' not found in the {} table",
                    id_column, side
                )));
            }
        }

        let data_columns: Vec<String> = new_table
            .columns()
            .filter(|c| *c != id_column)
            .map(str::to_string)
            .collect();
        if data_columns.is_empty() {
            return Err(TablebridgeError::configuration(format!(
                "Comparison needs at least one data column besides '{}'",
                id_column
            )));
        }

        if let Some(absent) = data_columns.iter().find(|c| !old_table.has_column(c)) {
            return Err(TablebridgeError::configuration(format!(
                "Data column '{}' not found in the old table",
                absent
            )));
        }

        let mut joined_columns = IndexSet::new();
        joined_columns.insert(id_column.clone());
        for suffix in [NEW_SUFFIX, OLD_SUFFIX] {
            for column in &data_columns {
                let joined = format!("{}{}", column, suffix);
                if !joined_columns.insert(joined.clone()) {
                    return Err(TablebridgeError::configuration(format!(
                        "Joined column name '{}' collides with another column",
                        joined
                    )));
                }
            }
        }

        let (new_keys, new_index) = index_identities(&new_table, &id_column, "new")?;
        let (old_keys, old_index) = index_identities(&old_table, &id_column, "old")?;

        let matched = new_keys
            .iter()
            .enumerate()
            .filter_map(|(i, key)| old_index.get(key).map(|&j| (i, j)))
            .collect::<Vec<_>>();

        log::debug!(
            "Comparing {} new rows with {} old rows on '{}': {} shared identities",
            new_table.len(),
            old_table.len(),
            id_column,
            matched.len()
        );

        Ok(Self {
            new: new_table,
            old: old_table,
            id_column,
            data_columns,
            joined_columns,
            new_keys,
            old_keys,
            new_index,
            old_index,
            matched,
            changed_flags: OnceCell::new(),
            outer: OnceCell::new(),
            inner: OnceCell::new(),
            new_rows: OnceCell::new(),
            removed_rows: OnceCell::new(),
            changed_rows: OnceCell::new(),
            unchanged_rows: OnceCell::new(),
        })
    }

    pub fn new_table(&self) -> &Table {
        &self.new
    }

    pub fn old_table(&self) -> &Table {
        &self.old
    }

    pub fn id_column(&self) -> &str {
        &self.id_column
    }

    /// New-table columns other than the identity column
    pub fn data_columns(&self) -> &[String] {
        &self.data_columns
    }

    pub fn data_columns_new(&self) -> Vec<String> {
        self.suffixed(NEW_SUFFIX)
    }

    pub fn data_columns_old(&self) -> Vec<String> {
        self.suffixed(OLD_SUFFIX)
    }

    fn suffixed(&self, suffix: &str) -> Vec<String> {
        self.data_columns
            .iter()
            .map(|c| format!("{}{}", c, suffix))
            .collect()
    }

    /// Union join on identity: new-table order, then old-only rows in old order
    pub fn outer_joined(&self) -> &Table {
        self.outer.get_or_init(|| {
            let mut rows: Vec<Vec<Value>> = (0..self.new.len())
                .map(|i| self.joined_row(Some(i), self.old_index.get(&self.new_keys[i]).copied()))
                .collect();
            rows.extend(
                (0..self.old.len())
                    .filter(|&j| !self.new_index.contains_key(&self.old_keys[j]))
                    .map(|j| self.joined_row(None, Some(j))),
            );
            Table::from_parts(self.joined_columns.clone(), rows)
        })
    }

    /// Intersection join on identity, in new-table order
    pub fn inner_joined(&self) -> &Table {
        self.inner.get_or_init(|| {
            let rows = self
                .matched
                .iter()
                .map(|&(i, j)| self.joined_row(Some(i), Some(j)))
                .collect();
            Table::from_parts(self.joined_columns.clone(), rows)
        })
    }

    fn joined_row(&self, new_row: Option<usize>, old_row: Option<usize>) -> Vec<Value> {
        let cell = |table: &Table, row: Option<usize>, column: &str| {
            row.and_then(|r| table.value(r, column))
                .cloned()
                .unwrap_or_default()
        };

        let identity = match new_row {
            Some(_) => cell(&self.new, new_row, self.id_column.as_str()),
            None => cell(&self.old, old_row, self.id_column.as_str()),
        };

        let mut values = Vec::with_capacity(self.joined_columns.len());
        values.push(identity);
        values.extend(self.data_columns.iter().map(|c| cell(&self.new, new_row, c.as_str())));
        values.extend(self.data_columns.iter().map(|c| cell(&self.old, old_row, c.as_str())));
        values
    }

    /// Per matched pair, whether any data column differs
    fn changed_flags(&self) -> &[bool] {
        self.changed_flags.get_or_init(|| {
            use rayon::prelude::*;

            let inner = self.inner_joined();
            let new_columns = self.data_columns_new();
            let old_columns = self.data_columns_old();

            (0..inner.len())
                .into_par_iter()
                .map(|i| {
                    inner
                        .row(i)
                        .map(|row| row_differs(&row, &new_columns, &old_columns))
                        .unwrap_or(false)
                })
                .collect()
        })
    }

    /// New-table rows whose identity is absent from the old table
    pub fn new_rows(&self) -> &Table {
        self.new_rows.get_or_init(|| {
            self.new.take((0..self.new.len()).filter(|&i| !self.old_index.contains_key(&self.new_keys[i])))
        })
    }

    /// Old-table rows whose identity is absent from the new table
    pub fn removed_rows(&self) -> &Table {
        self.removed_rows.get_or_init(|| {
            self.old.take((0..self.old.len()).filter(|&j| !self.new_index.contains_key(&self.old_keys[j])))
        })
    }

    /// Shared identities whose data differ, with the new-side values
    pub fn changed_rows(&self) -> &Table {
        self.changed_rows.get_or_init(|| {
            let flags = self.changed_flags();
            self.new.take(
                self.matched
                    .iter()
                    .zip(flags)
                    .filter(|(_, changed)| **changed)
                    .map(|(&(i, _), _)| i),
            )
        })
    }

    /// Shared identities with no difference, in old-table order and shape
    pub fn unchanged_rows(&self) -> &Table {
        self.unchanged_rows.get_or_init(|| {
            let flags = self.changed_flags();
            let mut unchanged: Vec<usize> = self
                .matched
                .iter()
                .zip(flags)
                .filter(|(_, changed)| !**changed)
                .map(|(&(_, j), _)| j)
                .collect();
            unchanged.sort_unstable();
            self.old.take(unchanged)
        })
    }

    /// Every differing cell among the changed rows
    pub fn cell_changes(&self) -> Vec<CellChange> {
        let flags = self.changed_flags();
        let mut changes = Vec::new();

        for (&(i, j), _) in self.matched.iter().zip(flags).filter(|(_, changed)| **changed) {
            for column in &self.data_columns {
                let new_value = self.new.value(i, column).cloned().unwrap_or_default();
                let old_value = self.old.value(j, column).cloned().unwrap_or_default();
                if cells_differ(&new_value, &old_value) {
                    changes.push(CellChange {
                        id: self.new.value(i, &self.id_column).cloned().unwrap_or_default(),
                        column: column.clone(),
                        old: old_value,
                        new: new_value,
                    });
                }
            }
        }

        changes
    }

    pub fn summary(&self) -> ComparisonSummary {
        ComparisonSummary {
            compared_at: Utc::now(),
            id_column: self.id_column.clone(),
            data_columns: self.data_columns.clone(),
            new_fingerprint: self.new.fingerprint(),
            old_fingerprint: self.old.fingerprint(),
            new_table_rows: self.new.len(),
            old_table_rows: self.old.len(),
            new: self.new_rows().len(),
            removed: self.removed_rows().len(),
            changed: self.changed_rows().len(),
            unchanged: self.unchanged_rows().len(),
        }
    }
}

fn index_identities(
    table: &Table,
    id_column: &str,
    side: &str,
) -> Result<(Vec<IdentityKey>, HashMap<IdentityKey, usize>)> {
    let values = table.column_values(id_column).ok_or_else(|| {
        TablebridgeError::configuration(format!(
            "Identity column '{}' not found in the {} table",
            id_column, side
        ))
    })?;

    let mut keys = Vec::with_capacity(table.len());
    let mut index = HashMap::with_capacity(table.len());
    for (row, value) in values.enumerate() {
        let key = value.identity_key().ok_or_else(|| {
            TablebridgeError::configuration(format!(
                "Missing identity value in row {} of the {} table",
                row, side
            ))
        })?;
        if index.insert(key.clone(), row).is_some() {
            return Err(TablebridgeError::duplicate_identity(id_column, value.to_string()));
        }
        keys.push(key);
    }

    Ok((keys, index))
}

/// One differing cell of a changed row
#[derive(Debug, Clone, Serialize)]
pub struct CellChange {
    pub id: Value,
    pub column: String,
    pub old: Value,
    pub new: Value,
}

/// Partition counts and snapshot fingerprints of a comparison
#[derive(Debug, Clone, Serialize)]
pub struct ComparisonSummary {
    pub compared_at: DateTime<Utc>,
    pub id_column: String,
    pub data_columns: Vec<String>,
    pub new_fingerprint: String,
    pub old_fingerprint: String,
    pub new_table_rows: usize,
    pub old_table_rows: usize,
    pub new: usize,
    pub removed: usize,
    pub changed: usize,
    pub unchanged: usize,
}

impl ComparisonSummary {
    pub fn has_changes(&self) -> bool {
        self.total_changes() > 0
    }

    pub fn total_changes(&self) -> usize {
        self.new + self.removed + self.changed
    }
}
