//! Missing-aware row difference predicate

use crate::table::RowRef;
use crate::value::Value;

/// Whether two cells differ.
///
/// Two missing cells never differ. Exactly one missing cell is a difference.
/// Two present cells differ if any element differs.
pub fn cells_differ(a: &Value, b: &Value) -> bool {
    match (a.is_missing(), b.is_missing()) {
        (true, true) => false,
        (true, false) | (false, true) => true,
        (false, false) => a.differs_from(b),
    }
}

/// Whether any pair of corresponding columns differs within `row`.
///
/// `new_columns[i]` is compared with `old_columns[i]`. Columns absent from the
/// row read as missing.
pub fn row_differs<S: AsRef<str>>(row: &RowRef<'_>, new_columns: &[S], old_columns: &[S]) -> bool {
    debug_assert_eq!(new_columns.len(), old_columns.len());

    new_columns
        .iter()
        .zip(old_columns)
        .any(|(new_col, old_col)| cells_differ(row.value(new_col.as_ref()), row.value(old_col.as_ref())))
}
