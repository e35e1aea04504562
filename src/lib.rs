//! # tablebridge
//!
//! Schema-driven conversion and versioned comparison of identity-keyed tables.
//!
//! - [`convert`] turns one table layout into another through rename, apply
//!   and group-transform rules
//! - [`comparison`] splits two snapshots of a table into new, removed,
//!   changed and unchanged rows
//! - [`fill`] carries values down columns with gaps

pub mod cli;
pub mod commands;
pub mod comparison;
pub mod config;
pub mod convert;
pub mod data;
pub mod error;
pub mod fill;
pub mod generators;
pub mod output;
pub mod predicate;
pub mod progress;
pub mod schema_file;
pub mod table;
pub mod validation;
pub mod value;

pub use comparison::{ComparisonSummary, TableComparison};
pub use convert::{convert, ColumnRule, ConversionSchema, Remap, UnmappedPolicy};
pub use error::{Result, TablebridgeError};
pub use fill::{fill_from_above, fill_from_above_in_place};
pub use predicate::row_differs;
pub use table::{Row, RowRef, Table};
pub use value::{Value, ValueType};

/// Name of the configuration file looked up from the working directory
pub const CONFIG_FILE_NAME: &str = "tablebridge.json";
