//! Error types for tablebridge operations

use thiserror::Error;

pub type Result<T> = std::result::Result<T, TablebridgeError>;

#[derive(Error, Debug)]
pub enum TablebridgeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("DuckDB error: {0}")]
    DuckDb(#[from] duckdb::Error),

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Duplicate identity value '{value}' in column '{column}'")]
    DuplicateIdentity { column: String, value: String },

    #[error("Schema error: {message}")]
    Schema { message: String },

    #[error("Unmapped value '{value}' in column '{column}'")]
    MissingValue { column: String, value: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl TablebridgeError {
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    pub fn duplicate_identity(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::DuplicateIdentity {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema {
            message: msg.into(),
        }
    }

    pub fn missing_value(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MissingValue {
            column: column.into(),
            value: value.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: msg.into(),
        }
    }
}
