//! Command-line interface for tablebridge

use crate::validation::{parse_assignment, Validator};
use crate::value::Value;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tablebridge")]
#[command(about = "Schema conversion and versioned diffing for identity-keyed tables")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the nearest tablebridge.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compare two versions of an identity-keyed table
    Diff {
        /// Current version of the table
        new: PathBuf,

        /// Previous version of the table
        old: PathBuf,

        /// Identity column shared by both tables
        #[arg(long)]
        id: Option<String>,

        /// Schema document applied to both tables before comparing
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Cell validator for a column, e.g. "position=point"
        #[arg(long = "validate", value_name = "COLUMN=KIND", value_parser = parse_assignment)]
        validate: Vec<(String, Validator)>,

        /// Output format: "pretty", "json"
        #[arg(long, default_value = "pretty")]
        format: String,

        /// Directory to write the new/removed/changed/unchanged partitions to
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },

    /// Convert a table with a schema document
    Convert {
        /// Input table
        input: PathBuf,

        /// Schema document (defaults to the configured schema)
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Output file (.csv, .tsv or .json)
        #[arg(long)]
        output: PathBuf,

        /// Cell validator for a column, e.g. "position=point"
        #[arg(long = "validate", value_name = "COLUMN=KIND", value_parser = parse_assignment)]
        validate: Vec<(String, Validator)>,
    },

    /// Fill missing cells from the nearest value above
    Fill {
        /// Input table
        input: PathBuf,

        /// Column to fill (repeatable)
        #[arg(long = "column", required = true)]
        columns: Vec<String>,

        /// Value for missing cells before the first present one
        #[arg(long)]
        start: Option<String>,

        /// Output file (.csv, .tsv or .json)
        #[arg(long)]
        output: PathBuf,

        /// Cell validator for a column, e.g. "position=point"
        #[arg(long = "validate", value_name = "COLUMN=KIND", value_parser = parse_assignment)]
        validate: Vec<(String, Validator)>,
    },
}

/// Parse output format string
#[derive(Debug, Clone)]
pub enum OutputFormat {
    Pretty,
    Json,
}

impl OutputFormat {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {}. Use 'pretty' or 'json'", s)),
        }
    }
}

/// Interpret a command-line literal as an integer, a float or text
pub fn parse_literal(s: &str) -> Value {
    if let Ok(i) = s.parse::<i64>() {
        Value::Int(i)
    } else if let Ok(x) = s.parse::<f64>() {
        Value::from(x)
    } else {
        Value::from(s)
    }
}
