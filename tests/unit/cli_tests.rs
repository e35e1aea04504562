//! Unit tests for CLI argument parsing and validation

use clap::Parser;
use std::path::PathBuf;
use tablebridge::cli::{Cli, Commands, OutputFormat};
use tablebridge::validation::Validator;

#[test]
fn test_cli_diff_command() {
    let cli = Cli::try_parse_from(["tablebridge", "diff", "new.csv", "old.csv"]).unwrap();
    match cli.command {
        Commands::Diff {
            new,
            old,
            id,
            schema,
            validate,
            format,
            output_dir,
        } => {
            assert_eq!(new, PathBuf::from("new.csv"));
            assert_eq!(old, PathBuf::from("old.csv"));
            assert!(id.is_none());
            assert!(schema.is_none());
            assert!(validate.is_empty());
            assert_eq!(format, "pretty");
            assert!(output_dir.is_none());
        }
        _ => panic!("Expected Diff command"),
    }
}

#[test]
fn test_cli_diff_command_with_options() {
    let cli = Cli::try_parse_from([
        "tablebridge",
        "--config",
        "project.json",
        "-v",
        "diff",
        "new.csv",
        "old.csv",
        "--id",
        "cell_id",
        "--schema",
        "schema.json",
        "--validate",
        "cell_id=int",
        "--format",
        "json",
        "--output-dir",
        "out",
    ])
    .unwrap();

    assert!(cli.verbose);
    assert_eq!(cli.config, Some(PathBuf::from("project.json")));
    match cli.command {
        Commands::Diff {
            id,
            schema,
            validate,
            format,
            output_dir,
            ..
        } => {
            assert_eq!(id.as_deref(), Some("cell_id"));
            assert_eq!(schema, Some(PathBuf::from("schema.json")));
            assert_eq!(validate, vec![("cell_id".to_string(), Validator::Int)]);
            assert_eq!(format, "json");
            assert_eq!(output_dir, Some(PathBuf::from("out")));
        }
        _ => panic!("Expected Diff command"),
    }
}

#[test]
fn test_cli_rejects_bad_validator() {
    let result = Cli::try_parse_from(["tablebridge", "diff", "a.csv", "b.csv", "--validate", "pt=vector"]);
    assert!(result.is_err());
}

#[test]
fn test_cli_convert_command() {
    let cli = Cli::try_parse_from([
        "tablebridge",
        "convert",
        "sheet.csv",
        "--schema",
        "schema.json",
        "--output",
        "out.json",
    ])
    .unwrap();
    match cli.command {
        Commands::Convert { input, schema, output, .. } => {
            assert_eq!(input, PathBuf::from("sheet.csv"));
            assert_eq!(schema, Some(PathBuf::from("schema.json")));
            assert_eq!(output, PathBuf::from("out.json"));
        }
        _ => panic!("Expected Convert command"),
    }
}

#[test]
fn test_cli_fill_command() {
    let cli = Cli::try_parse_from([
        "tablebridge",
        "fill",
        "sheet.csv",
        "--column",
        "section",
        "--column",
        "layer",
        "--start",
        "0",
        "--output",
        "filled.csv",
    ])
    .unwrap();
    match cli.command {
        Commands::Fill { columns, start, .. } => {
            assert_eq!(columns, vec!["section", "layer"]);
            assert_eq!(start.as_deref(), Some("0"));
        }
        _ => panic!("Expected Fill command"),
    }
}

#[test]
fn test_output_format_parse() {
    assert!(matches!(OutputFormat::parse("pretty"), Ok(OutputFormat::Pretty)));
    assert!(matches!(OutputFormat::parse("json"), Ok(OutputFormat::Json)));
    assert!(OutputFormat::parse("xml").is_err());
}
