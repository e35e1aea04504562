//! Command implementations for tablebridge CLI

use crate::cli::{parse_literal, Commands, OutputFormat};
use crate::comparison::TableComparison;
use crate::config::BridgeConfig;
use crate::convert::ConversionSchema;
use crate::data::{write_table, DataProcessor, SourceOptions};
use crate::error::{Result, TablebridgeError};
use crate::fill::fill_from_above_in_place;
use crate::output::{JsonFormatter, PrettyPrinter};
use crate::progress::ProgressReporter;
use crate::schema_file::load_schema;
use crate::table::Table;
use crate::validation::Validator;
use std::path::{Path, PathBuf};

/// Execute a command
pub fn execute_command(command: Commands, config_path: Option<&Path>) -> Result<()> {
    let config = BridgeConfig::resolve(config_path)?;

    match command {
        Commands::Diff {
            new,
            old,
            id,
            schema,
            validate,
            format,
            output_dir,
        } => diff_command(
            &config,
            &new,
            &old,
            id,
            schema,
            validate,
            &format,
            output_dir.as_deref(),
        ),
        Commands::Convert {
            input,
            schema,
            output,
            validate,
        } => convert_command(&config, &input, schema, &output, validate),
        Commands::Fill {
            input,
            columns,
            start,
            output,
            validate,
        } => fill_command(&config, &input, columns, start.as_deref(), &output, validate),
    }
}

/// Configured source options with command-line validators layered on top
fn source_options(config: &BridgeConfig, validate: Vec<(String, Validator)>) -> SourceOptions {
    let mut options = config.source.clone();
    options.validation.extend(validate);
    options
}

/// Schema from the command line, else from the config file
fn resolve_schema(config: &BridgeConfig, schema: Option<PathBuf>) -> Result<Option<ConversionSchema>> {
    schema
        .or_else(|| config.schema.clone())
        .map(|path| load_schema(&path))
        .transpose()
}

/// Compare two versions of a table
#[allow(clippy::too_many_arguments)]
fn diff_command(
    config: &BridgeConfig,
    new_path: &Path,
    old_path: &Path,
    id: Option<String>,
    schema: Option<PathBuf>,
    validate: Vec<(String, Validator)>,
    format: &str,
    output_dir: Option<&Path>,
) -> Result<()> {
    let format = OutputFormat::parse(format).map_err(TablebridgeError::invalid_input)?;
    let id_column = id.or_else(|| config.id_column.clone()).ok_or_else(|| {
        TablebridgeError::configuration(
            "No identity column given. Pass --id or set id_column in tablebridge.json",
        )
    })?;

    let mut progress = match format {
        OutputFormat::Pretty => ProgressReporter::new("Loading tables..."),
        OutputFormat::Json => ProgressReporter::new_minimal(),
    };

    let options = source_options(config, validate);
    let processor = DataProcessor::new()?;
    let mut new_table = processor.load_table(new_path, &options)?;
    let mut old_table = processor.load_table(old_path, &options)?;

    if let Some(schema) = resolve_schema(config, schema)? {
        progress.update("Converting tables...");
        new_table = schema.convert(&new_table)?;
        old_table = schema.convert(&old_table)?;
    }

    progress.update("Comparing tables...");
    let comparison = TableComparison::new(new_table, old_table, id_column)?;
    let summary = comparison.summary();
    let changes = comparison.cell_changes();
    progress.finish("Comparison complete");

    log::info!(
        "Compared {} against {}: {} new, {} removed, {} changed, {} unchanged",
        new_path.display(),
        old_path.display(),
        summary.new,
        summary.removed,
        summary.changed,
        summary.unchanged
    );

    match format {
        OutputFormat::Pretty => PrettyPrinter::print_comparison(&summary, &changes),
        OutputFormat::Json => println!("{}", JsonFormatter::format_comparison(&summary, &changes)?),
    }

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)?;
        let partitions: [(&str, &Table); 4] = [
            ("new", comparison.new_rows()),
            ("removed", comparison.removed_rows()),
            ("changed", comparison.changed_rows()),
            ("unchanged", comparison.unchanged_rows()),
        ];
        for (name, table) in partitions {
            write_table(table, &dir.join(format!("{}.csv", name)))?;
        }
        std::fs::write(dir.join("summary.json"), JsonFormatter::format(&summary)?)?;

        if matches!(format, OutputFormat::Pretty) {
            println!("\n💾 Partitions saved to: {}", dir.display());
        }
    }

    Ok(())
}

/// Convert a table with a schema document
fn convert_command(
    config: &BridgeConfig,
    input: &Path,
    schema: Option<PathBuf>,
    output: &Path,
    validate: Vec<(String, Validator)>,
) -> Result<()> {
    let schema = resolve_schema(config, schema)?.ok_or_else(|| {
        TablebridgeError::configuration(
            "No schema given. Pass --schema or set schema in tablebridge.json",
        )
    })?;

    let options = source_options(config, validate);
    let table = DataProcessor::new()?.load_table(input, &options)?;
    let converted = schema.convert(&table)?;
    write_table(&converted, output)?;

    log::info!("Converted {} rows from {}", converted.len(), input.display());
    PrettyPrinter::print_written("Converted", input, output, &converted);
    Ok(())
}

/// Fill missing cells down the given columns
fn fill_command(
    config: &BridgeConfig,
    input: &Path,
    columns: Vec<String>,
    start: Option<&str>,
    output: &Path,
    validate: Vec<(String, Validator)>,
) -> Result<()> {
    let options = source_options(config, validate);
    let mut table = DataProcessor::new()?.load_table(input, &options)?;

    fill_from_above_in_place(&mut table, columns, start.map(parse_literal))?;
    write_table(&table, output)?;

    PrettyPrinter::print_written("Filled", input, output, &table);
    Ok(())
}
