//! Project configuration file

use crate::data::SourceOptions;
use crate::error::{Result, TablebridgeError};
use crate::CONFIG_FILE_NAME;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings read from `tablebridge.json`. Command-line flags take precedence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub id_column: Option<String>,
    pub source: SourceOptions,
    /// Conversion schema document, relative to the config file
    pub schema: Option<PathBuf>,
}

impl BridgeConfig {
    /// Load a configuration file. A relative schema path is resolved against
    /// the file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            TablebridgeError::configuration(format!("Cannot read {}: {}", path.display(), e))
        })?;
        let mut config: Self = serde_json::from_str(&text).map_err(|e| {
            TablebridgeError::configuration(format!("Invalid config {}: {}", path.display(), e))
        })?;

        if let (Some(schema), Some(base)) = (&config.schema, path.parent()) {
            if schema.is_relative() {
                config.schema = Some(base.join(schema));
            }
        }

        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Find the nearest config file by walking up from `start_dir`, stopping
    /// at the repository root
    pub fn discover(start_dir: &Path) -> Result<Option<Self>> {
        let mut current = start_dir;

        loop {
            let candidate = current.join(CONFIG_FILE_NAME);
            if candidate.is_file() {
                return Self::load(&candidate).map(Some);
            }

            if current.join(".git").exists() {
                break;
            }

            match current.parent() {
                Some(parent) => current = parent,
                None => break,
            }
        }

        Ok(None)
    }

    /// Use `explicit` if given, otherwise the discovered file, otherwise defaults
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        let cwd = std::env::current_dir()?;
        Ok(Self::discover(&cwd)?.unwrap_or_default())
    }
}
