//! JSON schema documents
//!
//! A document is an object mapping output columns to either a source column
//! name (rename shorthand) or a rule object:
//!
//! ```json
//! {
//!   "cell_id": "id",
//!   "kind": {"rule": "rename", "source": "type", "remap": {"exc": "excitatory"}, "unmapped": "missing"},
//!   "uid": {"rule": "apply", "generator": {"kind": "counter", "start": 1, "prefix": "C"}},
//!   "mean_size": {"rule": "transform", "group_by": "type", "source": "size", "action": "mean"}
//! }
//! ```
//!
//! Remap objects key on text; use the `[{"from": .., "to": ..}]` form to map
//! numeric or boolean source values.

use crate::convert::{Aggregation, ColumnRule, ConversionSchema, Remap, UnmappedPolicy};
use crate::error::{Result, TablebridgeError};
use crate::generators::GeneratorSpec;
use crate::value::{Value, ValueType};
use indexmap::IndexMap;
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RuleDef {
    rule: String,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    remap: Option<serde_json::Value>,
    #[serde(default)]
    unmapped: Option<String>,
    #[serde(default)]
    strict: Option<bool>,
    #[serde(default)]
    generator: Option<GeneratorSpec>,
    #[serde(default)]
    group_by: Option<String>,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    fill_missing: Option<Value>,
    #[serde(default)]
    dtype: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RemapPair {
    from: Value,
    to: Value,
}

/// Read a schema document from disk
pub fn load_schema(path: &Path) -> Result<ConversionSchema> {
    let text = fs::read_to_string(path)?;
    log::debug!("Loading conversion schema from {}", path.display());
    parse_schema(&text)
}

/// Parse a schema document
pub fn parse_schema(text: &str) -> Result<ConversionSchema> {
    let entries: IndexMap<String, serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| TablebridgeError::schema(format!("Invalid schema document: {}", e)))?;

    let mut schema = ConversionSchema::new();
    for (output, entry) in entries {
        let rule = match entry {
            serde_json::Value::String(source) => ColumnRule::rename(source),
            serde_json::Value::Object(_) => {
                let def: RuleDef = serde_json::from_value(entry).map_err(|e| {
                    TablebridgeError::schema(format!("Invalid rule for '{}': {}", output, e))
                })?;
                build_rule(&output, def)?
            }
            other => {
                return Err(TablebridgeError::schema(format!(
                    "Rule for '{}' must be a column name or an object, got {}",
                    output, other
                )))
            }
        };
        schema.insert(output, rule);
    }

    Ok(schema)
}

fn build_rule(output: &str, def: RuleDef) -> Result<ColumnRule> {
    let mut rule = match def.rule.to_lowercase().as_str() {
        "rename" => {
            let source = required(output, "source", def.source)?;
            match def.remap {
                None => ColumnRule::rename(source),
                Some(mappings) => {
                    let policy = unmapped_policy(output, def.unmapped.as_deref(), def.strict)?;
                    ColumnRule::remap(source, build_remap(output, mappings, policy)?)
                }
            }
        }
        "apply" => ColumnRule::generator(required(output, "generator", def.generator)?),
        "transform" => {
            let group_by = required(output, "group_by", def.group_by)?;
            let source = required(output, "source", def.source)?;
            let action = required(output, "action", def.action)?;
            let action = Aggregation::parse(&action).map_err(|e| {
                TablebridgeError::schema(format!("Rule for '{}': {}", output, e))
            })?;
            ColumnRule::transform(group_by, source, action)
        }
        other => {
            return Err(TablebridgeError::schema(format!(
                "Unknown rule kind '{}' for '{}'. Use 'rename', 'apply' or 'transform'",
                other, output
            )))
        }
    };

    if let Some(default) = def.fill_missing {
        rule = rule.with_fill_missing(default);
    }
    if let Some(dtype) = def.dtype {
        let dtype = ValueType::parse(&dtype)
            .map_err(|e| TablebridgeError::schema(format!("Rule for '{}': {}", output, e)))?;
        rule = rule.with_dtype(dtype);
    }

    Ok(rule)
}

fn required<T>(output: &str, field: &str, value: Option<T>) -> Result<T> {
    value.ok_or_else(|| {
        TablebridgeError::schema(format!("Rule for '{}' is missing '{}'", output, field))
    })
}

fn unmapped_policy(output: &str, unmapped: Option<&str>, strict: Option<bool>) -> Result<UnmappedPolicy> {
    match (unmapped, strict) {
        (Some(_), Some(_)) => Err(TablebridgeError::schema(format!(
            "Rule for '{}' sets both 'unmapped' and 'strict'",
            output
        ))),
        (Some(policy), None) => UnmappedPolicy::parse(policy)
            .map_err(|e| TablebridgeError::schema(format!("Rule for '{}': {}", output, e))),
        (None, Some(true)) => Ok(UnmappedPolicy::Missing),
        (None, Some(false)) => Ok(UnmappedPolicy::PassThrough),
        (None, None) => Err(TablebridgeError::schema(format!(
            "Remap for '{}' needs an 'unmapped' policy or 'strict' flag",
            output
        ))),
    }
}

fn build_remap(output: &str, mappings: serde_json::Value, policy: UnmappedPolicy) -> Result<Remap> {
    let mut remap = Remap::new(policy);

    match mappings {
        serde_json::Value::Object(entries) => {
            for (from, to) in entries {
                let to: Value = serde_json::from_value(to)?;
                remap.insert(&Value::Text(from), to);
            }
        }
        serde_json::Value::Array(_) => {
            let pairs: Vec<RemapPair> = serde_json::from_value(mappings).map_err(|e| {
                TablebridgeError::schema(format!("Invalid remap for '{}': {}", output, e))
            })?;
            for pair in pairs {
                if !remap.insert(&pair.from, pair.to) {
                    return Err(TablebridgeError::schema(format!(
                        "Remap for '{}' cannot map from a missing value",
                        output
                    )));
                }
            }
        }
        other => {
            return Err(TablebridgeError::schema(format!(
                "Remap for '{}' must be an object or a list of pairs, got {}",
                output, other
            )))
        }
    }

    Ok(remap)
}
