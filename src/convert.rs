//! Schema-driven table conversion
//!
//! A [`ConversionSchema`] maps each output column to a [`ColumnRule`]:
//!
//! - **rename**: copy a source column, optionally translating values through a [`Remap`]
//! - **apply**: compute the cell from the full source row
//! - **transform**: aggregate a source column per group and broadcast the result
//!
//! Only the schema's output columns appear in the converted table, in the
//! order they were declared.

use crate::error::{Result, TablebridgeError};
use crate::generators::{Generator, GeneratorSpec};
use crate::table::{RowRef, Table};
use crate::value::{IdentityKey, Value, ValueType};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Pure per-row function
pub type RowFn = Arc<dyn Fn(&RowRef<'_>) -> Value + Send + Sync>;

/// Generator owned by the caller, whose state outlives a single conversion
pub type SharedGenerator = Arc<Mutex<dyn Generator>>;

/// What a remap does with a present value that has no mapping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnmappedPolicy {
    /// Keep the original value
    PassThrough,
    /// Replace it with the missing marker
    Missing,
    /// Fail the conversion
    Error,
}

impl UnmappedPolicy {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "pass_through" | "passthrough" => Ok(Self::PassThrough),
            "missing" => Ok(Self::Missing),
            "error" => Ok(Self::Error),
            _ => Err(format!(
                "Invalid unmapped policy: {}. Use 'pass_through', 'missing' or 'error'",
                s
            )),
        }
    }
}

/// Value translation table for rename rules
#[derive(Debug, Clone)]
pub struct Remap {
    mappings: HashMap<IdentityKey, Value>,
    unmapped: UnmappedPolicy,
}

impl Remap {
    pub fn new(unmapped: UnmappedPolicy) -> Self {
        Self {
            mappings: HashMap::new(),
            unmapped,
        }
    }

    /// Add a mapping. Mappings from a missing value are ignored.
    pub fn map(mut self, from: impl Into<Value>, to: impl Into<Value>) -> Self {
        self.insert(&from.into(), to.into());
        self
    }

    /// Add a mapping, returning false if `from` is missing and cannot be mapped
    pub fn insert(&mut self, from: &Value, to: Value) -> bool {
        match from.identity_key() {
            Some(key) => {
                self.mappings.insert(key, to);
                true
            }
            None => false,
        }
    }

    pub fn unmapped(&self) -> UnmappedPolicy {
        self.unmapped
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    fn translate(&self, column: &str, value: &Value) -> Result<Value> {
        if value.is_missing() {
            return Ok(Value::Missing);
        }

        if let Some(mapped) = value.identity_key().and_then(|key| self.mappings.get(&key)) {
            return Ok(mapped.clone());
        }

        match self.unmapped {
            UnmappedPolicy::PassThrough => Ok(value.clone()),
            UnmappedPolicy::Missing => Ok(Value::Missing),
            UnmappedPolicy::Error => Err(TablebridgeError::missing_value(column, value.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RenameRule {
    pub source: String,
    pub remap: Option<Remap>,
}

#[derive(Clone)]
pub enum ApplyRule {
    Function(RowFn),
    /// Instantiated fresh for every conversion run
    Generator(GeneratorSpec),
    Shared(SharedGenerator),
}

impl fmt::Debug for ApplyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplyRule::Function(_) => f.write_str("Function(..)"),
            ApplyRule::Generator(spec) => f.debug_tuple("Generator").field(spec).finish(),
            ApplyRule::Shared(_) => f.write_str("Shared(..)"),
        }
    }
}

/// Per-group aggregation for transform rules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Mean,
    Sum,
    Min,
    Max,
    Median,
    Count,
    First,
    Last,
}

impl Aggregation {
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        match s.to_lowercase().as_str() {
            "mean" | "avg" => Ok(Self::Mean),
            "sum" => Ok(Self::Sum),
            "min" => Ok(Self::Min),
            "max" => Ok(Self::Max),
            "median" => Ok(Self::Median),
            "count" => Ok(Self::Count),
            "first" => Ok(Self::First),
            "last" => Ok(Self::Last),
            _ => Err(format!("Unrecognized aggregation action: {}", s)),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Sum => "sum",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Count => "count",
            Self::First => "first",
            Self::Last => "last",
        }
    }

    /// Aggregate one group. Missing values are skipped.
    pub fn aggregate(&self, column: &str, values: &[&Value]) -> Result<Value> {
        let present: Vec<&Value> = values.iter().copied().filter(|v| v.is_present()).collect();

        match self {
            Self::Count => Ok(Value::Int(present.len() as i64)),
            Self::First => Ok(present.first().map(|v| (*v).clone()).unwrap_or_default()),
            Self::Last => Ok(present.last().map(|v| (*v).clone()).unwrap_or_default()),
            Self::Sum => {
                let int_total = present.iter().try_fold(0i64, |acc, v| match v {
                    Value::Int(i) => acc.checked_add(*i),
                    _ => None,
                });
                match int_total {
                    Some(total) => Ok(Value::Int(total)),
                    None => Ok(Value::Float(self.numbers(column, &present)?.iter().sum())),
                }
            }
            Self::Mean => {
                let numbers = self.numbers(column, &present)?;
                if numbers.is_empty() {
                    return Ok(Value::Missing);
                }
                Ok(Value::Float(numbers.iter().sum::<f64>() / numbers.len() as f64))
            }
            Self::Median => {
                let mut numbers = self.numbers(column, &present)?;
                if numbers.is_empty() {
                    return Ok(Value::Missing);
                }
                numbers.sort_by(|a, b| a.total_cmp(b));
                let mid = numbers.len() / 2;
                let median = if numbers.len() % 2 == 0 {
                    (numbers[mid - 1] + numbers[mid]) / 2.0
                } else {
                    numbers[mid]
                };
                Ok(Value::Float(median))
            }
            Self::Min | Self::Max => self.extreme(column, &present),
        }
    }

    fn numbers(&self, column: &str, present: &[&Value]) -> Result<Vec<f64>> {
        present
            .iter()
            .map(|v| {
                v.as_f64().ok_or_else(|| {
                    TablebridgeError::schema(format!(
                        "Cannot compute {} of non-numeric value '{}' in column '{}'",
                        self.name(),
                        v,
                        column
                    ))
                })
            })
            .collect()
    }

    fn extreme(&self, column: &str, present: &[&Value]) -> Result<Value> {
        let numeric = present.iter().all(|v| v.as_f64().is_some());
        let textual = present.iter().all(|v| v.as_str().is_some());
        if !numeric && !textual {
            return Err(TablebridgeError::schema(format!(
                "Cannot compute {} of mixed-type values in column '{}'",
                self.name(),
                column
            )));
        }

        let wanted = if *self == Self::Min {
            Ordering::Less
        } else {
            Ordering::Greater
        };

        let mut best: Option<&Value> = None;
        for &candidate in present {
            best = match best {
                None => Some(candidate),
                Some(current) => {
                    let ordering = if numeric {
                        candidate
                            .as_f64()
                            .unwrap_or_default()
                            .total_cmp(&current.as_f64().unwrap_or_default())
                    } else {
                        candidate.as_str().cmp(&current.as_str())
                    };
                    if ordering == wanted {
                        Some(candidate)
                    } else {
                        Some(current)
                    }
                }
            };
        }

        Ok(best.cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone)]
pub struct TransformRule {
    pub group_by: String,
    pub source: String,
    pub action: Aggregation,
}

#[derive(Debug, Clone)]
pub enum RuleKind {
    Rename(RenameRule),
    Apply(ApplyRule),
    Transform(TransformRule),
}

/// How one output column is produced
#[derive(Debug, Clone)]
pub struct ColumnRule {
    pub kind: RuleKind,
    /// Substituted for missing cells before coercion
    pub fill_missing: Option<Value>,
    pub dtype: Option<ValueType>,
}

impl ColumnRule {
    fn with_kind(kind: RuleKind) -> Self {
        Self {
            kind,
            fill_missing: None,
            dtype: None,
        }
    }

    pub fn rename(source: impl Into<String>) -> Self {
        Self::with_kind(RuleKind::Rename(RenameRule {
            source: source.into(),
            remap: None,
        }))
    }

    pub fn remap(source: impl Into<String>, remap: Remap) -> Self {
        Self::with_kind(RuleKind::Rename(RenameRule {
            source: source.into(),
            remap: Some(remap),
        }))
    }

    pub fn apply<F>(function: F) -> Self
    where
        F: Fn(&RowRef<'_>) -> Value + Send + Sync + 'static,
    {
        Self::with_kind(RuleKind::Apply(ApplyRule::Function(Arc::new(function))))
    }

    pub fn generator(spec: GeneratorSpec) -> Self {
        Self::with_kind(RuleKind::Apply(ApplyRule::Generator(spec)))
    }

    /// Use a caller-owned generator; its state carries over between conversions
    pub fn shared<G: Generator + 'static>(generator: Arc<Mutex<G>>) -> Self {
        let generator: SharedGenerator = generator;
        Self::with_kind(RuleKind::Apply(ApplyRule::Shared(generator)))
    }

    pub fn transform(group_by: impl Into<String>, source: impl Into<String>, action: Aggregation) -> Self {
        Self::with_kind(RuleKind::Transform(TransformRule {
            group_by: group_by.into(),
            source: source.into(),
            action,
        }))
    }

    pub fn with_fill_missing(mut self, value: impl Into<Value>) -> Self {
        self.fill_missing = Some(value.into());
        self
    }

    pub fn with_dtype(mut self, dtype: ValueType) -> Self {
        self.dtype = Some(dtype);
        self
    }
}

impl From<&str> for ColumnRule {
    fn from(source: &str) -> Self {
        Self::rename(source)
    }
}

impl From<String> for ColumnRule {
    fn from(source: String) -> Self {
        Self::rename(source)
    }
}

impl From<GeneratorSpec> for ColumnRule {
    fn from(spec: GeneratorSpec) -> Self {
        Self::generator(spec)
    }
}

/// Ordered mapping from output column name to the rule producing it
#[derive(Debug, Clone, Default)]
pub struct ConversionSchema {
    rules: IndexMap<String, ColumnRule>,
}

impl ConversionSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rename-only schema reproducing `table`'s columns unchanged
    pub fn identity_for(table: &Table) -> Self {
        table
            .columns()
            .fold(Self::new(), |schema, column| schema.rename(column, column))
    }

    pub fn with_column(mut self, output: impl Into<String>, rule: impl Into<ColumnRule>) -> Self {
        self.insert(output, rule);
        self
    }

    /// Add or replace the rule for `output`. A replaced rule keeps its position.
    pub fn insert(&mut self, output: impl Into<String>, rule: impl Into<ColumnRule>) -> Option<ColumnRule> {
        self.rules.insert(output.into(), rule.into())
    }

    pub fn rename(self, output: impl Into<String>, source: impl Into<String>) -> Self {
        self.with_column(output, ColumnRule::rename(source))
    }

    pub fn apply<F>(self, output: impl Into<String>, function: F) -> Self
    where
        F: Fn(&RowRef<'_>) -> Value + Send + Sync + 'static,
    {
        self.with_column(output, ColumnRule::apply(function))
    }

    pub fn get(&self, output: &str) -> Option<&ColumnRule> {
        self.rules.get(output)
    }

    pub fn output_columns(&self) -> impl Iterator<Item = &str> + '_ {
        self.rules.keys().map(String::as_str)
    }

    pub fn rules(&self) -> impl Iterator<Item = (&str, &ColumnRule)> + '_ {
        self.rules.iter().map(|(output, rule)| (output.as_str(), rule))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Check that every column the rules read exists in `table`
    pub fn validate(&self, table: &Table) -> Result<()> {
        for (output, rule) in &self.rules {
            match &rule.kind {
                RuleKind::Rename(rename) => require_column(table, output, "source", &rename.source)?,
                RuleKind::Transform(transform) => {
                    require_column(table, output, "group-by", &transform.group_by)?;
                    require_column(table, output, "source", &transform.source)?;
                }
                RuleKind::Apply(_) => {}
            }
        }
        Ok(())
    }

    /// Build the converted table
    pub fn convert(&self, table: &Table) -> Result<Table> {
        self.validate(table)?;

        let mut columns = Vec::with_capacity(self.rules.len());
        for (output, rule) in &self.rules {
            let mut values = match &rule.kind {
                RuleKind::Rename(rename) => rename_column(table, rename)?,
                RuleKind::Apply(apply) => apply_column(table, apply),
                RuleKind::Transform(transform) => transform_column(table, transform)?,
            };
            finish_column(output, rule, &mut values);
            columns.push((output.clone(), values));
        }

        log::debug!(
            "Converted {} rows from {} to {} columns",
            table.len(),
            table.width(),
            columns.len()
        );
        Table::from_columns_with_len(table.len(), columns)
    }
}

/// Convert `table` with `schema`
pub fn convert(table: &Table, schema: &ConversionSchema) -> Result<Table> {
    schema.convert(table)
}

fn require_column(table: &Table, output: &str, role: &str, column: &str) -> Result<()> {
    if table.has_column(column) {
        Ok(())
    } else {
        Err(TablebridgeError::schema(format!(
            "Rule for '{}' references missing {} column '{}'",
            output, role, column
        )))
    }
}

fn source_values<'t>(table: &'t Table, column: &str) -> Result<impl Iterator<Item = &'t Value> + 't> {
    table
        .column_values(column)
        .ok_or_else(|| TablebridgeError::schema(format!("Column '{}' not found", column)))
}

fn rename_column(table: &Table, rule: &RenameRule) -> Result<Vec<Value>> {
    let values = source_values(table, &rule.source)?;
    match &rule.remap {
        None => Ok(values.cloned().collect()),
        Some(remap) => values.map(|value| remap.translate(&rule.source, value)).collect(),
    }
}

fn apply_column(table: &Table, rule: &ApplyRule) -> Vec<Value> {
    match rule {
        ApplyRule::Function(function) => table.rows().map(|row| function(&row)).collect(),
        ApplyRule::Generator(spec) => {
            let mut generator = spec.build();
            table.rows().map(|row| generator.generate(&row)).collect()
        }
        ApplyRule::Shared(shared) => {
            let mut generator = shared.lock().unwrap_or_else(PoisonError::into_inner);
            table.rows().map(|row| generator.generate(&row)).collect()
        }
    }
}

fn transform_column(table: &Table, rule: &TransformRule) -> Result<Vec<Value>> {
    let sources: Vec<&Value> = source_values(table, &rule.source)?.collect();

    let mut groups: IndexMap<IdentityKey, Vec<usize>> = IndexMap::new();
    for (row, key) in source_values(table, &rule.group_by)?
        .map(Value::identity_key)
        .enumerate()
    {
        if let Some(key) = key {
            groups.entry(key).or_default().push(row);
        }
    }

    let mut output = vec![Value::Missing; table.len()];
    for rows in groups.values() {
        let members: Vec<&Value> = rows.iter().map(|&row| sources[row]).collect();
        let aggregate = rule.action.aggregate(&rule.source, &members)?;
        for &row in rows {
            output[row] = aggregate.clone();
        }
    }

    log::debug!(
        "Computed {} of '{}' over {} groups of '{}'",
        rule.action.name(),
        rule.source,
        groups.len(),
        rule.group_by
    );
    Ok(output)
}

fn finish_column(output: &str, rule: &ColumnRule, values: &mut [Value]) {
    if let Some(default) = &rule.fill_missing {
        for value in values.iter_mut().filter(|v| v.is_missing()) {
            *value = default.clone();
        }
    }

    if let Some(dtype) = rule.dtype {
        let mut failed = 0usize;
        for value in values.iter_mut() {
            match value.coerce(dtype) {
                Some(coerced) => *value = coerced,
                None => {
                    failed += 1;
                    *value = Value::Missing;
                }
            }
        }
        if failed > 0 {
            log::warn!(
                "Column '{}': {} values could not be converted to {:?} and were set to missing",
                output,
                failed,
                dtype
            );
        }
    }
}
