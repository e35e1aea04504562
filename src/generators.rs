//! Value generators usable as apply-rule actions

use crate::table::RowRef;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Produces one value per row. May keep state between calls.
pub trait Generator: Send {
    fn generate(&mut self, row: &RowRef<'_>) -> Value;
}

/// Always yields the same value
#[derive(Debug, Clone)]
pub struct Constant {
    value: Value,
}

impl Generator for Constant {
    fn generate(&mut self, _row: &RowRef<'_>) -> Value {
        self.value.clone()
    }
}

/// Always yields the missing marker
#[derive(Debug, Clone, Copy, Default)]
pub struct MissingValue;

impl Generator for MissingValue {
    fn generate(&mut self, _row: &RowRef<'_>) -> Value {
        Value::Missing
    }
}

/// Arithmetic sequence `start, start + step, ...`, optionally rendered as
/// `"{prefix}{n}"` text
#[derive(Debug, Clone)]
pub struct Counter {
    next: Option<i64>,
    step: i64,
    prefix: Option<String>,
}

impl Counter {
    pub fn new(start: i64) -> Self {
        Self {
            next: Some(start),
            step: 1,
            prefix: None,
        }
    }

    pub fn with_step(mut self, step: i64) -> Self {
        self.step = step;
        self
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = if prefix.is_empty() { None } else { Some(prefix) };
        self
    }
}

impl Iterator for Counter {
    type Item = Value;

    fn next(&mut self) -> Option<Value> {
        let current = self.next?;
        self.next = current.checked_add(self.step);

        Some(match &self.prefix {
            Some(prefix) => Value::Text(format!("{}{}", prefix, current)),
            None => Value::Int(current),
        })
    }
}

impl Generator for Counter {
    fn generate(&mut self, _row: &RowRef<'_>) -> Value {
        self.next().unwrap_or(Value::Missing)
    }
}

pub fn constant(value: impl Into<Value>) -> Constant {
    Constant {
        value: value.into(),
    }
}

pub fn missing_value() -> MissingValue {
    MissingValue
}

/// Counter starting at `start` with step 1 and no prefix
pub fn counter(start: i64) -> Counter {
    Counter::new(start)
}

/// Declarative description of a generator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GeneratorSpec {
    Constant {
        value: Value,
    },
    Missing,
    Counter {
        start: i64,
        #[serde(default = "default_step")]
        step: i64,
        #[serde(default)]
        prefix: Option<String>,
    },
}

fn default_step() -> i64 {
    1
}

impl GeneratorSpec {
    /// Build a fresh generator with its own state
    pub fn build(&self) -> Box<dyn Generator> {
        match self {
            GeneratorSpec::Constant { value } => Box::new(constant(value.clone())),
            GeneratorSpec::Missing => Box::new(missing_value()),
            GeneratorSpec::Counter {
                start,
                step,
                prefix,
            } => {
                let mut generator = counter(*start).with_step(*step);
                if let Some(prefix) = prefix {
                    generator = generator.with_prefix(prefix.as_str());
                }
                Box::new(generator)
            }
        }
    }
}
