//! Cell values, the missing-value marker and identity keys

use crate::predicate::cells_differ;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single table cell
///
/// `Missing` is the missing-value marker. A `Float` holding NaN is treated as
/// missing as well, so values read from numeric sources behave the same way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    #[default]
    Missing,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Missing => true,
            Value::Float(x) => x.is_nan(),
            _ => false,
        }
    }

    pub fn is_present(&self) -> bool {
        !self.is_missing()
    }

    /// Numeric view of the value, if it has one
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(x) if !x.is_nan() => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Missing => "missing",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(x) if x.is_nan() => "missing",
            Value::Float(_) => "float",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    /// Structural equality where two missing values are the same cell content.
    ///
    /// `==` never treats missing as equal to anything; use this when comparing
    /// whole tables.
    pub fn identical(&self, other: &Value) -> bool {
        !cells_differ(self, other)
    }

    /// Inequality between two present values. Lists compare element-wise.
    pub(crate) fn differs_from(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::List(a), Value::List(b)) => {
                a.len() != b.len() || a.iter().zip(b).any(|(x, y)| cells_differ(x, y))
            }
            (Value::Bool(a), Value::Bool(b)) => a != b,
            (Value::Text(a), Value::Text(b)) => a != b,
            (Value::Int(a), Value::Int(b)) => a != b,
            (Value::Int(i), Value::Float(x)) | (Value::Float(x), Value::Int(i)) => {
                integral_float(*x) != Some(*i)
            }
            _ => match (self.as_f64(), other.as_f64()) {
                (Some(a), Some(b)) => a != b,
                _ => true,
            },
        }
    }

    /// Hashable key for joins and grouping. Missing values have no key.
    pub fn identity_key(&self) -> Option<IdentityKey> {
        match self {
            Value::Missing => None,
            Value::Bool(b) => Some(IdentityKey::Bool(*b)),
            Value::Int(i) => Some(IdentityKey::Int(*i)),
            Value::Float(x) => {
                if x.is_nan() {
                    None
                } else if let Some(i) = integral_float(*x) {
                    Some(IdentityKey::Int(i))
                } else {
                    Some(IdentityKey::Float(x.to_bits()))
                }
            }
            Value::Text(s) => Some(IdentityKey::Text(s.clone())),
            Value::List(items) => items
                .iter()
                .map(Value::identity_key)
                .collect::<Option<Vec<_>>>()
                .map(IdentityKey::List),
        }
    }

    /// Convert to the target type. Missing stays missing; `None` means the
    /// value has no representation in the target type.
    pub fn coerce(&self, target: ValueType) -> Option<Value> {
        if self.is_missing() {
            return Some(Value::Missing);
        }

        match target {
            ValueType::Int => match self {
                Value::Int(i) => Some(Value::Int(*i)),
                Value::Float(x) => integral_float(x.trunc()).map(Value::Int),
                Value::Bool(b) => Some(Value::Int(i64::from(*b))),
                Value::Text(s) => parse_int(s).map(Value::Int),
                _ => None,
            },
            ValueType::Float => match self {
                Value::Int(i) => Some(Value::Float(*i as f64)),
                Value::Float(x) => Some(Value::Float(*x)),
                Value::Bool(b) => Some(Value::Float(if *b { 1.0 } else { 0.0 })),
                Value::Text(s) => s.trim().parse::<f64>().ok().map(Value::from),
                _ => None,
            },
            ValueType::Text => Some(Value::Text(self.to_string())),
            ValueType::Bool => match self {
                Value::Bool(b) => Some(Value::Bool(*b)),
                Value::Int(0) => Some(Value::Bool(false)),
                Value::Int(1) => Some(Value::Bool(true)),
                Value::Text(s) => parse_bool(s).map(Value::Bool),
                _ => None,
            },
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.is_present() && other.is_present() && !self.differs_from(other)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) if x.is_nan() => Ok(()),
            Value::Float(x) => write!(f, "{}", x),
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<u32> for Value {
    fn from(i: u32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        if x.is_nan() {
            Value::Missing
        } else {
            Value::Float(x)
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Missing)
    }
}

/// Hashable projection of a present [`Value`]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IdentityKey {
    Bool(bool),
    Int(i64),
    Float(u64),
    Text(String),
    List(Vec<IdentityKey>),
}

/// Target type for cell coercion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueType {
    Int,
    Float,
    Text,
    Bool,
}

impl ValueType {
    pub fn parse(s: &str) -> Result<Self, String> {
        match s.to_lowercase().as_str() {
            "int" | "integer" | "int64" => Ok(Self::Int),
            "float" | "double" | "float64" => Ok(Self::Float),
            "text" | "str" | "string" => Ok(Self::Text),
            "bool" | "boolean" => Ok(Self::Bool),
            _ => Err(format!(
                "Invalid value type: {}. Use 'int', 'float', 'text' or 'bool'",
                s
            )),
        }
    }
}

pub(crate) fn integral_float(x: f64) -> Option<i64> {
    if x.is_finite() && x.fract() == 0.0 && x >= i64::MIN as f64 && x < i64::MAX as f64 {
        Some(x as i64)
    } else {
        None
    }
}

fn parse_int(s: &str) -> Option<i64> {
    let trimmed = s.trim();
    trimmed
        .parse::<i64>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().and_then(integral_float))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
