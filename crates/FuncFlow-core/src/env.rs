//! # Global Constants
//!
//! Named values every synthesized function can read. The editor owns one
//! `GlobalConstants` and hands nodes a shared, read-only reference per run.

use crate::error::ConstantError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// The value kinds a constant can be declared with.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantKind {
    Str,
    Int,
    Float,
    Bool,
    List,
    Dict,
}

impl ConstantKind {
    pub const ALL: [ConstantKind; 6] = [
        ConstantKind::Str,
        ConstantKind::Int,
        ConstantKind::Float,
        ConstantKind::Bool,
        ConstantKind::List,
        ConstantKind::Dict,
    ];

    /// Converts user-entered text into a value of this kind.
    pub fn parse(self, text: &str) -> Result<Value, ConstantError> {
        let invalid = |reason: String| ConstantError::InvalidValue {
            kind: self.to_string(),
            text: text.to_string(),
            reason,
        };
        match self {
            ConstantKind::Str => Ok(Value::String(text.to_string())),
            ConstantKind::Int => text
                .trim()
                .parse::<i64>()
                .map(Value::from)
                .map_err(|e| invalid(e.to_string())),
            ConstantKind::Float => text
                .trim()
                .parse::<f64>()
                .map_err(|e| invalid(e.to_string()))
                .and_then(|f| {
                    serde_json::Number::from_f64(f)
                        .map(Value::Number)
                        .ok_or_else(|| invalid("not a finite number".to_string()))
                }),
            ConstantKind::Bool => Ok(Value::Bool(text.trim().eq_ignore_ascii_case("true"))),
            ConstantKind::List | ConstantKind::Dict => {
                let value: Value = serde_json::from_str(text).map_err(|e| invalid(e.to_string()))?;
                if ConstantKind::infer(&value) == self {
                    Ok(value)
                } else {
                    Err(invalid(format!("expected a {self} literal")))
                }
            }
        }
    }

    /// Best-effort kind for a value loaded without a declared kind.
    pub fn infer(value: &Value) -> ConstantKind {
        match value {
            Value::Bool(_) => ConstantKind::Bool,
            Value::Number(n) if n.is_i64() || n.is_u64() => ConstantKind::Int,
            Value::Number(_) => ConstantKind::Float,
            Value::Array(_) => ConstantKind::List,
            Value::Object(_) => ConstantKind::Dict,
            Value::String(_) | Value::Null => ConstantKind::Str,
        }
    }
}

impl fmt::Display for ConstantKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstantKind::Str => "str",
            ConstantKind::Int => "int",
            ConstantKind::Float => "float",
            ConstantKind::Bool => "bool",
            ConstantKind::List => "list",
            ConstantKind::Dict => "dict",
        };
        f.write_str(s)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Constant {
    pub value: Value,
    pub kind: ConstantKind,
}

/// The constant table. Persisted as a plain `name -> value` map.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Value>",
    into = "BTreeMap<String, Value>"
)]
pub struct GlobalConstants {
    entries: BTreeMap<String, Constant>,
}

impl GlobalConstants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) -> Result<(), ConstantError> {
        let kind = ConstantKind::infer(&value);
        self.insert_typed(name, value, kind)
    }

    /// Adds a constant with an explicit kind.
    pub fn insert_typed(
        &mut self,
        name: impl Into<String>,
        value: Value,
        kind: ConstantKind,
    ) -> Result<(), ConstantError> {
        let name = name.into();
        if name.is_empty() {
            return Err(ConstantError::EmptyName);
        }
        if self.entries.contains_key(&name) {
            return Err(ConstantError::Duplicate(name));
        }
        self.entries.insert(name, Constant { value, kind });
        Ok(())
    }

    /// Changes the value of `name`, optionally renaming it.
    pub fn update(
        &mut self,
        name: &str,
        new_name: impl Into<String>,
        value: Value,
        kind: ConstantKind,
    ) -> Result<(), ConstantError> {
        let new_name = new_name.into();
        if new_name.is_empty() {
            return Err(ConstantError::EmptyName);
        }
        if !self.entries.contains_key(name) {
            return Err(ConstantError::Unknown(name.to_string()));
        }
        if new_name != name && self.entries.contains_key(&new_name) {
            return Err(ConstantError::Duplicate(new_name));
        }
        self.entries.remove(name);
        self.entries.insert(new_name, Constant { value, kind });
        Ok(())
    }

    /// Overrides the declared kind of an existing constant.
    pub fn set_kind(&mut self, name: &str, kind: ConstantKind) -> Result<(), ConstantError> {
        let constant = self
            .entries
            .get_mut(name)
            .ok_or_else(|| ConstantError::Unknown(name.to_string()))?;
        constant.kind = kind;
        Ok(())
    }

    /// Declared kind of every constant, keyed by name.
    pub fn kinds(&self) -> BTreeMap<String, ConstantKind> {
        self.entries
            .iter()
            .map(|(name, c)| (name.clone(), c.kind))
            .collect()
    }

    pub fn remove(&mut self, name: &str) -> Result<Constant, ConstantError> {
        self.entries
            .remove(name)
            .ok_or_else(|| ConstantError::Unknown(name.to_string()))
    }

    pub fn get(&self, name: &str) -> Option<&Constant> {
        self.entries.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.entries.get(name).map(|c| &c.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Constant)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Independent copy of the values, converted for the script engine.
    ///
    /// Values that cannot be represented are skipped with a warning.
    pub fn snapshot(&self) -> BTreeMap<String, rhai::Dynamic> {
        let mut out = BTreeMap::new();
        for (name, constant) in &self.entries {
            match rhai::serde::to_dynamic(&constant.value) {
                Ok(v) => {
                    out.insert(name.clone(), v);
                }
                Err(e) => {
                    tracing::warn!(constant = %name, error = %e, "Skipping unconvertible constant");
                }
            }
        }
        out
    }
}

impl From<BTreeMap<String, Value>> for GlobalConstants {
    fn from(values: BTreeMap<String, Value>) -> Self {
        let entries = values
            .into_iter()
            .map(|(name, value)| {
                let kind = ConstantKind::infer(&value);
                (name, Constant { value, kind })
            })
            .collect();
        Self { entries }
    }
}

impl From<GlobalConstants> for BTreeMap<String, Value> {
    fn from(constants: GlobalConstants) -> Self {
        constants
            .entries
            .into_iter()
            .map(|(name, c)| (name, c.value))
            .collect()
    }
}
