//! Per-column variable metadata.
//!
//! `Variables` maps each data column to its metadata entry: either an
//! opaque description string or a parsed attribute mapping. Entry access
//! follows the same policy as [`Attributes`](crate::attrs::Attributes).

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::attrs::Attributes;
use crate::error::{MetatabError, MetatabResult};
use crate::value::Value;

/// Metadata for one column: raw text or a parsed attribute mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum VarEntry {
    Text(String),
    Map(Attributes),
}

impl VarEntry {
    /// Build from a YAML value. Strings and mappings are accepted; anything
    /// else fails with `TypeMismatch`.
    pub fn from_yaml(value: &serde_yaml::Value) -> MetatabResult<Self> {
        match value {
            serde_yaml::Value::String(s) => Ok(VarEntry::Text(s.clone())),
            serde_yaml::Value::Mapping(_) => Ok(VarEntry::Map(Attributes::from_yaml(value)?)),
            other => Err(MetatabError::TypeMismatch(format!(
                "variable metadata must be a string or mapping, got {other:?}"
            ))),
        }
    }

    /// View of the entry as attributes, for attachment to projected arrays.
    /// Raw text becomes a single `description` attribute.
    pub fn to_attrs(&self) -> Attributes {
        match self {
            VarEntry::Map(attrs) => attrs.clone(),
            VarEntry::Text(text) => {
                let mut attrs = Attributes::new();
                attrs.insert("description", text.as_str());
                attrs
            }
        }
    }
}

impl From<Attributes> for VarEntry {
    fn from(attrs: Attributes) -> Self {
        VarEntry::Map(attrs)
    }
}

impl From<&str> for VarEntry {
    fn from(text: &str) -> Self {
        VarEntry::Text(text.to_string())
    }
}

/// Column name -> variable metadata, one entry per data column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Variables {
    entries: IndexMap<String, VarEntry>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a YAML mapping of column name to string-or-mapping.
    pub fn from_yaml(value: &serde_yaml::Value) -> MetatabResult<Self> {
        let mut variables = Variables::new();
        variables.update_yaml(value)?;
        Ok(variables)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, entry: impl Into<VarEntry>) -> Option<VarEntry> {
        self.entries.insert(key.into(), entry.into())
    }

    pub fn get(&self, key: &str) -> MetatabResult<&VarEntry> {
        self.entries
            .get(key)
            .ok_or_else(|| MetatabError::key_not_found(key))
    }

    pub fn get_or(&self, key: &str, default: VarEntry) -> VarEntry {
        self.entries.get(key).cloned().unwrap_or(default)
    }

    /// Arity-checked lookup: 0 or 1 defaults, 2+ is `InvalidArguments`.
    pub fn lookup(&self, key: &str, defaults: &[VarEntry]) -> MetatabResult<VarEntry> {
        match defaults {
            [] => self.get(key).cloned(),
            [default] => Ok(self.get_or(key, default.clone())),
            _ => Err(MetatabError::InvalidArguments(format!(
                "lookup accepts at most one default, got {}",
                defaults.len()
            ))),
        }
    }

    pub fn pop(&mut self, key: &str) -> MetatabResult<VarEntry> {
        self.entries
            .shift_remove(key)
            .ok_or_else(|| MetatabError::key_not_found(key))
    }

    pub fn pop_or(&mut self, key: &str, default: VarEntry) -> VarEntry {
        self.entries.shift_remove(key).unwrap_or(default)
    }

    pub fn take(&mut self, key: &str, defaults: &[VarEntry]) -> MetatabResult<VarEntry> {
        match defaults {
            [] => self.pop(key),
            [default] => Ok(self.pop_or(key, default.clone())),
            _ => Err(MetatabError::InvalidArguments(format!(
                "take accepts at most one default, got {}",
                defaults.len()
            ))),
        }
    }

    pub fn update(&mut self, other: &Variables) {
        for (key, entry) in &other.entries {
            self.entries.insert(key.clone(), entry.clone());
        }
    }

    /// Merge entries from a YAML mapping. Fails with `TypeMismatch` when
    /// given a non-mapping value or an entry that is neither string nor
    /// mapping.
    pub fn update_yaml(&mut self, value: &serde_yaml::Value) -> MetatabResult<()> {
        let mapping = value.as_mapping().ok_or_else(|| {
            MetatabError::TypeMismatch(format!(
                "expected a mapping of column metadata, got {value:?}"
            ))
        })?;
        for (k, v) in mapping {
            let key = k
                .as_str()
                .ok_or_else(|| {
                    MetatabError::TypeMismatch(format!("column names must be strings, got {k:?}"))
                })?
                .to_string();
            self.entries.insert(key, VarEntry::from_yaml(v)?);
        }
        Ok(())
    }

    /// Parse a human-written `"description [unit]"` string into a
    /// description/unit attribute pair. Text without the trailing bracket
    /// syntax is returned unchanged, not an error.
    pub fn parse_string_var(text: &str) -> VarEntry {
        let trimmed = text.trim();
        if let Some(stripped) = trimmed.strip_suffix(']') {
            if let Some((desc, unit)) = stripped.rsplit_once(" [") {
                if !desc.trim().is_empty() {
                    let mut attrs = Attributes::new();
                    attrs.insert("description", desc.trim());
                    attrs.insert("unit", unit.trim());
                    return VarEntry::Map(attrs);
                }
            }
        }
        VarEntry::Text(text.to_string())
    }

    /// Apply `parse_string_var` to every raw-text entry in place.
    pub fn parse_all(&mut self) {
        let keys: Vec<String> = self.entries.keys().cloned().collect();
        for key in keys {
            if let Some(VarEntry::Text(text)) = self.entries.get(&key) {
                let parsed = Self::parse_string_var(text);
                self.entries.insert(key, parsed);
            }
        }
    }

    /// Subset of entries for the given columns, in the given order.
    /// Used when a slice narrows a container to fewer columns.
    pub fn narrow(&self, columns: &[&str]) -> Variables {
        Variables {
            entries: columns
                .iter()
                .filter_map(|c| {
                    self.entries
                        .get(*c)
                        .map(|entry| (c.to_string(), entry.clone()))
                })
                .collect(),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &VarEntry)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

/// A variables container with zero entries equals the null sentinel.
impl PartialEq<Value> for Variables {
    fn eq(&self, other: &Value) -> bool {
        other.is_null() && self.is_empty()
    }
}

impl fmt::Display for Variables {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<Empty Variables>");
        }
        write!(f, "Variables")?;
        for (name, entry) in &self.entries {
            match entry {
                VarEntry::Text(text) => write!(f, "\n    {name}: {text}")?,
                VarEntry::Map(_) => write!(f, "\n    {name}")?,
            }
        }
        Ok(())
    }
}
