//! Free-form attribute container with entry-access policy.
//!
//! `Attributes` distinguishes "key never set" from "key set to null":
//! lookups of a missing key fail with `KeyNotFound` unless a default is
//! supplied. The slice-default variants (`lookup`, `take`) accept at most
//! one default; supplying more is a usage error, not a silent pick.

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{MetatabError, MetatabResult};
use crate::value::Value;

/// Provenance/documentation attributes: string keys to scalar values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Attributes {
    entries: IndexMap<String, Value>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a YAML mapping with scalar values.
    ///
    /// Fails with `TypeMismatch` when given anything other than a mapping,
    /// or when a value is not a scalar.
    pub fn from_yaml(value: &serde_yaml::Value) -> MetatabResult<Self> {
        let mut attrs = Attributes::new();
        attrs.update_yaml(value)?;
        Ok(attrs)
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

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.entries.insert(key.into(), value.into())
    }

    /// Look up a key. Missing keys fail with `KeyNotFound`; a key set to
    /// `Value::Null` succeeds and returns the null.
    pub fn get(&self, key: &str) -> MetatabResult<&Value> {
        self.entries
            .get(key)
            .ok_or_else(|| MetatabError::key_not_found(key))
    }

    /// Look up a key, returning `default` when it is missing.
    pub fn get_or(&self, key: &str, default: Value) -> Value {
        self.entries.get(key).cloned().unwrap_or(default)
    }

    /// Arity-checked lookup: zero defaults behaves like `get`, one default
    /// like `get_or`, and two or more fail with `InvalidArguments`.
    pub fn lookup(&self, key: &str, defaults: &[Value]) -> MetatabResult<Value> {
        match defaults {
            [] => self.get(key).cloned(),
            [default] => Ok(self.get_or(key, default.clone())),
            _ => Err(MetatabError::InvalidArguments(format!(
                "lookup accepts at most one default, got {}",
                defaults.len()
            ))),
        }
    }

    /// Remove and return a key. Missing keys fail with `KeyNotFound`.
    pub fn pop(&mut self, key: &str) -> MetatabResult<Value> {
        self.entries
            .shift_remove(key)
            .ok_or_else(|| MetatabError::key_not_found(key))
    }

    /// Remove and return a key, or `default` when it is missing.
    pub fn pop_or(&mut self, key: &str, default: Value) -> Value {
        self.entries.shift_remove(key).unwrap_or(default)
    }

    /// Arity-checked removal, mirroring `lookup`.
    pub fn take(&mut self, key: &str, defaults: &[Value]) -> MetatabResult<Value> {
        match defaults {
            [] => self.pop(key),
            [default] => Ok(self.pop_or(key, default.clone())),
            _ => Err(MetatabError::InvalidArguments(format!(
                "take accepts at most one default, got {}",
                defaults.len()
            ))),
        }
    }

    /// Merge entries from another attributes container.
    pub fn update(&mut self, other: &Attributes) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Merge entries from a YAML mapping. Fails with `TypeMismatch` when
    /// given a non-mapping value.
    pub fn update_yaml(&mut self, value: &serde_yaml::Value) -> MetatabResult<()> {
        let mapping = value.as_mapping().ok_or_else(|| {
            MetatabError::TypeMismatch(format!("expected a mapping of attributes, got {value:?}"))
        })?;
        for (k, v) in mapping {
            let key = k
                .as_str()
                .ok_or_else(|| {
                    MetatabError::TypeMismatch(format!("attribute keys must be strings, got {k:?}"))
                })?
                .to_string();
            self.entries.insert(key, Value::from_yaml(v)?);
        }
        Ok(())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }
}

impl FromIterator<(String, Value)> for Attributes {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Attributes {
            entries: iter.into_iter().collect(),
        }
    }
}

/// An attributes container with zero entries equals the null sentinel.
impl PartialEq<Value> for Attributes {
    fn eq(&self, other: &Value) -> bool {
        other.is_null() && self.is_empty()
    }
}

impl fmt::Display for Attributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<Empty Attributes>");
        }
        write!(f, "Attributes")?;
        for (key, value) in &self.entries {
            write!(f, "\n    {key}: {value}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_equals_null_sentinel() {
        let attrs = Attributes::new();
        assert_eq!(attrs, Value::Null);
        assert_eq!(attrs, Attributes::default());
        assert_eq!(attrs.to_string(), "<Empty Attributes>");

        let mut full = Attributes::new();
        full.insert("author", "A");
        assert_ne!(full, Value::Null);
        assert_ne!(full.to_string(), "<Empty Attributes>");
    }

    #[test]
    fn test_missing_key_fails_without_default() {
        let attrs = Attributes::new();
        assert!(matches!(
            attrs.get("missing"),
            Err(MetatabError::KeyNotFound(_))
        ));
        assert!(matches!(
            attrs.lookup("missing", &[]),
            Err(MetatabError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_default_may_be_null() {
        let attrs = Attributes::new();
        assert_eq!(attrs.get_or("missing", Value::Null), Value::Null);
        assert_eq!(
            attrs.lookup("missing", &[Value::Str("x".into())]).unwrap(),
            Value::Str("x".into())
        );
    }

    #[test]
    fn test_two_defaults_is_invalid_arguments() {
        let mut attrs = Attributes::new();
        assert!(matches!(
            attrs.lookup("missing", &[Value::Int(1), Value::Int(2)]),
            Err(MetatabError::InvalidArguments(_))
        ));
        assert!(matches!(
            attrs.take("missing", &[Value::Int(1), Value::Int(2)]),
            Err(MetatabError::InvalidArguments(_))
        ));
    }

    #[test]
    fn test_pop_removes_on_success() {
        let mut attrs = Attributes::new();
        attrs.insert("author", "My Name");
        assert_eq!(attrs.pop("author").unwrap(), Value::Str("My Name".into()));
        assert_eq!(attrs.pop_or("author", Value::Null), Value::Null);
        assert!(matches!(
            attrs.pop("author"),
            Err(MetatabError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_null_value_is_present() {
        let mut attrs = Attributes::new();
        attrs.insert("note", Value::Null);
        assert!(attrs.contains_key("note"));
        assert_eq!(attrs.get("note").unwrap(), &Value::Null);
        // Present-with-null is not the empty sentinel.
        assert_ne!(attrs, Value::Null);
    }

    #[test]
    fn test_update_yaml_rejects_non_mapping() {
        let mut attrs = Attributes::new();
        let not_a_mapping: serde_yaml::Value = serde_yaml::from_str("1").unwrap();
        assert!(matches!(
            attrs.update_yaml(&not_a_mapping),
            Err(MetatabError::TypeMismatch(_))
        ));
    }

    #[test]
    fn test_update_merges_in_order() {
        let mut attrs = Attributes::new();
        attrs.insert("a", 1i64);
        let mut other = Attributes::new();
        other.insert("a", 2i64);
        other.insert("b", 3i64);
        attrs.update(&other);
        assert_eq!(attrs.get("a").unwrap(), &Value::Int(2));
        assert_eq!(attrs.get("b").unwrap(), &Value::Int(3));
    }
}
