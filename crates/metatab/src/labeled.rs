//! Labeled multi-dimensional arrays.
//!
//! This is the array side of the projection boundary: a named-axis array
//! built from a flat value sequence plus coordinate labels, and a dataset
//! composing several arrays over shared axes. Metadata attaches per array
//! and per dataset and survives serialization.

use indexmap::IndexMap;
use ndarray::{ArrayD, IxDyn};
use serde::Serialize;
use std::collections::HashMap;

use crate::attrs::Attributes;
use crate::error::{MetatabError, MetatabResult};
use crate::value::Value;

/// A labeled N-dimensional array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataArray {
    pub name: Option<String>,
    /// Axis names, in storage order.
    pub dims: Vec<String>,
    /// Axis labels, keyed by dimension name.
    pub coords: IndexMap<String, Vec<Value>>,
    pub values: ArrayD<Value>,
    pub attrs: Attributes,
}

impl DataArray {
    /// Build a dense array from index tuples.
    ///
    /// Each tuple addresses one value: per dimension, the distinct labels
    /// (in order of first appearance) become the axis coordinates, and the
    /// value lands at the tuple's position. Unaddressed positions are
    /// `Value::Null`. Duplicate tuples overwrite, last write wins.
    pub fn from_indexed(
        name: Option<String>,
        dims: &[String],
        tuples: &[Vec<Value>],
        values: &[Value],
        attrs: Attributes,
    ) -> MetatabResult<Self> {
        if dims.is_empty() {
            return Err(MetatabError::ShapeMismatch(
                "cannot build an array with zero dimensions".to_string(),
            ));
        }
        if tuples.len() != values.len() {
            return Err(MetatabError::ShapeMismatch(format!(
                "{} index tuples for {} values",
                tuples.len(),
                values.len()
            )));
        }

        let mut labels: Vec<Vec<Value>> = vec![Vec::new(); dims.len()];
        let mut positions: Vec<HashMap<Value, usize>> = vec![HashMap::new(); dims.len()];

        for tuple in tuples {
            if tuple.len() != dims.len() {
                return Err(MetatabError::ShapeMismatch(format!(
                    "index tuple has {} labels for {} dimensions",
                    tuple.len(),
                    dims.len()
                )));
            }
            for (d, label) in tuple.iter().enumerate() {
                if !positions[d].contains_key(label) {
                    positions[d].insert(label.clone(), labels[d].len());
                    labels[d].push(label.clone());
                }
            }
        }

        let shape: Vec<usize> = labels.iter().map(Vec::len).collect();
        let mut array = ArrayD::from_elem(IxDyn(&shape), Value::Null);

        for (tuple, value) in tuples.iter().zip(values) {
            let idx: Vec<usize> = tuple
                .iter()
                .enumerate()
                .map(|(d, label)| positions[d][label])
                .collect();
            array[IxDyn(&idx)] = value.clone();
        }

        let coords = dims
            .iter()
            .cloned()
            .zip(labels)
            .collect::<IndexMap<_, _>>();

        Ok(DataArray {
            name,
            dims: dims.to_vec(),
            coords,
            values: array,
            attrs,
        })
    }

    pub fn shape(&self) -> &[usize] {
        self.values.shape()
    }

    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }

    /// Number of unaddressed (null) positions.
    pub fn count_nulls(&self) -> usize {
        self.values.iter().filter(|v| v.is_null()).count()
    }

    /// Axis labels for a dimension.
    pub fn dim_labels(&self, dim: &str) -> MetatabResult<&[Value]> {
        self.coords
            .get(dim)
            .map(Vec::as_slice)
            .ok_or_else(|| MetatabError::key_not_found(dim))
    }
}

/// Several labeled arrays sharing axes, plus dataset-level metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Dataset {
    /// Shared axis labels, keyed by dimension name.
    pub dims: IndexMap<String, Vec<Value>>,
    /// Auxiliary coordinate arrays (derived coordinates).
    pub coords: IndexMap<String, DataArray>,
    pub data_vars: IndexMap<String, DataArray>,
    pub attrs: Attributes,
}

impl Dataset {
    pub fn var(&self, name: &str) -> MetatabResult<&DataArray> {
        self.data_vars
            .get(name)
            .ok_or_else(|| MetatabError::key_not_found(name))
    }

    pub fn coord(&self, name: &str) -> MetatabResult<&DataArray> {
        self.coords
            .get(name)
            .ok_or_else(|| MetatabError::key_not_found(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuples(pairs: &[(i64, &str)]) -> Vec<Vec<Value>> {
        pairs
            .iter()
            .map(|(i, s)| vec![Value::Int(*i), Value::Str(s.to_string())])
            .collect()
    }

    #[test]
    fn test_from_indexed_dense_fill() {
        let dims = vec!["ind".to_string(), "kind".to_string()];
        // 2x2 grid with one combination missing.
        let index = tuples(&[(0, "a"), (0, "b"), (1, "a")]);
        let values = vec![Value::Int(10), Value::Int(20), Value::Int(30)];
        let array =
            DataArray::from_indexed(None, &dims, &index, &values, Attributes::new()).unwrap();

        assert_eq!(array.shape(), &[2, 2]);
        assert_eq!(array.count_nulls(), 1);
        assert_eq!(array.values[IxDyn(&[0, 1])], Value::Int(20));
        assert_eq!(array.values[IxDyn(&[1, 1])], Value::Null);
        assert_eq!(
            array.dim_labels("kind").unwrap(),
            &[Value::Str("a".into()), Value::Str("b".into())]
        );
    }

    #[test]
    fn test_from_indexed_label_order_is_first_appearance() {
        let dims = vec!["ind".to_string()];
        let index = vec![
            vec![Value::Int(5)],
            vec![Value::Int(2)],
            vec![Value::Int(5)],
        ];
        let values = vec![Value::Int(1), Value::Int(2), Value::Int(3)];
        let array =
            DataArray::from_indexed(None, &dims, &index, &values, Attributes::new()).unwrap();
        assert_eq!(array.dim_labels("ind").unwrap(), &[Value::Int(5), Value::Int(2)]);
        // Duplicate tuple overwrote the first write.
        assert_eq!(array.values[IxDyn(&[0])], Value::Int(3));
    }

    #[test]
    fn test_serializes_with_labels_and_attrs() {
        let dims = vec!["ind".to_string()];
        let index = vec![vec![Value::Int(0)], vec![Value::Int(1)]];
        let values = vec![Value::Float(1.5), Value::Null];
        let mut attrs = Attributes::new();
        attrs.insert("unit", "C");
        let array =
            DataArray::from_indexed(Some("t".to_string()), &dims, &index, &values, attrs)
                .unwrap();

        let json = serde_json::to_value(&array).unwrap();
        assert_eq!(json["name"], "t");
        assert_eq!(json["coords"]["ind"], serde_json::json!([0, 1]));
        assert_eq!(json["attrs"]["unit"], "C");
    }

    #[test]
    fn test_from_indexed_shape_validation() {
        let dims = vec!["ind".to_string()];
        let err = DataArray::from_indexed(
            None,
            &dims,
            &[vec![Value::Int(0)]],
            &[],
            Attributes::new(),
        )
        .unwrap_err();
        assert!(matches!(err, MetatabError::ShapeMismatch(_)));

        let err = DataArray::from_indexed(None, &[], &[], &[], Attributes::new()).unwrap_err();
        assert!(matches!(err, MetatabError::ShapeMismatch(_)));
    }
}
