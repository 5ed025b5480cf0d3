//! Projection from indexed containers to labeled arrays.
//!
//! Only base coordinates become array axes. Derived coordinates become
//! auxiliary 1-D arrays indexed by the base coordinates they depend on,
//! and data columns become arrays over the full base set. 3-D containers
//! do not project directly; slice them down to 2-D first.

use tracing::debug;

use crate::attrs::Attributes;
use crate::container::{Container, TableData};
use crate::error::{MetatabError, MetatabResult};
use crate::labeled::{DataArray, Dataset};
use crate::table::Index;
use crate::value::Value;

impl Container {
    /// Project into a single labeled array.
    ///
    /// 1-D containers project directly: the index tuples restricted to the
    /// base coordinates address the array. 2-D containers stack their
    /// columns as an extra dimension first, auto-naming the column axis,
    /// then follow the 1-D path.
    pub fn to_dataarray(&self) -> MetatabResult<DataArray> {
        match self.data() {
            TableData::Series(series) => {
                let dims = self.base_dims()?;
                let tuples = base_tuples(series.index(), &dims)?;
                debug!(ndim = dims.len(), rows = series.len(), "projecting 1-D container");
                DataArray::from_indexed(
                    series.name.clone(),
                    &dims,
                    &tuples,
                    series.values(),
                    self.attrs().clone(),
                )
            }
            TableData::Frame(frame) => {
                let base = self.base_dims()?;
                let col_dim = format!("ind_{}", frame.index().nlevels());
                let mut dims = base.clone();
                dims.push(col_dim);

                let row_tuples = base_tuples(frame.index(), &base)?;
                let mut tuples = Vec::with_capacity(frame.len() * frame.ncols());
                let mut values = Vec::with_capacity(frame.len() * frame.ncols());
                for column in frame.column_names() {
                    for (row, value) in frame.column_values(column)?.iter().enumerate() {
                        let mut tuple = row_tuples[row].clone();
                        tuple.push(Value::Str(column.clone()));
                        tuples.push(tuple);
                        values.push(value.clone());
                    }
                }
                debug!(
                    ndim = dims.len(),
                    columns = frame.ncols(),
                    "stacking 2-D container into a single array"
                );
                DataArray::from_indexed(None, &dims, &tuples, &values, self.attrs().clone())
            }
            TableData::Panel(_) => Err(MetatabError::NotImplemented(
                "projection of 3-D containers; reduce to 2-D first".to_string(),
            )),
        }
    }

    /// Project into a labeled dataset.
    ///
    /// For 2-D containers: every derived coordinate becomes a 1-D array
    /// indexed by its base-dependency set, every data column becomes an
    /// array over the base coordinates with its Variables entry attached,
    /// and the container's Attributes become dataset-level metadata. A 1-D
    /// container wraps its single projected array.
    pub fn to_dataset(&self) -> MetatabResult<Dataset> {
        match self.data() {
            TableData::Series(series) => {
                let array = self.to_dataarray()?;
                let name = series
                    .name
                    .clone()
                    .unwrap_or_else(|| "values".to_string());
                let mut dataset = Dataset {
                    attrs: self.attrs().clone(),
                    ..Dataset::default()
                };
                dataset.dims = array.coords.clone();
                dataset.data_vars.insert(name, array);
                Ok(dataset)
            }
            TableData::Frame(frame) => {
                let base = self.base_dims()?;
                let mut dataset = Dataset {
                    attrs: self.attrs().clone(),
                    ..Dataset::default()
                };

                // Derived coordinates, each over its own base-dependency set.
                for name in self.coords().names() {
                    if self.coords().is_base(name) {
                        continue;
                    }
                    let deps = self.coords().base_dependencies(name)?;
                    let dims: Vec<String> = base
                        .iter()
                        .filter(|b| deps.contains(*b))
                        .cloned()
                        .collect();
                    if dims.is_empty() {
                        continue;
                    }
                    let tuples = base_tuples(frame.index(), &dims)?;
                    let values = frame.index().level_values(name)?;
                    let array = DataArray::from_indexed(
                        Some(name.clone()),
                        &dims,
                        &tuples,
                        values,
                        Attributes::new(),
                    )?;
                    dataset.coords.insert(name.clone(), array);
                }

                // Data columns over the full base set.
                let tuples = base_tuples(frame.index(), &base)?;
                for column in frame.column_names() {
                    let attrs = self
                        .variables()
                        .get(column)
                        .map(|entry| entry.to_attrs())
                        .unwrap_or_default();
                    let array = DataArray::from_indexed(
                        Some(column.clone()),
                        &base,
                        &tuples,
                        frame.column_values(column)?,
                        attrs,
                    )?;
                    if dataset.dims.is_empty() {
                        dataset.dims = array.coords.clone();
                    }
                    dataset.data_vars.insert(column.clone(), array);
                }
                debug!(
                    vars = dataset.data_vars.len(),
                    coords = dataset.coords.len(),
                    "projected 2-D container"
                );
                Ok(dataset)
            }
            TableData::Panel(_) => Err(MetatabError::NotImplemented(
                "projection of 3-D containers; reduce to 2-D first".to_string(),
            )),
        }
    }

    fn base_dims(&self) -> MetatabResult<Vec<String>> {
        let base = self.base_coords();
        if base.is_empty() {
            return Err(MetatabError::EmptyBaseSet);
        }
        Ok(base.to_vec())
    }
}

/// The per-row label tuples for the given index levels.
fn base_tuples(index: &Index, dims: &[String]) -> MetatabResult<Vec<Vec<Value>>> {
    let levels: Vec<&[Value]> = dims
        .iter()
        .map(|d| index.level_values(d))
        .collect::<MetatabResult<_>>()?;
    Ok((0..index.len())
        .map(|row| levels.iter().map(|level| level[row].clone()).collect())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerOptions;
    use crate::graph::{Declaration, DepSpec};
    use crate::table::{DataFrame, Series};
    use crate::variables::Variables;
    use indexmap::IndexMap;
    use ndarray::IxDyn;

    fn region_frame() -> DataFrame {
        let index = crate::table::Index::from_levels(vec![
            (
                Some("ind".to_string()),
                vec![Value::Int(0), Value::Int(1), Value::Int(2)],
            ),
            (
                Some("region".to_string()),
                vec![
                    Value::Str("north".into()),
                    Value::Str("north".into()),
                    Value::Str("south".into()),
                ],
            ),
        ])
        .unwrap();
        let mut columns = IndexMap::new();
        columns.insert(
            "col1".to_string(),
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
        );
        columns.insert(
            "col2".to_string(),
            vec![Value::Int(4), Value::Int(5), Value::Int(6)],
        );
        DataFrame::new(index, columns).unwrap()
    }

    fn region_container() -> Container {
        let mut decl = Declaration::new();
        decl.insert("ind".to_string(), None);
        decl.insert("region".to_string(), Some(DepSpec::One("ind".to_string())));
        let mut variables = Variables::new();
        variables.insert("col1", "The first column [wigits]");
        let mut options = ContainerOptions {
            coords: Some(decl),
            variables: Some(variables),
            ..ContainerOptions::default()
        };
        options.attrs.insert("author", "A");
        let mut container = Container::from_frame(region_frame(), options).unwrap();
        container.variables_mut().parse_all();
        container
    }

    #[test]
    fn test_derived_coord_is_indexed_solely_by_base() {
        let dataset = region_container().to_dataset().unwrap();

        let region = dataset.coord("region").unwrap();
        assert_eq!(region.dims, vec!["ind".to_string()]);
        assert_eq!(region.count_nulls(), 0);
        assert_eq!(region.shape(), &[3]);

        // Data variables span the base set only; no missing positions.
        let col1 = dataset.var("col1").unwrap();
        assert_eq!(col1.dims, vec!["ind".to_string()]);
        assert_eq!(col1.count_nulls(), 0);
        let col2 = dataset.var("col2").unwrap();
        assert_eq!(col2.count_nulls(), 0);
    }

    #[test]
    fn test_variable_attrs_attach_to_projected_arrays() {
        let dataset = region_container().to_dataset().unwrap();
        let col1 = dataset.var("col1").unwrap();
        assert_eq!(
            col1.attrs.get("unit").unwrap(),
            &Value::Str("wigits".into())
        );
        assert_eq!(
            dataset.attrs.get("author").unwrap(),
            &Value::Str("A".into())
        );
    }

    #[test]
    fn test_1d_projection_over_two_base_coords() {
        let index = crate::table::Index::from_levels(vec![
            (
                Some("x".to_string()),
                vec![Value::Int(0), Value::Int(0), Value::Int(1)],
            ),
            (
                Some("y".to_string()),
                vec![Value::Int(0), Value::Int(1), Value::Int(0)],
            ),
        ])
        .unwrap();
        let series = Series::new(
            Some("t".to_string()),
            index,
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
        )
        .unwrap();
        let container =
            Container::from_series(series, ContainerOptions::default()).unwrap();

        let array = container.to_dataarray().unwrap();
        assert_eq!(array.dims, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(array.shape(), &[2, 2]);
        // The (1, 1) combination never appears in the index.
        assert_eq!(array.count_nulls(), 1);
        assert_eq!(array.values[IxDyn(&[0, 1])], Value::Float(2.0));
    }

    #[test]
    fn test_2d_to_dataarray_stacks_columns() {
        let container = region_container();
        let array = container.to_dataarray().unwrap();

        // Base axis plus the auto-named column axis.
        assert_eq!(array.dims, vec!["ind".to_string(), "ind_2".to_string()]);
        assert_eq!(array.shape(), &[3, 2]);
        assert_eq!(
            array.dim_labels("ind_2").unwrap(),
            &[Value::Str("col1".into()), Value::Str("col2".into())]
        );
        assert_eq!(array.values[IxDyn(&[1, 0])], Value::Float(2.0));
        assert_eq!(array.values[IxDyn(&[1, 1])], Value::Int(5));
    }

    #[test]
    fn test_3d_projection_is_not_implemented() {
        let panel = region_container().to_panel("run1").unwrap();
        assert!(matches!(
            panel.to_dataset(),
            Err(MetatabError::NotImplemented(_))
        ));
        assert!(matches!(
            panel.to_dataarray(),
            Err(MetatabError::NotImplemented(_))
        ));

        // The escape hatch: slice to 2-D, then project.
        let frame = panel.item("run1").unwrap();
        assert!(frame.to_dataset().is_ok());
    }
}
