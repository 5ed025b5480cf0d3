//! Minimal in-memory tabular engine.
//!
//! This module is the boundary to the "tabular computation engine" the
//! metadata layer annotates: a labeled, possibly multi-level index plus
//! column storage, with the operations the container layer needs (value
//! access, index get/set, level renaming, column slicing, index reset,
//! equality, row iteration). No arithmetic lives here.

use std::fmt;

use indexmap::IndexMap;

use crate::error::{MetatabError, MetatabResult};
use crate::value::Value;

/// A row index with one or more labeled levels.
#[derive(Debug, Clone, PartialEq)]
pub struct Index {
    names: Vec<Option<String>>,
    levels: Vec<Vec<Value>>,
}

impl Index {
    /// Default integer range index with a single unnamed level.
    pub fn default_range(len: usize) -> Self {
        Index {
            names: vec![None],
            levels: vec![(0..len as i64).map(Value::Int).collect()],
        }
    }

    /// Single-level index from a name and labels.
    pub fn from_level(name: Option<String>, values: Vec<Value>) -> Self {
        Index {
            names: vec![name],
            levels: vec![values],
        }
    }

    /// Multi-level index. All levels must have the same length.
    pub fn from_levels(levels: Vec<(Option<String>, Vec<Value>)>) -> MetatabResult<Self> {
        let mut names = Vec::with_capacity(levels.len());
        let mut columns = Vec::with_capacity(levels.len());
        let mut len = None;
        for (name, values) in levels {
            match len {
                None => len = Some(values.len()),
                Some(expected) if expected != values.len() => {
                    return Err(MetatabError::ShapeMismatch(format!(
                        "index level '{}' has {} labels, expected {}",
                        name.as_deref().unwrap_or("<unnamed>"),
                        values.len(),
                        expected
                    )))
                }
                _ => {}
            }
            names.push(name);
            columns.push(values);
        }
        Ok(Index {
            names,
            levels: columns,
        })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of levels.
    pub fn nlevels(&self) -> usize {
        self.levels.len()
    }

    pub fn names(&self) -> &[Option<String>] {
        &self.names
    }

    /// Rename the levels. The replacement must cover every level.
    pub fn set_names(&mut self, names: Vec<Option<String>>) -> MetatabResult<()> {
        if names.len() != self.levels.len() {
            return Err(MetatabError::ShapeMismatch(format!(
                "{} names supplied for {} index levels",
                names.len(),
                self.levels.len()
            )));
        }
        self.names = names;
        Ok(())
    }

    /// Position of a named level.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
    }

    /// Labels of a named level.
    pub fn level_values(&self, name: &str) -> MetatabResult<&[Value]> {
        let pos = self
            .position(name)
            .ok_or_else(|| MetatabError::key_not_found(name))?;
        Ok(&self.levels[pos])
    }

    /// The label tuple of one row.
    pub fn row(&self, i: usize) -> Vec<Value> {
        self.levels.iter().map(|level| level[i].clone()).collect()
    }

    /// Project the index onto a subset of named levels, in the given order.
    pub fn select_levels(&self, names: &[&str]) -> MetatabResult<Index> {
        let mut levels = Vec::with_capacity(names.len());
        for name in names {
            levels.push((
                Some(name.to_string()),
                self.level_values(name)?.to_vec(),
            ));
        }
        Index::from_levels(levels)
    }

    /// Remove a named level, returning the reduced index and the removed
    /// labels. Removing the last level leaves a default range index.
    pub fn drop_level(&self, name: &str) -> MetatabResult<(Index, Vec<Value>)> {
        let pos = self
            .position(name)
            .ok_or_else(|| MetatabError::key_not_found(name))?;
        let removed = self.levels[pos].clone();
        let mut names = self.names.clone();
        let mut levels = self.levels.clone();
        names.remove(pos);
        levels.remove(pos);
        if levels.is_empty() {
            return Ok((Index::default_range(removed.len()), removed));
        }
        Ok((Index { names, levels }, removed))
    }
}

/// A 1-D tabular object: an index plus one value column.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub name: Option<String>,
    index: Index,
    values: Vec<Value>,
}

impl Series {
    pub fn new(name: Option<String>, index: Index, values: Vec<Value>) -> MetatabResult<Self> {
        if index.len() != values.len() {
            return Err(MetatabError::ShapeMismatch(format!(
                "series has {} values but the index has {} rows",
                values.len(),
                index.len()
            )));
        }
        Ok(Series {
            name,
            index,
            values,
        })
    }

    /// Series over a default range index.
    pub fn from_values(name: Option<String>, values: Vec<Value>) -> Self {
        let index = Index::default_range(values.len());
        Series {
            name,
            index,
            values,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut Index {
        &mut self.index
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            let labels = self
                .index
                .row(i)
                .iter()
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            write!(f, "{labels: <16} {value}")?;
        }
        Ok(())
    }
}

/// A 2-D tabular object: an index plus named value columns.
#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
    index: Index,
    columns: IndexMap<String, Vec<Value>>,
}

impl DataFrame {
    pub fn new(index: Index, columns: IndexMap<String, Vec<Value>>) -> MetatabResult<Self> {
        for (name, values) in &columns {
            if values.len() != index.len() {
                return Err(MetatabError::ShapeMismatch(format!(
                    "column '{}' has {} values but the index has {} rows",
                    name,
                    values.len(),
                    index.len()
                )));
            }
        }
        Ok(DataFrame { index, columns })
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn index(&self) -> &Index {
        &self.index
    }

    pub fn index_mut(&mut self) -> &mut Index {
        &mut self.index
    }

    pub fn column_names(&self) -> impl Iterator<Item = &String> {
        self.columns.keys()
    }

    pub fn column_values(&self, name: &str) -> MetatabResult<&[Value]> {
        self.columns
            .get(name)
            .map(Vec::as_slice)
            .ok_or_else(|| MetatabError::key_not_found(name))
    }

    /// Slice one column out as a series sharing this frame's index.
    pub fn column(&self, name: &str) -> MetatabResult<Series> {
        let values = self.column_values(name)?.to_vec();
        Series::new(Some(name.to_string()), self.index.clone(), values)
    }

    pub fn insert_column(&mut self, name: impl Into<String>, values: Vec<Value>) -> MetatabResult<()> {
        if values.len() != self.index.len() {
            return Err(MetatabError::ShapeMismatch(format!(
                "column has {} values but the index has {} rows",
                values.len(),
                self.index.len()
            )));
        }
        self.columns.insert(name.into(), values);
        Ok(())
    }

    /// Move the named index levels out of the index and prepend them as
    /// data columns. Resetting every level leaves a default range index.
    pub fn reset_index(&self, levels: &[&str]) -> MetatabResult<DataFrame> {
        let mut index = self.index.clone();
        let mut moved: IndexMap<String, Vec<Value>> = IndexMap::new();
        for name in levels {
            let (reduced, values) = index.drop_level(name)?;
            index = reduced;
            moved.insert(name.to_string(), values);
        }
        let mut columns = moved;
        for (name, values) in &self.columns {
            columns.insert(name.clone(), values.clone());
        }
        DataFrame::new(index, columns)
    }

    /// Move the named data columns into the index (in the given order),
    /// replacing the current index.
    pub fn set_index(&self, columns: &[&str]) -> MetatabResult<DataFrame> {
        let mut levels = Vec::with_capacity(columns.len());
        let mut remaining = self.columns.clone();
        for name in columns {
            let values = remaining
                .shift_remove(*name)
                .ok_or_else(|| MetatabError::key_not_found(*name))?;
            levels.push((Some(name.to_string()), values));
        }
        DataFrame::new(Index::from_levels(levels)?, remaining)
    }

    /// Iterate rows as (index labels, cell values) for serialization.
    pub fn iter_rows(&self) -> impl Iterator<Item = (Vec<Value>, Vec<Value>)> + '_ {
        (0..self.len()).map(move |i| {
            let labels = self.index.row(i);
            let cells = self.columns.values().map(|col| col[i].clone()).collect();
            (labels, cells)
        })
    }
}

impl fmt::Display for DataFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self
            .index
            .names()
            .iter()
            .map(|n| n.clone().unwrap_or_default())
            .chain(self.columns.keys().cloned())
            .collect::<Vec<_>>();
        write!(f, "{}", names.join("\t"))?;
        for (labels, cells) in self.iter_rows() {
            let row = labels
                .iter()
                .chain(cells.iter())
                .map(Value::to_string)
                .collect::<Vec<_>>()
                .join("\t");
            write!(f, "\n{row}")?;
        }
        Ok(())
    }
}

/// A 3-D tabular object: named 2-D frames sharing a conceptual layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    items: IndexMap<String, DataFrame>,
}

impl Panel {
    pub fn new(items: IndexMap<String, DataFrame>) -> Self {
        Panel { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn item_names(&self) -> impl Iterator<Item = &String> {
        self.items.keys()
    }

    pub fn item(&self, name: &str) -> MetatabResult<&DataFrame> {
        self.items
            .get(name)
            .ok_or_else(|| MetatabError::key_not_found(name))
    }

    /// The index of the first item, used for coordinate inference.
    pub fn first_index(&self) -> Option<&Index> {
        self.items.values().next().map(DataFrame::index)
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, name) in self.items.keys().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{name}]")?;
        }
        Ok(())
    }
}
