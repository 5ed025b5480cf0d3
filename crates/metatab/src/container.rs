//! Metadata-bearing containers over tabular data.
//!
//! A [`Container`] composes a tabular value (1-D, 2-D, or 3-D) with exactly
//! one instance each of [`Attributes`], [`Variables`], and [`Coordinates`].
//! The container annotates the tabular object, it does not own its storage
//! semantics: mutating the index through [`Container::data_mut`] requires an
//! explicit [`Container::update_coords`] call afterwards — nothing
//! re-derives metadata implicitly.
//!
//! Dimension transitions (`column`, `expand_to_frame`, `to_panel`, `item`,
//! `drop_coord`) produce a new container that receives a copy of the
//! metadata; Attributes and Variables are copied by value and Coordinates
//! are revalidated against the new index.

use std::fmt;

use indexmap::IndexMap;
use tracing::debug;

use crate::attrs::Attributes;
use crate::coords::Coordinates;
use crate::error::{MetatabError, MetatabResult};
use crate::graph::Declaration;
use crate::table::{DataFrame, Index, Panel, Series};
use crate::variables::Variables;

/// Maximum rendered width of a per-coordinate value preview.
const COORD_PREVIEW_WIDTH: usize = 50;

/// The wrapped tabular value.
#[derive(Debug, Clone, PartialEq)]
pub enum TableData {
    Series(Series),
    Frame(DataFrame),
    Panel(Panel),
}

impl TableData {
    pub fn ndim(&self) -> usize {
        match self {
            TableData::Series(_) => 1,
            TableData::Frame(_) => 2,
            TableData::Panel(_) => 3,
        }
    }

    pub fn shape(&self) -> Vec<usize> {
        match self {
            TableData::Series(s) => vec![s.len()],
            TableData::Frame(f) => vec![f.len(), f.ncols()],
            TableData::Panel(p) => {
                let (rows, cols) = p
                    .item_names()
                    .next()
                    .and_then(|n| p.item(n).ok())
                    .map_or((0, 0), |f| (f.len(), f.ncols()));
                vec![p.len(), rows, cols]
            }
        }
    }

    /// The index the metadata describes. For panels this is the first
    /// item's index.
    pub fn index(&self) -> Option<&Index> {
        match self {
            TableData::Series(s) => Some(s.index()),
            TableData::Frame(f) => Some(f.index()),
            TableData::Panel(p) => p.first_index(),
        }
    }
}

/// Metadata arguments for container construction.
#[derive(Debug, Clone, Default)]
pub struct ContainerOptions {
    pub attrs: Attributes,
    pub coords: Option<Declaration>,
    pub variables: Option<Variables>,
}

impl ContainerOptions {
    /// Split a YAML attribute mapping into metadata parts.
    ///
    /// The `coords` and `variables` keys nest their respective declarations
    /// inside the attribute mapping; every other key (including the
    /// reserved `version`) becomes an attribute.
    pub fn from_yaml(value: &serde_yaml::Value) -> MetatabResult<Self> {
        let mapping = value.as_mapping().ok_or_else(|| {
            MetatabError::TypeMismatch(format!("expected an attribute mapping, got {value:?}"))
        })?;

        let mut opts = ContainerOptions::default();
        let mut rest = serde_yaml::Mapping::new();
        for (k, v) in mapping {
            match k.as_str() {
                Some("coords") => {
                    let decl: Declaration = serde_yaml::from_value(v.clone())?;
                    opts.coords = Some(decl);
                }
                Some("variables") => {
                    opts.variables = Some(Variables::from_yaml(v)?);
                }
                _ => {
                    rest.insert(k.clone(), v.clone());
                }
            }
        }
        opts.attrs = Attributes::from_yaml(&serde_yaml::Value::Mapping(rest))?;
        Ok(opts)
    }

    /// Overlay directly supplied parts on top of these options; the
    /// directly supplied values take precedence on conflict.
    pub fn overlay(mut self, preferred: ContainerOptions) -> ContainerOptions {
        self.attrs.update(&preferred.attrs);
        if preferred.coords.is_some() {
            self.coords = preferred.coords;
        }
        if preferred.variables.is_some() {
            self.variables = preferred.variables;
        }
        self
    }
}

/// A tabular value plus its attached metadata.
#[derive(Debug, Clone)]
pub struct Container {
    data: TableData,
    attrs: Attributes,
    coords: Coordinates,
    variables: Variables,
}

impl Container {
    /// Construct a container, inferring coordinates from the index level
    /// names when no declaration is supplied. Unnamed levels are assigned
    /// synthetic names (`index` for a single level, `level_{i}` otherwise),
    /// applied to the index itself so level lookups stay consistent.
    pub fn new(mut data: TableData, options: ContainerOptions) -> MetatabResult<Self> {
        let coords = match options.coords {
            Some(declaration) => Coordinates::new(declaration)?,
            None => Coordinates::new(infer_declaration(&mut data)?)?,
        };
        Ok(Container {
            data,
            attrs: options.attrs,
            coords,
            variables: options.variables.unwrap_or_default(),
        })
    }

    pub fn from_series(series: Series, options: ContainerOptions) -> MetatabResult<Self> {
        Self::new(TableData::Series(series), options)
    }

    pub fn from_frame(frame: DataFrame, options: ContainerOptions) -> MetatabResult<Self> {
        Self::new(TableData::Frame(frame), options)
    }

    pub fn from_panel(panel: Panel, options: ContainerOptions) -> MetatabResult<Self> {
        Self::new(TableData::Panel(panel), options)
    }

    pub fn data(&self) -> &TableData {
        &self.data
    }

    /// Mutable access to the tabular value.
    ///
    /// Metadata is not re-derived on mutation: after changing the index
    /// shape or names, call [`Container::update_coords`].
    pub fn data_mut(&mut self) -> &mut TableData {
        &mut self.data
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn attrs_mut(&mut self) -> &mut Attributes {
        &mut self.attrs
    }

    pub fn coords(&self) -> &Coordinates {
        &self.coords
    }

    /// Replace the coordinate declaration wholesale (revalidated).
    pub fn set_coords(&mut self, declaration: Declaration) -> MetatabResult<()> {
        self.coords = Coordinates::new(declaration)?;
        Ok(())
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut Variables {
        &mut self.variables
    }

    pub fn set_variables(&mut self, variables: Variables) {
        self.variables = variables;
    }

    pub fn ndim(&self) -> usize {
        self.data.ndim()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.data.shape()
    }

    /// Base coordinates of the current declaration.
    pub fn base_coords(&self) -> &[String] {
        self.coords.base_coords()
    }

    /// Re-synchronize coordinate metadata with the index.
    ///
    /// With a declaration, merges it into the existing coordinates and
    /// revalidates (atomic on failure). Without one, re-infers an all-base
    /// declaration from the index level names, assigning synthetic names to
    /// unnamed levels first. This is an explicit step in the public
    /// contract: it must be called after any externally driven index
    /// mutation the container did not itself perform.
    pub fn update_coords(&mut self, coords: Option<&Declaration>) -> MetatabResult<()> {
        match coords {
            Some(declaration) => self.coords.update(declaration),
            None => {
                let declaration = infer_declaration(&mut self.data)?;
                self.coords.update(&declaration)
            }
        }
    }

    /// Slice one column out of a 2-D container, producing a 1-D container.
    ///
    /// Attributes are copied, Variables are narrowed to the selected
    /// column, and Coordinates are revalidated against the (unchanged)
    /// index.
    pub fn column(&self, name: &str) -> MetatabResult<Container> {
        let TableData::Frame(frame) = &self.data else {
            return Err(MetatabError::TypeMismatch(
                "column slicing requires a 2-D container".to_string(),
            ));
        };
        let series = frame.column(name)?;
        Ok(Container {
            data: TableData::Series(series),
            attrs: self.attrs.clone(),
            coords: Coordinates::new(self.coords.declaration().clone())?,
            variables: self.variables.narrow(&[name]),
        })
    }

    /// Expand a 1-D container into a single-column 2-D container.
    pub fn expand_to_frame(&self) -> MetatabResult<Container> {
        let TableData::Series(series) = &self.data else {
            return Err(MetatabError::TypeMismatch(
                "expansion requires a 1-D container".to_string(),
            ));
        };
        let column_name = series.name.clone().unwrap_or_else(|| "values".to_string());
        let mut columns = IndexMap::new();
        columns.insert(column_name, series.values().to_vec());
        let frame = DataFrame::new(series.index().clone(), columns)?;
        Ok(Container {
            data: TableData::Frame(frame),
            attrs: self.attrs.clone(),
            coords: Coordinates::new(self.coords.declaration().clone())?,
            variables: self.variables.clone(),
        })
    }

    /// Expand a 2-D container into a single-item 3-D container.
    pub fn to_panel(&self, item_name: impl Into<String>) -> MetatabResult<Container> {
        let TableData::Frame(frame) = &self.data else {
            return Err(MetatabError::TypeMismatch(
                "panel expansion requires a 2-D container".to_string(),
            ));
        };
        let mut items = IndexMap::new();
        items.insert(item_name.into(), frame.clone());
        Ok(Container {
            data: TableData::Panel(Panel::new(items)),
            attrs: self.attrs.clone(),
            coords: Coordinates::new(self.coords.declaration().clone())?,
            variables: self.variables.clone(),
        })
    }

    /// Slice one item out of a 3-D container, producing a 2-D container.
    pub fn item(&self, name: &str) -> MetatabResult<Container> {
        let TableData::Panel(panel) = &self.data else {
            return Err(MetatabError::TypeMismatch(
                "item slicing requires a 3-D container".to_string(),
            ));
        };
        let frame = panel.item(name)?.clone();
        Ok(Container {
            data: TableData::Frame(frame),
            attrs: self.attrs.clone(),
            coords: Coordinates::new(self.coords.declaration().clone())?,
            variables: self.variables.clone(),
        })
    }

    /// Remove a coordinate and its index level, producing a new container.
    ///
    /// The reduced declaration is revalidated: removing the last base
    /// coordinate fails with `EmptyBaseSet`, and removing a coordinate that
    /// others depend on fails with `KeyNotFound`. On failure the source
    /// container is untouched.
    pub fn drop_coord(&self, name: &str) -> MetatabResult<Container> {
        let mut declaration = self.coords.declaration().clone();
        declaration
            .shift_remove(name)
            .ok_or_else(|| MetatabError::key_not_found(name))?;
        let coords = Coordinates::new(declaration)?;
        debug!(coord = name, "dropping coordinate");

        let data = match &self.data {
            TableData::Series(series) => {
                let (index, _) = series.index().drop_level(name)?;
                TableData::Series(Series::new(
                    series.name.clone(),
                    index,
                    series.values().to_vec(),
                )?)
            }
            TableData::Frame(frame) => {
                let (index, _) = frame.index().drop_level(name)?;
                let columns = frame
                    .column_names()
                    .map(|c| {
                        frame
                            .column_values(c)
                            .map(|values| (c.clone(), values.to_vec()))
                    })
                    .collect::<MetatabResult<IndexMap<_, _>>>()?;
                TableData::Frame(DataFrame::new(index, columns)?)
            }
            TableData::Panel(_) => {
                return Err(MetatabError::NotImplemented(
                    "coordinate removal on 3-D containers".to_string(),
                ))
            }
        };

        Ok(Container {
            data,
            attrs: self.attrs.clone(),
            coords,
            variables: self.variables.clone(),
        })
    }

    fn coord_preview(&self, name: &str, base: bool) -> String {
        let marker = if base { "  * " } else { "    " };
        let deps = if base {
            name.to_string()
        } else {
            match self.coords.dependencies(name) {
                Ok(Some(set)) => set.iter().cloned().collect::<Vec<_>>().join(","),
                _ => String::new(),
            }
        };
        let mut line = format!("{marker}{name: <10} ({deps})");

        let Some(index) = self.data.index() else {
            return line;
        };
        let Ok(values) = index.level_values(name) else {
            return line;
        };
        if let Some(first) = values.iter().find(|v| !v.is_null()) {
            line.push_str(&format!(" {} ", first.dtype()));
        }
        for (i, value) in values.iter().enumerate() {
            let rendered = value.to_string();
            if line.len() + rendered.len() + 5 > COORD_PREVIEW_WIDTH {
                line.push_str("...");
                return line;
            }
            if i > 0 {
                line.push_str(", ");
            }
            line.push_str(&rendered);
        }
        line
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = self
            .shape()
            .iter()
            .map(usize::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(f, "<metatab.Container ({shape})>")?;

        match &self.data {
            TableData::Series(s) => write!(f, "{s}")?,
            TableData::Frame(frame) => write!(f, "{frame}")?,
            TableData::Panel(p) => write!(f, "{p}")?,
        }

        if !self.coords.is_empty() {
            write!(f, "\n\nCoordinates")?;
            for base in self.coords.base_coords() {
                write!(f, "\n{}", self.coord_preview(base, true))?;
            }
            let derived: Vec<String> = self
                .coords
                .names()
                .filter(|n| !self.coords.is_base(n))
                .cloned()
                .collect();
            for name in derived {
                write!(f, "\n{}", self.coord_preview(&name, false))?;
            }
        }

        if matches!(self.data, TableData::Frame(_)) && !self.variables.is_empty() {
            write!(f, "\n{}", self.variables)?;
        }

        if !self.attrs.is_empty() {
            write!(f, "\n{}", self.attrs)?;
        }
        Ok(())
    }
}

/// Infer an all-base declaration from the index level names, assigning
/// synthetic names to unnamed levels and writing them back to the index.
fn infer_declaration(data: &mut TableData) -> MetatabResult<Declaration> {
    let names = match data {
        TableData::Series(series) => name_levels(series.index_mut())?,
        TableData::Frame(frame) => name_levels(frame.index_mut())?,
        TableData::Panel(panel) => panel
            .first_index()
            .map(|index| {
                index
                    .names()
                    .iter()
                    .enumerate()
                    .map(|(i, n)| synthetic_name(n.as_deref(), i, index.nlevels()))
                    .collect()
            })
            .unwrap_or_default(),
    };
    Ok(names.into_iter().map(|n| (n, None)).collect())
}

fn name_levels(index: &mut Index) -> MetatabResult<Vec<String>> {
    let nlevels = index.nlevels();
    let names: Vec<String> = index
        .names()
        .iter()
        .enumerate()
        .map(|(i, n)| synthetic_name(n.as_deref(), i, nlevels))
        .collect();
    index.set_names(names.iter().cloned().map(Some).collect())?;
    Ok(names)
}

fn synthetic_name(name: Option<&str>, position: usize, nlevels: usize) -> String {
    match name {
        Some(n) => n.to_string(),
        None if nlevels == 1 => "index".to_string(),
        None => format!("level_{position}"),
    }
}
