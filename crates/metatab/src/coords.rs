//! Container-facing coordinate metadata.
//!
//! `Coordinates` wraps a [`CoordinateGraph`] and exposes the declaration
//! map, the base coordinate list, and per-coordinate base-dependency sets.
//! Equality is structural over the declaration map.

use std::fmt;

use indexmap::IndexSet;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::MetatabResult;
use crate::graph::{CoordinateGraph, Declaration, DepSpec};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Coordinates {
    graph: CoordinateGraph,
}

impl Coordinates {
    /// Validate a declaration into coordinate metadata.
    pub fn new(declaration: Declaration) -> MetatabResult<Self> {
        Ok(Coordinates {
            graph: CoordinateGraph::build(declaration)?,
        })
    }

    /// All-base coordinates from a list of level names.
    pub fn from_names<I, S>(names: I) -> MetatabResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(Coordinates {
            graph: CoordinateGraph::from_names(names)?,
        })
    }

    pub fn declaration(&self) -> &Declaration {
        self.graph.declaration()
    }

    pub fn base_coords(&self) -> &[String] {
        self.graph.base_coords()
    }

    pub fn is_base(&self, name: &str) -> bool {
        self.graph.is_base(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.graph.declaration().contains_key(name)
    }

    /// The dependency spec declared for a coordinate.
    pub fn get(&self, name: &str) -> MetatabResult<&Option<DepSpec>> {
        self.graph
            .declaration()
            .get(name)
            .ok_or_else(|| crate::error::MetatabError::key_not_found(name))
    }

    /// Direct dependencies of a coordinate (`None` for a base coordinate).
    pub fn dependencies(&self, name: &str) -> MetatabResult<Option<&IndexSet<String>>> {
        self.graph.dependencies(name)
    }

    pub fn base_dependencies(&self, name: &str) -> MetatabResult<&IndexSet<String>> {
        self.graph.base_dependencies(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.graph.coord_names()
    }

    pub fn len(&self) -> usize {
        self.graph.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.is_empty()
    }

    /// Merge `additions` into the declaration and revalidate.
    ///
    /// Atomic: on failure the previous coordinates remain in place.
    pub fn update(&mut self, additions: &Declaration) -> MetatabResult<()> {
        self.graph = self.graph.update(additions)?;
        Ok(())
    }
}

impl PartialEq<Declaration> for Coordinates {
    fn eq(&self, other: &Declaration) -> bool {
        self.graph.declaration() == other
    }
}

impl Serialize for Coordinates {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.graph.declaration().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Coordinates {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let declaration = Declaration::deserialize(deserializer)?;
        Coordinates::new(declaration).map_err(D::Error::custom)
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "<Empty Coordinates>");
        }
        write!(f, "Coordinates")?;
        for base in self.base_coords() {
            write!(f, "\n  * {base: <10} ({base})")?;
        }
        for name in self.names() {
            if self.is_base(name) {
                continue;
            }
            let deps = match self.dependencies(name) {
                Ok(Some(set)) => set.iter().cloned().collect::<Vec<_>>().join(","),
                _ => String::new(),
            };
            write!(f, "\n    {name: <10} ({deps})")?;
        }
        Ok(())
    }
}
