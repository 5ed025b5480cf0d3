//! Coordinate dependency graph.
//!
//! A coordinate declaration maps each coordinate name to a dependency spec:
//! `None` for a base coordinate (a true array axis), a single coordinate
//! name, or a list of coordinate names. Validation resolves the declaration
//! into the set of base coordinates and, for every coordinate, the set of
//! base coordinates it ultimately varies over.
//!
//! The graph is immutable once built; `update` merges new declarations and
//! rebuilds the whole graph, leaving the previous graph untouched when the
//! merged result is invalid.

use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{MetatabError, MetatabResult};

/// Dependency spec for a single coordinate: one name or several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DepSpec {
    One(String),
    Many(Vec<String>),
}

impl DepSpec {
    /// The declared dependency names, in declaration order.
    pub fn names(&self) -> Vec<&str> {
        match self {
            DepSpec::One(name) => vec![name.as_str()],
            DepSpec::Many(names) => names.iter().map(String::as_str).collect(),
        }
    }
}

/// A coordinate declaration: name -> dependency spec (`None` = base).
pub type Declaration = IndexMap<String, Option<DepSpec>>;

/// Resolved coordinate dependency graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoordinateGraph {
    declaration: Declaration,
    dependencies: IndexMap<String, Option<IndexSet<String>>>,
    base_coords: Vec<String>,
    base_dependencies: IndexMap<String, IndexSet<String>>,
}

impl CoordinateGraph {
    /// Validate a declaration and resolve it into a graph.
    ///
    /// Resolution is a depth-first traversal with three node states:
    /// unvisited, in-progress (visited but not yet present in the resolved
    /// dependency map), and finalized. Encountering an in-progress,
    /// not-yet-finalized coordinate signals a cycle.
    ///
    /// Multi-dependency coordinates pre-register an empty finalized entry
    /// before their children are resolved, so a cycle that loops back
    /// through such an ancestor can pass the cycle check; the coordinate
    /// then resolves with an incomplete base-dependency set. This detection
    /// rule is deliberate (see the pin tests below); do not harden it.
    ///
    /// Fails with `GraphIsCyclic` on a detected cycle, `KeyNotFound` when a
    /// dependency names an undeclared coordinate, and `EmptyBaseSet` when a
    /// non-empty declaration resolves to zero base coordinates. An empty
    /// declaration builds an empty graph.
    pub fn build(declaration: Declaration) -> MetatabResult<Self> {
        let mut resolver = Resolver {
            declaration: &declaration,
            visited: HashSet::new(),
            dependencies: IndexMap::new(),
            base_coords: Vec::new(),
            base_dependencies: IndexMap::new(),
        };

        for name in declaration.keys() {
            resolver.resolve(name)?;
        }

        if !declaration.is_empty() && resolver.base_coords.is_empty() {
            return Err(MetatabError::EmptyBaseSet);
        }

        Ok(CoordinateGraph {
            dependencies: resolver.dependencies,
            base_coords: resolver.base_coords,
            base_dependencies: resolver.base_dependencies,
            declaration,
        })
    }

    /// Build an all-base declaration from a list of level names.
    pub fn from_names<I, S>(names: I) -> MetatabResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let declaration: Declaration =
            names.into_iter().map(|n| (n.into(), None)).collect();
        Self::build(declaration)
    }

    /// Merge `additions` into the declaration and rebuild.
    ///
    /// Atomic: on failure the current graph is returned unchanged inside
    /// the error path (the caller keeps using `self`).
    pub fn update(&self, additions: &Declaration) -> MetatabResult<Self> {
        let mut merged = self.declaration.clone();
        for (name, spec) in additions {
            merged.insert(name.clone(), spec.clone());
        }
        Self::build(merged)
    }

    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    /// Base coordinates in resolution order. Dependencies resolve before
    /// their dependents, so a base referenced early lands early even when
    /// declared later.
    pub fn base_coords(&self) -> &[String] {
        &self.base_coords
    }

    pub fn is_base(&self, name: &str) -> bool {
        self.base_coords.iter().any(|c| c == name)
    }

    /// Direct dependencies of a coordinate (`None` for a base coordinate).
    pub fn dependencies(&self, name: &str) -> MetatabResult<Option<&IndexSet<String>>> {
        self.dependencies
            .get(name)
            .map(Option::as_ref)
            .ok_or_else(|| MetatabError::key_not_found(name))
    }

    /// The base coordinates a coordinate varies over (transitive closure
    /// restricted to base coordinates; `{self}` for a base coordinate).
    pub fn base_dependencies(&self, name: &str) -> MetatabResult<&IndexSet<String>> {
        self.base_dependencies
            .get(name)
            .ok_or_else(|| MetatabError::key_not_found(name))
    }

    /// Coordinate names in declaration order.
    pub fn coord_names(&self) -> impl Iterator<Item = &String> {
        self.declaration.keys()
    }

    pub fn len(&self) -> usize {
        self.declaration.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declaration.is_empty()
    }
}

struct Resolver<'a> {
    declaration: &'a Declaration,
    visited: HashSet<String>,
    dependencies: IndexMap<String, Option<IndexSet<String>>>,
    base_coords: Vec<String>,
    base_dependencies: IndexMap<String, IndexSet<String>>,
}

impl Resolver<'_> {
    fn resolve(&mut self, name: &str) -> MetatabResult<()> {
        if self.visited.contains(name) {
            // In-progress but not finalized: a true cycle.
            if !self.dependencies.contains_key(name) {
                return Err(MetatabError::GraphIsCyclic);
            }
            return Ok(());
        }

        let spec = self
            .declaration
            .get(name)
            .ok_or_else(|| MetatabError::key_not_found(name))?;

        match spec {
            None => {
                self.visited.insert(name.to_string());
                self.dependencies.insert(name.to_string(), None);
                self.base_coords.push(name.to_string());
                let mut own = IndexSet::new();
                own.insert(name.to_string());
                self.base_dependencies.insert(name.to_string(), own);
            }
            Some(DepSpec::One(dep)) => {
                self.visited.insert(name.to_string());
                self.resolve(dep)?;
                let mut direct = IndexSet::new();
                direct.insert(dep.clone());
                self.dependencies.insert(name.to_string(), Some(direct));
                let inherited = self
                    .base_dependencies
                    .get(dep)
                    .cloned()
                    .unwrap_or_default();
                self.base_dependencies.insert(name.to_string(), inherited);
            }
            Some(DepSpec::Many(deps)) => {
                self.visited.insert(name.to_string());
                // Pre-register a finalized (empty) entry before recursing.
                self.dependencies
                    .insert(name.to_string(), Some(IndexSet::new()));
                self.base_dependencies
                    .insert(name.to_string(), IndexSet::new());
                for dep in deps {
                    self.resolve(dep)?;
                    if let Some(Some(direct)) = self.dependencies.get_mut(name) {
                        direct.insert(dep.clone());
                    }
                    let inherited = self
                        .base_dependencies
                        .get(dep)
                        .cloned()
                        .unwrap_or_default();
                    if let Some(bases) = self.base_dependencies.get_mut(name) {
                        bases.extend(inherited);
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(entries: &[(&str, Option<DepSpec>)]) -> Declaration {
        entries
            .iter()
            .map(|(n, d)| (n.to_string(), d.clone()))
            .collect()
    }

    fn one(name: &str) -> Option<DepSpec> {
        Some(DepSpec::One(name.to_string()))
    }

    fn many(names: &[&str]) -> Option<DepSpec> {
        Some(DepSpec::Many(names.iter().map(|n| n.to_string()).collect()))
    }

    #[test]
    fn test_base_dependency_union_property() {
        let graph = CoordinateGraph::build(decl(&[
            ("ind1", None),
            ("ind2", None),
            ("region", one("ind1")),
            ("zone", many(&["region", "ind2"])),
        ]))
        .unwrap();

        assert_eq!(graph.base_coords(), &["ind1".to_string(), "ind2".to_string()]);

        // Base coordinates map to {self}.
        let b = graph.base_dependencies("ind1").unwrap();
        assert_eq!(b.iter().collect::<Vec<_>>(), vec!["ind1"]);

        // Alias inherits its dependency's base set.
        let r = graph.base_dependencies("region").unwrap();
        assert_eq!(r.iter().collect::<Vec<_>>(), vec!["ind1"]);

        // Multi-dependency is the union of its dependencies' base sets.
        let z = graph.base_dependencies("zone").unwrap();
        assert_eq!(z.iter().collect::<Vec<_>>(), vec!["ind1", "ind2"]);
    }

    #[test]
    fn test_base_coords_follow_resolution_order() {
        // `a` is declared first and resolves `c` before `b`, so the base
        // list starts with `c` even though `b` is declared before it.
        let graph = CoordinateGraph::build(decl(&[
            ("a", many(&["c", "b"])),
            ("b", None),
            ("c", None),
        ]))
        .unwrap();
        assert_eq!(graph.base_coords(), &["c".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_two_node_cycle_is_detected() {
        let err = CoordinateGraph::build(decl(&[("a", one("b")), ("b", one("a"))]))
            .unwrap_err();
        assert!(matches!(err, MetatabError::GraphIsCyclic));
    }

    #[test]
    fn test_alias_chain_resolves() {
        let graph = CoordinateGraph::build(decl(&[
            ("ind", None),
            ("a", one("ind")),
            ("b", one("a")),
        ]))
        .unwrap();
        let b = graph.base_dependencies("b").unwrap();
        assert_eq!(b.iter().collect::<Vec<_>>(), vec!["ind"]);
        assert!(!graph.is_base("b"));
    }

    #[test]
    fn test_unknown_dependency_is_key_not_found() {
        let err = CoordinateGraph::build(decl(&[("a", one("missing"))])).unwrap_err();
        assert!(matches!(err, MetatabError::KeyNotFound(_)));
    }

    // Pin tests for the multi-dependency pre-registration edge case: these
    // cycles pass the cycle check because the ancestor already has a
    // finalized (empty) entry when the loop closes.

    #[test]
    fn test_multi_self_reference_resolves_to_empty_base_set() {
        let err = CoordinateGraph::build(decl(&[("a", many(&["a"]))])).unwrap_err();
        assert!(matches!(err, MetatabError::EmptyBaseSet));
    }

    #[test]
    fn test_multi_self_reference_with_base_sibling_passes() {
        let graph =
            CoordinateGraph::build(decl(&[("x", None), ("a", many(&["x", "a"]))]))
                .unwrap();
        // The loop through `a` is not reported; `a` resolves against `x` only.
        let bases = graph.base_dependencies("a").unwrap();
        assert_eq!(bases.iter().collect::<Vec<_>>(), vec!["x"]);
    }

    #[test]
    fn test_empty_declaration_builds_empty_graph() {
        let graph = CoordinateGraph::build(Declaration::new()).unwrap();
        assert!(graph.is_empty());
        assert!(graph.base_coords().is_empty());
    }

    #[test]
    fn test_update_is_atomic_on_failure() {
        let graph = CoordinateGraph::build(decl(&[("ind", None)])).unwrap();
        let bad = decl(&[("ind", one("loop")), ("loop", one("ind"))]);
        assert!(graph.update(&bad).is_err());
        // Original graph untouched.
        assert_eq!(graph.base_coords(), &["ind".to_string()]);

        let good = decl(&[("region", one("ind"))]);
        let updated = graph.update(&good).unwrap();
        assert_eq!(updated.base_coords(), &["ind".to_string()]);
        assert!(updated.declaration().contains_key("region"));
    }

    #[test]
    fn test_from_names_all_base() {
        let graph = CoordinateGraph::from_names(["a", "b"]).unwrap();
        assert_eq!(graph.base_coords(), &["a".to_string(), "b".to_string()]);
        assert_eq!(graph.dependencies("a").unwrap(), None);
    }
}
