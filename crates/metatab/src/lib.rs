//! Structured, machine-checkable metadata for tabular data files.
//!
//! A delimited file gains a YAML front-matter preamble carrying three
//! metadata structures: free-form [`Attributes`], per-column [`Variables`],
//! and a [`Coordinates`] dependency graph that splits index levels into
//! base and derived coordinates. A [`Container`] binds the metadata to a
//! 1-D, 2-D, or 3-D tabular value, and projection turns an indexed
//! container into labeled arrays where only base coordinates become axes.
//!
//! ```no_run
//! use metatab::{read_csv, ReadOptions};
//!
//! let container = read_csv("data.csv", ReadOptions::default())?;
//! let dataset = container.to_dataset()?;
//! # Ok::<(), metatab::MetatabError>(())
//! ```

pub mod attrs;
pub mod container;
pub mod coords;
pub mod error;
pub mod graph;
pub mod header;
pub mod io;
pub mod labeled;
pub mod project;
pub mod table;
pub mod value;
pub mod variables;

pub use attrs::Attributes;
pub use container::{Container, ContainerOptions, TableData};
pub use coords::Coordinates;
pub use error::{MetatabError, MetatabResult};
pub use graph::{CoordinateGraph, Declaration, DepSpec};
pub use header::{Assertions, Expected, Header};
pub use io::{read_csv, read_csv_str, write_csv, write_csv_to, write_header_file, ReadOptions};
pub use labeled::{DataArray, Dataset};
pub use table::{DataFrame, Index, Panel, Series};
pub use value::Value;
pub use variables::{VarEntry, Variables};
