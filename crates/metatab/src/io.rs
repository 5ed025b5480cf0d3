//! Reading and writing delimited files with a metadata preamble.
//!
//! Reading layers three sources of metadata, in increasing precedence:
//! a separate header file, the inline preamble, and directly supplied
//! options. Declared coordinates select the index columns; the rest of
//! the columns become data.

use std::fs;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use indexmap::IndexMap;
use tracing::debug;

use crate::container::{Container, ContainerOptions, TableData};
use crate::error::{MetatabError, MetatabResult};
use crate::header::{Assertions, Header};
use crate::table::{DataFrame, Index};
use crate::value::Value;

/// Options for [`read_csv`] and [`read_csv_str`].
#[derive(Debug, Default)]
pub struct ReadOptions {
    /// Columns to move into the index, overriding coordinate selection.
    pub index_cols: Option<Vec<String>>,
    /// Column names to use instead of a names row. When set, the first
    /// body row is data.
    pub names: Option<Vec<String>>,
    /// Reduce a single-data-column result to a 1-D container.
    pub squeeze: bool,
    /// Parse `"description [unit]"` variable strings after reading.
    pub parse_vars: bool,
    /// Read the preamble from a separate file. The inline preamble still
    /// applies and takes precedence on conflict.
    pub header_file: Option<std::path::PathBuf>,
    /// Expectations checked against the merged header before the body is
    /// parsed.
    pub assertions: Option<Assertions>,
    /// Directly supplied metadata, taking precedence over any header.
    pub overrides: ContainerOptions,
}

/// Read a container from a file.
pub fn read_csv(path: impl AsRef<Path>, options: ReadOptions) -> MetatabResult<Container> {
    let text = fs::read_to_string(path)?;
    read_csv_str(&text, options)
}

/// Read a container from in-memory text.
pub fn read_csv_str(text: &str, options: ReadOptions) -> MetatabResult<Container> {
    let (inline, offset) = Header::parse(text)?;
    let header = match &options.header_file {
        Some(path) => {
            let base_text = fs::read_to_string(path)?;
            let (base, _) = Header::parse(&base_text)?;
            merge_headers(base, inline)
        }
        None => inline,
    };
    if let Some(assertions) = &options.assertions {
        assertions.check(&header)?;
    }

    let header_options = ContainerOptions {
        attrs: header.attrs,
        coords: header.coords,
        variables: (!header.variables.is_empty()).then_some(header.variables),
    };
    let merged = header_options.overlay(options.overrides);

    let (names, rows) = parse_body(&text[offset..], options.names)?;
    let mut columns: IndexMap<String, Vec<Value>> = names
        .iter()
        .map(|n| (n.clone(), Vec::with_capacity(rows.len())))
        .collect();
    for row in &rows {
        for (name, cell) in names.iter().zip(row) {
            if let Some(column) = columns.get_mut(name) {
                column.push(cell.clone());
            }
        }
    }

    let index_names: Vec<String> = match &options.index_cols {
        Some(cols) => cols.clone(),
        None => merged
            .coords
            .iter()
            .flat_map(|decl| decl.keys())
            .filter(|name| columns.contains_key(*name))
            .cloned()
            .collect(),
    };

    let index = if index_names.is_empty() {
        Index::default_range(rows.len())
    } else {
        let mut levels = Vec::with_capacity(index_names.len());
        for name in &index_names {
            let values = columns
                .shift_remove(name)
                .ok_or_else(|| MetatabError::key_not_found(name))?;
            levels.push((Some(name.clone()), values));
        }
        Index::from_levels(levels)?
    };
    debug!(
        rows = rows.len(),
        index_levels = index.nlevels(),
        data_columns = columns.len(),
        "read tabular body"
    );

    let frame = DataFrame::new(index, columns)?;
    let mut container = if options.squeeze && frame.ncols() == 1 {
        let only = frame
            .column_names()
            .next()
            .cloned()
            .ok_or_else(|| MetatabError::MalformedHeader("no data columns".to_string()))?;
        Container::from_series(frame.column(&only)?, merged)?
    } else {
        Container::from_frame(frame, merged)?
    };
    if options.parse_vars {
        container.variables_mut().parse_all();
    }
    Ok(container)
}

/// Write a container to a file: preamble, names row, then data rows.
pub fn write_csv(container: &Container, path: impl AsRef<Path>) -> MetatabResult<()> {
    let mut file = File::create(path)?;
    write_csv_to(container, &mut file)
}

/// Write a container to any writer.
///
/// 1-D containers serialize as a single-column table. 3-D containers do
/// not serialize directly; slice them down first.
pub fn write_csv_to<W: Write>(container: &Container, writer: &mut W) -> MetatabResult<()> {
    container_header(container).write(writer)?;

    let expanded;
    let frame = match container.data() {
        TableData::Frame(frame) => frame,
        TableData::Series(_) => {
            expanded = container.expand_to_frame()?;
            let TableData::Frame(frame) = expanded.data() else {
                unreachable!("expand_to_frame produces 2-D data");
            };
            frame
        }
        TableData::Panel(_) => {
            return Err(MetatabError::NotImplemented(
                "serialization of 3-D containers; reduce to 2-D first".to_string(),
            ))
        }
    };

    let mut csv_writer = csv::Writer::from_writer(writer);
    let names: Vec<String> = frame
        .index()
        .names()
        .iter()
        .map(|n| n.clone().unwrap_or_default())
        .chain(frame.column_names().cloned())
        .collect();
    csv_writer.write_record(&names)?;
    for (labels, cells) in frame.iter_rows() {
        let record: Vec<String> = labels
            .iter()
            .chain(cells.iter())
            .map(Value::to_string)
            .collect();
        csv_writer.write_record(&record)?;
    }
    csv_writer.flush()?;
    Ok(())
}

/// Write only the metadata preamble of a container to a file.
pub fn write_header_file(container: &Container, path: impl AsRef<Path>) -> MetatabResult<()> {
    let mut file = File::create(path)?;
    container_header(container).write(&mut file)?;
    Ok(())
}

fn container_header(container: &Container) -> Header {
    let declaration = container.coords().declaration().clone();
    Header {
        attrs: container.attrs().clone(),
        coords: (!declaration.is_empty()).then_some(declaration),
        variables: container.variables().clone(),
    }
}

/// Overlay an inline preamble on top of a header-file preamble.
fn merge_headers(base: Header, inline: Header) -> Header {
    let mut attrs = base.attrs;
    attrs.update(&inline.attrs);
    Header {
        attrs,
        coords: inline.coords.or(base.coords),
        variables: if inline.variables.is_empty() {
            base.variables
        } else {
            inline.variables
        },
    }
}

/// Tokenize the tabular body into column names and typed rows.
fn parse_body(
    body: &str,
    names: Option<Vec<String>>,
) -> MetatabResult<(Vec<String>, Vec<Vec<Value>>)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(body.as_bytes());

    let mut records = reader.records();
    let names = match names {
        Some(names) => names,
        None => match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => Vec::new(),
        },
    };

    let mut rows = Vec::new();
    for record in records {
        let record = record?;
        rows.push(record.iter().map(Value::parse_cell).collect());
    }
    Ok((names, rows))
}
