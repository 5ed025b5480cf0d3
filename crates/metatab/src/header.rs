//! Header preamble codec.
//!
//! A metatab file opens with an optional YAML front-matter block fenced by
//! `---` lines, followed by ordinary delimited rows:
//!
//! ```text
//! ---
//! author: A Person
//! version: greenland.2026-02-14.01
//! coords:
//!   ind: null
//!   region: ind
//! variables:
//!   col1: Temperature [C]
//! ---
//! ind,region,col1
//! 0,north,4.6
//! ```
//!
//! The top-level keys `coords` and `variables` are extracted into their
//! containers; every other key — including the reserved `version` — becomes
//! an attribute. Writing performs the inverse, and write→read reproduces
//! all three structures exactly.

use std::fmt;
use std::io::Write;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::attrs::Attributes;
use crate::error::{MetatabError, MetatabResult};
use crate::graph::Declaration;
use crate::value::Value;
use crate::variables::Variables;

/// The front-matter fence line.
pub const HEADER_FENCE: &str = "---";

/// Parsed header preamble: the three metadata structures.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    pub attrs: Attributes,
    pub coords: Option<Declaration>,
    pub variables: Variables,
}

/// On-disk shape of the preamble body.
#[derive(Debug, Default, Serialize, Deserialize)]
struct RawHeader {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    coords: Option<Declaration>,
    #[serde(default, skip_serializing_if = "Variables::is_empty")]
    variables: Variables,
    #[serde(flatten)]
    attrs: IndexMap<String, Value>,
}

impl Header {
    pub fn new(attrs: Attributes, coords: Option<Declaration>, variables: Variables) -> Self {
        Header {
            attrs,
            coords,
            variables,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
            && self.coords.as_ref().map_or(true, IndexMap::is_empty)
            && self.variables.is_empty()
    }

    /// The reserved `version` attribute, when present.
    pub fn version(&self) -> Option<&str> {
        self.attrs.get("version").ok().and_then(Value::as_str)
    }

    /// Parse a preamble off the front of `text`.
    ///
    /// Returns the header and the byte offset where tabular rows begin.
    /// Text without a leading fence has no header: the empty header at
    /// offset zero. A leading fence without a closing fence is malformed.
    pub fn parse(text: &str) -> MetatabResult<(Header, usize)> {
        let mut lines = text.split_inclusive('\n');
        let Some(first) = lines.next() else {
            return Ok((Header::default(), 0));
        };
        if first.trim_end() != HEADER_FENCE {
            return Ok((Header::default(), 0));
        }

        let mut offset = first.len();
        let body_start = offset;
        let mut body_end = None;
        for line in lines {
            if line.trim_end() == HEADER_FENCE {
                body_end = Some(offset);
                offset += line.len();
                break;
            }
            offset += line.len();
        }
        let Some(body_end) = body_end else {
            return Err(MetatabError::MalformedHeader(
                "missing closing fence".to_string(),
            ));
        };

        let raw: RawHeader = serde_yaml::from_str(&text[body_start..body_end])?;
        debug!(
            attrs = raw.attrs.len(),
            variables = raw.variables.len(),
            "parsed header preamble"
        );
        Ok((
            Header {
                attrs: raw.attrs.into_iter().collect(),
                coords: raw.coords,
                variables: raw.variables,
            },
            offset,
        ))
    }

    /// Serialize the preamble. An empty header writes nothing.
    pub fn write<W: Write>(&self, writer: &mut W) -> MetatabResult<()> {
        if self.is_empty() {
            return Ok(());
        }
        let raw = RawHeader {
            coords: self.coords.clone().filter(|d| !d.is_empty()),
            variables: self.variables.clone(),
            attrs: self.attrs.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
        };
        let body = serde_yaml::to_string(&raw)?;
        writeln!(writer, "{HEADER_FENCE}")?;
        writer.write_all(body.as_bytes())?;
        writeln!(writer, "{HEADER_FENCE}")?;
        Ok(())
    }

    /// Serialize the preamble into a string.
    pub fn to_text(&self) -> MetatabResult<String> {
        let mut buffer = Vec::new();
        self.write(&mut buffer)?;
        String::from_utf8(buffer)
            .map_err(|e| MetatabError::MalformedHeader(format!("non-UTF-8 header: {e}")))
    }
}

/// An expected header entry: a literal value or a predicate over it.
pub enum Expected {
    Equals(Value),
    Satisfies(Box<dyn Fn(&Value) -> bool>),
}

impl Expected {
    pub fn equals(value: impl Into<Value>) -> Self {
        Expected::Equals(value.into())
    }

    pub fn satisfies(predicate: impl Fn(&Value) -> bool + 'static) -> Self {
        Expected::Satisfies(Box::new(predicate))
    }

    fn matches(&self, value: &Value) -> bool {
        match self {
            Expected::Equals(expected) => expected == value,
            Expected::Satisfies(predicate) => predicate(value),
        }
    }
}

impl fmt::Debug for Expected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expected::Equals(value) => write!(f, "Equals({value:?})"),
            Expected::Satisfies(_) => write!(f, "Satisfies(<predicate>)"),
        }
    }
}

/// Post-read validation of selected header entries.
///
/// Any failed check fails the whole read with `AssertionFailed`.
#[derive(Debug, Default)]
pub struct Assertions {
    attrs: IndexMap<String, Expected>,
    variables: IndexMap<String, IndexMap<String, Expected>>,
}

impl Assertions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect an attribute entry.
    pub fn attr(mut self, key: impl Into<String>, expected: Expected) -> Self {
        self.attrs.insert(key.into(), expected);
        self
    }

    /// Expect an entry in one column's variable metadata.
    pub fn variable(
        mut self,
        column: impl Into<String>,
        key: impl Into<String>,
        expected: Expected,
    ) -> Self {
        self.variables
            .entry(column.into())
            .or_default()
            .insert(key.into(), expected);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty() && self.variables.is_empty()
    }

    /// Check every expectation against a parsed header.
    pub fn check(&self, header: &Header) -> MetatabResult<()> {
        for (key, expected) in &self.attrs {
            let value = header.attrs.get(key).map_err(|_| {
                MetatabError::AssertionFailed(format!("attribute '{key}' is missing"))
            })?;
            if !expected.matches(value) {
                return Err(MetatabError::AssertionFailed(format!(
                    "attribute '{key}' has value {value:?}"
                )));
            }
        }
        for (column, checks) in &self.variables {
            let entry = header.variables.get(column).map_err(|_| {
                MetatabError::AssertionFailed(format!("variable '{column}' is missing"))
            })?;
            let attrs = entry.to_attrs();
            for (key, expected) in checks {
                let value = attrs.get(key).map_err(|_| {
                    MetatabError::AssertionFailed(format!(
                        "variable '{column}' has no '{key}' entry"
                    ))
                })?;
                if !expected.matches(value) {
                    return Err(MetatabError::AssertionFailed(format!(
                        "variable '{column}' entry '{key}' has value {value:?}"
                    )));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DepSpec;

    const SAMPLE: &str = "---\nauthor: A\nversion: test5.2016-05-01.01\ncoords:\n  ind: null\n  region: ind\nvariables:\n  col1:\n    description: d\n---\nind,region,col1\n0,north,4.5\n";

    #[test]
    fn test_parse_extracts_three_structures() {
        let (header, offset) = Header::parse(SAMPLE).unwrap();

        assert_eq!(header.attrs.get("author").unwrap(), &Value::Str("A".into()));
        assert_eq!(header.version(), Some("test5.2016-05-01.01"));

        let coords = header.coords.as_ref().unwrap();
        assert_eq!(coords.get("ind"), Some(&None));
        assert_eq!(
            coords.get("region"),
            Some(&Some(DepSpec::One("ind".to_string())))
        );

        let entry = header.variables.get("col1").unwrap();
        assert_eq!(
            entry.to_attrs().get("description").unwrap(),
            &Value::Str("d".into())
        );

        // The offset lands on the first tabular row.
        assert!(SAMPLE[offset..].starts_with("ind,region,col1"));
    }

    #[test]
    fn test_text_without_fence_has_no_header() {
        let (header, offset) = Header::parse("ind,col1\n0,1\n").unwrap();
        assert!(header.is_empty());
        assert_eq!(offset, 0);
    }

    #[test]
    fn test_empty_fenced_preamble_parses_as_empty_header() {
        let text = "---\n---\ncol1\n1\n2\n";
        let (header, offset) = Header::parse(text).unwrap();
        assert!(header.is_empty());
        assert!(text[offset..].starts_with("col1"));
    }

    #[test]
    fn test_missing_closing_fence_is_malformed() {
        let err = Header::parse("---\nauthor: A\n").unwrap_err();
        assert!(matches!(err, MetatabError::MalformedHeader(_)));
    }

    #[test]
    fn test_write_read_roundtrip_is_structural() {
        let (header, _) = Header::parse(SAMPLE).unwrap();
        let text = header.to_text().unwrap();
        let (back, offset) = Header::parse(&text).unwrap();

        assert_eq!(back, header);
        assert_eq!(offset, text.len());
    }

    #[test]
    fn test_empty_header_writes_nothing() {
        assert_eq!(Header::default().to_text().unwrap(), "");
    }

    #[test]
    fn test_assertions_literal_and_predicate() {
        let (header, _) = Header::parse(SAMPLE).unwrap();

        Assertions::new()
            .attr("version", Expected::equals("test5.2016-05-01.01"))
            .check(&header)
            .unwrap();

        Assertions::new()
            .attr(
                "version",
                Expected::satisfies(|v| {
                    v.as_str().is_some_and(|s| s > "test5.2016-05-01.00")
                }),
            )
            .variable("col1", "description", Expected::equals("d"))
            .check(&header)
            .unwrap();

        let err = Assertions::new()
            .attr("version", Expected::equals("other"))
            .check(&header)
            .unwrap_err();
        assert!(matches!(err, MetatabError::AssertionFailed(_)));

        let err = Assertions::new()
            .attr("missing", Expected::equals("x"))
            .check(&header)
            .unwrap_err();
        assert!(matches!(err, MetatabError::AssertionFailed(_)));
    }
}
