//! End-to-end file round-trip tests.
//!
//! A written container read back must reproduce the attributes, the
//! coordinate declaration, and the variable metadata exactly, and the
//! data values within numeric tolerance.

use indexmap::IndexMap;
use metatab::{
    read_csv, read_csv_str, write_csv, write_header_file, Assertions, Container,
    ContainerOptions, DataFrame, Declaration, DepSpec, Expected, Index, MetatabError,
    ReadOptions, TableData, Value, Variables,
};

const TOLERANCE: f64 = 1e-7;

fn sample_container() -> Container {
    let index = Index::from_levels(vec![
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
        vec![
            Value::Float(0.234234),
            Value::Float(1.5),
            Value::Float(-2.25),
        ],
    );
    columns.insert(
        "col2".to_string(),
        vec![Value::Int(4), Value::Int(5), Value::Int(6)],
    );
    let frame = DataFrame::new(index, columns).unwrap();

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
    options.attrs.insert("author", "A Person");
    options.attrs.insert("version", "test5.2016-05-01.01");
    Container::from_frame(frame, options).unwrap()
}

fn assert_equivalent(original: &Container, read: &Container) {
    assert_eq!(read.attrs(), original.attrs());
    assert_eq!(
        read.coords().declaration(),
        original.coords().declaration()
    );
    assert_eq!(read.variables(), original.variables());
    assert_eq!(read.shape(), original.shape());

    let (TableData::Frame(a), TableData::Frame(b)) = (original.data(), read.data()) else {
        panic!("expected 2-D data on both sides");
    };
    assert_eq!(b.index().names(), a.index().names());
    for name in a.column_names() {
        let left = a.column_values(name).unwrap();
        let right = b.column_values(name).unwrap();
        assert_eq!(left.len(), right.len());
        for (l, r) in left.iter().zip(right) {
            assert!(l.approx_eq(r, TOLERANCE), "{name}: {l:?} != {r:?}");
        }
    }
}

#[test]
fn test_write_read_roundtrip_through_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");

    let original = sample_container();
    write_csv(&original, &path).unwrap();
    let read = read_csv(&path, ReadOptions::default()).unwrap();

    assert_equivalent(&original, &read);
}

#[test]
fn test_roundtrip_survives_a_second_pass() {
    let original = sample_container();
    let mut first = Vec::new();
    metatab::write_csv_to(&original, &mut first).unwrap();
    let read = read_csv_str(std::str::from_utf8(&first).unwrap(), ReadOptions::default())
        .unwrap();

    let mut second = Vec::new();
    metatab::write_csv_to(&read, &mut second).unwrap();
    // A stable fixed point: the second serialization is byte-identical.
    assert_eq!(first, second);
}

#[test]
fn test_header_file_supplies_shared_metadata() {
    let dir = tempfile::tempdir().unwrap();
    let header_path = dir.path().join("shared.header");
    let data_path = dir.path().join("body.csv");

    let original = sample_container();
    write_header_file(&original, &header_path).unwrap();
    std::fs::write(
        &data_path,
        "ind,region,col1,col2\n0,north,0.234234,4\n1,north,1.5,5\n2,south,-2.25,6\n",
    )
    .unwrap();

    let options = ReadOptions {
        header_file: Some(header_path),
        ..ReadOptions::default()
    };
    let read = read_csv(&data_path, options).unwrap();
    assert_equivalent(&original, &read);
}

#[test]
fn test_assertions_gate_file_reads() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("data.csv");
    write_csv(&sample_container(), &path).unwrap();

    let options = ReadOptions {
        assertions: Some(
            Assertions::new()
                .attr("author", Expected::equals("A Person"))
                .attr(
                    "version",
                    Expected::satisfies(|v| {
                        v.as_str().is_some_and(|s| s.starts_with("test5."))
                    }),
                ),
        ),
        ..ReadOptions::default()
    };
    assert!(read_csv(&path, options).is_ok());

    let options = ReadOptions {
        assertions: Some(Assertions::new().attr("author", Expected::equals("Somebody Else"))),
        ..ReadOptions::default()
    };
    assert!(matches!(
        read_csv(&path, options),
        Err(MetatabError::AssertionFailed(_))
    ));
}

#[test]
fn test_roundtrip_projects_after_read() {
    let original = sample_container();
    let mut buffer = Vec::new();
    metatab::write_csv_to(&original, &mut buffer).unwrap();
    let read = read_csv_str(std::str::from_utf8(&buffer).unwrap(), ReadOptions::default())
        .unwrap();

    let dataset = read.to_dataset().unwrap();
    let region = dataset.coord("region").unwrap();
    assert_eq!(region.dims, vec!["ind".to_string()]);
    assert_eq!(region.count_nulls(), 0);
    assert_eq!(
        dataset.attrs.get("author").unwrap(),
        &Value::Str("A Person".into())
    );
}
