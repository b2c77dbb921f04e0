use std::path::PathBuf;

use polars::prelude::*;

use hearth_core::error::PipelineError;
use hearth_core::ingest::read_table;

fn write_temp(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

#[test]
fn every_column_arrives_as_text() -> PolarsResult<()> {
    let path = write_temp(
        "hearth_ingest_basic.csv",
        "date, price ,state\n2020-01-01,100.0,WA\n2020-02-01, 110.0 ,OR\n",
    );

    let df = read_table(&path, b',', "t").unwrap();

    assert_eq!(df.get_column_names_str(), vec!["date", "price", "state"]);
    assert_eq!(df.height(), 2);
    for column in df.get_columns() {
        assert_eq!(column.dtype(), &DataType::String);
    }
    // Cell whitespace is trimmed along with header whitespace.
    assert_eq!(df.column("price")?.str()?.get(1), Some("110.0"));
    Ok(())
}

#[test]
fn empty_cells_and_short_rows_become_null() -> PolarsResult<()> {
    let path = write_temp(
        "hearth_ingest_sparse.csv",
        "a,b,c\n1,,3\n4,5\n",
    );

    let df = read_table(&path, b',', "t").unwrap();

    assert_eq!(df.column("b")?.str()?.get(0), None);
    assert_eq!(df.column("c")?.str()?.get(1), None);
    assert_eq!(df.column("b")?.str()?.get(1), Some("5"));
    Ok(())
}

#[test]
fn rows_with_surplus_cells_are_a_data_quality_error() {
    let path = write_temp("hearth_ingest_wide_row.csv", "a,b\n1,2\n3,4,5\n");

    let err = read_table(&path, b',', "t").unwrap_err();
    assert!(matches!(err, PipelineError::DataQuality { .. }));
    assert!(err.to_string().contains("row 3 has 3 cells"));
}

#[test]
fn duplicate_headers_are_a_configuration_error() {
    let path = write_temp("hearth_ingest_dup.csv", "a,b,a\n1,2,3\n");

    let err = read_table(&path, b',', "t").unwrap_err();
    assert!(matches!(err, PipelineError::Configuration(_)));
    assert!(err.to_string().contains("duplicate column 'a'"));
}

#[test]
fn missing_files_surface_as_io_errors() {
    let err = read_table(&PathBuf::from("/nonexistent/hearth.csv"), b',', "t").unwrap_err();
    assert!(matches!(err, PipelineError::Io(_)));
}

#[test]
fn alternate_delimiters_are_respected() -> PolarsResult<()> {
    let path = write_temp("hearth_ingest_tabs.csv", "a\tb\n1\t2\n");

    let df = read_table(&path, b'\t', "t").unwrap();
    assert_eq!(df.column("b")?.str()?.get(0), Some("2"));
    Ok(())
}
