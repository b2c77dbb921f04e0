//! Delimited-text ingestion: one raw file becomes an all-Utf8 DataFrame.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use polars::prelude::*;

use crate::error::{PipelineError, Result};

/// Reads a delimited file into a DataFrame of string columns, one per
/// header field. Empty cells become null; short rows are padded with nulls;
/// rows with more cells than the header has columns are a `DataQuality`
/// error (a surplus cell means the file is malformed, not sparse).
pub fn read_table(path: &Path, delimiter: u8, dataset: &str) -> Result<DataFrame> {
    let file = File::open(path)?;
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|header| header.trim().to_string())
        .collect();

    if headers.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "{}: file has no header row",
            path.display()
        )));
    }

    let mut seen = HashSet::new();
    for header in &headers {
        if !seen.insert(header.as_str()) {
            return Err(PipelineError::Configuration(format!(
                "{}: duplicate column '{}' in header",
                path.display(),
                header
            )));
        }
    }

    let mut cells: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for (row, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() > headers.len() {
            return Err(PipelineError::DataQuality {
                dataset: dataset.to_string(),
                column: path.display().to_string(),
                detail: format!(
                    "row {} has {} cells but the header declares {} columns",
                    // Header occupies line 1.
                    row + 2,
                    record.len(),
                    headers.len()
                ),
            });
        }
        for (index, column) in cells.iter_mut().enumerate() {
            let cell = record
                .get(index)
                .map(str::trim)
                .filter(|value| !value.is_empty());
            column.push(cell.map(str::to_string));
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(cells)
        .map(|(name, values)| Series::new(name.as_str().into(), values).into())
        .collect();

    Ok(DataFrame::new(columns)?)
}
