//! Pre-load bounds checking against fixed-point destination columns.
//!
//! A value whose integer-digit count exceeds `precision - scale` would be
//! silently truncated or rejected by the warehouse's numeric type, so the
//! dataset fails here instead, before anything is written.

use polars::prelude::*;

use crate::config::ColumnBounds;
use crate::error::{PipelineError, Result};

/// Read-only check; raises a typed error naming the dataset, column and
/// offending value. Bounds naming columns absent from the table are skipped
/// (not every destination column is present for every dataset variant).
pub fn check_bounds(df: &DataFrame, bounds: &[ColumnBounds], dataset: &str) -> Result<()> {
    for bound in bounds {
        let Ok(column) = df.column(&bound.column) else {
            continue;
        };
        let max_digits = bound.precision - bound.scale;

        match column.dtype() {
            DataType::Float64 => {
                let ca = column.f64()?;
                for idx in 0..ca.len() {
                    if let Some(value) = ca.get(idx) {
                        check_value(value, max_digits, bound, dataset)?;
                    }
                }
            }
            DataType::Int64 => {
                let ca = column.i64()?;
                for idx in 0..ca.len() {
                    if let Some(value) = ca.get(idx) {
                        check_value(value as f64, max_digits, bound, dataset)?;
                    }
                }
            }
            other => {
                return Err(PipelineError::Configuration(format!(
                    "{dataset}: bounds declared for non-numeric column '{}' ({other})",
                    bound.column
                )))
            }
        }
    }
    Ok(())
}

fn check_value(value: f64, max_digits: u32, bound: &ColumnBounds, dataset: &str) -> Result<()> {
    if integer_digits(value) > max_digits {
        return Err(PipelineError::DataQuality {
            dataset: dataset.to_string(),
            column: bound.column.clone(),
            detail: format!(
                "value {value} exceeds numeric({},{}) storage",
                bound.precision, bound.scale
            ),
        });
    }
    Ok(())
}

fn integer_digits(value: f64) -> u32 {
    let magnitude = value.abs().trunc();
    if magnitude < 1.0 {
        1
    } else {
        magnitude.log10().floor() as u32 + 1
    }
}
