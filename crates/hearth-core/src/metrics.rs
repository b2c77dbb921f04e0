//! Lagged percent-change derivation (MoM / YoY).
//!
//! Each metric is computed strictly within one entity's own chronological
//! sequence: rows are partitioned by the group columns, sorted by the order
//! column, then differenced at the configured lag. Results are rounded once
//! here; a non-finite division or a zero/null lag value materializes as
//! null, never as `inf`.

use std::collections::HashMap;

use polars::prelude::*;

use crate::config::MetricSpec;
use crate::error::{PipelineError, Result};

pub fn derive(
    df: &DataFrame,
    specs: &[MetricSpec],
    order_column: &str,
    dataset: &str,
) -> Result<DataFrame> {
    let order = order_values(df, order_column, dataset)?;
    let mut out = df.clone();

    for spec in specs {
        let source = df.column(&spec.source)?.f64()?;
        let derived = derive_one(df, spec, source, &order)?;
        out.hstack_mut(&[Series::new(spec.output.as_str().into(), derived).into()])?;
    }
    Ok(out)
}

fn derive_one(
    df: &DataFrame,
    spec: &MetricSpec,
    source: &Float64Chunked,
    order: &[Option<i64>],
) -> Result<Vec<Option<f64>>> {
    let height = df.height();
    let mut groups: HashMap<String, Vec<(i64, usize)>> = HashMap::new();

    'rows: for idx in 0..height {
        let Some(position) = order[idx] else {
            continue;
        };
        let mut key = String::new();
        for group in &spec.group_by {
            let ca = df.column(group)?.str()?;
            // Rows with a null group key get a null result.
            let Some(part) = ca.get(idx) else {
                continue 'rows;
            };
            key.push_str(part);
            key.push('\u{1f}');
        }
        groups.entry(key).or_default().push((position, idx));
    }

    let mut out: Vec<Option<f64>> = vec![None; height];
    for entries in groups.values_mut() {
        entries.sort_by_key(|(position, _)| *position);
        for window_end in spec.lag..entries.len() {
            let (_, idx) = entries[window_end];
            let (_, lag_idx) = entries[window_end - spec.lag];
            let (Some(current), Some(base)) = (source.get(idx), source.get(lag_idx)) else {
                continue;
            };
            if base == 0.0 {
                continue;
            }
            let change = (current - base) / base;
            if change.is_finite() {
                out[idx] = Some(round_to(change, spec.scale));
            }
        }
    }
    Ok(out)
}

/// Chronological positions for every row: date columns yield days since
/// epoch, integer columns (annual cadence) yield the year itself.
fn order_values(df: &DataFrame, order_column: &str, dataset: &str) -> Result<Vec<Option<i64>>> {
    let column = df.column(order_column)?;
    let height = df.height();
    match column.dtype() {
        DataType::Date => {
            let ca = column.date()?;
            Ok((0..height)
                .map(|idx| ca.get(idx).map(|days| days as i64))
                .collect())
        }
        DataType::Int64 => {
            let ca = column.i64()?;
            Ok((0..height).map(|idx| ca.get(idx)).collect())
        }
        other => Err(PipelineError::Configuration(format!(
            "{dataset}: order column '{order_column}' has non-chronological type {other}"
        ))),
    }
}

fn round_to(value: f64, scale: u32) -> f64 {
    let factor = 10f64.powi(scale as i32);
    (value * factor).round() / factor
}
