//! Per-dataset cleaning: column selection/renaming, numeric coercion,
//! missing-value strategies, and full-duplicate removal.
//!
//! Coercion always runs before missing-value handling: a cell that cannot
//! parse as a number becomes null and is then resolved by the strategy.

use std::collections::HashSet;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::config::{CleaningStrategy, DatasetConfig};
use crate::error::{PipelineError, Result};
use crate::UNIX_EPOCH_DAYS;

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%m-%d-%Y", "%m/%d/%Y"];

/// Produces a Clean Table: key columns stay text, the order column becomes
/// a first-of-period date (or an integer year), every other column is
/// `Float64` with the dataset's missing-value strategy applied, and no
/// fully-duplicate rows remain.
pub fn clean(df: &DataFrame, cfg: &DatasetConfig) -> Result<DataFrame> {
    let mut df = df.clone();

    for name in &cfg.drop_columns {
        if df.column(name).is_ok() {
            df = df.drop(name)?;
        }
    }
    if !cfg.select.is_empty() {
        df = df.select(cfg.select.iter().map(String::as_str))?;
    }
    for rename in &cfg.rename {
        df.rename(&rename.from, rename.to.as_str().into())?;
    }

    coerce_numeric_columns(&mut df, cfg)?;
    df = apply_strategy(&df, cfg)?;
    parse_order_column(&mut df, cfg)?;
    drop_duplicate_rows(&df)
}

fn is_identifier(cfg: &DatasetConfig, name: &str) -> bool {
    name == cfg.order_column || cfg.key_columns.iter().any(|key| key == name)
}

fn coerce_numeric_columns(df: &mut DataFrame, cfg: &DatasetConfig) -> Result<()> {
    let names: Vec<String> = df
        .get_columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    for name in names {
        if is_identifier(cfg, &name) {
            continue;
        }
        let column = df.column(&name)?;
        let coerced = match column.dtype() {
            DataType::Float64 => continue,
            DataType::String => {
                let ca = column.str()?;
                let values: Vec<Option<f64>> = (0..ca.len())
                    .map(|idx| ca.get(idx).and_then(parse_number))
                    .collect();
                Series::new(name.as_str().into(), values)
            }
            _ => column
                .cast(&DataType::Float64)?
                .as_materialized_series()
                .clone(),
        };
        df.replace(&name, coerced)?;
    }
    Ok(())
}

fn parse_number(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

fn apply_strategy(df: &DataFrame, cfg: &DatasetConfig) -> Result<DataFrame> {
    match cfg.cleaning {
        CleaningStrategy::Drop => drop_null_rows(df),
        CleaningStrategy::FillConstant(value) => fill_numeric(df, |values| {
            for cell in values.iter_mut() {
                if cell.is_none() {
                    *cell = Some(value);
                }
            }
        }),
        CleaningStrategy::FillMean => fill_numeric(df, |values| {
            let (sum, count) = values
                .iter()
                .flatten()
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            // All-null columns have no mean and stay null by policy.
            if count == 0 {
                return;
            }
            let mean = sum / count as f64;
            for cell in values.iter_mut() {
                if cell.is_none() {
                    *cell = Some(mean);
                }
            }
        }),
        CleaningStrategy::ForwardThenBackward => fill_numeric(df, |values| {
            let mut last = None;
            for cell in values.iter_mut() {
                match cell {
                    Some(v) => last = Some(*v),
                    None => *cell = last,
                }
            }
            let mut next = None;
            for cell in values.iter_mut().rev() {
                match cell {
                    Some(v) => next = Some(*v),
                    None => *cell = next,
                }
            }
            // Entirely empty columns fall back to zero as a last resort.
            if values.iter().all(Option::is_none) {
                for cell in values.iter_mut() {
                    *cell = Some(0.0);
                }
            }
        }),
    }
}

/// Removes any row containing a null in any column, typed or not.
fn drop_null_rows(df: &DataFrame) -> Result<DataFrame> {
    let mut keep = vec![true; df.height()];
    for column in df.get_columns() {
        let series = column.as_materialized_series();
        for (idx, flag) in keep.iter_mut().enumerate() {
            if *flag && matches!(series.get(idx)?, AnyValue::Null) {
                *flag = false;
            }
        }
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}

fn fill_numeric<F>(df: &DataFrame, fill: F) -> Result<DataFrame>
where
    F: Fn(&mut Vec<Option<f64>>),
{
    let mut out = df.clone();
    for column in df.get_columns() {
        if column.dtype() != &DataType::Float64 {
            continue;
        }
        let ca = column.f64()?;
        let mut values: Vec<Option<f64>> = (0..ca.len()).map(|idx| ca.get(idx)).collect();
        fill(&mut values);
        out.replace(
            column.name().as_str(),
            Series::new(column.name().clone(), values),
        )?;
    }
    Ok(out)
}

fn parse_order_column(df: &mut DataFrame, cfg: &DatasetConfig) -> Result<()> {
    let column = df.column(&cfg.order_column)?;
    let ca = match column.dtype() {
        // Already chronological; nothing to parse.
        DataType::Date | DataType::Int64 => return Ok(()),
        DataType::String => column.str()?,
        other => {
            return Err(PipelineError::Configuration(format!(
                "{}: order column '{}' has unsupported type {}",
                cfg.name, cfg.order_column, other
            )))
        }
    };

    let mut dates: Vec<i32> = Vec::with_capacity(ca.len());
    let mut years: Vec<i64> = Vec::with_capacity(ca.len());
    let mut as_dates = true;
    let mut as_years = true;

    for idx in 0..ca.len() {
        let raw = ca.get(idx).ok_or_else(|| PipelineError::DataQuality {
            dataset: cfg.name.clone(),
            column: cfg.order_column.clone(),
            detail: format!("missing value in order column at row {idx}"),
        })?;

        match parse_period(raw) {
            Some(date) if as_dates => {
                dates.push(date.num_days_from_ce() - UNIX_EPOCH_DAYS);
            }
            _ => as_dates = false,
        }
        match raw.trim().parse::<i64>() {
            Ok(year) if as_years => years.push(year),
            _ => as_years = false,
        }

        if !as_dates && !as_years {
            return Err(PipelineError::DataQuality {
                dataset: cfg.name.clone(),
                column: cfg.order_column.clone(),
                detail: format!("unparseable date '{raw}'"),
            });
        }
    }

    let parsed = if as_dates {
        Series::new(cfg.order_column.as_str().into(), dates).cast(&DataType::Date)?
    } else {
        Series::new(cfg.order_column.as_str().into(), years)
    };
    df.replace(&cfg.order_column, parsed)?;
    Ok(())
}

/// Parses a raw period string and snaps it to the first of its month.
fn parse_period(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(first_of_period(date));
        }
    }
    // Year-month form without a day component, e.g. "2020-01".
    if let Ok(date) = NaiveDate::parse_from_str(&format!("{raw}-01"), "%Y-%m-%d") {
        return Some(first_of_period(date));
    }
    None
}

fn first_of_period(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Removes fully-duplicate rows, keeping the first occurrence.
fn drop_duplicate_rows(df: &DataFrame) -> Result<DataFrame> {
    let mut seen = HashSet::with_capacity(df.height());
    let mut keep = Vec::with_capacity(df.height());
    for idx in 0..df.height() {
        let mut key = String::new();
        for column in df.get_columns() {
            let value = column.as_materialized_series().get(idx)?;
            key.push_str(&format!("{value}\u{1f}"));
        }
        keep.push(seen.insert(key));
    }
    let mask = BooleanChunked::from_slice("keep".into(), &keep);
    Ok(df.filter(&mask)?)
}
