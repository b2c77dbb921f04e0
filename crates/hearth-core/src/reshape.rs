//! Wide-to-long reshaping with per-dataset duplicate resolution.
//!
//! Entities are discovered as every column except the declared index
//! columns and any suffix-excluded column. Melting an already-long table
//! (entity column present, no wide columns left) only re-runs dedup, so
//! re-application never changes the `(date, entity)` cardinality.

use std::collections::hash_map::Entry;
use std::collections::HashMap;

use polars::prelude::*;

use crate::config::{DedupPolicy, EntitySplit, ReshapeConfig};
use crate::error::{PipelineError, Result};

pub fn reshape(df: &DataFrame, rc: &ReshapeConfig, dataset: &str) -> Result<DataFrame> {
    for index in &rc.index_columns {
        if df.column(index).is_err() {
            return Err(PipelineError::Configuration(format!(
                "{dataset}: reshape index column '{index}' not found"
            )));
        }
    }

    let long = if df.column(&rc.entity_column).is_ok() {
        if df.column(&rc.value_column).is_err() {
            return Err(PipelineError::Configuration(format!(
                "{dataset}: table has entity column '{}' but no value column '{}'",
                rc.entity_column, rc.value_column
            )));
        }
        df.clone()
    } else {
        melt_wide(df, rc, dataset)?
    };

    let deduped = dedup(&long, rc)?;
    match &rc.entity_split {
        Some(split) => split_entity(&deduped, rc, split, dataset),
        None => Ok(deduped),
    }
}

fn is_entity_column(rc: &ReshapeConfig, name: &str) -> bool {
    if rc.index_columns.iter().any(|index| index == name) || name == rc.value_column {
        return false;
    }
    !rc.exclude_suffixes
        .iter()
        .any(|suffix| name.ends_with(suffix.as_str()))
}

/// One frame per entity column, stacked: the `flatten` approach to melting.
fn melt_wide(df: &DataFrame, rc: &ReshapeConfig, dataset: &str) -> Result<DataFrame> {
    let entity_names: Vec<String> = df
        .get_columns()
        .iter()
        .map(|column| column.name().to_string())
        .filter(|name| is_entity_column(rc, name))
        .collect();

    if entity_names.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "{dataset}: no wide columns to melt into '{}'",
            rc.entity_column
        )));
    }

    let rows = df.height();
    let mut frames: Vec<DataFrame> = Vec::with_capacity(entity_names.len());

    for entity in &entity_names {
        let mut columns: Vec<Column> = Vec::with_capacity(rc.index_columns.len() + 2);
        for index in &rc.index_columns {
            columns.push(df.column(index)?.clone());
        }

        let entity_series = Series::new(
            rc.entity_column.as_str().into(),
            vec![entity.as_str(); rows],
        );
        columns.push(entity_series.into());

        let mut values = df.column(entity)?.as_materialized_series().clone();
        values.rename(rc.value_column.as_str().into());
        columns.push(values.into());

        frames.push(DataFrame::new(columns)?);
    }

    let mut iter = frames.into_iter();
    let mut combined = iter.next().ok_or_else(|| {
        PipelineError::Configuration(format!("{dataset}: melt produced no frames"))
    })?;
    for frame in iter {
        combined.vstack_mut(&frame)?;
    }
    Ok(combined)
}

/// Resolves `(index…, entity)` collisions under the configured policy and
/// returns the survivors sorted by (index…, entity) for deterministic loads.
fn dedup(df: &DataFrame, rc: &ReshapeConfig) -> Result<DataFrame> {
    let height = df.height();
    let values = df.column(&rc.value_column)?.f64()?;

    let mut best: HashMap<String, usize> = HashMap::with_capacity(height);
    for idx in 0..height {
        let key = group_key(df, rc, idx)?;
        match rc.dedup {
            DedupPolicy::LatestWins => {
                best.insert(key, idx);
            }
            DedupPolicy::GreatestValueWins => match best.entry(key) {
                Entry::Vacant(entry) => {
                    entry.insert(idx);
                }
                Entry::Occupied(mut entry) => {
                    if value_beats(values.get(idx), values.get(*entry.get())) {
                        entry.insert(idx);
                    }
                }
            },
        }
    }

    let mut kept: Vec<usize> = best.into_values().collect();
    let mut sortable: Vec<(Vec<SortKey>, usize)> = Vec::with_capacity(kept.len());
    for idx in kept.drain(..) {
        let mut parts = Vec::with_capacity(rc.index_columns.len() + 1);
        for index in &rc.index_columns {
            parts.push(sort_key(df.column(index)?, idx)?);
        }
        parts.push(sort_key(df.column(&rc.entity_column)?, idx)?);
        sortable.push((parts, idx));
    }
    sortable.sort();

    let indices: Vec<IdxSize> = sortable.iter().map(|(_, idx)| *idx as IdxSize).collect();
    let take = IdxCa::from_vec("take".into(), indices);
    Ok(df.take(&take)?)
}

/// A null loses to any value; ties keep the incumbent.
fn value_beats(candidate: Option<f64>, incumbent: Option<f64>) -> bool {
    match (candidate, incumbent) {
        (Some(new), Some(held)) => new > held,
        (Some(_), None) => true,
        _ => false,
    }
}

fn group_key(df: &DataFrame, rc: &ReshapeConfig, idx: usize) -> Result<String> {
    let mut key = String::new();
    for index in &rc.index_columns {
        let value = df.column(index)?.as_materialized_series().get(idx)?;
        key.push_str(&format!("{value}\u{1f}"));
    }
    let entity = df
        .column(&rc.entity_column)?
        .as_materialized_series()
        .get(idx)?;
    key.push_str(&format!("{entity}"));
    Ok(key)
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum SortKey {
    Null,
    Int(i64),
    Text(String),
}

fn sort_key(column: &Column, idx: usize) -> Result<SortKey> {
    let key = match column.dtype() {
        DataType::Date => column
            .date()?
            .get(idx)
            .map(|days| SortKey::Int(days as i64))
            .unwrap_or(SortKey::Null),
        DataType::Int64 => column
            .i64()?
            .get(idx)
            .map(SortKey::Int)
            .unwrap_or(SortKey::Null),
        DataType::String => column
            .str()?
            .get(idx)
            .map(|text| SortKey::Text(text.to_string()))
            .unwrap_or(SortKey::Null),
        _ => {
            let value = column.as_materialized_series().get(idx)?;
            match value {
                AnyValue::Null => SortKey::Null,
                other => SortKey::Text(format!("{other}")),
            }
        }
    };
    Ok(key)
}

fn split_entity(
    df: &DataFrame,
    rc: &ReshapeConfig,
    split: &EntitySplit,
    dataset: &str,
) -> Result<DataFrame> {
    let ca = df.column(&rc.entity_column)?.str()?;
    let mut left: Vec<String> = Vec::with_capacity(ca.len());
    let mut right: Vec<String> = Vec::with_capacity(ca.len());

    for idx in 0..ca.len() {
        let entity = ca.get(idx).ok_or_else(|| PipelineError::DataQuality {
            dataset: dataset.to_string(),
            column: rc.entity_column.clone(),
            detail: format!("null entity at row {idx}"),
        })?;
        let (first, second) =
            entity
                .split_once(split.delimiter.as_str())
                .ok_or_else(|| PipelineError::DataQuality {
                    dataset: dataset.to_string(),
                    column: rc.entity_column.clone(),
                    detail: format!(
                        "entity '{entity}' lacks split delimiter '{}'",
                        split.delimiter
                    ),
                })?;
        left.push(first.to_string());
        right.push(second.to_string());
    }

    let mut out = df.drop(&rc.entity_column)?;
    out.hstack_mut(&[
        Series::new(split.left.as_str().into(), left).into(),
        Series::new(split.right.as_str().into(), right).into(),
    ])?;
    Ok(out)
}
