//! Idempotent warehouse loading.
//!
//! One SQL transaction per dataset batch: every row is upserted keyed by
//! the dataset's natural unique key, with all non-key columns overwritten
//! on collision. Either the whole batch commits or it rolls back; one
//! dataset's failure never corrupts another's relation.

use chrono::NaiveDate;
use polars::prelude::*;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres};
use tracing::{info, warn};

use crate::error::{PipelineError, Result};
use crate::UNIX_EPOCH_DAYS;

pub async fn upsert(
    pool: &PgPool,
    df: &DataFrame,
    table: &str,
    natural_key: &[String],
    dataset: &str,
) -> Result<u64> {
    if natural_key.is_empty() {
        return Err(PipelineError::Configuration(format!(
            "{dataset}: natural key must name at least one column"
        )));
    }

    let columns: Vec<String> = df
        .get_columns()
        .iter()
        .map(|column| column.name().to_string())
        .collect();

    for key in natural_key {
        if !columns.iter().any(|column| column == key) {
            return Err(PipelineError::Configuration(format!(
                "{dataset}: natural key column '{key}' missing from table"
            )));
        }
    }

    let sql = build_upsert_sql(table, &columns, natural_key);

    let mut tx = pool.begin().await.map_err(classify)?;
    for row in 0..df.height() {
        let mut query = sqlx::query(&sql);
        for column in df.get_columns() {
            query = bind_value(query, column, row)?;
        }
        if let Err(err) = query.execute(&mut *tx).await {
            warn!(dataset, table, key = ?natural_key, error = %err, "rolling back batch");
            tx.rollback().await.ok();
            return Err(classify(err));
        }
    }
    tx.commit().await.map_err(classify)?;

    let rows = df.height() as u64;
    info!(dataset, table, rows, "batch committed");
    Ok(rows)
}

/// `INSERT … ON CONFLICT (key…) DO UPDATE SET <non-key> = EXCLUDED.<non-key>`;
/// a table whose columns are all part of the key degrades to `DO NOTHING`.
pub fn build_upsert_sql(table: &str, columns: &[String], natural_key: &[String]) -> String {
    let column_list = columns
        .iter()
        .map(|column| format!("\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=columns.len())
        .map(|position| format!("${position}"))
        .collect::<Vec<_>>()
        .join(", ");
    let conflict_list = natural_key
        .iter()
        .map(|key| format!("\"{key}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let updates = columns
        .iter()
        .filter(|column| !natural_key.iter().any(|key| key == *column))
        .map(|column| format!("\"{column}\" = EXCLUDED.\"{column}\""))
        .collect::<Vec<_>>()
        .join(", ");

    if updates.is_empty() {
        format!(
            "INSERT INTO {table} ({column_list}) VALUES ({placeholders}) \
             ON CONFLICT ({conflict_list}) DO NOTHING"
        )
    } else {
        format!(
            "INSERT INTO {table} ({column_list}) VALUES ({placeholders}) \
             ON CONFLICT ({conflict_list}) DO UPDATE SET {updates}"
        )
    }
}

fn bind_value<'q>(
    query: Query<'q, Postgres, PgArguments>,
    column: &Column,
    row: usize,
) -> Result<Query<'q, Postgres, PgArguments>> {
    match column.dtype() {
        DataType::Float64 => Ok(query.bind(column.f64()?.get(row))),
        DataType::Int64 => Ok(query.bind(column.i64()?.get(row))),
        DataType::String => Ok(query.bind(column.str()?.get(row).map(str::to_string))),
        DataType::Date => {
            let date = column.date()?.get(row).and_then(days_to_date);
            Ok(query.bind(date))
        }
        other => Err(PipelineError::Configuration(format!(
            "cannot load column '{}' of type {other}",
            column.name()
        ))),
    }
}

fn days_to_date(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS)
}

/// Constraint violations are fatal to the batch; connection-level failures
/// are the retryable class the orchestrator's connector handles.
fn classify(err: sqlx::Error) -> PipelineError {
    match &err {
        sqlx::Error::Database(db)
            if db.is_unique_violation()
                || db.is_check_violation()
                || db.is_foreign_key_violation() =>
        {
            PipelineError::Integrity(err)
        }
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => PipelineError::Connectivity(err),
        _ => PipelineError::Sqlx(err),
    }
}
