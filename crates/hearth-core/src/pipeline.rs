//! Per-dataset orchestration.
//!
//! Each dataset walks `Pending → Cleaning → Reshaping → Deriving →
//! Validating → Loading → Done`; a failure at any stage moves that dataset
//! to `Failed` and the run continues with the next one. Transform and
//! validation failures are never retried.

use serde::Serialize;
use sqlx::PgPool;
use tracing::{error, info};

use crate::config::DatasetConfig;
use crate::error::{PipelineError, Result};
use crate::{cleaner, ingest, loader, metrics, reshape, validate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Pending,
    Cleaning,
    Reshaping,
    Deriving,
    Validating,
    Loading,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Pending => "pending",
            Stage::Cleaning => "cleaning",
            Stage::Reshaping => "reshaping",
            Stage::Deriving => "deriving",
            Stage::Validating => "validating",
            Stage::Loading => "loading",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetReport {
    pub dataset: String,
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_at: Option<Stage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rows_loaded: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub reports: Vec<DatasetReport>,
}

impl RunSummary {
    pub fn completed(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.stage == Stage::Done)
            .count()
    }

    pub fn failed(&self) -> usize {
        self.reports
            .iter()
            .filter(|report| report.stage == Stage::Failed)
            .count()
    }
}

/// Runs every dataset sequentially against one shared pool. With
/// `pool = None` (dry run) each dataset stops after validation.
pub async fn run(pool: Option<&PgPool>, datasets: &[DatasetConfig], dry_run: bool) -> RunSummary {
    let mut reports = Vec::with_capacity(datasets.len());
    for cfg in datasets {
        info!(dataset = %cfg.name, "starting dataset pipeline");
        reports.push(run_dataset(pool, cfg, dry_run).await);
    }
    RunSummary { reports }
}

async fn run_dataset(pool: Option<&PgPool>, cfg: &DatasetConfig, dry_run: bool) -> DatasetReport {
    let mut stage = Stage::Pending;
    match execute_stages(pool, cfg, dry_run, &mut stage).await {
        Ok(rows_loaded) => {
            info!(dataset = %cfg.name, rows = ?rows_loaded, "dataset pipeline finished");
            DatasetReport {
                dataset: cfg.name.clone(),
                stage: Stage::Done,
                failed_at: None,
                rows_loaded,
                error: None,
            }
        }
        Err(err) => {
            error!(
                dataset = %cfg.name,
                stage = stage.as_str(),
                error = %err,
                "dataset pipeline failed"
            );
            DatasetReport {
                dataset: cfg.name.clone(),
                stage: Stage::Failed,
                failed_at: Some(stage),
                rows_loaded: None,
                error: Some(err.to_string()),
            }
        }
    }
}

async fn execute_stages(
    pool: Option<&PgPool>,
    cfg: &DatasetConfig,
    dry_run: bool,
    stage: &mut Stage,
) -> Result<Option<u64>> {
    cfg.validate()?;

    *stage = Stage::Cleaning;
    let raw = ingest::read_table(&cfg.source, cfg.delimiter as u8, &cfg.name)?;
    let mut table = cleaner::clean(&raw, cfg)?;

    *stage = Stage::Reshaping;
    if let Some(rc) = &cfg.reshape {
        table = reshape::reshape(&table, rc, &cfg.name)?;
    }

    *stage = Stage::Deriving;
    if !cfg.metrics.is_empty() {
        table = metrics::derive(&table, &cfg.metrics, &cfg.order_column, &cfg.name)?;
    }

    *stage = Stage::Validating;
    validate::check_bounds(&table, &cfg.bounds, &cfg.name)?;

    if dry_run {
        info!(dataset = %cfg.name, rows = table.height(), "dry run, skipping load");
        return Ok(None);
    }

    *stage = Stage::Loading;
    let pool = pool.ok_or_else(|| {
        PipelineError::Configuration(format!(
            "{}: no warehouse connection available for loading",
            cfg.name
        ))
    })?;
    let rows = loader::upsert(pool, &table, &cfg.destination, &cfg.natural_key, &cfg.name).await?;
    Ok(Some(rows))
}
