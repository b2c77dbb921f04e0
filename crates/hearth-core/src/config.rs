//! Declarative per-dataset pipeline configuration.
//!
//! Every dataset-specific decision (cleaning strategy, reshape policy,
//! natural key, precision map, metric lags) lives in a `DatasetConfig`
//! value rather than in scattered conditionals. Configs can be built in
//! code (see `catalog`) or deserialized from a TOML catalog file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{PipelineError, Result};

/// Missing-value handling applied by the cleaner after numeric coercion.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "strategy", content = "value")]
pub enum CleaningStrategy {
    /// Remove any row containing a null in any column.
    Drop,
    /// Replace nulls with a caller-supplied constant.
    FillConstant(f64),
    /// Replace nulls per-column with that column's mean over non-null values.
    FillMean,
    /// Forward-fill, then backward-fill leading gaps, then zero for columns
    /// that remain entirely empty.
    ForwardThenBackward,
}

/// Duplicate resolution for `(date, entity)` collisions after the melt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DedupPolicy {
    /// The last row in arrival order supersedes earlier ones.
    LatestWins,
    /// The numerically greatest value is kept; ties keep the earlier row.
    GreatestValueWins,
}

/// Splits a melted entity name once on a delimiter into two key columns,
/// e.g. `men_bachelors` -> (`men`, `bachelors`).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EntitySplit {
    pub delimiter: String,
    pub left: String,
    pub right: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReshapeConfig {
    /// Identifier columns that stay fixed through the melt (date/index).
    pub index_columns: Vec<String>,
    /// Wide columns carrying these suffixes are excluded from melting
    /// (columns already representing a derived change, not a base value).
    #[serde(default)]
    pub exclude_suffixes: Vec<String>,
    /// Name of the output entity column.
    pub entity_column: String,
    /// Name of the output value column.
    pub value_column: String,
    pub dedup: DedupPolicy,
    #[serde(default)]
    pub entity_split: Option<EntitySplit>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MetricSpec {
    /// Value column the percent change is computed over.
    pub source: String,
    /// Entity key columns; empty means the whole table is one sequence.
    #[serde(default)]
    pub group_by: Vec<String>,
    /// Lag in periods: 1 for MoM, 12 for YoY at monthly cadence.
    pub lag: usize,
    /// Name of the derived output column.
    pub output: String,
    /// Decimal places the result is rounded to, once, at derivation time.
    #[serde(default = "default_scale")]
    pub scale: u32,
}

fn default_scale() -> u32 {
    3
}

/// Fixed-point bounds for one destination column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ColumnBounds {
    pub column: String,
    pub precision: u32,
    pub scale: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Rename {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DatasetConfig {
    pub name: String,
    /// Delimited source file, relative to the run's data directory.
    pub source: PathBuf,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    /// Raw columns to keep before renaming; empty keeps everything.
    #[serde(default)]
    pub select: Vec<String>,
    /// Stray source columns removed when present (some exports carry a
    /// duplicate date column under a second name).
    #[serde(default)]
    pub drop_columns: Vec<String>,
    #[serde(default)]
    pub rename: Vec<Rename>,
    pub cleaning: CleaningStrategy,
    /// The chronological column: a first-of-period date, or an integer year.
    pub order_column: String,
    /// Identifier columns kept as text and never coerced to numeric.
    #[serde(default)]
    pub key_columns: Vec<String>,
    #[serde(default)]
    pub reshape: Option<ReshapeConfig>,
    #[serde(default)]
    pub metrics: Vec<MetricSpec>,
    /// Minimal column set uniquely identifying a warehouse row.
    pub natural_key: Vec<String>,
    #[serde(default)]
    pub bounds: Vec<ColumnBounds>,
    /// Destination relation in the warehouse.
    pub destination: String,
}

fn default_delimiter() -> char {
    ','
}

impl DatasetConfig {
    /// Checks the config for defects that would otherwise surface as
    /// confusing mid-pipeline failures. Fatal to this dataset only.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(PipelineError::Configuration(
                "dataset name must not be empty".to_string(),
            ));
        }
        if !self.delimiter.is_ascii() {
            return Err(PipelineError::Configuration(format!(
                "{}: delimiter must be a single ASCII character",
                self.name
            )));
        }
        if self.order_column.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "{}: order column must not be empty",
                self.name
            )));
        }
        if self.natural_key.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "{}: natural key must name at least one column",
                self.name
            )));
        }
        if self.destination.is_empty() {
            return Err(PipelineError::Configuration(format!(
                "{}: destination relation must not be empty",
                self.name
            )));
        }
        for spec in &self.metrics {
            if spec.lag == 0 {
                return Err(PipelineError::Configuration(format!(
                    "{}: metric '{}' has lag 0; lags are 1-based periods",
                    self.name, spec.output
                )));
            }
            if spec.output.is_empty() || spec.source.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "{}: metric specs need both a source and an output column",
                    self.name
                )));
            }
        }
        for bounds in &self.bounds {
            if bounds.scale > bounds.precision {
                return Err(PipelineError::Configuration(format!(
                    "{}: bounds for '{}' have scale {} > precision {}",
                    self.name, bounds.column, bounds.scale, bounds.precision
                )));
            }
        }
        if let Some(reshape) = &self.reshape {
            if reshape.entity_column.is_empty() || reshape.value_column.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "{}: reshape needs entity and value column names",
                    self.name
                )));
            }
            if reshape.index_columns.is_empty() {
                return Err(PipelineError::Configuration(format!(
                    "{}: reshape needs at least one index column",
                    self.name
                )));
            }
            if let Some(split) = &reshape.entity_split {
                if split.delimiter.is_empty() {
                    return Err(PipelineError::Configuration(format!(
                        "{}: entity split delimiter must not be empty",
                        self.name
                    )));
                }
            }
        }
        Ok(())
    }

    /// Returns a copy with a relative source path resolved against `data_dir`.
    pub fn with_data_dir(&self, data_dir: &Path) -> Self {
        let mut cfg = self.clone();
        if cfg.source.is_relative() {
            cfg.source = data_dir.join(&cfg.source);
        }
        cfg
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    dataset: Vec<DatasetConfig>,
}

/// Loads a dataset catalog from a TOML file with `[[dataset]]` entries.
pub fn load_catalog(path: &Path) -> Result<Vec<DatasetConfig>> {
    let contents = std::fs::read_to_string(path)?;
    let parsed: CatalogFile = toml::from_str(&contents)?;
    for dataset in &parsed.dataset {
        dataset.validate()?;
    }
    Ok(parsed.dataset)
}
