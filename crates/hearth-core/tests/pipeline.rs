use std::path::PathBuf;

use hearth_core::config::{CleaningStrategy, ColumnBounds, DatasetConfig, MetricSpec};
use hearth_core::pipeline::{self, Stage};

fn write_temp_csv(name: &str, contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn prices_config(source: PathBuf) -> DatasetConfig {
    DatasetConfig {
        name: "prices".to_string(),
        source,
        delimiter: ',',
        select: Vec::new(),
        drop_columns: Vec::new(),
        rename: Vec::new(),
        cleaning: CleaningStrategy::Drop,
        order_column: "date".to_string(),
        key_columns: Vec::new(),
        reshape: None,
        metrics: vec![MetricSpec {
            source: "price".to_string(),
            group_by: Vec::new(),
            lag: 1,
            output: "price_mom".to_string(),
            scale: 3,
        }],
        natural_key: vec!["date".to_string()],
        bounds: vec![
            ColumnBounds {
                column: "price".to_string(),
                precision: 12,
                scale: 2,
            },
            ColumnBounds {
                column: "price_mom".to_string(),
                precision: 6,
                scale: 3,
            },
        ],
        destination: "prices".to_string(),
    }
}

#[tokio::test]
async fn dry_run_walks_every_stage_without_a_warehouse() {
    let source = write_temp_csv(
        "hearth_prices_ok.csv",
        "date,price\n2020-01-01,100.0\n2020-02-01,110.0\n",
    );

    let summary = pipeline::run(None, &[prices_config(source)], true).await;

    assert_eq!(summary.completed(), 1);
    assert_eq!(summary.failed(), 0);
    let report = &summary.reports[0];
    assert_eq!(report.stage, Stage::Done);
    assert_eq!(report.rows_loaded, None);
    assert_eq!(report.error, None);
}

#[tokio::test]
async fn one_failing_dataset_never_stops_the_rest() {
    let good = write_temp_csv(
        "hearth_prices_good.csv",
        "date,price\n2020-01-01,100.0\n2020-02-01,110.0\n",
    );
    let missing = prices_config(PathBuf::from("/nonexistent/hearth/input.csv"));

    let summary = pipeline::run(None, &[missing, prices_config(good)], true).await;

    assert_eq!(summary.reports.len(), 2);
    assert_eq!(summary.failed(), 1);
    assert_eq!(summary.completed(), 1);

    let failed = &summary.reports[0];
    assert_eq!(failed.stage, Stage::Failed);
    assert_eq!(failed.failed_at, Some(Stage::Cleaning));
    assert!(failed.error.is_some());
    assert_eq!(summary.reports[1].stage, Stage::Done);
}

#[tokio::test]
async fn out_of_bounds_values_fail_during_validation() {
    let source = write_temp_csv(
        "hearth_prices_wide.csv",
        "date,price\n2020-01-01,100.0\n2020-02-01,9999999999999.0\n",
    );

    let summary = pipeline::run(None, &[prices_config(source)], true).await;

    let report = &summary.reports[0];
    assert_eq!(report.stage, Stage::Failed);
    assert_eq!(report.failed_at, Some(Stage::Validating));
    assert!(report.error.as_deref().unwrap().contains("price"));
}

#[tokio::test]
async fn loading_without_a_pool_fails_at_the_loading_stage() {
    let source = write_temp_csv(
        "hearth_prices_load.csv",
        "date,price\n2020-01-01,100.0\n",
    );

    let summary = pipeline::run(None, &[prices_config(source)], false).await;

    let report = &summary.reports[0];
    assert_eq!(report.stage, Stage::Failed);
    assert_eq!(report.failed_at, Some(Stage::Loading));
}

#[tokio::test]
async fn invalid_config_fails_before_any_file_is_read() {
    let mut cfg = prices_config(PathBuf::from("/nonexistent/never-read.csv"));
    cfg.natural_key.clear();

    let summary = pipeline::run(None, &[cfg], true).await;

    let report = &summary.reports[0];
    assert_eq!(report.stage, Stage::Failed);
    // Config validation happens ahead of the first stage transition.
    assert_eq!(report.failed_at, Some(Stage::Pending));
    assert!(report.error.as_deref().unwrap().contains("natural key"));
}

#[test]
fn reports_serialize_with_snake_case_stages() {
    let report = pipeline::DatasetReport {
        dataset: "prices".to_string(),
        stage: Stage::Done,
        failed_at: None,
        rows_loaded: Some(42),
        error: None,
    };

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["stage"], "done");
    assert_eq!(json["rows_loaded"], 42);
    assert!(json.get("error").is_none());
}
