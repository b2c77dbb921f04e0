use chrono::NaiveDate;
use polars::prelude::*;

use hearth_core::cleaner::clean;
use hearth_core::config::{CleaningStrategy, DatasetConfig, Rename};
use hearth_core::error::PipelineError;
use hearth_core::{catalog, reshape};

fn base_config(cleaning: CleaningStrategy) -> DatasetConfig {
    DatasetConfig {
        name: "test_dataset".to_string(),
        source: "unused.csv".into(),
        delimiter: ',',
        select: Vec::new(),
        drop_columns: Vec::new(),
        rename: Vec::new(),
        cleaning,
        order_column: "date".to_string(),
        key_columns: Vec::new(),
        reshape: None,
        metrics: Vec::new(),
        natural_key: vec!["date".to_string()],
        bounds: Vec::new(),
        destination: "test_dataset".to_string(),
    }
}

fn days_since_epoch(year: i32, month: u32, day: u32) -> i32 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    (NaiveDate::from_ymd_opt(year, month, day).unwrap() - epoch).num_days() as i32
}

#[test]
fn coerces_non_key_columns_and_fills_constant() -> PolarsResult<()> {
    let df = DataFrame::new(vec![
        Series::new("date".into(), vec!["2020-01-15", "2020-02-15", "2020-03-15"]).into(),
        Series::new("price".into(), vec![Some("100.5"), Some("not a number"), None]).into(),
    ])?;

    let cfg = base_config(CleaningStrategy::FillConstant(-1.0));
    let out = clean(&df, &cfg).unwrap();

    let price = out.column("price")?.f64()?;
    assert_eq!(price.get(0), Some(100.5));
    // Unparseable cells become null before the strategy runs, never an error.
    assert_eq!(price.get(1), Some(-1.0));
    assert_eq!(price.get(2), Some(-1.0));
    Ok(())
}

#[test]
fn drop_strategy_removes_rows_with_any_null() -> PolarsResult<()> {
    let df = DataFrame::new(vec![
        Series::new("date".into(), vec!["2020-01-01", "2020-02-01", "2020-03-01"]).into(),
        Series::new("a".into(), vec![Some("1"), None, Some("3")]).into(),
        Series::new("b".into(), vec![Some("4"), Some("5"), Some("bad")]).into(),
    ])?;

    let cfg = base_config(CleaningStrategy::Drop);
    let out = clean(&df, &cfg).unwrap();

    assert_eq!(out.height(), 1);
    assert_eq!(out.column("a")?.f64()?.get(0), Some(1.0));
    Ok(())
}

#[test]
fn fill_mean_uses_per_column_mean_over_non_null_values() -> PolarsResult<()> {
    let df = DataFrame::new(vec![
        Series::new("date".into(), vec!["2020-01-01", "2020-02-01", "2020-03-01"]).into(),
        Series::new("a".into(), vec![Some("10"), None, Some("30")]).into(),
        Series::new("empty".into(), vec![None::<&str>, None, None]).into(),
    ])?;

    let cfg = base_config(CleaningStrategy::FillMean);
    let out = clean(&df, &cfg).unwrap();

    assert_eq!(out.column("a")?.f64()?.get(1), Some(20.0));
    // All-null columns have no mean and stay null.
    assert_eq!(out.column("empty")?.f64()?.get(0), None);
    Ok(())
}

#[test]
fn forward_then_backward_fill_with_zero_fallback() -> PolarsResult<()> {
    let df = DataFrame::new(vec![
        Series::new(
            "date".into(),
            vec!["2020-01-01", "2020-02-01", "2020-03-01", "2020-04-01"],
        )
        .into(),
        Series::new("a".into(), vec![None, Some("2"), None, Some("4")]).into(),
        Series::new("empty".into(), vec![None::<&str>, None, None, None]).into(),
    ])?;

    let cfg = base_config(CleaningStrategy::ForwardThenBackward);
    let out = clean(&df, &cfg).unwrap();

    let a = out.column("a")?.f64()?;
    // Leading gap backward-filled, interior gap forward-filled.
    assert_eq!(a.get(0), Some(2.0));
    assert_eq!(a.get(2), Some(2.0));
    assert_eq!(out.column("empty")?.f64()?.get(3), Some(0.0));
    Ok(())
}

#[test]
fn order_column_snaps_to_first_of_period() -> PolarsResult<()> {
    let df = DataFrame::new(vec![
        Series::new("date".into(), vec!["01-31-2020", "02-29-2020"]).into(),
        Series::new("v".into(), vec!["1", "2"]).into(),
    ])?;

    let cfg = base_config(CleaningStrategy::Drop);
    let out = clean(&df, &cfg).unwrap();

    assert_eq!(out.column("date")?.dtype(), &DataType::Date);
    let date = out.column("date")?.date()?;
    assert_eq!(date.get(0), Some(days_since_epoch(2020, 1, 1)));
    assert_eq!(date.get(1), Some(days_since_epoch(2020, 2, 1)));
    Ok(())
}

#[test]
fn year_only_order_column_becomes_integer() -> PolarsResult<()> {
    let mut cfg = base_config(CleaningStrategy::Drop);
    cfg.order_column = "year".to_string();
    cfg.key_columns = vec!["state".to_string()];
    cfg.natural_key = vec!["state".to_string(), "year".to_string()];

    let df = DataFrame::new(vec![
        Series::new("state".into(), vec!["WA", "OR"]).into(),
        Series::new("year".into(), vec!["2019", "2020"]).into(),
        Series::new("units".into(), vec!["10", "20"]).into(),
    ])?;

    let out = clean(&df, &cfg).unwrap();
    assert_eq!(out.column("year")?.dtype(), &DataType::Int64);
    assert_eq!(out.column("year")?.i64()?.get(1), Some(2020));
    // Key columns are never coerced.
    assert_eq!(out.column("state")?.dtype(), &DataType::String);
    Ok(())
}

#[test]
fn unparseable_date_is_a_data_quality_error() -> PolarsResult<()> {
    let df = DataFrame::new(vec![
        Series::new("date".into(), vec!["2020-01-01", "soon"]).into(),
        Series::new("v".into(), vec!["1", "2"]).into(),
    ])?;

    let cfg = base_config(CleaningStrategy::FillMean);
    let err = clean(&df, &cfg).unwrap_err();
    assert!(matches!(err, PipelineError::DataQuality { .. }));
    assert!(err.to_string().contains("soon"));
    Ok(())
}

#[test]
fn fully_duplicate_rows_are_removed() -> PolarsResult<()> {
    let df = DataFrame::new(vec![
        Series::new("date".into(), vec!["2020-01-01", "2020-01-01", "2020-02-01"]).into(),
        Series::new("v".into(), vec!["5", "5", "6"]).into(),
    ])?;

    let cfg = base_config(CleaningStrategy::Drop);
    let out = clean(&df, &cfg).unwrap();
    assert_eq!(out.height(), 2);
    Ok(())
}

#[test]
fn configured_drop_columns_are_removed_when_present() -> PolarsResult<()> {
    let mut cfg = base_config(CleaningStrategy::Drop);
    cfg.drop_columns = vec!["Date".to_string(), "never_there".to_string()];

    let df = DataFrame::new(vec![
        Series::new("date".into(), vec!["2020-01-01"]).into(),
        Series::new("Date".into(), vec!["2020-01-31"]).into(),
        Series::new("v".into(), vec!["1"]).into(),
    ])?;

    let out = clean(&df, &cfg).unwrap();
    assert!(out.column("Date").is_err());
    assert_eq!(out.height(), 1);
    Ok(())
}

// A raw home-value export sometimes carries a stray second date column;
// if it survives cleaning, the melt would invent a "Date" state filled
// with zeros for every period.
#[test]
fn stray_date_column_never_melts_into_an_entity() -> PolarsResult<()> {
    let cfg = catalog::find("zillow_home_value_index").unwrap();

    let df = DataFrame::new(vec![
        Series::new("Unnamed: 0".into(), vec!["2020-01-31", "2020-02-29"]).into(),
        Series::new("Date".into(), vec!["2020-01-31", "2020-02-29"]).into(),
        Series::new("CA".into(), vec!["550000", "552000"]).into(),
        Series::new("WA".into(), vec!["410000", "412000"]).into(),
    ])?;

    let cleaned = clean(&df, cfg).unwrap();
    let long = reshape::reshape(&cleaned, cfg.reshape.as_ref().unwrap(), &cfg.name).unwrap();

    let states = long.column("state")?.str()?;
    let fabricated = (0..states.len())
        .filter(|&idx| states.get(idx) == Some("Date"))
        .count();
    assert_eq!(fabricated, 0);
    assert_eq!(long.height(), 4);
    Ok(())
}

#[test]
fn select_and_rename_run_before_coercion() -> PolarsResult<()> {
    let mut cfg = base_config(CleaningStrategy::Drop);
    cfg.select = vec!["Unnamed: 0".to_string(), "U.S. National".to_string()];
    cfg.rename = vec![
        Rename {
            from: "Unnamed: 0".to_string(),
            to: "date".to_string(),
        },
        Rename {
            from: "U.S. National".to_string(),
            to: "us_national".to_string(),
        },
    ];

    let df = DataFrame::new(vec![
        Series::new("Unnamed: 0".into(), vec!["2020-01-01"]).into(),
        Series::new("U.S. National".into(), vec!["212.4"]).into(),
        Series::new("ignored".into(), vec!["junk"]).into(),
    ])?;

    let out = clean(&df, &cfg).unwrap();
    assert!(out.column("ignored").is_err());
    assert_eq!(out.column("us_national")?.f64()?.get(0), Some(212.4));
    assert!(out.column("date")?.date()?.get(0).is_some());
    Ok(())
}
