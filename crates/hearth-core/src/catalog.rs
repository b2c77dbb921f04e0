//! Built-in catalog of the production housing/economic datasets.
//!
//! One entry per warehouse relation. Paths are relative to the run's data
//! directory; precision maps match the destination schema's numeric types.

use once_cell::sync::Lazy;
use std::path::PathBuf;

use crate::config::{
    CleaningStrategy, ColumnBounds, DatasetConfig, DedupPolicy, EntitySplit, MetricSpec, Rename,
    ReshapeConfig,
};

static CATALOG: Lazy<Vec<DatasetConfig>> = Lazy::new(|| {
    vec![
        bls_housing_cpi(),
        census_housing(),
        kaggle_housing_prices(),
        wages_education(),
        interest_rates(),
        zillow_housing(),
        zillow_home_value_index(),
    ]
});

pub fn builtin() -> &'static [DatasetConfig] {
    CATALOG.as_slice()
}

pub fn find(name: &str) -> Option<&'static DatasetConfig> {
    builtin().iter().find(|cfg| cfg.name == name)
}

fn renames(pairs: &[(&str, &str)]) -> Vec<Rename> {
    pairs
        .iter()
        .map(|(from, to)| Rename {
            from: (*from).to_string(),
            to: (*to).to_string(),
        })
        .collect()
}

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

fn bounds(entries: &[(&str, u32, u32)]) -> Vec<ColumnBounds> {
    entries
        .iter()
        .map(|(column, precision, scale)| ColumnBounds {
            column: (*column).to_string(),
            precision: *precision,
            scale: *scale,
        })
        .collect()
}

/// MoM + YoY pair over one source column, whole-table sequence.
fn change_pair(source: &str, mom: &str, yoy: &str) -> Vec<MetricSpec> {
    vec![
        MetricSpec {
            source: source.to_string(),
            group_by: Vec::new(),
            lag: 1,
            output: mom.to_string(),
            scale: 3,
        },
        MetricSpec {
            source: source.to_string(),
            group_by: Vec::new(),
            lag: 12,
            output: yoy.to_string(),
            scale: 3,
        },
    ]
}

fn bls_housing_cpi() -> DatasetConfig {
    let mut metrics = Vec::new();
    metrics.extend(change_pair("housing_cpi", "housing_cpi_mom", "housing_cpi_yoy"));
    metrics.extend(change_pair("shelter_cpi", "shelter_cpi_mom", "shelter_cpi_yoy"));
    metrics.extend(change_pair(
        "fuels_utilities_cpi",
        "fuels_utilities_mom",
        "fuels_utilities_yoy",
    ));
    metrics.extend(change_pair(
        "household_furnishings_cpi",
        "furnishings_mom",
        "furnishings_yoy",
    ));
    DatasetConfig {
        name: "bls_housing_cpi".to_string(),
        source: PathBuf::from("bls/bls_housing_processed.csv"),
        delimiter: ',',
        select: strings(&[
            "date",
            "Fuels_Utilities",
            "Household_Furnishings",
            "Housing",
            "Shelter",
        ]),
        drop_columns: Vec::new(),
        rename: renames(&[
            ("Fuels_Utilities", "fuels_utilities_cpi"),
            ("Household_Furnishings", "household_furnishings_cpi"),
            ("Housing", "housing_cpi"),
            ("Shelter", "shelter_cpi"),
        ]),
        cleaning: CleaningStrategy::FillMean,
        order_column: "date".to_string(),
        key_columns: Vec::new(),
        reshape: None,
        metrics,
        natural_key: strings(&["date"]),
        bounds: bounds(&[
            ("housing_cpi", 10, 2),
            ("shelter_cpi", 10, 2),
            ("fuels_utilities_cpi", 10, 2),
            ("household_furnishings_cpi", 10, 2),
            ("housing_cpi_mom", 6, 3),
            ("shelter_cpi_mom", 6, 3),
            ("fuels_utilities_mom", 6, 3),
            ("furnishings_mom", 6, 3),
            ("housing_cpi_yoy", 6, 3),
            ("shelter_cpi_yoy", 6, 3),
            ("fuels_utilities_yoy", 6, 3),
            ("furnishings_yoy", 6, 3),
        ]),
        destination: "bls_housing_cpi".to_string(),
    }
}

fn census_housing() -> DatasetConfig {
    DatasetConfig {
        name: "census_housing".to_string(),
        source: PathBuf::from("census/census_housing_processed.csv"),
        delimiter: ',',
        select: Vec::new(),
        drop_columns: Vec::new(),
        rename: renames(&[
            ("Total_Housing_Units", "total_housing_units"),
            ("Occupied_Units", "occupied_units"),
            ("Vacant_Units", "vacant_units"),
            ("Owner_Occupied", "owner_occupied"),
            ("Renter_Occupied", "renter_occupied"),
            ("Median_Home_Value", "median_home_value"),
            ("Median_Monthly_Housing_Cost", "median_monthly_cost"),
            ("Vacancy_Rate", "vacancy_rate"),
            ("Homeownership_Rate", "homeownership_rate"),
        ]),
        cleaning: CleaningStrategy::FillMean,
        order_column: "year".to_string(),
        key_columns: strings(&["state"]),
        reshape: None,
        metrics: Vec::new(),
        natural_key: strings(&["state", "year"]),
        bounds: bounds(&[
            ("median_home_value", 12, 2),
            ("median_monthly_cost", 8, 2),
            ("vacancy_rate", 5, 2),
            ("homeownership_rate", 5, 2),
        ]),
        destination: "census_housing".to_string(),
    }
}

fn kaggle_housing_prices() -> DatasetConfig {
    let mut metrics = Vec::new();
    metrics.extend(change_pair("us_national", "us_national_mom", "us_national_yoy"));
    metrics.extend(change_pair("city_composite_20", "city_20_mom", "city_20_yoy"));
    metrics.extend(change_pair("city_composite_10", "city_10_mom", "city_10_yoy"));
    DatasetConfig {
        name: "kaggle_housing_prices".to_string(),
        source: PathBuf::from("kaggle/housing/kaggle_housing_processed.csv"),
        delimiter: ',',
        select: strings(&["date", "U.S. National", "20-City Composite", "10-City Composite"]),
        drop_columns: Vec::new(),
        rename: renames(&[
            ("U.S. National", "us_national"),
            ("20-City Composite", "city_composite_20"),
            ("10-City Composite", "city_composite_10"),
        ]),
        cleaning: CleaningStrategy::FillMean,
        order_column: "date".to_string(),
        key_columns: Vec::new(),
        reshape: None,
        metrics,
        natural_key: strings(&["date"]),
        bounds: bounds(&[
            ("us_national", 10, 2),
            ("city_composite_20", 10, 2),
            ("city_composite_10", 10, 2),
            ("us_national_mom", 6, 3),
            ("city_20_mom", 6, 3),
            ("city_10_mom", 6, 3),
            ("us_national_yoy", 6, 3),
            ("city_20_yoy", 6, 3),
            ("city_10_yoy", 6, 3),
        ]),
        destination: "kaggle_housing_prices".to_string(),
    }
}

fn wages_education() -> DatasetConfig {
    DatasetConfig {
        name: "wages_education".to_string(),
        source: PathBuf::from("kaggle/wages/kaggle_wages_processed.csv"),
        delimiter: ',',
        select: Vec::new(),
        drop_columns: Vec::new(),
        rename: renames(&[("Year", "year")]),
        cleaning: CleaningStrategy::FillMean,
        order_column: "year".to_string(),
        key_columns: Vec::new(),
        reshape: Some(ReshapeConfig {
            index_columns: strings(&["year"]),
            exclude_suffixes: Vec::new(),
            entity_column: "category".to_string(),
            value_column: "wage_value".to_string(),
            dedup: DedupPolicy::LatestWins,
            entity_split: Some(EntitySplit {
                delimiter: "_".to_string(),
                left: "demographic_group".to_string(),
                right: "education_level".to_string(),
            }),
        }),
        // Annual cadence: the year-over-year change is a lag of one period.
        metrics: vec![MetricSpec {
            source: "wage_value".to_string(),
            group_by: strings(&["demographic_group", "education_level"]),
            lag: 1,
            output: "wage_yoy_change".to_string(),
            scale: 3,
        }],
        natural_key: strings(&["year", "education_level", "demographic_group"]),
        bounds: bounds(&[("wage_value", 10, 2), ("wage_yoy_change", 6, 3)]),
        destination: "wages_education".to_string(),
    }
}

fn interest_rates() -> DatasetConfig {
    let mut metrics = Vec::new();
    metrics.extend(change_pair("fed_funds_target", "target_rate_mom", "target_rate_yoy"));
    metrics.extend(change_pair("effective_rate", "effective_rate_mom", "effective_rate_yoy"));
    DatasetConfig {
        name: "interest_rates".to_string(),
        source: PathBuf::from("kaggle/interest_rates/kaggle_interest_rates_processed.csv"),
        delimiter: ',',
        select: Vec::new(),
        drop_columns: Vec::new(),
        rename: renames(&[
            ("Date", "date"),
            ("Federal Funds Target Rate", "fed_funds_target"),
            ("Federal Funds Upper Target", "fed_funds_upper"),
            ("Federal Funds Lower Target", "fed_funds_lower"),
            ("Effective Federal Funds Rate", "effective_rate"),
            ("Real GDP (Percent Change)", "real_gdp_change"),
            ("Unemployment Rate", "unemployment_rate"),
            ("Inflation Rate", "inflation_rate"),
        ]),
        cleaning: CleaningStrategy::Drop,
        order_column: "date".to_string(),
        key_columns: Vec::new(),
        reshape: None,
        metrics,
        natural_key: strings(&["date"]),
        bounds: bounds(&[
            ("fed_funds_target", 5, 2),
            ("fed_funds_upper", 5, 2),
            ("fed_funds_lower", 5, 2),
            ("effective_rate", 5, 2),
            ("real_gdp_change", 5, 2),
            ("unemployment_rate", 5, 2),
            ("inflation_rate", 5, 2),
            ("target_rate_mom", 6, 3),
            ("effective_rate_mom", 6, 3),
            ("target_rate_yoy", 6, 3),
            ("effective_rate_yoy", 6, 3),
        ]),
        destination: "interest_rates".to_string(),
    }
}

fn zillow_housing() -> DatasetConfig {
    DatasetConfig {
        name: "zillow_housing".to_string(),
        source: PathBuf::from("kaggle/zillow/kaggle_zillow_processed.csv"),
        delimiter: ',',
        select: strings(&["Date", "RegionName", "State", "Metro", "CountyName", "Price"]),
        drop_columns: Vec::new(),
        rename: renames(&[
            ("Date", "date"),
            ("RegionName", "region_name"),
            ("State", "state"),
            ("Metro", "metro_area"),
            ("CountyName", "county_name"),
            ("Price", "price"),
        ]),
        cleaning: CleaningStrategy::FillMean,
        order_column: "date".to_string(),
        key_columns: strings(&["region_name", "state", "metro_area", "county_name"]),
        // Already long; the reshape stage only resolves duplicate snapshots,
        // where later source rows supersede earlier ones for the same period.
        reshape: Some(ReshapeConfig {
            index_columns: strings(&["date"]),
            exclude_suffixes: Vec::new(),
            entity_column: "region_name".to_string(),
            value_column: "price".to_string(),
            dedup: DedupPolicy::LatestWins,
            entity_split: None,
        }),
        metrics: vec![
            MetricSpec {
                source: "price".to_string(),
                group_by: strings(&["region_name"]),
                lag: 1,
                output: "price_mom".to_string(),
                scale: 3,
            },
            MetricSpec {
                source: "price".to_string(),
                group_by: strings(&["region_name"]),
                lag: 12,
                output: "price_yoy".to_string(),
                scale: 3,
            },
        ],
        natural_key: strings(&["date", "region_name"]),
        bounds: bounds(&[("price", 12, 2), ("price_mom", 6, 3), ("price_yoy", 6, 3)]),
        destination: "zillow_housing".to_string(),
    }
}

fn zillow_home_value_index() -> DatasetConfig {
    DatasetConfig {
        name: "zillow_home_value_index".to_string(),
        source: PathBuf::from("kaggle/zillow_hvindex/kaggle_zillow_hvindex_raw.csv"),
        delimiter: ',',
        select: Vec::new(),
        // The raw export sometimes carries a stray second date column that
        // would otherwise melt into a bogus "Date" state.
        drop_columns: strings(&["Date"]),
        rename: renames(&[("Unnamed: 0", "date")]),
        cleaning: CleaningStrategy::ForwardThenBackward,
        order_column: "date".to_string(),
        key_columns: Vec::new(),
        // Duplicate re-reported indices resolve to the larger figure.
        reshape: Some(ReshapeConfig {
            index_columns: strings(&["date"]),
            exclude_suffixes: strings(&["_MoM", "_mom"]),
            entity_column: "state".to_string(),
            value_column: "home_value_index".to_string(),
            dedup: DedupPolicy::GreatestValueWins,
            entity_split: None,
        }),
        metrics: vec![
            MetricSpec {
                source: "home_value_index".to_string(),
                group_by: strings(&["state"]),
                lag: 1,
                output: "hvi_mom".to_string(),
                scale: 3,
            },
            MetricSpec {
                source: "home_value_index".to_string(),
                group_by: strings(&["state"]),
                lag: 12,
                output: "hvi_yoy".to_string(),
                scale: 3,
            },
        ],
        natural_key: strings(&["date", "state"]),
        bounds: bounds(&[
            ("home_value_index", 12, 2),
            ("hvi_mom", 6, 3),
            ("hvi_yoy", 6, 3),
        ]),
        destination: "zillow_home_value_index".to_string(),
    }
}
