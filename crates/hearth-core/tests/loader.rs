use hearth_core::loader::build_upsert_sql;

fn strings(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

#[test]
fn upsert_overwrites_non_key_columns_on_conflict() {
    let sql = build_upsert_sql(
        "zillow_housing",
        &strings(&["date", "region_name", "price", "price_mom"]),
        &strings(&["date", "region_name"]),
    );

    assert_eq!(
        sql,
        "INSERT INTO zillow_housing (\"date\", \"region_name\", \"price\", \"price_mom\") \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (\"date\", \"region_name\") \
         DO UPDATE SET \"price\" = EXCLUDED.\"price\", \"price_mom\" = EXCLUDED.\"price_mom\""
    );
}

#[test]
fn all_key_tables_degrade_to_do_nothing() {
    let sql = build_upsert_sql(
        "memberships",
        &strings(&["date", "state"]),
        &strings(&["date", "state"]),
    );

    assert!(sql.ends_with("ON CONFLICT (\"date\", \"state\") DO NOTHING"));
    assert!(!sql.contains("DO UPDATE"));
}

#[test]
fn mixed_case_source_headers_stay_quoted() {
    let sql = build_upsert_sql("t", &strings(&["Date", "Price"]), &strings(&["Date"]));
    assert!(sql.contains("(\"Date\", \"Price\")"));
    assert!(sql.contains("\"Price\" = EXCLUDED.\"Price\""));
}
