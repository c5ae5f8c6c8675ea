use chrono::{TimeZone, Utc};
use dashkit::prelude::*;
use pretty_assertions::assert_eq;

fn model(json: &str) -> QueryConfigModel {
    QueryConfigModel::from_json(json).expect("Failed to decode query config")
}

#[test]
fn test_daily_round_trip() {
    let model = model(
        r#"{
            "filters": {"start_date": null, "end_date": null, "product_name": "p1",
                        "test": "", "metric": "", "runby": "", "official": "true", "metadata": []},
            "results": {"date_group": "Daily", "labels": []}
        }"#,
    );

    let sql = dashkit::translate(&model).unwrap();
    assert_eq!(
        sql,
        "SELECT test, metric, owner, \
         USEC_TO_TIMESTAMP(UTC_USEC_TO_DAY(INTEGER(timestamp * 1000000))) AS date, \
         MIN(value) AS min, AVG(value) AS avg, MAX(value) AS max, STDDEV(value) AS stddev, \
         VARIANCE(value) AS variance, COUNT(value) AS count \
         FROM samples_mart.results \
         WHERE product_name = 'p1' AND official = true \
         GROUP BY test, metric, owner, date \
         ORDER BY test, metric, date \
         LIMIT 5000"
    );
}

#[test]
fn test_details_with_dates_labels_and_metadata() {
    let model = model(
        r#"{
            "filters": {
                "start_date": {"filter_type": "CUSTOM", "text": "2015-01-01"},
                "end_date": {"filter_type": "DAY", "filter_value": 1},
                "product_name": "p1", "test": "iperf", "metric": "Throughput", "runby": "",
                "official": "false",
                "metadata": [{"text": "cloud:GCP"}]
            },
            "results": {"date_group": "Details", "labels": [{"label": "zone"}]}
        }"#,
    );

    let sql = dashkit::translate(&model).unwrap();
    assert_eq!(
        sql,
        "SELECT owner, SEC_TO_TIMESTAMP(INTEGER(timestamp)) AS date, \
         REGEXP_EXTRACT(labels, r'\\|zone:(.*?)\\|') AS zone, value, log_uri \
         FROM samples_mart.results \
         WHERE timestamp >= TIMESTAMP_TO_SEC(TIMESTAMP('2015-01-01')) \
         AND timestamp <= TIMESTAMP_TO_SEC(DATE_ADD(CURRENT_TIMESTAMP(), -1, 'DAY')) \
         AND product_name = 'p1' AND test = 'iperf' AND metric = 'Throughput' \
         AND official = false AND labels CONTAINS '|cloud:GCP|' \
         ORDER BY date \
         LIMIT 5000"
    );
}

#[test]
fn test_weekly_group_by_matches_columns() {
    let model = model(
        r#"{"filters": {"metric": "latency"},
            "results": {"date_group": "Weekly", "labels": [{"label": "num-vms"}]}}"#,
    );

    let service = QueryBuilderService::new();
    let plan = service.explain(&model).unwrap();
    let sql = service.get_sql(&model).unwrap();

    assert!(sql.contains("UTC_USEC_TO_WEEK(INTEGER(timestamp * 1000000), 0)"));
    assert!(sql.contains("AS [num-vms]"));
    assert!(sql.contains("GROUP BY product_name, test, owner, date, [num-vms] ORDER BY"));
    assert_eq!(plan.sort_fields, vec!["product_name", "test", "date"]);
}

#[test]
fn test_one_group_is_not_sorted_by_date() {
    let model = model(r#"{"filters": {"product_name": "p1", "test": "t", "metric": "m"},
                          "results": {"date_group": "OneGroup"}}"#);
    let sql = dashkit::translate(&model).unwrap();
    assert!(!sql.contains("ORDER BY"));
    assert!(sql.starts_with("SELECT owner, MIN(value) AS min"));
    assert!(sql.contains("GROUP BY owner LIMIT 5000"));
}

#[test]
fn test_percentile_aggregations() {
    let model = model(r#"{"results": {"date_group": "OneGroup", "aggregations": ["avg", "99.9%"]}}"#);
    let sql = dashkit::translate(&model).unwrap();
    assert!(sql.contains("AVG(value) AS avg, NTH(1000, QUANTILES(value, 1001)) AS p99_9 FROM"));
}

#[test]
fn test_invalid_aggregation_is_rejected() {
    let model = model(r#"{"results": {"date_group": "Daily", "aggregations": ["p99"]}}"#);
    let err = dashkit::translate(&model).unwrap_err();
    assert!(matches!(err, ExplorerError::InvalidAggregation(t) if t == "p99"));
}

#[test]
fn test_incomplete_date_filter_is_rejected() {
    let model = model(r#"{"filters": {"end_date": {"filter_type": "HOUR"}}}"#);
    let err = dashkit::translate(&model).unwrap_err();
    assert!(matches!(err, ExplorerError::MalformedDateFilter { bound: DateBound::End, .. }));
}

#[test]
fn test_literals_are_escaped() {
    let model = model(r#"{"filters": {"product_name": "p1' OR '1'='1"}, "results": {"date_group": "OneGroup"}}"#);
    let sql = dashkit::translate(&model).unwrap();
    assert!(sql.contains(r"WHERE product_name = 'p1\' OR \'1\'=\'1'"));
}

#[test]
fn test_fixed_clock_is_idempotent() {
    let clock = FixedClock(Utc.with_ymd_and_hms(2015, 6, 1, 0, 0, 0).unwrap());
    let service = QueryBuilderService::new().with_clock(clock);
    let model = model(
        r#"{"filters": {"start_date": {"filter_type": "MONTH", "filter_value": "3"}},
            "results": {"date_group": "Daily"}}"#,
    );

    let first = service.get_sql(&model).unwrap();
    let second = service.get_sql(&model).unwrap();
    assert_eq!(first, second);
    assert!(first.contains("DATE_ADD(TIMESTAMP('2015-06-01 00:00:00'), -3, 'MONTH')"));
}

#[test]
fn test_settings_change_table_and_limit() {
    let config = ExplorerConfig::from_toml(
        r#"
        tables = ["samples_mart.results", "samples_mart.archive"]
        row_limit = 100
        "#,
    )
    .unwrap();
    let sql = QueryBuilderService::with_config(config)
        .get_sql(&QueryConfigModel::default())
        .unwrap();
    assert!(sql.contains(" FROM samples_mart.results, samples_mart.archive "));
    assert!(sql.ends_with(" LIMIT 100"));
}

#[test]
fn test_group_by_equals_selected_columns() {
    for group in ["Daily", "Weekly", "OneGroup", ""] {
        let model = model(&format!(
            r#"{{"filters": {{"test": "t"}}, "results": {{"date_group": "{}", "labels": [{{"label": "zone"}}]}}}}"#,
            group
        ));
        let plan = QueryBuilderService::new().explain(&model).unwrap();
        let props = &plan.properties;

        let selected: Vec<String> = props
            .columns()
            .map(|f| f.alias().map(str::to_string).unwrap_or_else(|| f.field().to_sql()))
            .collect();
        assert_eq!(dashkit::transpiler::build_group_args(props), selected);
    }
}

#[test]
fn test_colliding_label_columns_are_rejected() {
    for labels in [r#"[{"label": "date"}]"#, r#"[{"label": "zone"}, {"label": "zone"}]"#] {
        let model = model(&format!(
            r#"{{"results": {{"date_group": "Daily", "labels": {}}}}}"#,
            labels
        ));
        let err = dashkit::translate(&model).unwrap_err();
        assert!(matches!(err, ExplorerError::Configuration(_)), "{:?}", err);
    }
}

#[test]
fn test_blank_table_is_rejected_before_rendering() {
    let err = ExplorerConfig::from_toml(r#"tables = ["samples_mart.results", ""]"#).unwrap_err();
    assert!(matches!(err, ExplorerError::Config(_)));
}
