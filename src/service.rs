//! The query translator: turns a [`QueryConfigModel`] into SQL.
//!
//! Translation runs in two steps. [`QueryBuilderService::explain`] decides
//! which filters, columns, aggregations and sort fields apply and returns
//! them as a [`QueryPlan`]; [`QueryBuilderService::get_sql`] renders that
//! plan with the clause builders in [`crate::transpiler`].

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::ast::builders::{
    binary, col, create_simple_filter, func, get_column_display_mode, int, pattern,
    simple_filter, text,
};
use crate::ast::*;
use crate::clock::Clock;
use crate::config::ExplorerConfig;
use crate::error::{DateBound, ExplorerError, ExplorerResult};
use crate::model::{DateFilter, DateGroup, DateSpec, DateUnit, Official, QueryConfigModel};
use crate::parser::parse_aggregations;
use crate::transpiler::{
    ToSql, build_group_args, build_select_args, build_where_args, format_query,
};

/// Seconds to microseconds, for the UTC_USEC_TO_* bucketing functions.
pub const BQ_TIMESTAMP_MULTIPLIER: i64 = 1_000_000;

/// First day of the week for weekly buckets (Sunday).
pub const WEEK_START_DAY: i64 = 0;

const TIMESTAMP_FIELD: &str = "timestamp";
const LABELS_FIELD: &str = "labels";
const DATE_ALIAS: &str = "date";

/// The resolved form of a query, before rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryPlan {
    pub properties: QueryProperties,
    pub sort_fields: Vec<String>,
}

/// Translates query configurations into SQL statements.
///
/// # Example
///
/// ```
/// use dashkit::model::QueryConfigModel;
/// use dashkit::service::QueryBuilderService;
///
/// let model = QueryConfigModel::from_json(
///     r#"{"filters": {"product_name": "p1"}, "results": {"date_group": "OneGroup"}}"#,
/// ).unwrap();
/// let sql = QueryBuilderService::new().get_sql(&model).unwrap();
/// assert!(sql.contains("WHERE product_name = 'p1'"));
/// assert!(sql.ends_with("LIMIT 5000"));
/// ```
#[derive(Clone, Default)]
pub struct QueryBuilderService {
    config: ExplorerConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl QueryBuilderService {
    /// A translator with default settings. Relative dates are evaluated by
    /// the query engine against CURRENT_TIMESTAMP().
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExplorerConfig) -> Self {
        Self {
            config,
            clock: None,
        }
    }

    /// Anchor relative dates on `clock`, sampled once per translation.
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    /// See [`get_column_display_mode`].
    pub fn get_column_display_mode(&self, values: Option<&[Value]>) -> DisplayMode {
        get_column_display_mode(values)
    }

    /// See [`create_simple_filter`].
    pub fn create_simple_filter(
        &self,
        field: impl Into<Expr>,
        values: Option<Vec<Value>>,
        match_rule: Option<MatchRule>,
        display_mode: Option<DisplayMode>,
        alias: Option<String>,
    ) -> Filter {
        create_simple_filter(field, values, match_rule, display_mode, alias)
    }

    /// `amount` units before `now`, in epoch seconds.
    pub fn get_relative_date_function(&self, now: &Expr, amount: i64, unit: &str) -> Expr {
        func(
            "TIMESTAMP_TO_SEC",
            vec![func("DATE_ADD", vec![now.clone(), int(-amount), text(unit)])],
        )
    }

    /// An absolute date, in epoch seconds.
    pub fn get_absolute_date_function(&self, date_text: &str) -> Expr {
        func("TIMESTAMP_TO_SEC", vec![func("TIMESTAMP", vec![text(date_text)])])
    }

    /// Compile a query configuration into SQL.
    pub fn get_sql(&self, model: &QueryConfigModel) -> ExplorerResult<String> {
        let plan = self.explain(model)?;
        let props = &plan.properties;

        let sql = format_query(
            &build_select_args(props),
            &self.config.tables,
            &build_where_args(props),
            &build_group_args(props),
            &plan.sort_fields,
            self.config.row_limit,
        )?;

        debug!(len = sql.len(), "Generated SQL");
        Ok(sql)
    }

    /// Resolve a query configuration into filters, aggregations and sort
    /// order without rendering it.
    pub fn explain(&self, model: &QueryConfigModel) -> ExplorerResult<QueryPlan> {
        let filters = &model.filters;
        let date_group = model.results.date_group();
        debug!(
            ?date_group,
            labels = model.results.labels.len(),
            metadata = filters.metadata.len(),
            "Translating query"
        );

        let now = self.now_expr();
        let mut field_filters: Vec<Filter> = Vec::new();

        if let Some(start) = &filters.start_date {
            field_filters.push(self.date_filter(start, DateBound::Start, &now)?);
        }
        if let Some(end) = &filters.end_date {
            field_filters.push(self.date_filter(end, DateBound::End, &now)?);
        }

        field_filters.push(simple_filter("product_name").values([filters.product_name.clone()]).build());
        field_filters.push(simple_filter("test").values([filters.test.clone()]).build());
        field_filters.push(simple_filter("metric").values([filters.metric.clone()]).build());
        field_filters.push(simple_filter("owner").values([filters.runby.clone()]).build());

        if let Some(date_column) = date_bucket(date_group) {
            field_filters.push(simple_filter(date_column).alias(DATE_ALIAS).build());
        }

        let sort_fields = sort_fields(model);
        if date_group == DateGroup::Other {
            warn!("No date grouping mode; ordering by a date column the query does not select");
        }

        for column in &model.results.labels {
            match column.label.as_deref().map(str::trim) {
                Some(label) if !label.is_empty() => {
                    field_filters.push(label_filter(label)?);
                }
                _ => warn!("Skipping label column without a name"),
            }
        }

        match filters.official {
            Official::True => field_filters.push(simple_filter("official").values([true]).build()),
            Official::False => field_filters.push(simple_filter("official").values([false]).build()),
            Official::Any => {}
        }

        for tag in &filters.metadata {
            match tag.text.as_deref().map(str::trim) {
                Some(term) if !term.is_empty() => field_filters.push(metadata_filter(term)?),
                _ => warn!("Skipping empty metadata filter"),
            }
        }

        let aggregations = if date_group == DateGroup::Details {
            if !model.results.aggregations.is_empty() {
                debug!("Ignoring aggregations for Details query");
            }
            field_filters.push(simple_filter(self.config.value_field.as_str()).build());
            field_filters.push(simple_filter("log_uri").build());
            Vec::new()
        } else if model.results.aggregations.is_empty() {
            Aggregation::DEFAULT_SET.to_vec()
        } else {
            let mut aggregations = parse_aggregations(&model.results.aggregations)?;
            let mut seen = std::collections::HashSet::new();
            aggregations.retain(|a| seen.insert(*a));
            aggregations
        };

        check_column_names(&field_filters)?;

        for filter in &field_filters {
            trace!(
                field = %filter.field().to_sql(),
                mode = ?filter.display_mode(),
                clauses = filter.clauses().len(),
                "Resolved filter"
            );
        }

        let properties = QueryProperties::new(aggregations, field_filters, Vec::new())
            .with_value_field(self.config.value_field.as_str());

        Ok(QueryPlan {
            properties,
            sort_fields,
        })
    }

    /// The expression for "now", sampled once per translation.
    fn now_expr(&self) -> Expr {
        match &self.clock {
            Some(clock) => {
                let now = clock.now().format("%Y-%m-%d %H:%M:%S").to_string();
                func("TIMESTAMP", vec![text(&now)])
            }
            None => func("CURRENT_TIMESTAMP", vec![]),
        }
    }

    /// One hidden `timestamp >= x` / `timestamp <= x` filter.
    fn date_filter(&self, filter: &DateFilter, bound: DateBound, now: &Expr) -> ExplorerResult<Filter> {
        let value = match filter.resolve(bound)? {
            DateSpec::Custom { at, has_time } => {
                self.get_absolute_date_function(&DateSpec::timestamp_text(&at, has_time))
            }
            DateSpec::Relative { amount, unit } => {
                let amount = relative_offset(amount, unit)
                    .ok_or_else(|| ExplorerError::malformed_date(bound, "filter_value is too large"))?;
                self.get_relative_date_function(now, amount, unit.date_add_unit())
            }
        };

        let rule = match bound {
            DateBound::Start => MatchRule::Ge,
            DateBound::End => MatchRule::Le,
        };

        Ok(Filter::new(
            TIMESTAMP_FIELD,
            vec![FilterClause::expression(value, rule)],
            DisplayMode::Hidden,
            None,
        ))
    }
}

fn relative_offset(amount: u64, unit: DateUnit) -> Option<i64> {
    amount
        .checked_mul(unit.factor())
        .and_then(|n| i64::try_from(n).ok())
}

/// The date column for a grouping mode, if it has one.
fn date_bucket(date_group: DateGroup) -> Option<Expr> {
    let usec = || {
        func(
            "INTEGER",
            vec![binary(col(TIMESTAMP_FIELD), BinaryOp::Mul, int(BQ_TIMESTAMP_MULTIPLIER))],
        )
    };

    match date_group {
        DateGroup::Details => Some(func(
            "SEC_TO_TIMESTAMP",
            vec![func("INTEGER", vec![col(TIMESTAMP_FIELD)])],
        )),
        DateGroup::Daily => Some(func(
            "USEC_TO_TIMESTAMP",
            vec![func("UTC_USEC_TO_DAY", vec![usec()])],
        )),
        DateGroup::Weekly => Some(func(
            "USEC_TO_TIMESTAMP",
            vec![func("UTC_USEC_TO_WEEK", vec![usec(), int(WEEK_START_DAY)])],
        )),
        DateGroup::OneGroup | DateGroup::Other => None,
    }
}

/// Sort by product, test and metric unless a filter pins them, then by
/// date unless everything is one group.
fn sort_fields(model: &QueryConfigModel) -> Vec<String> {
    let filters = &model.filters;
    let pinned = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

    let mut fields = Vec::new();
    if !pinned(&filters.product_name) {
        fields.push("product_name".to_string());
    }
    if !pinned(&filters.test) {
        fields.push("test".to_string());
    }
    if !pinned(&filters.metric) {
        fields.push("metric".to_string());
    }
    if model.results.date_group() != DateGroup::OneGroup {
        fields.push(DATE_ALIAS.to_string());
    }
    fields
}

/// Output column names must be unique, compared case-insensitively.
fn check_column_names(filters: &[Filter]) -> ExplorerResult<()> {
    let mut seen = std::collections::HashSet::new();
    for filter in filters.iter().filter(|f| f.is_column()) {
        let Some(name) = filter.alias().or_else(|| filter.field().as_column()) else {
            continue;
        };
        if !seen.insert(name.to_ascii_lowercase()) {
            return Err(ExplorerError::Configuration(format!(
                "column '{}' is selected more than once",
                name
            )));
        }
    }
    Ok(())
}

/// A column extracting `|label:value|` from the labels field.
fn label_filter(label: &str) -> ExplorerResult<Filter> {
    if label.chars().any(|c| c == '[' || c == ']' || c.is_control()) {
        return Err(ExplorerError::Configuration(format!(
            "label '{}' cannot be used as a column name",
            label
        )));
    }

    let extract = func(
        "REGEXP_EXTRACT",
        vec![
            col(LABELS_FIELD),
            pattern(format!(r"\|{}:(.*?)\|", regex::escape(label))),
        ],
    );
    Ok(simple_filter(extract).alias(label).build())
}

/// Rows whose labels carry the exact tag `|term|`.
fn metadata_filter(term: &str) -> ExplorerResult<Filter> {
    if term.contains('|') {
        return Err(ExplorerError::Configuration(format!(
            "metadata filter '{}' contains the tag delimiter '|'",
            term
        )));
    }

    Ok(simple_filter(LABELS_FIELD)
        .values([format!("|{}|", term)])
        .match_rule(MatchRule::Ct)
        .display_mode(DisplayMode::Hidden)
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::model::{FilterAmount, LabelColumn, MetadataFilter};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    fn model(date_group: DateGroup) -> QueryConfigModel {
        let mut model = QueryConfigModel::default();
        model.results.date_group = Some(date_group);
        model
    }

    fn column_names(plan: &QueryPlan) -> Vec<String> {
        plan.properties
            .columns()
            .map(|f| f.alias().map(str::to_string).unwrap_or_else(|| f.field().to_sql()))
            .collect()
    }

    #[test]
    fn test_details_has_no_aggregations() {
        let plan = QueryBuilderService::new().explain(&model(DateGroup::Details)).unwrap();
        assert!(plan.properties.aggregations.is_empty());
        let columns = column_names(&plan);
        assert!(columns.contains(&"value".to_string()));
        assert!(columns.contains(&"log_uri".to_string()));
    }

    #[test]
    fn test_details_ignores_aggregation_override() {
        let mut m = model(DateGroup::Details);
        m.results.aggregations = vec!["bogus".to_string()];
        let plan = QueryBuilderService::new().explain(&m).unwrap();
        assert!(plan.properties.aggregations.is_empty());
    }

    #[test]
    fn test_grouped_modes_use_default_set() {
        for group in [DateGroup::Daily, DateGroup::Weekly, DateGroup::OneGroup, DateGroup::Other] {
            let plan = QueryBuilderService::new().explain(&model(group)).unwrap();
            assert_eq!(plan.properties.aggregations, Aggregation::DEFAULT_SET.to_vec());
        }
    }

    #[test]
    fn test_date_bucket_columns() {
        let date_of = |group| {
            let plan = QueryBuilderService::new().explain(&model(group)).unwrap();
            plan.properties
                .columns()
                .find(|f| f.alias() == Some("date"))
                .map(|f| f.field().to_sql())
        };
        assert_eq!(
            date_of(DateGroup::Daily).unwrap(),
            "USEC_TO_TIMESTAMP(UTC_USEC_TO_DAY(INTEGER(timestamp * 1000000)))"
        );
        assert_eq!(
            date_of(DateGroup::Weekly).unwrap(),
            "USEC_TO_TIMESTAMP(UTC_USEC_TO_WEEK(INTEGER(timestamp * 1000000), 0))"
        );
        assert_eq!(
            date_of(DateGroup::Details).unwrap(),
            "SEC_TO_TIMESTAMP(INTEGER(timestamp))"
        );
        assert_eq!(date_of(DateGroup::OneGroup), None);
        assert_eq!(date_of(DateGroup::Other), None);
    }

    #[test]
    fn test_sort_fields_skip_pinned() {
        let mut m = model(DateGroup::Daily);
        m.filters.product_name = Some("p1".to_string());
        m.filters.metric = Some("".to_string());
        let plan = QueryBuilderService::new().explain(&m).unwrap();
        assert_eq!(plan.sort_fields, vec!["test", "metric", "date"]);

        let mut m = model(DateGroup::OneGroup);
        m.filters.test = Some("iperf".to_string());
        let plan = QueryBuilderService::new().explain(&m).unwrap();
        assert_eq!(plan.sort_fields, vec!["product_name", "metric"]);
    }

    #[test]
    fn test_custom_aggregations() {
        let mut m = model(DateGroup::Daily);
        m.results.aggregations = vec!["max".into(), "99%".into(), "max".into()];
        let plan = QueryBuilderService::new().explain(&m).unwrap();
        assert_eq!(
            plan.properties.aggregations,
            vec![Aggregation::Max, "99%".parse().unwrap()]
        );

        m.results.aggregations = vec!["median".into()];
        let err = QueryBuilderService::new().explain(&m).unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidAggregation(t) if t == "median"));
    }

    #[test]
    fn test_label_column() {
        let mut m = model(DateGroup::OneGroup);
        m.results.labels = vec![
            LabelColumn { label: Some("machine.type".to_string()) },
            LabelColumn { label: Some("  ".to_string()) },
        ];
        let plan = QueryBuilderService::new().explain(&m).unwrap();
        let label = plan
            .properties
            .filters
            .iter()
            .find(|f| f.alias() == Some("machine.type"))
            .unwrap();
        assert!(label.is_column());
        assert_eq!(
            label.field().to_sql(),
            r"REGEXP_EXTRACT(labels, r'\|machine\.type:(.*?)\|')"
        );
        assert_eq!(column_names(&plan).len(), 5);
    }

    #[test]
    fn test_label_alias_collisions() {
        let labels = |names: &[&str]| {
            names
                .iter()
                .map(|n| LabelColumn { label: Some(n.to_string()) })
                .collect::<Vec<_>>()
        };

        let mut m = model(DateGroup::Daily);
        m.results.labels = labels(&["date"]);
        assert!(matches!(
            QueryBuilderService::new().explain(&m),
            Err(ExplorerError::Configuration(msg)) if msg.contains("'date'")
        ));

        m.results.labels = labels(&["zone", "Zone"]);
        assert!(matches!(
            QueryBuilderService::new().explain(&m),
            Err(ExplorerError::Configuration(_))
        ));

        let mut m = model(DateGroup::Details);
        m.results.labels = labels(&["log_uri"]);
        assert!(matches!(
            QueryBuilderService::new().explain(&m),
            Err(ExplorerError::Configuration(_))
        ));

        // Only selected columns count: a pinned test filter frees the name.
        let mut m = model(DateGroup::OneGroup);
        m.filters.test = Some("iperf".to_string());
        m.results.labels = labels(&["test"]);
        assert!(QueryBuilderService::new().explain(&m).is_ok());
    }

    #[test]
    fn test_other_mode_still_sorts_by_date() {
        let plan = QueryBuilderService::new().explain(&model(DateGroup::Other)).unwrap();
        assert_eq!(plan.sort_fields.last().map(String::as_str), Some("date"));
        assert!(plan.properties.columns().all(|f| f.alias() != Some("date")));
    }

    #[test]
    fn test_label_rejects_bracket() {
        let mut m = model(DateGroup::OneGroup);
        m.results.labels = vec![LabelColumn { label: Some("a]b".to_string()) }];
        assert!(matches!(
            QueryBuilderService::new().explain(&m),
            Err(ExplorerError::Configuration(_))
        ));
    }

    #[test]
    fn test_metadata_filter() {
        let mut m = model(DateGroup::OneGroup);
        m.filters.metadata = vec![MetadataFilter { text: Some("abc".to_string()) }];
        let plan = QueryBuilderService::new().explain(&m).unwrap();
        let tag = plan
            .properties
            .predicates()
            .find(|f| f.field().as_column() == Some("labels"))
            .unwrap();
        assert_eq!(tag.display_mode(), DisplayMode::Hidden);
        assert_eq!(tag.clauses()[0].match_rule(), MatchRule::Ct);
        assert_eq!(
            tag.clauses()[0].values(),
            &[ClauseValue::Literal(Value::from("|abc|"))]
        );

        m.filters.metadata = vec![MetadataFilter { text: Some("a|b".to_string()) }];
        assert!(matches!(
            QueryBuilderService::new().explain(&m),
            Err(ExplorerError::Configuration(_))
        ));
    }

    #[test]
    fn test_official_filter() {
        let official_clauses = |official| {
            let mut m = model(DateGroup::OneGroup);
            m.filters.official = official;
            let plan = QueryBuilderService::new().explain(&m).unwrap();
            plan.properties
                .filters
                .iter()
                .filter(|f| f.field().as_column() == Some("official"))
                .count()
        };
        assert_eq!(official_clauses(Official::True), 1);
        assert_eq!(official_clauses(Official::False), 1);
        assert_eq!(official_clauses(Official::Any), 0);
    }

    #[test]
    fn test_relative_dates_against_server_time() {
        let mut m = model(DateGroup::Daily);
        m.filters.start_date = Some(DateFilter {
            filter_type: Some("WEEK".to_string()),
            filter_value: Some(FilterAmount::Number(2.0)),
            text: None,
        });
        let plan = QueryBuilderService::new().explain(&m).unwrap();
        let start = &plan.properties.filters[0];
        assert_eq!(start.display_mode(), DisplayMode::Hidden);
        assert_eq!(
            start.clauses()[0].render("timestamp").unwrap(),
            "timestamp >= TIMESTAMP_TO_SEC(DATE_ADD(CURRENT_TIMESTAMP(), -14, 'DAY'))"
        );
    }

    #[test]
    fn test_relative_dates_against_fixed_clock() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2015, 6, 1, 12, 0, 0).unwrap());
        let mut m = model(DateGroup::Daily);
        m.filters.end_date = Some(DateFilter {
            filter_type: Some("DAY".to_string()),
            filter_value: Some(FilterAmount::Number(1.0)),
            text: None,
        });
        let plan = QueryBuilderService::new().with_clock(clock).explain(&m).unwrap();
        assert_eq!(
            plan.properties.filters[0].clauses()[0].render("timestamp").unwrap(),
            "timestamp <= TIMESTAMP_TO_SEC(DATE_ADD(TIMESTAMP('2015-06-01 12:00:00'), -1, 'DAY'))"
        );
    }

    #[test]
    fn test_incomplete_date_filter_is_rejected() {
        let mut m = model(DateGroup::Daily);
        m.filters.start_date = Some(DateFilter {
            filter_type: Some("CUSTOM".to_string()),
            filter_value: None,
            text: None,
        });
        assert!(matches!(
            QueryBuilderService::new().explain(&m),
            Err(ExplorerError::MalformedDateFilter { bound: DateBound::Start, .. })
        ));
    }

    #[test]
    fn test_value_field_from_config() {
        let config = ExplorerConfig {
            value_field: "latency_ms".to_string(),
            ..ExplorerConfig::default()
        };
        let sql = QueryBuilderService::with_config(config)
            .get_sql(&model(DateGroup::OneGroup))
            .unwrap();
        assert!(sql.contains("MIN(latency_ms) AS min"));
    }
}
