//! Clause builders: turn [`QueryProperties`] into SELECT / WHERE / GROUP BY
//! argument lists and assemble the final statement.

use crate::ast::builders::{func, int};
use crate::ast::*;
use crate::error::{ExplorerError, ExplorerResult};

use super::{ConditionToSql, ToSql, quote_identifier};

/// SELECT arguments: every column filter, then one aggregate per
/// requested aggregation in declared order.
pub fn build_select_args(props: &QueryProperties) -> Vec<String> {
    let columns = props.columns().map(|f| match f.alias() {
        Some(alias) => format!("{} AS {}", f.field().to_sql(), quote_identifier(alias)),
        None => f.field().to_sql(),
    });

    let aggregates = props
        .aggregations
        .iter()
        .map(|agg| aggregate_sql(agg, &props.value_field));

    columns.chain(aggregates).collect()
}

/// WHERE arguments: one predicate per filter with clauses, AND-joined by
/// [`format_query`].
pub fn build_where_args(props: &QueryProperties) -> Vec<String> {
    props
        .predicates()
        .filter_map(|f| f.to_condition_sql())
        .collect()
}

/// GROUP BY arguments: the alias (or field) of every column filter, then
/// any explicit group fields not already listed. Empty for unaggregated
/// queries.
pub fn build_group_args(props: &QueryProperties) -> Vec<String> {
    if !props.is_aggregated() {
        return Vec::new();
    }

    let mut args: Vec<String> = props
        .columns()
        .map(|f| match f.alias() {
            Some(alias) => quote_identifier(alias),
            None => f.field().to_sql(),
        })
        .collect();

    for expr in &props.group_by {
        let sql = expr.to_sql();
        if !args.contains(&sql) {
            args.push(sql);
        }
    }
    args
}

/// Render one aggregate over the value field.
///
/// Percentiles use QUANTILES with enough buckets to address them exactly:
/// `50%` is `NTH(51, QUANTILES(value, 101))`.
pub fn aggregate_sql(agg: &Aggregation, value_field: &Expr) -> String {
    let expr = match agg {
        Aggregation::Percentile(p) => func(
            agg.function_name(),
            vec![
                int(p.nth() as i64),
                func("QUANTILES", vec![value_field.clone(), int(p.quantile_count() as i64)]),
            ],
        ),
        named => func(named.function_name(), vec![value_field.clone()]),
    };
    format!("{} AS {}", expr.to_sql(), quote_identifier(&agg.alias()))
}

/// Assemble a statement:
/// `SELECT .. FROM .. [WHERE ..] [GROUP BY ..] [ORDER BY ..] LIMIT n`.
pub fn format_query(
    select_args: &[String],
    tables: &[String],
    where_args: &[String],
    group_args: &[String],
    sort_args: &[String],
    limit: usize,
) -> ExplorerResult<String> {
    if select_args.is_empty() {
        return Err(ExplorerError::EmptyFieldList);
    }
    if tables.is_empty() {
        return Err(ExplorerError::Configuration(
            "no tables to select from".to_string(),
        ));
    }

    let mut sql = String::from("SELECT ");
    sql.push_str(&select_args.join(", "));

    sql.push_str(" FROM ");
    sql.push_str(&tables.join(", "));

    if !where_args.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&where_args.join(" AND "));
    }

    if !group_args.is_empty() {
        sql.push_str(" GROUP BY ");
        sql.push_str(&group_args.join(", "));
    }

    if !sort_args.is_empty() {
        sql.push_str(" ORDER BY ");
        sql.push_str(&sort_args.join(", "));
    }

    sql.push_str(&format!(" LIMIT {}", limit));

    Ok(sql)
}
