use serde::{Deserialize, Serialize};

use crate::ast::{Aggregation, Expr, Filter};

/// The resolved compilation unit for one query: what to aggregate, which
/// filters apply, and any extra GROUP BY fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryProperties {
    pub aggregations: Vec<Aggregation>,
    pub filters: Vec<Filter>,
    pub group_by: Vec<Expr>,
    /// Field the aggregations summarize.
    pub value_field: Expr,
}

impl QueryProperties {
    pub fn new(aggregations: Vec<Aggregation>, filters: Vec<Filter>, group_by: Vec<Expr>) -> Self {
        Self {
            aggregations,
            filters,
            group_by,
            value_field: Expr::Named("value".to_string()),
        }
    }

    pub fn with_value_field(mut self, field: impl Into<Expr>) -> Self {
        self.value_field = field.into();
        self
    }

    /// Filters whose field is selected and grouped.
    pub fn columns(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| f.is_column())
    }

    /// Filters that contribute a WHERE predicate.
    pub fn predicates(&self) -> impl Iterator<Item = &Filter> {
        self.filters.iter().filter(|f| f.has_predicate())
    }

    pub fn is_aggregated(&self) -> bool {
        !self.aggregations.is_empty()
    }
}
