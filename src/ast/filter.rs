//! Filters and their clauses.
//!
//! A [`Filter`] names a field and carries zero or more [`FilterClause`]s.
//! Clauses under one filter are OR-combined; filters are AND-combined.
//! A filter without clauses only contributes a column.

use serde::{Deserialize, Serialize};

use crate::ast::{DisplayMode, Expr, MatchRule, Value};

/// One operand of a clause.
///
/// Literals are quoted and escaped when rendered; expressions are
/// already-structured SQL and are rendered as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClauseValue {
    Literal(Value),
    Expression(Expr),
}

impl From<Value> for ClauseValue {
    fn from(value: Value) -> Self {
        ClauseValue::Literal(value)
    }
}

impl From<Expr> for ClauseValue {
    fn from(expr: Expr) -> Self {
        ClauseValue::Expression(expr)
    }
}

/// A single comparison of a filter's field against a list of values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterClause {
    values: Vec<ClauseValue>,
    match_rule: MatchRule,
}

impl FilterClause {
    pub fn new(values: Vec<ClauseValue>, match_rule: MatchRule) -> Self {
        Self { values, match_rule }
    }

    /// Clause comparing against literal values.
    pub fn literals(values: impl IntoIterator<Item = Value>, match_rule: MatchRule) -> Self {
        Self::new(values.into_iter().map(ClauseValue::Literal).collect(), match_rule)
    }

    /// Clause comparing against a single expression.
    pub fn expression(expr: Expr, match_rule: MatchRule) -> Self {
        Self::new(vec![ClauseValue::Expression(expr)], match_rule)
    }

    pub fn values(&self) -> &[ClauseValue] {
        &self.values
    }

    pub fn match_rule(&self) -> MatchRule {
        self.match_rule
    }
}

/// A field with its predicates and display policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    field: Expr,
    clauses: Vec<FilterClause>,
    display_mode: DisplayMode,
    alias: Option<String>,
}

impl Filter {
    pub fn new(
        field: impl Into<Expr>,
        clauses: Vec<FilterClause>,
        display_mode: DisplayMode,
        alias: Option<String>,
    ) -> Self {
        Self {
            field: field.into(),
            clauses,
            display_mode,
            alias,
        }
    }

    pub fn field(&self) -> &Expr {
        &self.field
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn alias(&self) -> Option<&str> {
        self.alias.as_deref()
    }

    pub fn is_column(&self) -> bool {
        self.display_mode == DisplayMode::Column
    }

    /// True when the filter contributes a WHERE predicate.
    pub fn has_predicate(&self) -> bool {
        !self.clauses.is_empty()
    }
}
