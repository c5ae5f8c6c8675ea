//! Ergonomic builder functions for AST expressions and filters.
//!
//! # Example
//! ```
//! use dashkit::ast::builders::*;
//! use dashkit::ast::{DisplayMode, MatchRule};
//!
//! let filter = simple_filter("labels")
//!     .values(["|cloud:GCP|"])
//!     .match_rule(MatchRule::Ct)
//!     .build();
//! assert_eq!(filter.display_mode(), DisplayMode::Hidden);
//! ```

use crate::ast::{BinaryOp, DisplayMode, Expr, Filter, FilterClause, MatchRule, Value};

/// Column reference.
pub fn col(name: &str) -> Expr {
    Expr::Named(name.to_string())
}

/// Function call expression.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::FunctionCall {
        name: name.to_string(),
        args,
    }
}

/// Integer literal.
pub fn int(n: i64) -> Expr {
    Expr::Literal(Value::Int(n))
}

/// String literal.
pub fn text(s: &str) -> Expr {
    Expr::Literal(Value::String(s.to_string()))
}

/// Regular expression literal.
pub fn pattern(re: impl Into<String>) -> Expr {
    Expr::Literal(Value::Pattern(re.into()))
}

/// `left op right`
pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

/// Display mode implied by a filter's values.
///
/// Only the first value is examined. A concrete value pins the field to a
/// single value across the result set, so the column is hidden; NULL,
/// blank, or no values at all leave it as a column.
pub fn get_column_display_mode(values: Option<&[Value]>) -> DisplayMode {
    match values.and_then(|v| v.first()) {
        Some(value) if !value.is_blank() => DisplayMode::Hidden,
        _ => DisplayMode::Column,
    }
}

/// Build a filter with one clause per non-blank value.
///
/// `match_rule` defaults to EQ; `display_mode` defaults to
/// [`get_column_display_mode`] of the values.
pub fn create_simple_filter(
    field: impl Into<Expr>,
    values: Option<Vec<Value>>,
    match_rule: Option<MatchRule>,
    display_mode: Option<DisplayMode>,
    alias: Option<String>,
) -> Filter {
    let match_rule = match_rule.unwrap_or_default();
    let display_mode =
        display_mode.unwrap_or_else(|| get_column_display_mode(values.as_deref()));

    let clauses = values
        .unwrap_or_default()
        .into_iter()
        .filter(|v| !v.is_blank())
        .map(|v| FilterClause::literals([v], match_rule))
        .collect();

    Filter::new(field, clauses, display_mode, alias)
}

/// Start a [`SimpleFilterBuilder`] on a field.
pub fn simple_filter(field: impl Into<Expr>) -> SimpleFilterBuilder {
    SimpleFilterBuilder {
        field: field.into(),
        values: None,
        match_rule: None,
        display_mode: None,
        alias: None,
    }
}

/// Builder over [`create_simple_filter`].
#[derive(Debug, Clone)]
pub struct SimpleFilterBuilder {
    field: Expr,
    values: Option<Vec<Value>>,
    match_rule: Option<MatchRule>,
    display_mode: Option<DisplayMode>,
    alias: Option<String>,
}

impl SimpleFilterBuilder {
    pub fn values<V: Into<Value>>(mut self, values: impl IntoIterator<Item = V>) -> Self {
        self.values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn match_rule(mut self, rule: MatchRule) -> Self {
        self.match_rule = Some(rule);
        self
    }

    pub fn display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = Some(mode);
        self
    }

    /// Add alias (AS name)
    pub fn alias(mut self, name: impl Into<String>) -> Self {
        self.alias = Some(name.into());
        self
    }

    pub fn build(self) -> Filter {
        create_simple_filter(
            self.field,
            self.values,
            self.match_rule,
            self.display_mode,
            self.alias,
        )
    }
}

impl From<SimpleFilterBuilder> for Filter {
    fn from(builder: SimpleFilterBuilder) -> Self {
        builder.build()
    }
}
