//! SQL serializer for the query AST.
//!
//! All quoting and escaping lives here: literal values are escaped by
//! [`quote_string`], regular expressions by [`quote_pattern`], and output
//! aliases by [`quote_identifier`]. Expressions are rendered structurally,
//! so a value can never be escaped twice.

pub mod builder;
pub mod conditions;

use crate::ast::*;

pub use builder::{build_group_args, build_select_args, build_where_args, format_query};
pub use conditions::ConditionToSql;

/// Words that cannot be used as bare aliases.
pub const RESERVED_WORDS: &[&str] = &[
    "all", "and", "as", "asc", "by", "case", "contains", "desc", "distinct", "each", "else",
    "end", "false", "from", "full", "group", "having", "ignore", "in", "inner", "is", "join",
    "left", "limit", "not", "null", "on", "or", "order", "outer", "right", "select", "then",
    "true", "when", "where", "within",
];

/// Trait for converting AST nodes to SQL.
pub trait ToSql {
    /// Convert this node to a SQL string.
    fn to_sql(&self) -> String;
}

impl ToSql for Value {
    fn to_sql(&self) -> String {
        match self {
            Value::Null => "NULL".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(n) if n.is_finite() => n.to_string(),
            Value::Float(_) => "NULL".to_string(),
            Value::String(s) => quote_string(s),
            Value::Pattern(re) => quote_pattern(re),
        }
    }
}

impl ToSql for Expr {
    fn to_sql(&self) -> String {
        match self {
            Expr::Named(name) => name.clone(),
            Expr::Literal(value) => value.to_sql(),
            Expr::FunctionCall { name, args } => {
                let args: Vec<String> = args.iter().map(|a| a.to_sql()).collect();
                format!("{}({})", name, args.join(", "))
            }
            Expr::Binary { left, op, right } => {
                format!("{} {} {}", operand_sql(left), op, operand_sql(right))
            }
        }
    }
}

impl ToSql for ClauseValue {
    fn to_sql(&self) -> String {
        match self {
            ClauseValue::Literal(value) => value.to_sql(),
            ClauseValue::Expression(expr) => expr.to_sql(),
        }
    }
}

/// Nested binary operands are parenthesized to keep precedence explicit.
fn operand_sql(expr: &Expr) -> String {
    match expr {
        Expr::Binary { .. } => format!("({})", expr.to_sql()),
        _ => expr.to_sql(),
    }
}

/// Single-quoted string literal with backslash escapes.
pub fn quote_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Raw string literal for a regular expression.
///
/// Raw strings cannot contain their own quote, so quotes and line breaks
/// are written as regex escapes, which match the same characters.
pub fn quote_pattern(re: &str) -> String {
    let body = re
        .replace('\'', "\\x27")
        .replace('\n', "\\n")
        .replace('\r', "\\r");
    format!("r'{}'", body)
}

/// True when `name` can be used as an alias without quoting.
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .map(|c| c.is_ascii_alphabetic() || c == '_')
        .unwrap_or(false);
    starts_ok
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !RESERVED_WORDS.contains(&name.to_ascii_lowercase().as_str())
}

/// Quote an alias with brackets if it is reserved or contains special chars.
///
/// Names containing brackets cannot be quoted; callers validate them first.
pub fn quote_identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        format!("[{}]", name)
    }
}
