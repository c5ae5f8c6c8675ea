use serde::{Deserialize, Serialize};

use crate::ast::{BinaryOp, Value};

/// A general expression node: column reference, literal, function call
/// or arithmetic. Rendered to SQL by [`crate::transpiler::ToSql`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    /// A named column
    Named(String),
    /// A literal value
    Literal(Value),
    /// Function call expression (TIMESTAMP_TO_SEC, REGEXP_EXTRACT, etc.)
    FunctionCall { name: String, args: Vec<Expr> },
    /// Binary expression (left op right)
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },
}

impl Expr {
    /// The column name when this is a plain column reference.
    pub fn as_column(&self) -> Option<&str> {
        match self {
            Expr::Named(name) => Some(name),
            _ => None,
        }
    }
}

impl From<&str> for Expr {
    fn from(name: &str) -> Self {
        Expr::Named(name.to_string())
    }
}

impl From<String> for Expr {
    fn from(name: String) -> Self {
        Expr::Named(name)
    }
}

impl From<Value> for Expr {
    fn from(value: Value) -> Self {
        Expr::Literal(value)
    }
}
