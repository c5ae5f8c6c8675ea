//! Query AST: literal values, expression trees, filters and the resolved
//! query properties handed to the SQL builder.

pub mod builders;
pub mod expr;
pub mod filter;
pub mod operators;
pub mod properties;
pub mod values;

pub use self::expr::Expr;
pub use self::filter::{ClauseValue, Filter, FilterClause};
pub use self::operators::{Aggregation, BinaryOp, DisplayMode, MatchRule, Percentile};
pub use self::properties::QueryProperties;
pub use self::values::Value;
