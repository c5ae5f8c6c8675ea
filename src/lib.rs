//! # Dashkit: Explorer query builder
//!
//! Compiles a dashboard widget's query configuration (date range,
//! product/test/metric filters, metadata tags, date grouping and
//! aggregations) into a BigQuery SQL statement against the benchmark
//! results table.
//!
//! ## Quick Example
//!
//! ```rust
//! use dashkit::prelude::*;
//!
//! let model = QueryConfigModel::from_json(r#"{
//!     "filters": {"product_name": "p1", "official": "true"},
//!     "results": {"date_group": "Daily"}
//! }"#)?;
//!
//! let sql = dashkit::translate(&model)?;
//! assert!(sql.starts_with("SELECT test, metric, owner, USEC_TO_TIMESTAMP("));
//! assert!(sql.contains("FROM samples_mart.results WHERE product_name = 'p1' AND official = true"));
//! # Ok::<(), ExplorerError>(())
//! ```
//!
//! ## Pipeline
//!
//! | Stage                        | Output                                 |
//! |------------------------------|----------------------------------------|
//! | [`model::QueryConfigModel`]  | UI configuration, as stored            |
//! | [`service::QueryBuilderService::explain`] | [`service::QueryPlan`]: filters, aggregations, sort |
//! | [`transpiler::builder`]      | SELECT / WHERE / GROUP BY arguments    |
//! | [`transpiler::format_query`] | SQL text                               |

pub mod ast;
pub mod clock;
pub mod config;
pub mod error;
pub mod model;
pub mod parser;
pub mod service;
pub mod transpiler;

pub mod prelude {
    pub use crate::ast::*;
    pub use crate::clock::{Clock, FixedClock, SystemClock};
    pub use crate::config::ExplorerConfig;
    pub use crate::error::*;
    pub use crate::model::*;
    pub use crate::parser::parse_aggregation;
    pub use crate::service::{QueryBuilderService, QueryPlan};
    pub use crate::transpiler::{ConditionToSql, ToSql};
}

/// Compile a query configuration with default settings.
///
/// # Example
///
/// ```
/// use dashkit::model::QueryConfigModel;
///
/// let model = QueryConfigModel::from_json(r#"{"results": {"date_group": "OneGroup"}}"#).unwrap();
/// let sql = dashkit::translate(&model).unwrap();
/// assert!(sql.ends_with("ORDER BY product_name, test, metric LIMIT 5000"));
/// ```
pub fn translate(model: &model::QueryConfigModel) -> error::ExplorerResult<String> {
    service::QueryBuilderService::new().get_sql(model)
}
