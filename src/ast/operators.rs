use serde::{Deserialize, Serialize};

/// How a filter clause compares its field against its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum MatchRule {
    /// Equal (=, or IN for several values)
    #[default]
    Eq,
    /// Not equal (!=)
    Ne,
    /// Greater than (>)
    Gt,
    /// Greater than or equal (>=)
    Ge,
    /// Less than (<)
    Lt,
    /// Less than or equal (<=)
    Le,
    /// Substring containment (CONTAINS)
    Ct,
    /// Negated substring containment (NOT ... CONTAINS)
    Nc,
}

impl MatchRule {
    /// Returns the SQL symbol/keyword for this rule.
    pub fn sql_symbol(&self) -> &'static str {
        match self {
            MatchRule::Eq => "=",
            MatchRule::Ne => "!=",
            MatchRule::Gt => ">",
            MatchRule::Ge => ">=",
            MatchRule::Lt => "<",
            MatchRule::Le => "<=",
            MatchRule::Ct | MatchRule::Nc => "CONTAINS",
        }
    }
}

/// Whether a filter's field is selected and grouped, or only constrains rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DisplayMode {
    /// Appears in SELECT and GROUP BY
    Column,
    /// Only contributes to WHERE
    Hidden,
}

/// Binary operators for expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    /// Addition (+)
    Add,
    /// Subtraction (-)
    Sub,
    /// Multiplication (*)
    Mul,
    /// Division (/)
    Div,
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
        }
    }
}

/// A percentile aggregation such as `50%` or `.01%`.
///
/// Stored as a fixed-point number: `scaled / 10^decimals` percent, with
/// trailing zeros stripped so `50.0%` and `50%` compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Percentile {
    scaled: u32,
    decimals: u8,
}

impl Percentile {
    /// Finest supported precision.
    pub const MAX_DECIMALS: u8 = 4;

    /// Returns `None` when the value exceeds 100% or is too precise.
    pub fn new(mut scaled: u32, mut decimals: u8) -> Option<Self> {
        while decimals > 0 && scaled % 10 == 0 {
            scaled /= 10;
            decimals -= 1;
        }
        if decimals > Self::MAX_DECIMALS {
            return None;
        }
        let scale = 10u32.pow(decimals as u32);
        if scaled > 100 * scale {
            return None;
        }
        Some(Self { scaled, decimals })
    }

    fn scale(&self) -> u32 {
        10u32.pow(self.decimals as u32)
    }

    /// Number of quantile buckets needed to address this percentile exactly.
    pub fn quantile_count(&self) -> u32 {
        100 * self.scale() + 1
    }

    /// 1-based index of this percentile within `quantile_count` buckets.
    pub fn nth(&self) -> u32 {
        self.scaled + 1
    }

    /// Column alias, e.g. `p50` or `p0_01`.
    pub fn alias(&self) -> String {
        format!("p{}", self.number().replace('.', "_"))
    }

    fn number(&self) -> String {
        if self.decimals == 0 {
            return self.scaled.to_string();
        }
        let scale = self.scale();
        format!(
            "{}.{:0width$}",
            self.scaled / scale,
            self.scaled % scale,
            width = self.decimals as usize
        )
    }
}

impl std::fmt::Display for Percentile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}%", self.number())
    }
}

/// Summary function applied to the value field of each group.
///
/// Parse tokens with [`str::parse`]; see [`crate::parser::parse_aggregation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Aggregation {
    Average,
    Count,
    Last,
    Max,
    Mean,
    Min,
    StdDev,
    Sum,
    Variance,
    Percentile(Percentile),
}

impl Aggregation {
    /// The aggregations computed for every grouped query.
    pub const DEFAULT_SET: [Aggregation; 6] = [
        Aggregation::Min,
        Aggregation::Average,
        Aggregation::Max,
        Aggregation::StdDev,
        Aggregation::Variance,
        Aggregation::Count,
    ];

    /// Every named (non-percentile) aggregation.
    pub const NAMED: [Aggregation; 9] = [
        Aggregation::Average,
        Aggregation::Count,
        Aggregation::Last,
        Aggregation::Max,
        Aggregation::Mean,
        Aggregation::Min,
        Aggregation::StdDev,
        Aggregation::Sum,
        Aggregation::Variance,
    ];

    /// Token used in query configs (`avg`, `50%`).
    pub fn token(&self) -> String {
        match self {
            Aggregation::Percentile(p) => p.to_string(),
            named => named.name().unwrap_or_default().to_string(),
        }
    }

    /// Name of a named aggregation, `None` for percentiles.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            Aggregation::Average => Some("avg"),
            Aggregation::Count => Some("count"),
            Aggregation::Last => Some("last"),
            Aggregation::Max => Some("max"),
            Aggregation::Mean => Some("mean"),
            Aggregation::Min => Some("min"),
            Aggregation::StdDev => Some("stddev"),
            Aggregation::Sum => Some("sum"),
            Aggregation::Variance => Some("variance"),
            Aggregation::Percentile(_) => None,
        }
    }

    /// Outermost SQL function. `mean` is computed with AVG; percentiles
    /// pick one bucket of QUANTILES with NTH.
    pub fn function_name(&self) -> &'static str {
        match self {
            Aggregation::Average | Aggregation::Mean => "AVG",
            Aggregation::Count => "COUNT",
            Aggregation::Last => "LAST",
            Aggregation::Max => "MAX",
            Aggregation::Min => "MIN",
            Aggregation::StdDev => "STDDEV",
            Aggregation::Sum => "SUM",
            Aggregation::Variance => "VARIANCE",
            Aggregation::Percentile(_) => "NTH",
        }
    }

    /// Output column alias.
    pub fn alias(&self) -> String {
        match self {
            Aggregation::Percentile(p) => p.alias(),
            named => named.token(),
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}
