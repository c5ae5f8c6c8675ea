//! Query configuration model supplied by the hosting dashboard.
//!
//! These types mirror the JSON the explorer UI stores for a widget. They
//! are read-only input: the translator never mutates them.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{DateBound, ExplorerError, ExplorerResult};

/// A complete query description: what to filter and how to group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryConfigModel {
    #[serde(default)]
    pub filters: QueryFilterModel,
    #[serde(default)]
    pub results: QueryColumnModel,
}

impl QueryConfigModel {
    /// Decode a model from JSON.
    pub fn from_json(json: &str) -> ExplorerResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Row filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryFilterModel {
    #[serde(default)]
    pub start_date: Option<DateFilter>,
    #[serde(default)]
    pub end_date: Option<DateFilter>,
    #[serde(default)]
    pub product_name: Option<String>,
    #[serde(default)]
    pub test: Option<String>,
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default)]
    pub runby: Option<String>,
    #[serde(default)]
    pub official: Official,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub metadata: Vec<MetadataFilter>,
}

/// Output shape: date bucketing, label columns and aggregations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryColumnModel {
    #[serde(default)]
    pub date_group: Option<DateGroup>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub labels: Vec<LabelColumn>,
    /// Aggregation tokens overriding the default set (ignored for Details).
    #[serde(default, deserialize_with = "null_as_empty")]
    pub aggregations: Vec<String>,
}

impl QueryColumnModel {
    pub fn date_group(&self) -> DateGroup {
        self.date_group.unwrap_or_default()
    }
}

/// Date bucketing granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateGroup {
    /// One row per sample, no aggregation.
    Details,
    Daily,
    Weekly,
    /// A single group over the whole date range.
    OneGroup,
    /// Anything else: aggregated, no date bucket.
    #[default]
    #[serde(other)]
    Other,
}

/// A metadata label to display as a column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LabelColumn {
    #[serde(default)]
    pub label: Option<String>,
}

/// A `key:value` metadata tag that rows must carry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetadataFilter {
    #[serde(default)]
    pub text: Option<String>,
}

/// Tri-state filter on official runs.
///
/// Stored as `"true"`, `"false"` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Official {
    True,
    False,
    /// Both official and unofficial runs.
    #[default]
    Any,
}

impl Serialize for Official {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Official::True => serializer.serialize_str("true"),
            Official::False => serializer.serialize_str("false"),
            Official::Any => serializer.serialize_none(),
        }
    }
}

/// Accepts `"true"`, `"false"`, booleans, `null` or anything else (Any).
impl<'de> Deserialize<'de> for Official {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Repr {
            Bool(bool),
            Text(String),
            Other(serde_json::Value),
        }

        Ok(match Option::<Repr>::deserialize(deserializer)? {
            // JSON booleans are accepted as well as the UI's string form.
            Some(Repr::Bool(true)) => Official::True,
            Some(Repr::Bool(false)) => Official::False,
            Some(Repr::Text(s)) if s == "true" => Official::True,
            Some(Repr::Text(s)) if s == "false" => Official::False,
            _ => Official::Any,
        })
    }
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// One bound of the date range, as stored by the UI.
///
/// `filter_type` is `CUSTOM` for an absolute date in `text`, or a unit
/// for a relative offset of `filter_value` units before now.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DateFilter {
    #[serde(default)]
    pub filter_type: Option<String>,
    #[serde(default)]
    pub filter_value: Option<FilterAmount>,
    #[serde(default)]
    pub text: Option<String>,
}

/// A relative amount; the UI sends either a number or a numeric string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterAmount {
    Number(f64),
    Text(String),
}

/// Units for relative dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DateUnit {
    Year,
    Month,
    Week,
    Day,
    Hour,
    Minute,
    Second,
}

impl DateUnit {
    /// The unit name understood by DATE_ADD. Weeks are expressed in days.
    pub fn date_add_unit(&self) -> &'static str {
        match self {
            DateUnit::Year => "YEAR",
            DateUnit::Month => "MONTH",
            DateUnit::Week | DateUnit::Day => "DAY",
            DateUnit::Hour => "HOUR",
            DateUnit::Minute => "MINUTE",
            DateUnit::Second => "SECOND",
        }
    }

    /// Multiplier from this unit to [`Self::date_add_unit`].
    pub fn factor(&self) -> u64 {
        match self {
            DateUnit::Week => 7,
            _ => 1,
        }
    }
}

impl std::str::FromStr for DateUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "YEAR" => Ok(DateUnit::Year),
            "MONTH" => Ok(DateUnit::Month),
            "WEEK" => Ok(DateUnit::Week),
            "DAY" => Ok(DateUnit::Day),
            "HOUR" => Ok(DateUnit::Hour),
            "MINUTE" => Ok(DateUnit::Minute),
            "SECOND" => Ok(DateUnit::Second),
            _ => Err(()),
        }
    }
}

/// A validated date bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSpec {
    /// An absolute point in time. `has_time` is false for date-only input.
    Custom { at: NaiveDateTime, has_time: bool },
    /// `amount` units before now.
    Relative { amount: u64, unit: DateUnit },
}

impl DateSpec {
    /// Canonical text for an absolute date, as passed to TIMESTAMP().
    pub fn timestamp_text(at: &NaiveDateTime, has_time: bool) -> String {
        if has_time {
            at.format("%Y-%m-%d %H:%M:%S").to_string()
        } else {
            at.format("%Y-%m-%d").to_string()
        }
    }
}

impl DateFilter {
    /// Validate this filter into a [`DateSpec`].
    pub fn resolve(&self, bound: DateBound) -> ExplorerResult<DateSpec> {
        let filter_type = self
            .filter_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ExplorerError::malformed_date(bound, "missing filter_type"))?;

        if filter_type.eq_ignore_ascii_case("CUSTOM") {
            let text = self
                .text
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| ExplorerError::malformed_date(bound, "CUSTOM filter without text"))?;
            let (at, has_time) = parse_date_text(text).ok_or_else(|| {
                ExplorerError::malformed_date(bound, format!("unrecognized date '{}'", text))
            })?;
            return Ok(DateSpec::Custom { at, has_time });
        }

        let unit: DateUnit = filter_type.parse().map_err(|_| {
            ExplorerError::malformed_date(bound, format!("unknown filter_type '{}'", filter_type))
        })?;
        let amount = self
            .filter_value
            .as_ref()
            .ok_or_else(|| ExplorerError::malformed_date(bound, "relative filter without filter_value"))?
            .as_count()
            .ok_or_else(|| {
                ExplorerError::malformed_date(bound, "filter_value must be a non-negative integer")
            })?;

        Ok(DateSpec::Relative { amount, unit })
    }
}

impl FilterAmount {
    fn as_count(&self) -> Option<u64> {
        match self {
            FilterAmount::Number(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => {
                Some(*n as u64)
            }
            FilterAmount::Number(_) => None,
            FilterAmount::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Parse the absolute date formats the date picker produces.
fn parse_date_text(text: &str) -> Option<(NaiveDateTime, bool)> {
    if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|at| (at, false));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(at) = NaiveDateTime::parse_from_str(text, format) {
            return Some((at, true));
        }
    }
    DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| (dt.naive_utc(), true))
}
