//! Aggregation token parser using nom.
//!
//! # Grammar
//!
//! ```text
//! aggregation := named | percentile
//! named       := avg | count | last | max | mean | min | stddev | sum | variance
//! percentile  := [digits] ['.' digits] '%'      (at least one digit, <= 100)
//! ```

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, digit1},
    combinator::{all_consuming, opt, value},
    sequence::{pair, preceded, terminated},
};

use crate::ast::{Aggregation, Percentile};
use crate::error::{ExplorerError, ExplorerResult};

/// Parse an aggregation token such as `avg`, `stddev`, `50%` or `.01%`.
///
/// # Example
///
/// ```
/// use dashkit::ast::Aggregation;
/// use dashkit::parser::parse_aggregation;
///
/// assert_eq!(parse_aggregation("max").unwrap(), Aggregation::Max);
/// assert_eq!(parse_aggregation("99.9%").unwrap().alias(), "p99_9");
/// assert!(parse_aggregation("median").is_err());
/// ```
pub fn parse_aggregation(token: &str) -> ExplorerResult<Aggregation> {
    let token = token.trim();
    let invalid = || ExplorerError::InvalidAggregation(token.to_string());

    if let Ok((_, agg)) = all_consuming(parse_named)(token) {
        return Ok(agg);
    }

    let (_, (whole, frac)) = all_consuming(parse_percentile)(token).map_err(|_| invalid())?;
    if whole.is_none() && frac.is_none() {
        return Err(invalid());
    }

    let frac = frac.unwrap_or("").trim_end_matches('0');
    if frac.len() > Percentile::MAX_DECIMALS as usize {
        return Err(invalid());
    }
    let whole: u32 = whole.unwrap_or("0").parse().map_err(|_| invalid())?;
    let frac_value: u32 = if frac.is_empty() {
        0
    } else {
        frac.parse().map_err(|_| invalid())?
    };

    let scaled = whole
        .checked_mul(10u32.pow(frac.len() as u32))
        .and_then(|w| w.checked_add(frac_value))
        .ok_or_else(invalid)?;

    Percentile::new(scaled, frac.len() as u8)
        .map(Aggregation::Percentile)
        .ok_or_else(invalid)
}

/// Parse a list of aggregation tokens, failing on the first invalid one.
pub fn parse_aggregations<S: AsRef<str>>(tokens: &[S]) -> ExplorerResult<Vec<Aggregation>> {
    tokens.iter().map(|t| parse_aggregation(t.as_ref())).collect()
}

impl std::str::FromStr for Aggregation {
    type Err = ExplorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_aggregation(s)
    }
}

/// Parse a named aggregation.
fn parse_named(input: &str) -> IResult<&str, Aggregation> {
    alt((
        value(Aggregation::Average, tag_no_case("avg")),
        value(Aggregation::Count, tag_no_case("count")),
        value(Aggregation::Last, tag_no_case("last")),
        value(Aggregation::Max, tag_no_case("max")),
        value(Aggregation::Mean, tag_no_case("mean")),
        value(Aggregation::Min, tag_no_case("min")),
        value(Aggregation::StdDev, tag_no_case("stddev")),
        value(Aggregation::Sum, tag_no_case("sum")),
        value(Aggregation::Variance, tag_no_case("variance")),
    ))(input)
}

/// Parse the integer and fractional digits of a percentile.
fn parse_percentile(input: &str) -> IResult<&str, (Option<&str>, Option<&str>)> {
    terminated(
        pair(opt(digit1), opt(preceded(char('.'), digit1))),
        char('%'),
    )(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pct(token: &str) -> Percentile {
        match parse_aggregation(token).unwrap() {
            Aggregation::Percentile(p) => p,
            other => panic!("expected percentile, got {:?}", other),
        }
    }

    #[test]
    fn test_named_tokens() {
        for agg in Aggregation::NAMED {
            assert_eq!(parse_aggregation(&agg.token()).unwrap(), agg);
        }
        assert_eq!(parse_aggregation("AVG").unwrap(), Aggregation::Average);
        assert_eq!(" stddev ".parse::<Aggregation>().unwrap(), Aggregation::StdDev);
    }

    #[test]
    fn test_percentiles() {
        assert_eq!(pct("50%"), Percentile::new(50, 0).unwrap());
        assert_eq!(pct(".01%"), Percentile::new(1, 2).unwrap());
        assert_eq!(pct("99.90%"), Percentile::new(999, 1).unwrap());
        assert_eq!(pct("100%").to_string(), "100%");
        assert_eq!(pct("0%").nth(), 1);
    }

    #[test]
    fn test_rejects_malformed() {
        for token in ["", "%", "median", "avg%", "50", "50.%", "101%", "1.00001%", "-5%", "maxx", "5 0%"] {
            assert!(
                matches!(parse_aggregation(token), Err(ExplorerError::InvalidAggregation(_))),
                "accepted {:?}",
                token
            );
        }
    }

    #[test]
    fn test_parse_list_stops_at_first_error() {
        let err = parse_aggregations(&["min", "bogus", "max"]).unwrap_err();
        assert!(matches!(err, ExplorerError::InvalidAggregation(t) if t == "bogus"));
    }
}
