//! Metric Query Parser
//!
//! Parses metric query strings into [`SeriesQuery`] values.
//!
//! # Supported Syntax
//!
//! ```text
//! aggregator:[interval-aggregator[-counter]:]metric[{key=value,key2=*}]
//! ```
//!
//! # Examples
//!
//! ```text
//! sum:cpu.user
//! sum:1m-avg:cpu.user{host=web1}
//! max:1h-max-counter:net.bytes{host=*,dc=east}
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map_opt, map_res, opt, value},
    multi::separated_list1,
    sequence::{delimited, pair, separated_pair, terminated},
    IResult,
};

use crate::aggregation::Aggregator;
use crate::query::error::{QueryError, QueryResult};
use crate::query::types::{DownsampleSpec, SeriesQuery, TimeRange};
use chrono::Utc;

/// Parse a metric query string scoped to `time_range`
pub fn parse_metric_query(input: &str, time_range: TimeRange) -> QueryResult<SeriesQuery> {
    let input = input.trim();

    match parse_full_metric_query(input) {
        Ok((remaining, (aggregator, downsample, metric, tags))) => {
            if !remaining.trim().is_empty() {
                return Err(QueryError::Parse(format!(
                    "Unexpected input after metric query: '{}'",
                    remaining.trim()
                )));
            }
            if let Some(spec) = &downsample {
                if spec.interval_ms <= 0 {
                    return Err(QueryError::Parse(format!(
                        "Downsample interval must be positive in '{}'",
                        input
                    )));
                }
            }

            let mut query = SeriesQuery::new(metric, time_range).aggregator(aggregator);
            query.downsample = downsample;
            for (key, value) in tags {
                query = query.tag(key, value);
            }
            Ok(query)
        }
        Err(e) => Err(QueryError::Parse(format!(
            "Invalid metric query '{}': {:?}",
            input, e
        ))),
    }
}

/// Parse a duration like "30s", "5m", "1h", "250ms" into milliseconds
pub fn parse_interval(input: &str) -> QueryResult<i64> {
    match parse_duration(input.trim()) {
        Ok(("", ms)) => Ok(ms),
        _ => Err(QueryError::Parse(format!("Invalid interval '{}'", input))),
    }
}

/// Parse a timestamp: epoch milliseconds, RFC 3339, or "<duration>-ago"
pub fn parse_time_spec(input: &str) -> QueryResult<i64> {
    let input = input.trim();

    if let Some(offset) = input.strip_suffix("-ago") {
        let offset = parse_interval(offset)?;
        return Utc::now()
            .timestamp_millis()
            .checked_sub(offset)
            .ok_or_else(|| QueryError::Parse(format!("Timestamp out of range: '{}'", input)));
    }
    if let Ok(ms) = input.parse::<i64>() {
        return Ok(ms);
    }

    chrono::DateTime::parse_from_rfc3339(input)
        .map(|dt| dt.timestamp_millis())
        .map_err(|e| QueryError::Parse(format!("Invalid timestamp '{}': {}", input, e)))
}

type ParsedQuery<'a> = (
    Aggregator,
    Option<DownsampleSpec>,
    &'a str,
    Vec<(&'a str, &'a str)>,
);

/// Parse the full metric query
fn parse_full_metric_query(input: &str) -> IResult<&str, ParsedQuery<'_>> {
    let (input, aggregator) = terminated(parse_aggregator, char(':'))(input)?;
    let (input, downsample) = opt(terminated(parse_downsample, char(':')))(input)?;
    let (input, metric) = parse_name(input)?;
    let (input, tags) = opt(parse_tags)(input)?;

    Ok((input, (aggregator, downsample, metric, tags.unwrap_or_default())))
}

/// Parse aggregator name
fn parse_aggregator(input: &str) -> IResult<&str, Aggregator> {
    map_opt(take_while1(|c: char| c.is_ascii_alphabetic()), Aggregator::from_str)(input)
}

/// Parse downsample clause like "1m-avg" or "1h-max-counter"
fn parse_downsample(input: &str) -> IResult<&str, DownsampleSpec> {
    let (input, interval_ms) = parse_duration(input)?;
    let (input, _) = char('-')(input)?;
    let (input, aggregator) = parse_aggregator(input)?;
    let (input, counter) = opt(tag("-counter"))(input)?;

    Ok((
        input,
        DownsampleSpec {
            interval_ms,
            aggregator,
            counter: counter.is_some(),
        },
    ))
}

/// Parse duration like "250ms", "30s", "5m", "1h", "7d"
fn parse_duration(input: &str) -> IResult<&str, i64> {
    // Overflowing durations are rejected, not wrapped
    map_opt(
        pair(
            map_res(digit1, |s: &str| s.parse::<i64>()),
            alt((
                value(1i64, tag("ms")),
                value(1000i64, tag("s")),
                value(60 * 1000i64, tag("m")),
                value(60 * 60 * 1000i64, tag("h")),
                value(24 * 60 * 60 * 1000i64, tag("d")),
            )),
        ),
        |(num, unit)| num.checked_mul(unit),
    )(input)
}

/// Parse tag list like "{host=web1,dc=*}"
fn parse_tags(input: &str) -> IResult<&str, Vec<(&str, &str)>> {
    delimited(
        char('{'),
        separated_list1(
            delimited(multispace0, char(','), multispace0),
            separated_pair(parse_name, char('='), parse_tag_value),
        ),
        char('}'),
    )(input)
}

/// Parse metric name or tag key
fn parse_name(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '/'))(input)
}

/// Parse tag value (names plus wildcard and alternation)
fn parse_tag_value(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || matches!(c, '.' | '_' | '-' | '/' | '*' | '|'))(
        input,
    )
}
