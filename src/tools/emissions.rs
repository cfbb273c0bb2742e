//! `get_ship_emissions`: voyage emissions for one ship over a time period.
//!
//! Dates are accepted in ISO 8601 form with or without a trailing `Z` and are
//! forwarded to the upstream API as naive ISO timestamps
//! (`YYYY-MM-DDTHH:MM:SS[.ffffff]`). When neither bound is given the period
//! defaults to year-to-date.

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Timelike, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use super::{scalar_arg, upstream_text};
use crate::protocol::ToolOutcome;
use crate::upstream::{Api, UpstreamClient};

const EMISSIONS_PATH: &str = "/voyages/emissions";

/// Resolved query period, reported back to the client in `query_info`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimePeriod {
    pub start: Option<String>,
    pub end: Option<String>,
    pub is_year_to_date: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("Invalid date format. Use ISO format (YYYY-MM-DDTHH:MM:SS): {0}")]
    InvalidFormat(String),

    #[error("start date must be before end date")]
    StartNotBeforeEnd,
}

/// Validate and normalize the requested period.
///
/// Either bound may be given alone. With neither, the period runs from
/// January 1st of `now`'s year to `now`.
pub fn resolve_period(
    start: Option<&str>,
    end: Option<&str>,
    now: NaiveDateTime,
) -> Result<TimePeriod, PeriodError> {
    let is_year_to_date = start.is_none() && end.is_none();

    let (start, end) = if is_year_to_date {
        let year_start = NaiveDate::from_ymd_opt(now.year(), 1, 1)
            .map(|d| d.and_time(NaiveTime::MIN))
            .ok_or_else(|| PeriodError::InvalidFormat(format!("year {} out of range", now.year())))?;
        tracing::info!(
            start = %format_iso(year_start),
            end = %format_iso(now),
            "Using year-to-date default"
        );
        (Some(year_start), Some(now))
    } else {
        (
            start.map(parse_iso).transpose()?,
            end.map(parse_iso).transpose()?,
        )
    };

    if let (Some(start), Some(end)) = (start, end) {
        if start >= end {
            return Err(PeriodError::StartNotBeforeEnd);
        }
    }

    Ok(TimePeriod {
        start: start.map(format_iso),
        end: end.map(format_iso),
        is_year_to_date,
    })
}

/// Parse an ISO 8601 date or datetime. `Z` markers are ignored; explicit
/// offsets are converted to UTC.
fn parse_iso(raw: &str) -> Result<NaiveDateTime, PeriodError> {
    let s = raw.replace('Z', "");

    const OFFSET_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f%:z", "%Y-%m-%dT%H:%M%:z"];
    for format in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::<FixedOffset>::parse_from_str(&s, format) {
            return Ok(dt.naive_utc());
        }
    }

    const FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];
    for format in FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&s, format) {
            return Ok(dt);
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d")
        .map(|d| d.and_time(NaiveTime::MIN))
        .map_err(|_| PeriodError::InvalidFormat(format!("Invalid isoformat string: '{}'", raw)))
}

/// Render as `YYYY-MM-DDTHH:MM:SS`, adding microseconds only when non-zero.
fn format_iso(dt: NaiveDateTime) -> String {
    let base = dt.format("%Y-%m-%dT%H:%M:%S").to_string();
    let micros = dt.nanosecond() / 1_000;
    if micros == 0 {
        base
    } else {
        format!("{}.{:06}", base, micros)
    }
}

/// A date argument: absent, null and empty are all "not given".
fn date_arg(arguments: &Map<String, Value>, key: &str) -> Result<Option<String>, PeriodError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(PeriodError::InvalidFormat(format!(
            "'{}' must be a string, got {}",
            key, other
        ))),
    }
}

#[derive(Serialize)]
struct QueryInfo<'a> {
    ship_id: &'a str,
    time_period: &'a TimePeriod,
    query_timestamp: String,
}

#[derive(Serialize)]
struct EmissionsReport<'a> {
    query_info: QueryInfo<'a>,
    emissions_data: Value,
}

pub(super) async fn get_ship_emissions(
    upstream: &UpstreamClient,
    arguments: &Map<String, Value>,
) -> ToolOutcome {
    let Some(ship_id) = scalar_arg(arguments, "asset_id").or_else(|| scalar_arg(arguments, "ship_id"))
    else {
        return ToolOutcome::error("Missing asset_id or ship_id argument");
    };

    let (start, end) = match (date_arg(arguments, "start"), date_arg(arguments, "end")) {
        (Ok(start), Ok(end)) => (start, end),
        (Err(e), _) | (_, Err(e)) => return ToolOutcome::error(e.to_string()),
    };

    let period = match resolve_period(start.as_deref(), end.as_deref(), Utc::now().naive_utc()) {
        Ok(period) => period,
        Err(e) => return ToolOutcome::error(e.to_string()),
    };

    let mut query = vec![("asset_ids", ship_id.clone())];
    if let Some(start) = &period.start {
        query.push(("start", start.clone()));
    }
    if let Some(end) = &period.end {
        query.push(("end", end.clone()));
    }

    tracing::info!(
        ship_id = %ship_id,
        start = period.start.as_deref().unwrap_or("N/A"),
        end = period.end.as_deref().unwrap_or("N/A"),
        "Fetching ship emissions"
    );

    let result = upstream.get_json(Api::Dch, EMISSIONS_PATH, &query).await;

    match result {
        Ok(data) if data.get("error").is_none() => {
            let report = EmissionsReport {
                query_info: QueryInfo {
                    ship_id: &ship_id,
                    time_period: &period,
                    query_timestamp: format!("{}Z", format_iso(Utc::now().naive_utc())),
                },
                emissions_data: data,
            };
            match serde_json::to_string_pretty(&report) {
                Ok(text) => ToolOutcome::text(text),
                Err(e) => ToolOutcome::error(e.to_string()),
            }
        }
        other => ToolOutcome::text(upstream_text(&other)),
    }
}
