//! Scalar and temporal conversions between `Value` and URL text.

use base64::Engine as _;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::schema::ScalarKind;
use crate::value::Value;

use super::URL_TOKEN;

const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

pub(crate) fn format_date(d: &NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

pub(crate) fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}

pub(crate) fn format_time(t: &NaiveTime) -> String {
    t.format("%H:%M:%S%.f").to_string()
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|e| e.to_string())
}

pub(crate) fn parse_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Ok(dt);
        }
    }
    // Offset-qualified timestamps keep their wall-clock reading.
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.naive_local());
    }
    // A bare date is midnight of that day.
    parse_date(raw)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| format!("invalid isoformat string: '{raw}'"))
}

pub(crate) fn parse_time(raw: &str) -> Result<NaiveTime, String> {
    let raw = raw.trim();
    for fmt in TIME_FORMATS {
        if let Ok(t) = NaiveTime::parse_from_str(raw, fmt) {
            return Ok(t);
        }
    }
    Err(format!("invalid isoformat string: '{raw}'"))
}

/// Textual form of a scalar. Collections are handled by the caller.
pub(crate) fn format_scalar(value: &Value) -> Option<String> {
    Some(match value {
        Value::Null => String::new(),
        Value::Bool(true) => "true".to_string(),
        Value::Bool(false) => "false".to_string(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => format!("{f:?}"),
        Value::Str(s) => s.clone(),
        Value::Date(d) => format_date(d),
        Value::DateTime(dt) => format_datetime(dt),
        Value::Time(t) => format_time(t),
        Value::Bytes(b) => URL_TOKEN.encode(b),
        Value::List(_) | Value::Tuple(_) | Value::Set(_) | Value::Map(_) => return None,
    })
}

pub(crate) fn parse_scalar(raw: &str, kind: ScalarKind) -> Result<Value, String> {
    match kind {
        ScalarKind::Bool => Ok(Value::Bool(matches!(
            raw.to_lowercase().as_str(),
            "true" | "1" | "t" | "yes" | "on"
        ))),
        ScalarKind::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| e.to_string()),
        ScalarKind::Float => raw
            .trim()
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|e| e.to_string()),
        ScalarKind::Str => Ok(Value::Str(raw.to_string())),
        ScalarKind::Date => parse_date(raw).map(Value::Date),
        ScalarKind::DateTime => parse_datetime(raw).map(Value::DateTime),
        ScalarKind::Time => parse_time(raw).map(Value::Time),
        ScalarKind::Bytes => URL_TOKEN
            .decode(raw.trim())
            .map(Value::Bytes)
            .map_err(|e| e.to_string()),
    }
}
