//! Pure cell-level conversions used by the silver normalizer.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use thiserror::Error;

use crate::domain::Value;

/// A value that could not be converted. The normalizer recovers from it by storing
/// null and counting the occurrence.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("cannot parse {value:?} as {target}")]
pub struct ValueParseError {
    pub value: String,
    pub target: &'static str,
}

impl ValueParseError {
    fn new(value: &Value, target: &'static str) -> Self {
        Self {
            value: value.to_string(),
            target,
        }
    }
}

/// Literal strings that stand for a missing value once a cell has been stringified
/// and upper-cased
pub const NULL_SENTINELS: [&str; 3] = ["NAN", "NONE", ""];

pub fn is_null_sentinel(upper: &str) -> bool {
    NULL_SENTINELS.contains(&upper)
}

/// Parse a cell as a number. Null and blank text stay null; booleans become 0/1.
pub fn coerce_numeric(value: &Value) -> Result<Value, ValueParseError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => Ok(Value::Int(*i)),
        Value::Float(f) => Ok(Value::from(*f)),
        Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
        Value::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(Value::Null);
            }
            if let Ok(i) = s.parse::<i64>() {
                return Ok(Value::Int(i));
            }
            match s.parse::<f64>() {
                Ok(f) => Ok(Value::from(f)),
                Err(_) => Err(ValueParseError::new(value, "number")),
            }
        }
        Value::Timestamp(_) => Err(ValueParseError::new(value, "number")),
    }
}

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a cell as a calendar timestamp. Accepts RFC 3339, date-time, date and
/// year-month text; timestamps pass through.
pub fn parse_timestamp(value: &Value) -> Result<Value, ValueParseError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Timestamp(ts) => Ok(Value::Timestamp(*ts)),
        Value::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(Value::Null);
            }
            parse_timestamp_str(s)
                .map(Value::Timestamp)
                .ok_or_else(|| ValueParseError::new(value, "timestamp"))
        }
        _ => Err(ValueParseError::new(value, "timestamp")),
    }
}

fn parse_timestamp_str(s: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return d.and_hms_opt(0, 0, 0);
    }
    // Year-month only, e.g. "2023-01"
    NaiveDate::parse_from_str(&format!("{s}-01"), "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Stringify, trim and upper-case a text cell. Null-like literals become null.
pub fn standardize_text(value: &Value) -> Value {
    let Some(text) = value.to_text() else {
        return Value::Null;
    };
    let upper = text.trim().to_uppercase();
    if is_null_sentinel(&upper) {
        Value::Null
    } else {
        Value::Text(upper)
    }
}

/// Partition key `"{ano}_{mes:02}"`, defined only when both parts are integral numbers
pub fn partition_key(ano: &Value, mes: &Value) -> Option<String> {
    let ano = ano.as_i64()?;
    let mes = mes.as_i64()?;
    Some(format!("{ano}_{mes:02}"))
}

/// First instant of the month a partition key's parts refer to
pub fn month_start(ano: &Value, mes: &Value) -> Option<NaiveDateTime> {
    let year = i32::try_from(ano.as_i64()?).ok()?;
    let month = u32::try_from(mes.as_i64()?).ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)
}
