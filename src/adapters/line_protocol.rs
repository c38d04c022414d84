//! InfluxDB line protocol encoding:
//! `measurement,tag=value field=value,field=value timestamp_ns`.

use thiserror::Error;

use crate::domain::models::FieldValue;
use crate::domain::point::TimeSeriesPoint;

#[derive(Debug, Error, PartialEq)]
pub enum LineProtocolError {
    #[error("point for {0} has no fields")]
    NoFields(String),
    #[error("field {0} is not a finite number")]
    NonFiniteField(&'static str),
    #[error("timestamp is outside the nanosecond range")]
    TimestampOutOfRange,
    #[error("tag {key} value {value:?} contains control characters")]
    InvalidTagValue { key: &'static str, value: String },
}

pub fn encode_point(point: &TimeSeriesPoint) -> Result<String, LineProtocolError> {
    if point.fields.is_empty() {
        return Err(LineProtocolError::NoFields(point.measurement.clone()));
    }

    let timestamp_ns = point
        .timestamp
        .timestamp_nanos_opt()
        .ok_or(LineProtocolError::TimestampOutOfRange)?;

    let mut line = escape_measurement(&point.measurement);

    for (key, value) in point.tags() {
        // Empty tag values are not allowed by the protocol; drop the tag.
        if value.is_empty() {
            continue;
        }
        if value.chars().any(char::is_control) {
            return Err(LineProtocolError::InvalidTagValue {
                key,
                value: value.to_string(),
            });
        }
        line.push(',');
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&escape_key(value));
    }

    line.push(' ');
    for (index, (key, value)) in point.fields.iter().enumerate() {
        if index > 0 {
            line.push(',');
        }
        line.push_str(&escape_key(key));
        line.push('=');
        line.push_str(&encode_field_value(key, value)?);
    }

    line.push(' ');
    line.push_str(&timestamp_ns.to_string());

    Ok(line)
}

fn encode_field_value(key: &'static str, value: &FieldValue) -> Result<String, LineProtocolError> {
    Ok(match value {
        FieldValue::Float(number) => {
            if !number.is_finite() {
                return Err(LineProtocolError::NonFiniteField(key));
            }
            format!("{number}")
        }
        FieldValue::Integer(number) => format!("{number}i"),
    })
}

fn escape_measurement(value: &str) -> String {
    value.replace(',', "\\,").replace(' ', "\\ ")
}

// Tag keys, tag values and field keys share the same escaping rules. A
// backslash is doubled so a trailing one cannot escape the next separator.
fn escape_key(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}
