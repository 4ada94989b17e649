//! SQL Server value decoding.
//!
//! Every TDS column value is mapped onto a JSON value:
//! - integers, floats and `bit` natively
//! - `decimal`/`numeric` and `uniqueidentifier` as strings (no precision loss)
//! - date/time types as ISO-8601 strings
//! - binary as base64
//! - SQL `NULL` as JSON `null`

use base64::{Engine as _, engine::general_purpose::STANDARD};
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::Value as JsonValue;
use tiberius::{ColumnData, FromSql};

// =============================================================================
// Column Decoding
// =============================================================================

/// Decode one column value.
pub fn column_to_json(data: &ColumnData<'static>) -> JsonValue {
    match data {
        ColumnData::U8(v) => opt(v.map(JsonValue::from)),
        ColumnData::I16(v) => opt(v.map(JsonValue::from)),
        ColumnData::I32(v) => opt(v.map(JsonValue::from)),
        ColumnData::I64(v) => opt(v.map(JsonValue::from)),
        ColumnData::F32(v) => opt(v.and_then(|f| float(f as f64))),
        ColumnData::F64(v) => opt(v.and_then(float)),
        ColumnData::Bit(v) => opt(v.map(JsonValue::Bool)),
        ColumnData::String(v) => opt(v.as_ref().map(|s| JsonValue::String(s.to_string()))),
        ColumnData::Guid(v) => opt(v.as_ref().map(|g| JsonValue::String(g.to_string()))),
        ColumnData::Numeric(v) => opt(v.as_ref().map(|n| JsonValue::String(n.to_string()))),
        ColumnData::Binary(v) => opt(v.as_ref().map(|b| JsonValue::String(STANDARD.encode(b)))),
        ColumnData::Xml(v) => opt(v.as_ref().map(|x| JsonValue::String(x.to_string()))),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            temporal::<NaiveDateTime>(data, |t| t.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        }
        ColumnData::Date(_) => temporal::<NaiveDate>(data, |d| d.format("%Y-%m-%d").to_string()),
        ColumnData::Time(_) => temporal::<NaiveTime>(data, |t| t.format("%H:%M:%S%.f").to_string()),
        ColumnData::DateTimeOffset(_) => {
            temporal::<DateTime<FixedOffset>>(data, |t| t.to_rfc3339())
        }
        #[allow(unreachable_patterns)]
        other => JsonValue::String(format!("{:?}", other)),
    }
}

fn opt(value: Option<JsonValue>) -> JsonValue {
    value.unwrap_or(JsonValue::Null)
}

/// Non-finite floats have no JSON representation.
fn float(f: f64) -> Option<JsonValue> {
    serde_json::Number::from_f64(f).map(JsonValue::Number)
}

fn temporal<'a, T>(data: &'a ColumnData<'static>, render: impl Fn(T) -> String) -> JsonValue
where
    T: FromSql<'a>,
{
    match T::from_sql(data) {
        Ok(Some(value)) => JsonValue::String(render(value)),
        Ok(None) => JsonValue::Null,
        // Out-of-range values: keep something readable instead of failing the row
        Err(_) => JsonValue::String(format!("{:?}", data)),
    }
}
