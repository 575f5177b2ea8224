//! Value coercion at the SQLite boundary.
//!
//! SQLite stores five storage classes, so richer values are flattened on the
//! way in and recovered on the way out from the column's declared type:
//!
//! | written value | stored as | read back as |
//! |---|---|---|
//! | bool | INTEGER 0/1 | bool when declared `BOOLEAN` |
//! | UUID | TEXT (hyphenated) | string (deserializes into `Uuid`) |
//! | JSON | TEXT | parsed JSON when declared `JSON` |
//! | bytes | BLOB | array of bytes (deserializes into `Vec<u8>`) |
//! | decimal, dates | TEXT | string |

use crate::error::{DataError, Result};
use rusqlite::types::{Value as SqliteValue, ValueRef};
use sea_query::Value;
use serde_json::{Number, Value as JsonValue};

/// Flatten a bound parameter into a SQLite value.
pub fn to_sqlite(value: &Value) -> Result<SqliteValue> {
    let converted = match value {
        Value::Bool(Some(b)) => SqliteValue::Integer(i64::from(*b)),
        Value::TinyInt(Some(i)) => SqliteValue::Integer(i64::from(*i)),
        Value::SmallInt(Some(i)) => SqliteValue::Integer(i64::from(*i)),
        Value::Int(Some(i)) => SqliteValue::Integer(i64::from(*i)),
        Value::BigInt(Some(i)) => SqliteValue::Integer(*i),
        Value::TinyUnsigned(Some(u)) => SqliteValue::Integer(i64::from(*u)),
        Value::SmallUnsigned(Some(u)) => SqliteValue::Integer(i64::from(*u)),
        Value::Unsigned(Some(u)) => SqliteValue::Integer(i64::from(*u)),
        Value::BigUnsigned(Some(u)) => {
            let i = i64::try_from(*u).map_err(|_| {
                DataError::QueryExecutionError(format!(
                    "BigUnsigned value {u} exceeds i64::MAX ({}), cannot be bound",
                    i64::MAX
                ))
            })?;
            SqliteValue::Integer(i)
        }
        Value::Float(Some(f)) => SqliteValue::Real(f64::from(*f)),
        Value::Double(Some(f)) => SqliteValue::Real(*f),
        Value::String(Some(s)) => SqliteValue::Text(s.to_string()),
        Value::Char(Some(c)) => SqliteValue::Text(c.to_string()),
        Value::Bytes(Some(b)) => SqliteValue::Blob(b.to_vec()),
        Value::Json(Some(j)) => SqliteValue::Text(j.to_string()),
        Value::Uuid(Some(u)) => SqliteValue::Text(u.to_string()),
        Value::Decimal(Some(d)) => SqliteValue::Text(d.to_string()),
        Value::ChronoDate(Some(d)) => SqliteValue::Text(d.to_string()),
        Value::ChronoTime(Some(t)) => SqliteValue::Text(t.to_string()),
        Value::ChronoDateTime(Some(dt)) => SqliteValue::Text(dt.to_string()),
        Value::ChronoDateTimeUtc(Some(dt)) => SqliteValue::Text(dt.to_rfc3339()),
        Value::ChronoDateTimeLocal(Some(dt)) => SqliteValue::Text(dt.to_rfc3339()),
        Value::ChronoDateTimeWithTimeZone(Some(dt)) => SqliteValue::Text(dt.to_rfc3339()),
        Value::Bool(None)
        | Value::TinyInt(None)
        | Value::SmallInt(None)
        | Value::Int(None)
        | Value::BigInt(None)
        | Value::TinyUnsigned(None)
        | Value::SmallUnsigned(None)
        | Value::Unsigned(None)
        | Value::BigUnsigned(None)
        | Value::Float(None)
        | Value::Double(None)
        | Value::String(None)
        | Value::Char(None)
        | Value::Bytes(None)
        | Value::Json(None)
        | Value::Uuid(None)
        | Value::Decimal(None)
        | Value::ChronoDate(None)
        | Value::ChronoTime(None)
        | Value::ChronoDateTime(None)
        | Value::ChronoDateTimeUtc(None)
        | Value::ChronoDateTimeLocal(None)
        | Value::ChronoDateTimeWithTimeZone(None) => SqliteValue::Null,
        #[allow(unreachable_patterns)]
        other => {
            return Err(DataError::QueryExecutionError(format!(
                "unsupported parameter type for sqlite: {other:?}"
            )))
        }
    };
    Ok(converted)
}

pub fn to_sqlite_params(values: &[Value]) -> Result<Vec<SqliteValue>> {
    values.iter().map(to_sqlite).collect()
}

fn declared(decl_type: Option<&str>, marker: &str) -> bool {
    decl_type
        .map(|t| t.to_ascii_uppercase().contains(marker))
        .unwrap_or(false)
}

/// Recover a JSON value from a stored SQLite value.
pub fn from_sqlite(value: ValueRef<'_>, decl_type: Option<&str>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) if declared(decl_type, "BOOL") => JsonValue::Bool(i != 0),
        ValueRef::Integer(i) => JsonValue::Number(i.into()),
        ValueRef::Real(f) => Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => {
            let text = String::from_utf8_lossy(bytes).into_owned();
            if declared(decl_type, "JSON") {
                serde_json::from_str(&text).unwrap_or(JsonValue::String(text))
            } else {
                JsonValue::String(text)
            }
        }
        ValueRef::Blob(bytes) => {
            JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect())
        }
    }
}
