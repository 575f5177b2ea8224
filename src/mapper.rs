//! Field mapper: turns a record into the ordered column/value pairs that an
//! insert or update writes.
//!
//! Per field, in declaration order:
//! - [`WritePolicy::Excluded`] fields are dropped,
//! - the identifier is dropped unless `include_identifier` is set,
//! - [`WritePolicy::Json`] fields are written as their JSON text,
//! - [`WritePolicy::AutoGenerate`] fields get a fresh UUID v4,
//! - everything else is written unchanged.

use crate::error::{DataError, Result};
use crate::record::{FieldDescriptor, Record, WritePolicy};
use sea_query::Value;
use uuid::Uuid;

/// Ordered column/value pairs for one row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSet {
    entries: Vec<(&'static str, Value)>,
}

impl WriteSet {
    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(c, _)| *c)
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> + '_ {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_entries(self) -> Vec<(&'static str, Value)> {
        self.entries
    }
}

/// Column list shared by every row of a bulk insert, with per-row values
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BulkWriteSet {
    pub columns: Vec<&'static str>,
    pub rows: Vec<Vec<Value>>,
}

impl BulkWriteSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Whether a bound value is SQL NULL.
pub fn is_null(value: &Value) -> bool {
    matches!(
        value,
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
            | Value::ChronoDateTimeWithTimeZone(None)
    )
}

fn ensure_identifier<R: Record>() -> Result<()> {
    if R::identifier_field().is_none() {
        return Err(DataError::MappingError(format!(
            "identifier field `{}` not declared on {}",
            R::IDENTIFIER,
            std::any::type_name::<R>()
        )));
    }
    Ok(())
}

fn field_value<R: Record>(field: &FieldDescriptor<R>, entity: &R) -> Result<Value> {
    match field.policy {
        WritePolicy::AutoGenerate => Ok(Uuid::new_v4().into()),
        _ => field.read(entity).map_err(|e| {
            DataError::MappingError(format!("failed to encode `{}` as JSON: {e}", field.name))
        }),
    }
}

fn writable<R: Record>(include_identifier: bool) -> impl Iterator<Item = &'static FieldDescriptor<R>> {
    R::fields().iter().filter(move |f| {
        f.policy != WritePolicy::Excluded && (include_identifier || f.name != R::IDENTIFIER)
    })
}

/// Compute the write set for a single entity.
///
/// Inserts pass `include_identifier = true` so a generated identifier is
/// visible to the caller; updates pass `false` and address the row by
/// identifier instead.
pub fn compute_write_set<R: Record>(entity: &R, include_identifier: bool) -> Result<WriteSet> {
    ensure_identifier::<R>()?;
    let entries = writable::<R>(include_identifier)
        .map(|field| Ok((field.name, field_value(field, entity)?)))
        .collect::<Result<Vec<_>>>()?;
    Ok(WriteSet { entries })
}

/// Compute the write sets for a batch.
///
/// The column list is derived once and includes the identifier, exactly as
/// a single insert does. Values are computed per item, so every item gets
/// its own generated identifier and JSON text.
pub fn compute_bulk_write_sets<R: Record>(items: &[R]) -> Result<BulkWriteSet> {
    ensure_identifier::<R>()?;
    if items.is_empty() {
        return Ok(BulkWriteSet::default());
    }
    let fields: Vec<&'static FieldDescriptor<R>> = writable::<R>(true).collect();
    let columns = fields.iter().map(|f| f.name).collect();
    let rows = items
        .iter()
        .map(|item| {
            fields
                .iter()
                .map(|field| field_value(field, item))
                .collect::<Result<Vec<_>>>()
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(BulkWriteSet { columns, rows })
}
