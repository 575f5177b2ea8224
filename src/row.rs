//! Result rows.
//!
//! Drivers hand back rows as named columns holding JSON values; decoding
//! into a caller's target shape goes through `serde`.

use crate::error::{DataError, Result};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// One result row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<JsonValue>,
}

impl Row {
    /// Build a row; `columns` is shared by every row of a result set.
    pub fn new(columns: Arc<[String]>, values: Vec<JsonValue>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.values.get(i))
    }

    pub fn get_index(&self, index: usize) -> Option<&JsonValue> {
        self.values.get(index)
    }

    /// Read the first column as an integer (e.g. a `COUNT(*)` result).
    pub fn first_i64(&self) -> Result<i64> {
        self.values
            .first()
            .and_then(JsonValue::as_i64)
            .ok_or_else(|| DataError::ParseError("expected an integer in the first column".to_string()))
    }

    /// Decode the row into any `DeserializeOwned` shape, keyed by column name.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        let map: Map<String, JsonValue> = self
            .columns
            .iter()
            .cloned()
            .zip(self.values.iter().cloned())
            .collect();
        serde_json::from_value(JsonValue::Object(map))
            .map_err(|e| DataError::ParseError(format!("failed to decode row: {e}")))
    }

    pub fn into_json(self) -> JsonValue {
        JsonValue::Object(self.columns.iter().cloned().zip(self.values).collect())
    }
}
