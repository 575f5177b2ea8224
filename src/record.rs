//! Static field descriptors for record types.
//!
//! A record type describes its columns once, at compile time, as a slice of
//! [`FieldDescriptor`]s in declaration order. Each descriptor carries the
//! column name, the field's [`WritePolicy`] and an accessor that reads the
//! field's current value. The field mapper walks these descriptors instead of
//! inspecting the type at runtime.
//!
//! Descriptors are normally generated with `#[derive(Record)]`:
//!
//! ```no_run
//! use tablekit::Record;
//! use uuid::Uuid;
//!
//! #[derive(Record, serde::Deserialize)]
//! #[table_name = "users"]
//! struct User {
//!     #[auto_uuid]
//!     id: Uuid,
//!     email: String,
//!     #[json]
//!     tags: Vec<String>,
//!     #[skip_write]
//!     created_at: Option<String>,
//! }
//! ```
//!
//! They can also be registered by hand:
//!
//! ```
//! use tablekit::record::{FieldDescriptor, Record, WritePolicy};
//! use sea_query::Value;
//!
//! struct Tag {
//!     id: i64,
//!     label: String,
//! }
//!
//! fn tag_id(t: &Tag) -> Value {
//!     t.id.into()
//! }
//!
//! fn tag_label(t: &Tag) -> Value {
//!     t.label.clone().into()
//! }
//!
//! static TAG_FIELDS: [FieldDescriptor<Tag>; 2] = [
//!     FieldDescriptor::value("id", WritePolicy::Default, tag_id),
//!     FieldDescriptor::value("label", WritePolicy::Default, tag_label),
//! ];
//!
//! impl Record for Tag {
//!     fn fields() -> &'static [FieldDescriptor<Self>] {
//!         &TAG_FIELDS
//!     }
//! }
//! ```

use sea_query::Value;
use std::fmt;

/// How the field mapper treats a field on insert/update
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Written as-is
    Default,
    /// Never sent to the database (computed or read-only columns)
    Excluded,
    /// A fresh UUID is generated at write time, ignoring the current value
    AutoGenerate,
    /// Serialized to JSON text before being written
    Json,
}

/// Reads a field's current value off a record
pub enum Accessor<R> {
    /// Plain column value
    Value(fn(&R) -> Value),
    /// JSON serialization of the field
    Json(fn(&R) -> serde_json::Result<String>),
}

impl<R> Clone for Accessor<R> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<R> Copy for Accessor<R> {}

/// One column of a record type
pub struct FieldDescriptor<R> {
    pub name: &'static str,
    pub policy: WritePolicy,
    pub accessor: Accessor<R>,
}

impl<R> FieldDescriptor<R> {
    pub const fn new(name: &'static str, policy: WritePolicy, accessor: Accessor<R>) -> Self {
        Self {
            name,
            policy,
            accessor,
        }
    }

    /// Descriptor whose value is read directly
    pub const fn value(name: &'static str, policy: WritePolicy, get: fn(&R) -> Value) -> Self {
        Self::new(name, policy, Accessor::Value(get))
    }

    /// Descriptor for a JSON-encoded field
    pub const fn json(name: &'static str, encode: fn(&R) -> serde_json::Result<String>) -> Self {
        Self::new(name, WritePolicy::Json, Accessor::Json(encode))
    }

    /// The field's current value, JSON fields yielding their encoded text.
    pub fn read(&self, record: &R) -> serde_json::Result<Value> {
        match self.accessor {
            Accessor::Value(get) => Ok(get(record)),
            Accessor::Json(encode) => encode(record).map(Value::from),
        }
    }
}

impl<R> fmt::Debug for FieldDescriptor<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FieldDescriptor")
            .field("name", &self.name)
            .field("policy", &self.policy)
            .finish()
    }
}

/// A typed row shape with statically described columns.
pub trait Record: Send + Sync + 'static {
    /// Column addressed by identifier lookups, updates and deletes
    const IDENTIFIER: &'static str = "id";

    /// Column descriptors in declaration order.
    fn fields() -> &'static [FieldDescriptor<Self>]
    where
        Self: Sized;

    /// Descriptor of the identifier column, if the record declares one.
    fn identifier_field() -> Option<&'static FieldDescriptor<Self>>
    where
        Self: Sized,
    {
        Self::fields().iter().find(|f| f.name == Self::IDENTIFIER)
    }

    /// Current value of the identifier column, whatever its write policy.
    ///
    /// Updates locate their row with this value. The derive reads the field
    /// directly, so a `#[skip_write]` identifier still yields its value.
    fn identifier_value(&self) -> Option<Value>
    where
        Self: Sized,
    {
        Self::identifier_field().and_then(|field| field.read(self).ok())
    }
}

/// Default table name for a record type, supplied by `#[table_name = "..."]`.
pub trait TableName {
    const TABLE_NAME: &'static str;
}
