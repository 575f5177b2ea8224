//! Procedural macros for tablekit
//!
//! This crate provides the `Record` derive, which generates the static
//! field descriptors the field mapper walks.

mod attributes;
mod macros;

use proc_macro::TokenStream;

/// Derive macro for `Record` - generates static field descriptors
///
/// This macro generates:
/// - one `FieldDescriptor` per field, in declaration order
/// - `Record::IDENTIFIER` when `#[identifier = "..."]` is given
/// - a `TableName` impl when `#[table_name = "..."]` is given
///
/// Field attributes:
/// - `#[column_name = "..."]`: column name (defaults to the field name)
/// - `#[skip_write]`: never written on insert/update
/// - `#[auto_uuid]`: a fresh UUID v4 is written on insert
/// - `#[json]`: written as its `serde_json` text
///
/// # Example
///
/// ```ignore
/// use tablekit::Record;
///
/// #[derive(Record)]
/// #[table_name = "users"]
/// pub struct User {
///     #[auto_uuid]
///     pub id: uuid::Uuid,
///     pub email: String,
///     #[json]
///     pub tags: Vec<String>,
/// }
/// ```
#[proc_macro_derive(
    Record,
    attributes(table_name, identifier, column_name, skip_write, auto_uuid, json)
)]
pub fn derive_record(input: TokenStream) -> TokenStream {
    macros::derive_record(input)
}
