//! # Tablekit
//!
//! Generic repository, field mapping and unit-of-work data access over
//! `sea-query`, for six SQL dialects.
//!
//! - [`Record`] types describe their columns statically (usually through
//!   `#[derive(Record)]`); the [`mapper`] turns a record into the column
//!   values an insert or update writes.
//! - A [`DbContext`] binds one [`Connection`] to one [`Dialect`] and holds
//!   the active transaction, if any.
//! - A [`Repository`] exposes CRUD and query verbs for one record type and
//!   table; a [`UnitOfWork`] brackets repository calls in a transaction.
//!
//! SQLite is bundled behind the default `sqlite` feature
//! ([`SqliteConnection`]); other databases plug in by implementing
//! [`Connection`].

// Lets `#[derive(Record)]` output resolve `::tablekit` inside this crate.
extern crate self as tablekit;

pub mod config;
pub mod connection;
pub mod context;
pub mod dialect;
pub mod driver;
pub mod error;
pub mod mapper;
pub mod metrics;
pub mod pagination;
pub mod query;
pub mod record;
pub mod repository;
pub mod row;
pub mod unit_of_work;

#[cfg(all(feature = "sqlite", any(test, feature = "test-helpers")))]
pub mod test_helpers;

pub use config::DatabaseConfig;
pub use connection::{Connection, IsolationLevel, Statement, Transaction};
pub use context::DbContext;
pub use dialect::{Compiler, Dialect};
pub use error::{DataError, Result};
pub use pagination::PaginationResult;
pub use query::{Filter, Operator, QueryFilter};
pub use record::{FieldDescriptor, Record, TableName, WritePolicy};
pub use repository::{Repository, TableRepository};
pub use row::Row;
pub use unit_of_work::UnitOfWork;

#[cfg(feature = "sqlite")]
pub use driver::SqliteConnection;

pub use tablekit_derive::Record;

// Paths used by `#[derive(Record)]` output.
pub use sea_query;
pub use serde_json;
pub use uuid;
