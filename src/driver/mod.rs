//! Database drivers implementing [`Connection`](crate::connection::Connection).

#[cfg(feature = "sqlite")]
pub mod coercion;
#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteConnection;
