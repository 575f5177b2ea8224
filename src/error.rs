//! Error taxonomy for the data access layer.
//!
//! Every fallible operation in the crate returns [`DataError`]. Errors raised
//! by the query compiler or the driver are surfaced unchanged as
//! [`DataError::QueryExecutionError`] (or [`DataError::SqliteError`] for the
//! bundled driver); nothing here retries.

use std::fmt;

/// Crate error type
#[derive(Debug)]
pub enum DataError {
    /// A write set could not be computed (missing identifier, JSON failure)
    MappingError(String),
    /// A required single-row lookup matched zero rows
    NotFoundError(String),
    /// Transaction lifecycle misuse
    InvalidStateError(String),
    /// Dialect name outside the supported set
    UnsupportedDialectError(String),
    /// Pass-through failure from the compiler or driver
    QueryExecutionError(String),
    /// SQLite error from `rusqlite`
    #[cfg(feature = "sqlite")]
    SqliteError(rusqlite::Error),
    /// Row decoding error
    ParseError(String),
    /// The cancellation token fired before completion
    Cancelled,
}

impl fmt::Display for DataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataError::MappingError(s) => {
                write!(f, "Mapping error: {s}")
            }
            DataError::NotFoundError(s) => {
                write!(f, "Not found: {s}")
            }
            DataError::InvalidStateError(s) => {
                write!(f, "Invalid state: {s}")
            }
            DataError::UnsupportedDialectError(s) => {
                write!(f, "Unsupported dialect: {s}")
            }
            DataError::QueryExecutionError(s) => {
                write!(f, "Query error: {s}")
            }
            #[cfg(feature = "sqlite")]
            DataError::SqliteError(e) => {
                write!(f, "SQLite error: {e}")
            }
            DataError::ParseError(s) => {
                write!(f, "Parse error: {s}")
            }
            DataError::Cancelled => {
                write!(f, "Operation cancelled")
            }
        }
    }
}

impl std::error::Error for DataError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            #[cfg(feature = "sqlite")]
            DataError::SqliteError(e) => Some(e),
            _ => None,
        }
    }
}

impl DataError {
    /// True for [`DataError::NotFoundError`]
    pub fn is_not_found(&self) -> bool {
        matches!(self, DataError::NotFoundError(_))
    }

    /// True for [`DataError::InvalidStateError`]
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, DataError::InvalidStateError(_))
    }
}

#[cfg(feature = "sqlite")]
impl From<rusqlite::Error> for DataError {
    fn from(err: rusqlite::Error) -> Self {
        DataError::SqliteError(err)
    }
}

impl From<sea_query::error::Error> for DataError {
    fn from(err: sea_query::error::Error) -> Self {
        DataError::QueryExecutionError(err.to_string())
    }
}

impl From<serde_json::Error> for DataError {
    fn from(err: serde_json::Error) -> Self {
        DataError::ParseError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for DataError {
    fn from(err: tokio::task::JoinError) -> Self {
        DataError::QueryExecutionError(format!("driver task failed: {err}"))
    }
}

/// Crate result alias
pub type Result<T> = std::result::Result<T, DataError>;
