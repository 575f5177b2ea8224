//! Driver boundary.
//!
//! [`Connection`] is the seam between the data access layer and a concrete
//! database driver: open/close, transaction begin/commit/rollback and
//! parameterized execution. Statements arrive already compiled for the
//! driver's dialect as a [`Statement`].

use crate::error::{DataError, Result};
use crate::row::Row;
use async_trait::async_trait;
use sea_query::{Value, Values};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use tokio_util::sync::CancellationToken;

/// Compiled SQL text plus its positional parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub values: Vec<Value>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            values,
        }
    }
}

impl From<(String, Values)> for Statement {
    fn from((sql, values): (String, Values)) -> Self {
        Self {
            sql,
            values: values.0,
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Transaction isolation level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    /// Read uncommitted
    ReadUncommitted,
    /// Read committed (default)
    #[default]
    ReadCommitted,
    /// Repeatable read
    RepeatableRead,
    /// Serializable
    Serializable,
}

impl IsolationLevel {
    /// SQL spelling, as used in `SET TRANSACTION ISOLATION LEVEL ...`
    pub fn to_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

impl FromStr for IsolationLevel {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "read_uncommitted" => Ok(IsolationLevel::ReadUncommitted),
            "read_committed" => Ok(IsolationLevel::ReadCommitted),
            "repeatable_read" => Ok(IsolationLevel::RepeatableRead),
            "serializable" => Ok(IsolationLevel::Serializable),
            _ => Err(DataError::InvalidStateError(format!(
                "unknown isolation level `{s}`"
            ))),
        }
    }
}

/// Handle to an open transaction on a [`Connection`]
///
/// The handle only identifies the transaction; the driver owns the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    id: u64,
    isolation: IsolationLevel,
}

impl Transaction {
    /// Drivers mint handles with a per-connection unique id.
    pub fn new(id: u64, isolation: IsolationLevel) -> Self {
        Self { id, isolation }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }
}

/// A database connection as seen by the data access layer
///
/// Implementations must be usable from any task; all methods take `&self`.
/// Calls on one connection are expected to be serialized by the caller.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Open the connection. Opening an open connection is a no-op.
    async fn open(&self) -> Result<()>;

    /// Close the connection. Closing a closed connection is a no-op.
    async fn close(&self) -> Result<()>;

    fn is_open(&self) -> bool;

    /// Start a transaction on the open connection.
    async fn begin(&self, isolation: IsolationLevel) -> Result<Transaction>;

    async fn commit(&self, transaction: &Transaction) -> Result<()>;

    async fn rollback(&self, transaction: &Transaction) -> Result<()>;

    /// Run a statement, returning the number of affected rows.
    async fn execute(
        &self,
        statement: &Statement,
        transaction: Option<&Transaction>,
        cancel: &CancellationToken,
    ) -> Result<u64>;

    /// Run a statement, returning its rows.
    async fn query(
        &self,
        statement: &Statement,
        transaction: Option<&Transaction>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>>;
}

/// Run `fut` unless `cancel` fires first.
pub async fn cancellable<F, T>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    if cancel.is_cancelled() {
        return Err(DataError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DataError::Cancelled),
        res = fut => res,
    }
}
