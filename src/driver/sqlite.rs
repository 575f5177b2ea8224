//! Bundled SQLite driver.
//!
//! `rusqlite` is blocking, so every call runs on tokio's blocking pool
//! against a connection shared behind a mutex. Cancelling an in-flight call
//! interrupts the running statement through SQLite's interrupt handle and
//! waits for the blocking task to unwind before returning
//! [`DataError::Cancelled`].
//!
//! An in-memory database (`:memory:`) loses its contents when the connection
//! closes, and the data access layer closes connections between
//! non-transactional calls; use a file path for anything beyond a single
//! unit of work.

use crate::config::DatabaseConfig;
use crate::connection::{Connection, IsolationLevel, Statement, Transaction};
use crate::dialect::Dialect;
use crate::driver::coercion::{from_sqlite, to_sqlite_params};
use crate::error::{DataError, Result};
use crate::row::Row;
use async_trait::async_trait;
use rusqlite::params_from_iter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;

type Shared = Arc<Mutex<Option<rusqlite::Connection>>>;

/// SQLite implementation of [`Connection`]
pub struct SqliteConnection {
    path: PathBuf,
    conn: Shared,
    interrupt: Mutex<Option<Arc<rusqlite::InterruptHandle>>>,
    open: AtomicBool,
    next_transaction: AtomicU64,
    active_transaction: Mutex<Option<u64>>,
}

fn poisoned() -> DataError {
    DataError::QueryExecutionError("sqlite connection lock poisoned".to_string())
}

fn closed() -> DataError {
    DataError::InvalidStateError("sqlite connection is closed".to_string())
}

impl SqliteConnection {
    /// A closed connection to the database file at `path`.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            conn: Arc::new(Mutex::new(None)),
            interrupt: Mutex::new(None),
            open: AtomicBool::new(false),
            next_transaction: AtomicU64::new(1),
            active_transaction: Mutex::new(None),
        }
    }

    /// A closed connection to the database named by `config.url`.
    ///
    /// The url is a file path, optionally prefixed with `sqlite://`.
    pub fn from_config(config: &DatabaseConfig) -> Result<Self> {
        let dialect = config.dialect()?;
        if dialect != Dialect::Sqlite {
            return Err(DataError::UnsupportedDialectError(format!(
                "{} (configured for the sqlite driver)",
                config.dialect
            )));
        }
        let path = config.url.strip_prefix("sqlite://").unwrap_or(&config.url);
        if path.is_empty() {
            return Err(DataError::InvalidStateError(
                "database url is empty".to_string(),
            ));
        }
        Ok(Self::new(path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run a batch of `;`-separated statements without parameters
    /// (schema setup, pragmas). Opens and closes the connection around the
    /// batch if it is not already open.
    pub async fn execute_script(&self, sql: &str, cancel: &CancellationToken) -> Result<()> {
        let was_open = self.is_open();
        if !was_open {
            self.open().await?;
        }
        let sql = sql.to_string();
        let res = self
            .run(cancel, move |conn| conn.execute_batch(&sql).map_err(DataError::from))
            .await;
        if !was_open {
            self.close().await?;
        }
        res
    }

    fn interrupt_handle(&self) -> Option<Arc<rusqlite::InterruptHandle>> {
        self.interrupt
            .lock()
            .ok()
            .and_then(|h| h.as_ref().map(Arc::clone))
    }

    fn check_transaction(&self, transaction: Option<&Transaction>) -> Result<()> {
        let Some(transaction) = transaction else {
            return Ok(());
        };
        let active = *self.active_transaction.lock().map_err(|_| poisoned())?;
        if active == Some(transaction.id()) {
            Ok(())
        } else {
            Err(DataError::InvalidStateError(format!(
                "transaction {} is not active on this connection",
                transaction.id()
            )))
        }
    }

    async fn run<T, F>(&self, cancel: &CancellationToken, f: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        if cancel.is_cancelled() {
            return Err(DataError::Cancelled);
        }
        let shared = Arc::clone(&self.conn);
        let mut task = tokio::task::spawn_blocking(move || {
            let guard = shared.lock().map_err(|_| poisoned())?;
            let conn = guard.as_ref().ok_or_else(closed)?;
            f(conn)
        });

        tokio::select! {
            res = &mut task => res?,
            _ = cancel.cancelled() => {
                if let Some(handle) = self.interrupt_handle() {
                    handle.interrupt();
                }
                if let Err(e) = task.await {
                    log::warn!("sqlite task failed after interrupt: {e}");
                }
                Err(DataError::Cancelled)
            }
        }
    }

    async fn finish_transaction(&self, transaction: &Transaction, sql: &'static str) -> Result<()> {
        self.check_transaction(Some(transaction))?;
        self.run(&CancellationToken::new(), move |conn| {
            conn.execute_batch(sql).map_err(DataError::from)
        })
        .await?;
        *self.active_transaction.lock().map_err(|_| poisoned())? = None;
        Ok(())
    }
}

#[async_trait]
impl Connection for SqliteConnection {
    async fn open(&self) -> Result<()> {
        if self.is_open() {
            return Ok(());
        }
        let path = self.path.clone();
        let conn = tokio::task::spawn_blocking(move || rusqlite::Connection::open(path)).await??;
        let handle = Arc::new(conn.get_interrupt_handle());
        *self.conn.lock().map_err(|_| poisoned())? = Some(conn);
        *self.interrupt.lock().map_err(|_| poisoned())? = Some(handle);
        self.open.store(true, Ordering::SeqCst);
        log::debug!("opened sqlite database {}", self.path.display());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        if !self.is_open() {
            return Ok(());
        }
        let conn = self.conn.lock().map_err(|_| poisoned())?.take();
        *self.interrupt.lock().map_err(|_| poisoned())? = None;
        *self.active_transaction.lock().map_err(|_| poisoned())? = None;
        self.open.store(false, Ordering::SeqCst);
        if let Some(conn) = conn {
            tokio::task::spawn_blocking(move || conn.close().map_err(|(_, e)| DataError::from(e)))
                .await??;
        }
        log::debug!("closed sqlite database {}", self.path.display());
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    async fn begin(&self, isolation: IsolationLevel) -> Result<Transaction> {
        if !self.is_open() {
            return Err(closed());
        }
        if self.active_transaction.lock().map_err(|_| poisoned())?.is_some() {
            return Err(DataError::InvalidStateError(
                "a transaction is already active on this connection".to_string(),
            ));
        }
        // SQLite is serializable throughout; the level only picks when the write lock is taken.
        let sql = match isolation {
            IsolationLevel::ReadUncommitted | IsolationLevel::ReadCommitted => "BEGIN DEFERRED",
            IsolationLevel::RepeatableRead | IsolationLevel::Serializable => "BEGIN IMMEDIATE",
        };
        self.run(&CancellationToken::new(), move |conn| {
            conn.execute_batch(sql).map_err(DataError::from)
        })
        .await?;
        let id = self.next_transaction.fetch_add(1, Ordering::SeqCst);
        *self.active_transaction.lock().map_err(|_| poisoned())? = Some(id);
        Ok(Transaction::new(id, isolation))
    }

    async fn commit(&self, transaction: &Transaction) -> Result<()> {
        self.finish_transaction(transaction, "COMMIT").await
    }

    async fn rollback(&self, transaction: &Transaction) -> Result<()> {
        self.finish_transaction(transaction, "ROLLBACK").await
    }

    async fn execute(
        &self,
        statement: &Statement,
        transaction: Option<&Transaction>,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        self.check_transaction(transaction)?;
        let sql = statement.sql.clone();
        let params = to_sqlite_params(&statement.values)?;
        self.run(cancel, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let affected = stmt.execute(params_from_iter(params.iter()))?;
            Ok(affected as u64)
        })
        .await
    }

    async fn query(
        &self,
        statement: &Statement,
        transaction: Option<&Transaction>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Row>> {
        self.check_transaction(transaction)?;
        let sql = statement.sql.clone();
        let params = to_sqlite_params(&statement.values)?;
        self.run(cancel, move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let (names, decl_types): (Vec<String>, Vec<Option<String>>) = stmt
                .columns()
                .iter()
                .map(|c| (c.name().to_string(), c.decl_type().map(str::to_string)))
                .unzip();
            let columns: Arc<[String]> = names.into();

            let mut rows = stmt.query(params_from_iter(params.iter()))?;
            let mut out = Vec::new();
            while let Some(row) = rows.next()? {
                let values = decl_types
                    .iter()
                    .enumerate()
                    .map(|(i, decl)| -> Result<serde_json::Value> {
                        Ok(from_sqlite(row.get_ref(i)?, decl.as_deref()))
                    })
                    .collect::<Result<Vec<_>>>()?;
                out.push(Row::new(Arc::clone(&columns), values));
            }
            Ok(out)
        })
        .await
    }
}
