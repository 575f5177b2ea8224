//! Dialect context: one connection, one dialect, at most one transaction.
//!
//! Every repository and unit of work built over the same [`DbContext`]
//! shares its transaction handle. The unit of work is the only writer of
//! that handle; repositories only read it, so any call made while a
//! transaction is active runs inside it.
//!
//! The context does not serialize callers. The handle sits behind a lock
//! only so that reads and writes are memory safe; tasks sharing a context
//! must order their own calls (typically by awaiting them in sequence).

use crate::config::DatabaseConfig;
use crate::connection::{Connection, Statement, Transaction};
use crate::dialect::{Compiler, Dialect};
use crate::error::{DataError, Result};
use crate::row::Row;
use std::str::FromStr;
use std::sync::{Arc, RwLock};
use std::time::Instant;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use tracing::Instrument;

pub struct DbContext {
    connection: Arc<dyn Connection>,
    compiler: Compiler,
    transaction: RwLock<Option<Transaction>>,
}

fn poisoned() -> DataError {
    DataError::InvalidStateError("transaction handle lock poisoned".to_string())
}

impl DbContext {
    pub fn new(connection: Arc<dyn Connection>, dialect: Dialect) -> Self {
        Self {
            connection,
            compiler: Compiler::new(dialect),
            transaction: RwLock::new(None),
        }
    }

    /// Bind `connection` to the dialect named `dialect`.
    ///
    /// # Errors
    ///
    /// [`DataError::UnsupportedDialectError`] for names outside the supported set.
    pub fn create(connection: Arc<dyn Connection>, dialect: &str) -> Result<Self> {
        Ok(Self::new(connection, Dialect::from_str(dialect)?))
    }

    /// Bind `connection` to the dialect named in `config`.
    pub fn from_config(connection: Arc<dyn Connection>, config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::new(connection, config.dialect()?))
    }

    pub fn dialect(&self) -> Dialect {
        self.compiler.dialect()
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// The active transaction, if any.
    pub fn transaction(&self) -> Result<Option<Transaction>> {
        Ok(self.transaction.read().map_err(|_| poisoned())?.clone())
    }

    pub(crate) fn set_transaction(&self, transaction: Option<Transaction>) -> Result<()> {
        *self.transaction.write().map_err(|_| poisoned())? = transaction;
        Ok(())
    }

    pub(crate) fn take_transaction(&self) -> Result<Option<Transaction>> {
        Ok(self.transaction.write().map_err(|_| poisoned())?.take())
    }

    /// Run a statement for its affected-row count.
    pub async fn execute(&self, statement: &Statement, cancel: &CancellationToken) -> Result<u64> {
        let transaction = self.transaction()?;
        let connection = &self.connection;
        self.scoped(statement, transaction.is_some(), async {
            connection
                .execute(statement, transaction.as_ref(), cancel)
                .await
        })
        .await
    }

    /// Run a statement for its rows.
    pub async fn query(&self, statement: &Statement, cancel: &CancellationToken) -> Result<Vec<Row>> {
        let transaction = self.transaction()?;
        let connection = &self.connection;
        self.scoped(statement, transaction.is_some(), async {
            connection
                .query(statement, transaction.as_ref(), cancel)
                .await
        })
        .await
    }

    /// Outside a transaction, open a closed connection for the duration of
    /// one call and close it again afterwards.
    async fn scoped<T, F>(&self, statement: &Statement, in_transaction: bool, call: F) -> Result<T>
    where
        F: std::future::Future<Output = Result<T>>,
    {
        let borrow_connection = !in_transaction && !self.connection.is_open();
        if borrow_connection {
            self.connection.open().await?;
        }

        let start = Instant::now();
        #[cfg(feature = "tracing")]
        let res = call
            .instrument(tracing_helpers::execute_query_span(&statement.sql))
            .await;
        #[cfg(not(feature = "tracing"))]
        let res = call.await;

        #[cfg(feature = "metrics")]
        METRICS.record_query(start.elapsed());
        log::trace!("{} finished in {:?}", statement.sql, start.elapsed());

        if borrow_connection {
            if let Err(e) = self.connection.close().await {
                log::warn!("failed to close connection after statement: {e}");
                if res.is_ok() {
                    return Err(e);
                }
            }
        }
        res
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::IsolationLevel;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    #[derive(Default)]
    struct Recording {
        open: AtomicBool,
        opens: AtomicUsize,
        closes: AtomicUsize,
        saw_transaction: AtomicBool,
    }

    #[async_trait]
    impl Connection for Recording {
        async fn open(&self) -> Result<()> {
            self.open.store(true, Ordering::SeqCst);
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        async fn close(&self) -> Result<()> {
            self.open.store(false, Ordering::SeqCst);
            self.closes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
        fn is_open(&self) -> bool {
            self.open.load(Ordering::SeqCst)
        }
        async fn begin(&self, isolation: IsolationLevel) -> Result<Transaction> {
            Ok(Transaction::new(1, isolation))
        }
        async fn commit(&self, _: &Transaction) -> Result<()> {
            Ok(())
        }
        async fn rollback(&self, _: &Transaction) -> Result<()> {
            Ok(())
        }
        async fn execute(
            &self,
            _: &Statement,
            transaction: Option<&Transaction>,
            _: &CancellationToken,
        ) -> Result<u64> {
            self.saw_transaction
                .store(transaction.is_some(), Ordering::SeqCst);
            Ok(1)
        }
        async fn query(
            &self,
            _: &Statement,
            _: Option<&Transaction>,
            _: &CancellationToken,
        ) -> Result<Vec<Row>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_create_rejects_unknown_dialect() {
        let conn: Arc<dyn Connection> = Arc::new(Recording::default());
        assert!(matches!(
            DbContext::create(conn.clone(), "informix"),
            Err(DataError::UnsupportedDialectError(_))
        ));
        let ctx = DbContext::create(conn, "postgres").unwrap();
        assert_eq!(ctx.dialect(), Dialect::Postgres);
    }

    #[tokio::test]
    async fn test_closed_connection_is_borrowed_per_call() {
        let recording = Arc::new(Recording::default());
        let ctx = DbContext::new(recording.clone(), Dialect::Sqlite);
        let stmt = Statement::new("DELETE FROM t", vec![]);
        ctx.execute(&stmt, &CancellationToken::new()).await.unwrap();
        assert_eq!(recording.opens.load(Ordering::SeqCst), 1);
        assert_eq!(recording.closes.load(Ordering::SeqCst), 1);
        assert!(!recording.saw_transaction.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_active_transaction_is_passed_through() {
        let recording = Arc::new(Recording::default());
        let ctx = DbContext::new(recording.clone(), Dialect::Sqlite);
        recording.open().await.unwrap();
        ctx.set_transaction(Some(Transaction::new(9, IsolationLevel::default())))
            .unwrap();
        let stmt = Statement::new("DELETE FROM t", vec![]);
        ctx.execute(&stmt, &CancellationToken::new()).await.unwrap();
        assert!(recording.saw_transaction.load(Ordering::SeqCst));
        assert_eq!(recording.closes.load(Ordering::SeqCst), 0);
    }
}
