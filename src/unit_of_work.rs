//! Unit of work: brackets repository calls in one transaction.
//!
//! The unit of work is the only writer of the context's transaction handle.
//! It moves between two states:
//!
//! - no transaction: [`UnitOfWork::begin_transaction`] opens the connection,
//!   begins a transaction and stores the handle on the context;
//! - in a transaction: [`UnitOfWork::save_changes`] commits and
//!   [`UnitOfWork::discard_changes`] rolls back. Both clear the handle and
//!   close the connection, whether or not the commit/rollback succeeded.
//!
//! Misuse in either direction is an [`DataError::InvalidStateError`].
//!
//! The cancellation token is only observed before a commit starts; a
//! cancelled save rolls back instead. Once issued, commit and rollback run
//! to completion and their real outcome is returned.

use crate::config::DatabaseConfig;
use crate::connection::{IsolationLevel, Transaction};
use crate::context::DbContext;
use crate::error::{DataError, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[cfg(feature = "tracing")]
use crate::metrics::tracing_helpers;
#[cfg(feature = "metrics")]
use crate::metrics::METRICS;
#[cfg(feature = "tracing")]
use tracing::Instrument;

pub struct UnitOfWork {
    context: Arc<DbContext>,
    isolation: IsolationLevel,
}

#[derive(Clone, Copy)]
enum Outcome {
    Commit,
    Rollback,
}

impl Outcome {
    fn as_str(self) -> &'static str {
        match self {
            Outcome::Commit => "commit",
            Outcome::Rollback => "rollback",
        }
    }
}

impl UnitOfWork {
    pub fn new(context: Arc<DbContext>) -> Self {
        Self::with_isolation(context, IsolationLevel::default())
    }

    pub fn with_isolation(context: Arc<DbContext>, isolation: IsolationLevel) -> Self {
        Self { context, isolation }
    }

    /// Unit of work using the configured default isolation level.
    pub fn from_config(context: Arc<DbContext>, config: &DatabaseConfig) -> Result<Self> {
        Ok(Self::with_isolation(context, config.isolation_level()?))
    }

    pub fn context(&self) -> &Arc<DbContext> {
        &self.context
    }

    pub fn isolation_level(&self) -> IsolationLevel {
        self.isolation
    }

    /// True while a transaction handle exists and its connection is open.
    pub fn is_in_transaction(&self) -> bool {
        matches!(self.context.transaction(), Ok(Some(_))) && self.context.connection().is_open()
    }

    /// Open the connection and begin a transaction.
    ///
    /// # Errors
    ///
    /// [`DataError::InvalidStateError`] if a transaction is already active; the
    /// active transaction is left untouched.
    pub async fn begin_transaction(&self, cancel: &CancellationToken) -> Result<()> {
        if self.context.transaction()?.is_some() {
            return Err(DataError::InvalidStateError(
                "a transaction is already active on this context".to_string(),
            ));
        }

        let connection = self.context.connection();
        let opened_here = !connection.is_open();
        let begin = async {
            if opened_here {
                connection.open().await?;
            }
            connection.begin(self.isolation).await
        };
        #[cfg(feature = "tracing")]
        let begin = begin.instrument(tracing_helpers::begin_transaction_span(self.isolation.to_sql()));

        let transaction = match crate::connection::cancellable(cancel, begin).await {
            Ok(transaction) => transaction,
            Err(e) => {
                if opened_here {
                    if let Err(close) = connection.close().await {
                        log::warn!("failed to close connection after failed begin: {close}");
                    }
                }
                return Err(e);
            }
        };
        log::debug!(
            "began transaction {} ({})",
            transaction.id(),
            self.isolation.to_sql()
        );
        self.context.set_transaction(Some(transaction))
    }

    /// Commit the active transaction and close the connection.
    pub async fn save_changes(&self, cancel: &CancellationToken) -> Result<()> {
        self.finish(Outcome::Commit, cancel).await
    }

    /// Roll back the active transaction and close the connection.
    pub async fn discard_changes(&self, cancel: &CancellationToken) -> Result<()> {
        self.finish(Outcome::Rollback, cancel).await
    }

    async fn finish(&self, outcome: Outcome, cancel: &CancellationToken) -> Result<()> {
        let transaction = self.context.take_transaction()?.ok_or_else(|| {
            DataError::InvalidStateError(format!(
                "{} requested with no active transaction",
                outcome.as_str()
            ))
        })?;

        let res = self.end(&transaction, outcome, cancel).await;
        match &res {
            Ok(()) => log::debug!("{} of transaction {}", outcome.as_str(), transaction.id()),
            Err(e) => log::warn!(
                "{} of transaction {} failed: {e}",
                outcome.as_str(),
                transaction.id()
            ),
        }
        #[cfg(feature = "metrics")]
        METRICS.record_transaction(if res.is_ok() { outcome.as_str() } else { "error" });

        let closed = self.context.connection().close().await;
        if let Err(e) = &closed {
            log::warn!("failed to close connection after {}: {e}", outcome.as_str());
        }
        res.and(closed)
    }

    async fn end(
        &self,
        transaction: &Transaction,
        outcome: Outcome,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let connection = self.context.connection();
        match outcome {
            Outcome::Commit if cancel.is_cancelled() => {
                log::debug!(
                    "save of transaction {} cancelled before commit, rolling back",
                    transaction.id()
                );
                let rollback = connection.rollback(transaction);
                #[cfg(feature = "tracing")]
                let rollback = rollback.instrument(tracing_helpers::rollback_transaction_span());
                rollback.await?;
                Err(DataError::Cancelled)
            }
            Outcome::Commit => {
                let commit = connection.commit(transaction);
                #[cfg(feature = "tracing")]
                let commit = commit.instrument(tracing_helpers::commit_transaction_span());
                commit.await
            }
            Outcome::Rollback => {
                let rollback = connection.rollback(transaction);
                #[cfg(feature = "tracing")]
                let rollback = rollback.instrument(tracing_helpers::rollback_transaction_span());
                rollback.await
            }
        }
    }
}
