//! Generic repository over a (context, table, record type) triple.
//!
//! Every read verb takes a [`Filter`], so the four call shapes (no filter,
//! column equality, column/operator comparison and a caller-built
//! [`QueryFilter`]) all end up as one `QueryFilter` compiled by the
//! context's dialect. Every verb runs inside the context's active
//! transaction when a unit of work has begun one.
//!
//! All verbs have default bodies; a concrete repository implements
//! [`Repository::context`] and [`Repository::table`] and overrides only
//! what it needs to specialize.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tablekit::{DbContext, Dialect, Filter, Record, Repository, SqliteConnection, TableRepository};
//! use tokio_util::sync::CancellationToken;
//! use uuid::Uuid;
//!
//! #[derive(Record, serde::Deserialize)]
//! #[table_name = "users"]
//! struct User {
//!     #[auto_uuid]
//!     id: Uuid,
//!     email: String,
//! }
//!
//! # async fn run() -> tablekit::Result<()> {
//! let connection = Arc::new(SqliteConnection::new("app.db"));
//! let context = Arc::new(DbContext::new(connection, Dialect::Sqlite));
//! let users = TableRepository::<User>::for_record(context);
//! let cancel = CancellationToken::new();
//!
//! let id: Uuid = users
//!     .insert_get_id(&User { id: Uuid::nil(), email: "a@x.com".into() }, &cancel)
//!     .await?;
//! let user: User = users.first(Filter::id(id), &cancel).await?;
//! # Ok(())
//! # }
//! ```

use crate::context::DbContext;
use crate::dialect::InsertReturning;
use crate::error::{DataError, Result};
use crate::mapper::{compute_bulk_write_sets, compute_write_set, is_null};
use crate::pagination::{self, read_count, PaginationResult};
use crate::query::Filter;
use crate::record::{FieldDescriptor, Record, TableName, WritePolicy};
use crate::row::Row;
use async_trait::async_trait;
use sea_query::Value;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn identifier_field<R: Record>() -> Result<&'static FieldDescriptor<R>> {
    R::identifier_field().ok_or_else(|| {
        DataError::MappingError(format!(
            "identifier field `{}` not declared on {}",
            R::IDENTIFIER,
            std::any::type_name::<R>()
        ))
    })
}

fn decode_all<T: DeserializeOwned>(rows: &[Row]) -> Result<Vec<T>> {
    rows.iter().map(Row::decode::<T>).collect()
}

fn generated_id<K: DeserializeOwned>(value: Option<&Value>) -> Result<K> {
    match value {
        Some(Value::Uuid(Some(id))) => Ok(serde_json::from_value(serde_json::to_value(id)?)?),
        other => Err(DataError::MappingError(format!(
            "expected a generated UUID identifier, found {other:?}"
        ))),
    }
}

fn returned_id<K: DeserializeOwned>(rows: &[Row]) -> Result<K> {
    let value = rows
        .first()
        .and_then(|row| row.get_index(0))
        .ok_or_else(|| {
            DataError::QueryExecutionError("insert did not return an identifier".to_string())
        })?;
    Ok(serde_json::from_value(value.clone())?)
}

/// CRUD and query verbs for one record type stored in one table
#[async_trait]
pub trait Repository<R: Record>: Send + Sync {
    fn context(&self) -> &DbContext;

    fn table(&self) -> &str;

    /// Whether any row matches. Any window on the filter is ignored.
    async fn any(&self, filter: Filter, cancel: &CancellationToken) -> Result<bool> {
        let ctx = self.context();
        let query = filter.into_query::<R>().without_window();
        let rows = ctx
            .query(&ctx.compiler().exists(self.table(), &query), cancel)
            .await?;
        Ok(read_count(&rows)? > 0)
    }

    /// Number of matching rows. A window on the filter is respected, so this
    /// always equals `get(filter).len()`.
    async fn count(&self, filter: Filter, cancel: &CancellationToken) -> Result<u64> {
        let ctx = self.context();
        let query = filter.into_query::<R>();
        let rows = ctx
            .query(&ctx.compiler().count(self.table(), &query), cancel)
            .await?;
        read_count(&rows)
    }

    /// All matching rows, decoded into `T` (the record type or any projection).
    async fn get<T>(&self, filter: Filter, cancel: &CancellationToken) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let ctx = self.context();
        let query = filter.into_query::<R>();
        let rows = ctx
            .query(&ctx.compiler().select(self.table(), &query), cancel)
            .await?;
        decode_all(&rows)
    }

    /// Page `page` (1-based) of `take` rows plus the unbounded total.
    async fn get_pagination<T>(
        &self,
        filter: Filter,
        page: u64,
        take: u64,
        cancel: &CancellationToken,
    ) -> Result<PaginationResult<T>>
    where
        T: DeserializeOwned + Send,
    {
        let query = filter.into_query::<R>();
        pagination::paginate(self.context(), self.table(), &query, page, take, cancel).await
    }

    /// First matching row in the filter's order.
    ///
    /// # Errors
    ///
    /// [`DataError::NotFoundError`] when nothing matches.
    async fn first<T>(&self, filter: Filter, cancel: &CancellationToken) -> Result<T>
    where
        T: DeserializeOwned + Send,
    {
        self.first_or_default(filter, cancel).await?.ok_or_else(|| {
            DataError::NotFoundError(format!("no row in `{}` matches the filter", self.table()))
        })
    }

    /// First matching row in the filter's order, `None` when nothing matches.
    async fn first_or_default<T>(&self, filter: Filter, cancel: &CancellationToken) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        let ctx = self.context();
        let query = filter.into_query::<R>().limit(1);
        let rows = ctx
            .query(&ctx.compiler().select(self.table(), &query), cancel)
            .await?;
        rows.first().map(Row::decode::<T>).transpose()
    }

    /// Insert one row, identifier included (generated when `#[auto_uuid]`).
    async fn insert(&self, entity: &R, cancel: &CancellationToken) -> Result<u64> {
        let ctx = self.context();
        let write_set = compute_write_set(entity, true)?;
        let columns: Vec<&str> = write_set.columns().collect();
        let values = write_set.values().cloned().collect();
        let stmt = ctx.compiler().insert(self.table(), &columns, vec![values])?;
        ctx.execute(&stmt, cancel).await
    }

    /// Insert one row and return its identifier.
    ///
    /// An `#[auto_uuid]` identifier is generated locally and returned without
    /// a round trip. Any other identifier is left out of the insert and read
    /// back from the database.
    async fn insert_get_id<K>(&self, entity: &R, cancel: &CancellationToken) -> Result<K>
    where
        K: DeserializeOwned + Send,
    {
        let ctx = self.context();
        let compiler = ctx.compiler();

        if identifier_field::<R>()?.policy == WritePolicy::AutoGenerate {
            let write_set = compute_write_set(entity, true)?;
            let id = generated_id(write_set.get(R::IDENTIFIER))?;
            let columns: Vec<&str> = write_set.columns().collect();
            let values = write_set.values().cloned().collect();
            let stmt = compiler.insert(self.table(), &columns, vec![values])?;
            ctx.execute(&stmt, cancel).await?;
            return Ok(id);
        }

        let write_set = compute_write_set(entity, false)?;
        let columns: Vec<&str> = write_set.columns().collect();
        let values = write_set.values().cloned().collect();
        match compiler.insert_returning(self.table(), &columns, values, R::IDENTIFIER)? {
            InsertReturning::Row(stmt) => returned_id(&ctx.query(&stmt, cancel).await?),
            InsertReturning::FollowUp { insert, last_id } => {
                // The follow-up must run on the session that did the insert.
                let connection = ctx.connection();
                let borrowed = !connection.is_open();
                if borrowed {
                    connection.open().await?;
                }
                let res = async {
                    ctx.execute(&insert, cancel).await?;
                    returned_id(&ctx.query(&last_id, cancel).await?)
                }
                .await;
                if borrowed {
                    if let Err(e) = connection.close().await {
                        log::warn!("failed to close connection after insert: {e}");
                    }
                }
                res
            }
        }
    }

    /// Insert a batch in one statement; every item gets its own generated
    /// identifier. An empty batch is a no-op.
    async fn insert_many(&self, items: &[R], cancel: &CancellationToken) -> Result<u64> {
        let bulk = compute_bulk_write_sets(items)?;
        if bulk.is_empty() {
            return Ok(0);
        }
        let ctx = self.context();
        let stmt = ctx.compiler().insert(self.table(), &bulk.columns, bulk.rows)?;
        ctx.execute(&stmt, cancel).await
    }

    /// Write every non-identifier field to the row with the entity's identifier.
    ///
    /// # Errors
    ///
    /// [`DataError::MappingError`] if the identifier is missing or NULL.
    async fn update(&self, entity: &R, cancel: &CancellationToken) -> Result<u64> {
        let ctx = self.context();
        identifier_field::<R>()?;
        let id = entity
            .identifier_value()
            .filter(|id| !is_null(id))
            .ok_or_else(|| {
                DataError::MappingError(format!(
                    "cannot update {}: identifier `{}` is NULL",
                    std::any::type_name::<R>(),
                    R::IDENTIFIER
                ))
            })?;
        let write_set = compute_write_set(entity, false)?;
        let stmt = ctx
            .compiler()
            .update(self.table(), write_set.into_entries(), R::IDENTIFIER, id)?;
        ctx.execute(&stmt, cancel).await
    }

    /// Delete every matching row.
    async fn destroy(&self, filter: Filter, cancel: &CancellationToken) -> Result<u64> {
        let ctx = self.context();
        let query = filter.into_query::<R>();
        ctx.execute(&ctx.compiler().delete(self.table(), &query), cancel)
            .await
    }
}

/// Stock [`Repository`] with no specialized verbs
pub struct TableRepository<R> {
    context: Arc<DbContext>,
    table: String,
    _record: PhantomData<fn() -> R>,
}

impl<R: Record> TableRepository<R> {
    pub fn new(context: Arc<DbContext>, table: impl Into<String>) -> Self {
        Self {
            context,
            table: table.into(),
            _record: PhantomData,
        }
    }

    /// Repository over the record's `#[table_name]`.
    pub fn for_record(context: Arc<DbContext>) -> Self
    where
        R: TableName,
    {
        Self::new(context, R::TABLE_NAME)
    }
}

impl<R> Clone for TableRepository<R> {
    fn clone(&self) -> Self {
        Self {
            context: Arc::clone(&self.context),
            table: self.table.clone(),
            _record: PhantomData,
        }
    }
}

impl<R: Record> Repository<R> for TableRepository<R> {
    fn context(&self) -> &DbContext {
        &self.context
    }

    fn table(&self) -> &str {
        &self.table
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_generated_id_decodes_into_uuid_and_string() {
        let id = Uuid::new_v4();
        let value = Value::from(id);
        let as_uuid: Uuid = generated_id(Some(&value)).unwrap();
        assert_eq!(as_uuid, id);
        let as_text: String = generated_id(Some(&value)).unwrap();
        assert_eq!(as_text, id.to_string());
    }

    #[test]
    fn test_generated_id_rejects_non_uuid() {
        let err = generated_id::<Uuid>(Some(&Value::from(3i64))).unwrap_err();
        assert!(matches!(err, DataError::MappingError(_)));
        assert!(generated_id::<Uuid>(None).is_err());
    }

    #[test]
    fn test_returned_id_requires_a_row() {
        let err = returned_id::<i64>(&[]).unwrap_err();
        assert!(matches!(err, DataError::QueryExecutionError(_)));

        let row = Row::new(Arc::from(vec!["id".to_string()]), vec![serde_json::json!(42)]);
        assert_eq!(returned_id::<i64>(&[row]).unwrap(), 42);
    }
}
