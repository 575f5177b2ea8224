//! Query compiler: turns a table name plus a [`QueryFilter`] (or a write
//! set) into dialect-correct SQL with positional parameters.
//!
//! Counting wraps the select in a subquery the same way for every dialect:
//!
//! ```text
//! SELECT COUNT(*) FROM (<select without ORDER BY>) count_subquery
//! ```
//!
//! The inner select keeps its window, so a count over a limited query
//! counts at most `limit` rows. Callers that want the unbounded total pass
//! [`QueryFilter::without_window`].

use crate::connection::Statement;
use crate::dialect::builders::{FirebirdQueryBuilder, OracleQueryBuilder, SqlServerQueryBuilder};
use crate::dialect::Dialect;
use crate::error::{DataError, Result};
use crate::query::QueryFilter;
use sea_query::{
    Alias, ConditionalStatement, Expr, MysqlQueryBuilder, PostgresQueryBuilder, Query,
    QueryBuilder, SimpleExpr, SqliteQueryBuilder, Value,
};

/// Stand-in upper bound for offset-only windows on dialects whose `OFFSET`
/// requires a `LIMIT`.
const UNBOUNDED_LIMIT: u64 = i64::MAX as u64;

const COUNT_ALIAS: &str = "count_subquery";

/// How an insert hands back its generated identifier
#[derive(Debug, Clone, PartialEq)]
pub enum InsertReturning {
    /// The insert itself returns a row holding the identifier
    Row(Statement),
    /// Run the insert, then query the identifier with a follow-up statement
    FollowUp { insert: Statement, last_id: Statement },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Compiler {
    dialect: Dialect,
}

impl Compiler {
    pub fn new(dialect: Dialect) -> Self {
        Self { dialect }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn builder(&self) -> Box<dyn QueryBuilder> {
        match self.dialect {
            Dialect::Postgres => Box::new(PostgresQueryBuilder),
            Dialect::MySql => Box::new(MysqlQueryBuilder),
            Dialect::Sqlite => Box::new(SqliteQueryBuilder),
            Dialect::SqlServer => Box::new(SqlServerQueryBuilder),
            Dialect::Oracle => Box::new(OracleQueryBuilder),
            Dialect::Firebird => Box::new(FirebirdQueryBuilder),
        }
    }

    fn finish(&self, statement: Statement) -> Statement {
        log::debug!("[{}] {}", self.dialect, statement.sql);
        statement
    }

    /// `SELECT` with the query's projection, predicate, ordering and window.
    pub fn select(&self, table: &str, query: &QueryFilter) -> Statement {
        let mut select = query.select_statement(table);
        let (limit, offset) = (query.get_limit(), query.get_offset());

        if self.dialect.uses_limit_offset() {
            match (limit, offset) {
                (Some(limit), _) => {
                    select.limit(limit);
                }
                (None, Some(_)) => {
                    select.limit(UNBOUNDED_LIMIT);
                }
                (None, None) => {}
            }
            if let Some(offset) = offset {
                select.offset(offset);
            }
            return self.finish(select.build_any(self.builder().as_ref()).into());
        }

        let (mut sql, values) = select.build_any(self.builder().as_ref());
        if limit.is_some() || offset.is_some() {
            if self.dialect == Dialect::SqlServer && !query.has_order() {
                sql.push_str(" ORDER BY (SELECT NULL)");
            }
            sql.push_str(&format!(" OFFSET {} ROWS", offset.unwrap_or(0)));
            if let Some(limit) = limit {
                sql.push_str(&format!(" FETCH NEXT {limit} ROWS ONLY"));
            }
        }
        self.finish(Statement::new(sql, values.0))
    }

    /// `SELECT COUNT(*)` over the query with its ordering stripped.
    pub fn count(&self, table: &str, query: &QueryFilter) -> Statement {
        let inner = self.select(table, &query.without_order());
        self.finish(Statement::new(
            format!("SELECT COUNT(*) FROM ({}) {COUNT_ALIAS}", inner.sql),
            inner.values,
        ))
    }

    /// Count of at most one row: non-zero iff the query matches anything.
    pub fn exists(&self, table: &str, query: &QueryFilter) -> Statement {
        self.count(table, &query.clone().limit(1))
    }

    /// Multi-row `INSERT` with a shared column list.
    pub fn insert(&self, table: &str, columns: &[&str], rows: Vec<Vec<Value>>) -> Result<Statement> {
        if columns.is_empty() {
            return Err(DataError::MappingError(format!(
                "no writable columns for insert into `{table}`"
            )));
        }
        let mut insert = Query::insert();
        insert
            .into_table(Alias::new(table))
            .columns(columns.iter().map(|c| Alias::new(*c)));
        for row in rows {
            insert.values(row.into_iter().map(SimpleExpr::Value))?;
        }
        Ok(self.finish(insert.build_any(self.builder().as_ref()).into()))
    }

    /// Single-row `INSERT` that hands back the server-generated `id_column`.
    pub fn insert_returning(
        &self,
        table: &str,
        columns: &[&str],
        values: Vec<Value>,
        id_column: &str,
    ) -> Result<InsertReturning> {
        match self.dialect {
            Dialect::Oracle => Err(DataError::QueryExecutionError(
                "server-generated identifiers are not supported for oracle".to_string(),
            )),
            Dialect::MySql => {
                let insert = self.insert(table, columns, vec![values])?;
                let last_id = Statement::new("SELECT LAST_INSERT_ID()", Vec::new());
                Ok(InsertReturning::FollowUp { insert, last_id })
            }
            _ => {
                if columns.is_empty() {
                    return Err(DataError::MappingError(format!(
                        "no writable columns for insert into `{table}`"
                    )));
                }
                let mut insert = Query::insert();
                insert
                    .into_table(Alias::new(table))
                    .columns(columns.iter().map(|c| Alias::new(*c)))
                    .values(values.into_iter().map(SimpleExpr::Value))?;
                insert.returning_col(Alias::new(id_column));
                Ok(InsertReturning::Row(
                    self.finish(insert.build_any(self.builder().as_ref()).into()),
                ))
            }
        }
    }

    /// `UPDATE` of the row whose `id_column` equals `id`.
    pub fn update(
        &self,
        table: &str,
        set: Vec<(&str, Value)>,
        id_column: &str,
        id: Value,
    ) -> Result<Statement> {
        if set.is_empty() {
            return Err(DataError::MappingError(format!(
                "no writable columns for update of `{table}`"
            )));
        }
        let mut update = Query::update();
        update.table(Alias::new(table));
        for (column, value) in set {
            update.value(Alias::new(column), value);
        }
        update.and_where(Expr::col(Alias::new(id_column)).eq(id));
        Ok(self.finish(update.build_any(self.builder().as_ref()).into()))
    }

    /// `DELETE` of every row matching the query's predicate. Projection,
    /// ordering and window do not apply.
    pub fn delete(&self, table: &str, query: &QueryFilter) -> Statement {
        let mut delete = Query::delete();
        delete.from_table(Alias::new(table));
        if !query.condition().is_empty() {
            delete.cond_where(query.condition().clone());
        }
        self.finish(delete.build_any(self.builder().as_ref()).into())
    }
}
