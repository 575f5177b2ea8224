//! SQL emitted per dialect for the repository verbs

use tablekit::dialect::InsertReturning;
use tablekit::{Compiler, DataError, DatabaseConfig, DbContext, Dialect, Filter, Operator, QueryFilter};

#[test]
fn test_configured_dialect_is_validated() {
    let config = DatabaseConfig {
        dialect: "db2".to_string(),
        ..DatabaseConfig::default()
    };
    let connection = std::sync::Arc::new(NoConnection);
    assert!(matches!(
        DbContext::from_config(connection, &config),
        Err(DataError::UnsupportedDialectError(ref name)) if name == "db2"
    ));
}

#[test]
fn test_equality_filter_per_dialect() {
    let query = Filter::eq("email", "a@x.com").into_query::<Unkeyed>();
    let expected = [
        (Dialect::Postgres, r#"SELECT * FROM "users" WHERE "email" = $1"#),
        (Dialect::MySql, "SELECT * FROM `users` WHERE `email` = ?"),
        (Dialect::Sqlite, r#"SELECT * FROM "users" WHERE "email" = ?"#),
        (Dialect::SqlServer, r#"SELECT * FROM "users" WHERE "email" = @P1"#),
        (Dialect::Oracle, r#"SELECT * FROM "users" WHERE "email" = :1"#),
        (Dialect::Firebird, r#"SELECT * FROM "users" WHERE "email" = ?"#),
    ];
    for (dialect, sql) in expected {
        let stmt = Compiler::new(dialect).select("users", &query);
        assert_eq!(stmt.sql, sql, "{dialect}");
        assert_eq!(stmt.values.len(), 1);
    }
}

#[test]
fn test_ordered_window_on_fetch_dialects() {
    let query = QueryFilter::new()
        .where_op("age", Operator::Gte, 18)
        .order_by_asc("email")
        .limit(5);
    let stmt = Compiler::new(Dialect::SqlServer).select("users", &query);
    assert_eq!(
        stmt.sql,
        r#"SELECT * FROM "users" WHERE "age" >= @P1 ORDER BY "email" ASC OFFSET 0 ROWS FETCH NEXT 5 ROWS ONLY"#
    );

    let stmt = Compiler::new(Dialect::Firebird).select("users", &QueryFilter::new().offset(10));
    assert_eq!(stmt.sql, r#"SELECT * FROM "users" OFFSET 10 ROWS"#);
}

#[test]
fn test_count_over_fetch_window() {
    let query = QueryFilter::new().limit(2);
    let stmt = Compiler::new(Dialect::Oracle).count("users", &query);
    assert_eq!(
        stmt.sql,
        r#"SELECT COUNT(*) FROM (SELECT * FROM "users" OFFSET 0 ROWS FETCH NEXT 2 ROWS ONLY) count_subquery"#
    );
}

#[test]
fn test_sql_server_insert_returns_generated_id() {
    let plan = Compiler::new(Dialect::SqlServer)
        .insert_returning("notes", &["body"], vec!["hello".into()], "id")
        .unwrap();
    let InsertReturning::Row(stmt) = plan else {
        panic!("expected a single statement");
    };
    assert_eq!(
        stmt.sql,
        r#"INSERT INTO "notes" ("body") OUTPUT INSERTED."id" VALUES (@P1)"#
    );
}

#[test]
fn test_context_rejects_unsupported_dialect() {
    let connection = std::sync::Arc::new(NoConnection);
    assert!(matches!(
        DbContext::create(connection, "informix"),
        Err(DataError::UnsupportedDialectError(_))
    ));
}

struct Unkeyed;

impl tablekit::record::Record for Unkeyed {
    fn fields() -> &'static [tablekit::FieldDescriptor<Self>] {
        &[]
    }
}

struct NoConnection;

#[async_trait::async_trait]
impl tablekit::Connection for NoConnection {
    async fn open(&self) -> tablekit::Result<()> {
        Ok(())
    }
    async fn close(&self) -> tablekit::Result<()> {
        Ok(())
    }
    fn is_open(&self) -> bool {
        false
    }
    async fn begin(&self, isolation: tablekit::IsolationLevel) -> tablekit::Result<tablekit::Transaction> {
        Ok(tablekit::Transaction::new(1, isolation))
    }
    async fn commit(&self, _: &tablekit::Transaction) -> tablekit::Result<()> {
        Ok(())
    }
    async fn rollback(&self, _: &tablekit::Transaction) -> tablekit::Result<()> {
        Ok(())
    }
    async fn execute(
        &self,
        _: &tablekit::Statement,
        _: Option<&tablekit::Transaction>,
        _: &tokio_util::sync::CancellationToken,
    ) -> tablekit::Result<u64> {
        Ok(0)
    }
    async fn query(
        &self,
        _: &tablekit::Statement,
        _: Option<&tablekit::Transaction>,
        _: &tokio_util::sync::CancellationToken,
    ) -> tablekit::Result<Vec<tablekit::Row>> {
        Ok(Vec::new())
    }
}
