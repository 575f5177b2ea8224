//! Fixtures for tests: temporary SQLite databases with a `users` table.
//!
//! Enabled for this crate's unit tests and, through the `test-helpers`
//! feature, for integration tests.

use crate::context::DbContext;
use crate::dialect::Dialect;
use crate::driver::SqliteConnection;
use crate::error::Result;
use crate::Record;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

pub const USERS_SCHEMA: &str = "(
    id TEXT PRIMARY KEY NOT NULL,
    role_id TEXT,
    email TEXT NOT NULL,
    password TEXT NOT NULL,
    two_factor BOOLEAN NOT NULL DEFAULT 0,
    tags JSON NOT NULL DEFAULT '[]',
    avatar BLOB,
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
)";

pub const NOTES_SCHEMA: &str = "(
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    body TEXT NOT NULL
)";

/// Row of the `users` fixture table
#[derive(Debug, Clone, PartialEq, Record, Serialize, Deserialize)]
#[table_name = "users"]
pub struct User {
    #[auto_uuid]
    pub id: Uuid,
    pub role_id: Option<Uuid>,
    pub email: String,
    pub password: String,
    pub two_factor: bool,
    #[json]
    pub tags: Vec<String>,
    pub avatar: Option<Vec<u8>>,
    #[skip_write]
    #[serde(default)]
    pub created_at: Option<String>,
}

impl User {
    pub fn new(email: &str) -> Self {
        Self {
            id: Uuid::nil(),
            role_id: None,
            email: email.to_string(),
            password: "secret".to_string(),
            two_factor: false,
            tags: Vec::new(),
            avatar: None,
            created_at: None,
        }
    }
}

/// Row of the `notes` fixture table, keyed by a server-generated integer
#[derive(Debug, Clone, PartialEq, Record, Serialize, Deserialize)]
#[table_name = "notes"]
pub struct Note {
    pub id: i64,
    pub body: String,
}

/// A database file in a temporary directory, removed on drop
pub struct TestDatabase {
    pub connection: Arc<SqliteConnection>,
    pub context: Arc<DbContext>,
    _dir: TempDir,
}

/// Create an empty database holding the `users` and `notes` tables.
pub async fn temp_database() -> Result<TestDatabase> {
    let dir = tempfile::tempdir()
        .map_err(|e| crate::DataError::QueryExecutionError(format!("tempdir: {e}")))?;
    let connection = Arc::new(SqliteConnection::new(dir.path().join("tablekit.db")));
    create_table(&connection, "users", USERS_SCHEMA).await?;
    create_table(&connection, "notes", NOTES_SCHEMA).await?;
    let context = Arc::new(DbContext::new(connection.clone(), Dialect::Sqlite));
    Ok(TestDatabase {
        connection,
        context,
        _dir: dir,
    })
}

pub async fn create_table(connection: &SqliteConnection, name: &str, schema: &str) -> Result<()> {
    let sql = format!("CREATE TABLE IF NOT EXISTS {name} {schema}");
    connection
        .execute_script(&sql, &CancellationToken::new())
        .await
}
