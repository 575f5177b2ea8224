//! SQL dialects.
//!
//! The supported set is closed: anything else parses to
//! [`DataError::UnsupportedDialectError`].

pub mod builders;
pub mod compiler;

use crate::error::DataError;
use std::fmt;
use std::str::FromStr;

pub use builders::{FirebirdQueryBuilder, OracleQueryBuilder, SqlServerQueryBuilder};
pub use compiler::{Compiler, InsertReturning};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    Postgres,
    MySql,
    SqlServer,
    Sqlite,
    Oracle,
    Firebird,
}

impl Dialect {
    pub const ALL: [Dialect; 6] = [
        Dialect::Postgres,
        Dialect::MySql,
        Dialect::SqlServer,
        Dialect::Sqlite,
        Dialect::Oracle,
        Dialect::Firebird,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::SqlServer => "sqlserver",
            Dialect::Sqlite => "sqlite",
            Dialect::Oracle => "oracle",
            Dialect::Firebird => "firebird",
        }
    }

    /// Whether the dialect windows results with `LIMIT`/`OFFSET`
    /// rather than `OFFSET ... ROWS FETCH NEXT ... ROWS ONLY`.
    pub fn uses_limit_offset(&self) -> bool {
        matches!(self, Dialect::Postgres | Dialect::MySql | Dialect::Sqlite)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dialect {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "npgsql" => Ok(Dialect::Postgres),
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "sqlserver" | "mssql" => Ok(Dialect::SqlServer),
            "sqlite" => Ok(Dialect::Sqlite),
            "oracle" => Ok(Dialect::Oracle),
            "firebird" => Ok(Dialect::Firebird),
            _ => Err(DataError::UnsupportedDialectError(s.to_string())),
        }
    }
}
