//! The filter shapes every repository verb accepts.
//!
//! One verb per operation takes a [`Filter`]; the equality and comparison
//! shapes are convenience constructors that lower to a [`QueryFilter`].

use crate::error::DataError;
use crate::query::select::QueryFilter;
use crate::record::Record;
use sea_query::{BinOper, Value};
use std::fmt;
use std::str::FromStr;

/// Comparison operator for `(column, operator, value)` filters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    NotEq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    NotLike,
}

impl Operator {
    pub(crate) fn bin_oper(self) -> BinOper {
        match self {
            Operator::Eq => BinOper::Equal,
            Operator::NotEq => BinOper::NotEqual,
            Operator::Gt => BinOper::GreaterThan,
            Operator::Gte => BinOper::GreaterThanOrEqual,
            Operator::Lt => BinOper::SmallerThan,
            Operator::Lte => BinOper::SmallerThanOrEqual,
            Operator::Like => BinOper::Like,
            Operator::NotLike => BinOper::NotLike,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "<>",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Like => "like",
            Operator::NotLike => "not like",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = DataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        match normalized.as_str() {
            "=" | "==" => Ok(Operator::Eq),
            "<>" | "!=" => Ok(Operator::NotEq),
            ">" => Ok(Operator::Gt),
            ">=" => Ok(Operator::Gte),
            "<" => Ok(Operator::Lt),
            "<=" => Ok(Operator::Lte),
            "like" => Ok(Operator::Like),
            "not like" => Ok(Operator::NotLike),
            _ => Err(DataError::QueryExecutionError(format!(
                "unknown comparison operator `{s}`"
            ))),
        }
    }
}

/// Which rows a repository verb applies to
#[derive(Debug, Clone, Default)]
pub enum Filter {
    /// Every row
    #[default]
    All,
    /// Row whose identifier column equals the value
    Id(Value),
    /// `column <op> value`
    Compare {
        column: String,
        op: Operator,
        value: Value,
    },
    /// Caller-built filter/query object, passed through as is
    Query(QueryFilter),
}

impl Filter {
    pub fn all() -> Self {
        Filter::All
    }

    pub fn id<V: Into<Value>>(id: V) -> Self {
        Filter::Id(id.into())
    }

    /// `column = value`
    pub fn eq<V: Into<Value>>(column: &str, value: V) -> Self {
        Self::compare(column, Operator::Eq, value)
    }

    pub fn compare<V: Into<Value>>(column: &str, op: Operator, value: V) -> Self {
        Filter::Compare {
            column: column.to_string(),
            op,
            value: value.into(),
        }
    }

    pub fn query(query: QueryFilter) -> Self {
        Filter::Query(query)
    }

    /// Lower any shape to a [`QueryFilter`], resolving `Id` against `R::IDENTIFIER`.
    pub fn into_query<R: Record>(self) -> QueryFilter {
        match self {
            Filter::All => QueryFilter::new(),
            Filter::Id(value) => QueryFilter::new().where_op(R::IDENTIFIER, Operator::Eq, value),
            Filter::Compare { column, op, value } => {
                QueryFilter::new().where_op(&column, op, value)
            }
            Filter::Query(query) => query,
        }
    }
}

impl From<QueryFilter> for Filter {
    fn from(query: QueryFilter) -> Self {
        Filter::Query(query)
    }
}
