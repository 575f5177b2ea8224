//! `QueryFilter`: the filter/query object handed to the compiler.
//!
//! Wraps the pieces of a select the repository needs to shape (predicate,
//! projection, ordering, window) and builds the `SelectStatement` on demand
//! for whichever table it is run against.

use crate::query::filter::Operator;
use sea_query::{
    Alias, Asterisk, Condition, ConditionalStatement, Expr, Order, OrderedStatement, Query,
    SelectStatement, SimpleExpr,
};

/// Predicate, projection, ordering and window for a single-table select
///
/// # Example
///
/// ```
/// use tablekit::QueryFilter;
/// use sea_query::Expr;
///
/// let query = QueryFilter::new()
///     .filter(Expr::col(sea_query::Alias::new("age")).gt(18))
///     .order_by_desc("created_at")
///     .limit(10);
/// assert_eq!(query.get_limit(), Some(10));
/// ```
#[derive(Debug, Clone)]
pub struct QueryFilter {
    condition: Condition,
    columns: Vec<String>,
    orders: Vec<(String, Order)>,
    limit: Option<u64>,
    offset: Option<u64>,
}

impl Default for QueryFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryFilter {
    /// A filter matching every row
    pub fn new() -> Self {
        Self {
            condition: Condition::all(),
            columns: Vec::new(),
            orders: Vec::new(),
            limit: None,
            offset: None,
        }
    }

    /// AND a predicate into the filter
    pub fn filter(mut self, expr: SimpleExpr) -> Self {
        self.condition = self.condition.add(expr);
        self
    }

    /// AND a nested condition (e.g. `Condition::any()`) into the filter
    pub fn cond(mut self, condition: Condition) -> Self {
        self.condition = self.condition.add(condition);
        self
    }

    /// AND `column <op> value` into the filter
    pub fn where_op<V>(self, column: &str, op: Operator, value: V) -> Self
    where
        V: Into<sea_query::Value>,
    {
        let expr = Expr::col(Alias::new(column)).binary(op.bin_oper(), SimpleExpr::Value(value.into()));
        self.filter(expr)
    }

    /// Project the given columns instead of `*`
    pub fn columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns.extend(columns.into_iter().map(Into::into));
        self
    }

    pub fn order_by(mut self, column: &str, order: Order) -> Self {
        self.orders.push((column.to_string(), order));
        self
    }

    pub fn order_by_asc(self, column: &str) -> Self {
        self.order_by(column, Order::Asc)
    }

    pub fn order_by_desc(self, column: &str) -> Self {
        self.order_by(column, Order::Desc)
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn get_limit(&self) -> Option<u64> {
        self.limit
    }

    pub fn get_offset(&self) -> Option<u64> {
        self.offset
    }

    pub fn has_order(&self) -> bool {
        !self.orders.is_empty()
    }

    pub fn condition(&self) -> &Condition {
        &self.condition
    }

    /// Same filter with limit and offset removed
    pub fn without_window(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }

    /// Same filter with ordering removed
    pub fn without_order(&self) -> Self {
        Self {
            orders: Vec::new(),
            ..self.clone()
        }
    }

    /// Build the select against `table`, without the window.
    ///
    /// Limit and offset are dialect specific and applied by the compiler.
    pub(crate) fn select_statement(&self, table: &str) -> SelectStatement {
        let mut select = Query::select();
        if self.columns.is_empty() {
            select.column(Asterisk);
        } else {
            select.columns(self.columns.iter().map(|c| Alias::new(c.as_str())));
        }
        select.from(Alias::new(table));
        if !self.condition.is_empty() {
            select.cond_where(self.condition.clone());
        }
        for (column, order) in &self.orders {
            select.order_by(Alias::new(column.as_str()), order.clone());
        }
        select
    }
}
