//! `sea_query` builders for the dialects it does not ship.
//!
//! SQL Server, Oracle and Firebird share the ANSI parts of the grammar with
//! the stock builders; they differ in placeholder style, string escaping and
//! how an insert hands back generated columns. Result windows are rendered
//! by the compiler, never through `LIMIT`.

use sea_query::{
    BinOper, EscapeBuilder, Oper, OperLeftAssocDecider, PrecedenceDecider, QueryBuilder, Quote,
    QuotedBuilder, ReturningClause, SimpleExpr, SqlWriter, SubQueryStatement, TableRefBuilder,
    UnOper, Value,
};
use std::fmt::Write;

/// Microsoft SQL Server (`@P1` placeholders, `OUTPUT INSERTED`)
#[derive(Default, Debug, Clone, Copy)]
pub struct SqlServerQueryBuilder;

/// Oracle (`:1` placeholders)
#[derive(Default, Debug, Clone, Copy)]
pub struct OracleQueryBuilder;

/// Firebird (`?` placeholders, `RETURNING`)
#[derive(Default, Debug, Clone, Copy)]
pub struct FirebirdQueryBuilder;

fn is_arithmetic(op: &BinOper) -> bool {
    matches!(
        op,
        BinOper::Mul | BinOper::Div | BinOper::Mod | BinOper::Add | BinOper::Sub
    )
}

fn is_shift(op: &BinOper) -> bool {
    matches!(op, BinOper::LShift | BinOper::RShift)
}

fn is_comparison_like(op: &BinOper) -> bool {
    matches!(
        op,
        BinOper::SmallerThan
            | BinOper::SmallerThanOrEqual
            | BinOper::Equal
            | BinOper::GreaterThanOrEqual
            | BinOper::GreaterThan
            | BinOper::NotEqual
            | BinOper::In
            | BinOper::NotIn
            | BinOper::Like
            | BinOper::NotLike
            | BinOper::Is
            | BinOper::IsNot
    )
}

fn is_logical(oper: &Oper) -> bool {
    matches!(
        oper,
        Oper::UnOper(UnOper::Not) | Oper::BinOper(BinOper::And) | Oper::BinOper(BinOper::Or)
    )
}

/// Parenthesization rules shared with the stock builders: drop parentheses
/// only around atoms, and around comparisons/arithmetic nested in a looser
/// operator.
fn ansi_inner_expr_well_known_greater_precedence(inner: &SimpleExpr, outer: &Oper) -> bool {
    match inner {
        SimpleExpr::Column(_)
        | SimpleExpr::Tuple(_)
        | SimpleExpr::Constant(_)
        | SimpleExpr::FunctionCall(_)
        | SimpleExpr::Value(_)
        | SimpleExpr::Keyword(_)
        | SimpleExpr::Case(_)
        | SimpleExpr::SubQuery(_, _) => true,
        SimpleExpr::Binary(_, inner_op, _) => {
            if is_arithmetic(inner_op) || is_shift(inner_op) {
                let outer_is_predicate = match outer {
                    Oper::BinOper(op) => {
                        is_comparison_like(op) || matches!(op, BinOper::Between | BinOper::NotBetween)
                    }
                    Oper::UnOper(_) => false,
                };
                outer_is_predicate || is_logical(outer)
            } else if is_comparison_like(inner_op) {
                is_logical(outer)
            } else {
                false
            }
        }
        _ => false,
    }
}

fn ansi_well_known_left_associative(op: &BinOper) -> bool {
    matches!(
        op,
        BinOper::And | BinOper::Or | BinOper::Add | BinOper::Sub | BinOper::Mul | BinOper::Mod
    )
}

macro_rules! impl_ansi_builder {
    ($builder:ty) => {
        impl QuotedBuilder for $builder {
            fn quote(&self) -> Quote {
                Quote::new(b'"')
            }
        }

        impl EscapeBuilder for $builder {
            fn escape_string(&self, string: &str) -> String {
                string.replace('\'', "''")
            }

            fn unescape_string(&self, string: &str) -> String {
                string.replace("''", "'")
            }
        }

        impl TableRefBuilder for $builder {}

        impl PrecedenceDecider for $builder {
            fn inner_expr_well_known_greater_precedence(
                &self,
                inner: &SimpleExpr,
                outer_oper: &Oper,
            ) -> bool {
                ansi_inner_expr_well_known_greater_precedence(inner, outer_oper)
            }
        }

        impl OperLeftAssocDecider for $builder {
            fn well_known_left_associative(&self, op: &BinOper) -> bool {
                ansi_well_known_left_associative(op)
            }
        }
    };
}

impl_ansi_builder!(SqlServerQueryBuilder);
impl_ansi_builder!(OracleQueryBuilder);
impl_ansi_builder!(FirebirdQueryBuilder);

fn prepare_sub_query<B: QueryBuilder + ?Sized>(
    builder: &B,
    query: &SubQueryStatement,
    sql: &mut dyn SqlWriter,
) {
    match query {
        SubQueryStatement::SelectStatement(stmt) => builder.prepare_select_statement(stmt, sql),
        SubQueryStatement::InsertStatement(stmt) => builder.prepare_insert_statement(stmt, sql),
        SubQueryStatement::UpdateStatement(stmt) => builder.prepare_update_statement(stmt, sql),
        SubQueryStatement::DeleteStatement(stmt) => builder.prepare_delete_statement(stmt, sql),
        SubQueryStatement::WithStatement(stmt) => builder.prepare_with_query(stmt, sql),
    }
}

impl QueryBuilder for SqlServerQueryBuilder {
    fn placeholder(&self) -> (&str, bool) {
        ("@P", true)
    }

    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        prepare_sub_query(self, query, sql);
    }

    fn prepare_value(&self, value: &Value, sql: &mut dyn SqlWriter) {
        sql.push_param(value.clone(), self as _);
    }

    /// Generated columns come back through `OUTPUT INSERTED.<col>`,
    /// written between the column list and `VALUES`.
    fn prepare_output(&self, returning: &Option<ReturningClause>, sql: &mut dyn SqlWriter) {
        let Some(returning) = returning else {
            return;
        };
        sql.write_str(" OUTPUT ").ok();
        match returning {
            ReturningClause::All => {
                sql.write_str("INSERTED.*").ok();
            }
            ReturningClause::Columns(cols) => {
                for (i, column_ref) in cols.iter().enumerate() {
                    if i > 0 {
                        sql.write_str(", ").ok();
                    }
                    sql.write_str("INSERTED.").ok();
                    self.prepare_column_ref(column_ref, sql);
                }
            }
            ReturningClause::Exprs(exprs) => {
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        sql.write_str(", ").ok();
                    }
                    self.prepare_simple_expr(expr, sql);
                }
            }
        }
    }

    fn prepare_returning(&self, _returning: &Option<ReturningClause>, _sql: &mut dyn SqlWriter) {}
}

impl QueryBuilder for OracleQueryBuilder {
    fn placeholder(&self) -> (&str, bool) {
        (":", true)
    }

    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        prepare_sub_query(self, query, sql);
    }

    fn prepare_value(&self, value: &Value, sql: &mut dyn SqlWriter) {
        sql.push_param(value.clone(), self as _);
    }

    // `RETURNING ... INTO` needs out-binds, which the statement model does not carry.
    fn prepare_returning(&self, _returning: &Option<ReturningClause>, _sql: &mut dyn SqlWriter) {}
}

impl QueryBuilder for FirebirdQueryBuilder {
    fn prepare_query_statement(&self, query: &SubQueryStatement, sql: &mut dyn SqlWriter) {
        prepare_sub_query(self, query, sql);
    }

    fn prepare_value(&self, value: &Value, sql: &mut dyn SqlWriter) {
        sql.push_param(value.clone(), self as _);
    }
}
