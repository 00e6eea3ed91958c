//! Parameter binding utilities for database queries.
//!
//! This module binds `QueryParam` values to database-specific query objects,
//! always through placeholders. Values never become part of the SQL text.

use crate::models::{QueryParam, Statement};
use sqlx::mysql::MySqlArguments;
use sqlx::postgres::PgArguments;
use sqlx::sqlite::SqliteArguments;
use sqlx::{MySql, Postgres, Sqlite};

/// Bind a parameter to a MySQL query.
pub(crate) fn bind_mysql_param<'q>(
    query: sqlx::query::Query<'q, MySql, MySqlArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, MySql, MySqlArguments> {
    match param {
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Timestamp(v) => query.bind(*v),
    }
}

/// Bind a parameter to a PostgreSQL query.
pub(crate) fn bind_postgres_param<'q>(
    query: sqlx::query::Query<'q, Postgres, PgArguments>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, Postgres, PgArguments> {
    match param {
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Timestamp(v) => query.bind(*v),
    }
}

/// Bind a parameter to a SQLite query.
pub(crate) fn bind_sqlite_param<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    param: &'q QueryParam,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match param {
        QueryParam::Bool(v) => query.bind(*v),
        QueryParam::Int(v) => query.bind(*v),
        QueryParam::String(v) => query.bind(v.as_str()),
        QueryParam::Timestamp(v) => query.bind(*v),
    }
}

/// Build a MySQL query from a statement, binding every parameter in order.
pub(crate) fn mysql_query(stmt: &Statement) -> sqlx::query::Query<'_, MySql, MySqlArguments> {
    stmt.params
        .iter()
        .fold(sqlx::query(&stmt.sql), bind_mysql_param)
}

/// Build a PostgreSQL query from a statement, binding every parameter in order.
pub(crate) fn postgres_query(stmt: &Statement) -> sqlx::query::Query<'_, Postgres, PgArguments> {
    stmt.params
        .iter()
        .fold(sqlx::query(&stmt.sql), bind_postgres_param)
}

/// Build a SQLite query from a statement, binding every parameter in order.
pub(crate) fn sqlite_query(
    stmt: &Statement,
) -> sqlx::query::Query<'_, Sqlite, SqliteArguments<'_>> {
    stmt.params
        .iter()
        .fold(sqlx::query(&stmt.sql), bind_sqlite_param)
}
