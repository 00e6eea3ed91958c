//! Statement execution engine.
//!
//! This module runs [`Statement`]s against a borrowed connection with:
//! - Positional parameter binding
//! - Full cursor draining for reads
//! - Generated-key retrieval for inserts
//! - Per-statement timeouts
//!
//! # Architecture
//!
//! The executor uses database-specific implementations organized in submodules:
//! - `mysql`: MySQL-specific statement execution
//! - `postgres`: PostgreSQL-specific statement execution
//! - `sqlite`: SQLite-specific statement execution
//!
//! Each submodule provides identical functionality adapted to the database's
//! row and result types. Failures are logged with the statement intent and SQL
//! template only; bound values never reach the log.

use crate::config::DEFAULT_QUERY_TIMEOUT_SECS;
use crate::db::mapper::FromDbRow;
use crate::db::pool::DbHandle;
use crate::error::{DbError, DbResult, classify_write_error};
use crate::models::Statement;
use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error};

/// Executes statements with a bounded duration.
#[derive(Debug, Clone, Copy)]
pub struct QueryExecutor {
    timeout: Duration,
}

impl QueryExecutor {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Run a write and return the number of affected rows.
    pub async fn execute(&self, handle: DbHandle<'_>, stmt: &Statement) -> DbResult<u64> {
        match handle {
            DbHandle::MySql(conn) => self
                .run(stmt, mysql::execute(conn, stmt))
                .await
                .map(|r| r.rows_affected()),
            DbHandle::Postgres(conn) => self
                .run(stmt, postgres::execute(conn, stmt))
                .await
                .map(|r| r.rows_affected()),
            DbHandle::SQLite(conn) => self
                .run(stmt, sqlite::execute(conn, stmt))
                .await
                .map(|r| r.rows_affected()),
        }
    }

    /// Run a read and map every row. The cursor is drained before returning.
    pub async fn query<T: FromDbRow>(
        &self,
        handle: DbHandle<'_>,
        stmt: &Statement,
    ) -> DbResult<Vec<T>> {
        let mapped = match handle {
            DbHandle::MySql(conn) => {
                let rows = self.run(stmt, mysql::fetch_all(conn, stmt)).await?;
                rows.iter().map(T::from_mysql).collect::<Result<Vec<_>, _>>()
            }
            DbHandle::Postgres(conn) => {
                let rows = self.run(stmt, postgres::fetch_all(conn, stmt)).await?;
                rows.iter().map(T::from_postgres).collect::<Result<Vec<_>, _>>()
            }
            DbHandle::SQLite(conn) => {
                let rows = self.run(stmt, sqlite::fetch_all(conn, stmt)).await?;
                rows.iter().map(T::from_sqlite).collect::<Result<Vec<_>, _>>()
            }
        };
        mapped.map_err(|e| self.fail(stmt, e))
    }

    /// Run a read that yields at most one row.
    pub async fn query_optional<T: FromDbRow>(
        &self,
        handle: DbHandle<'_>,
        stmt: &Statement,
    ) -> DbResult<Option<T>> {
        let mapped = match handle {
            DbHandle::MySql(conn) => self
                .run(stmt, mysql::fetch_optional(conn, stmt))
                .await?
                .as_ref()
                .map(T::from_mysql)
                .transpose(),
            DbHandle::Postgres(conn) => self
                .run(stmt, postgres::fetch_optional(conn, stmt))
                .await?
                .as_ref()
                .map(T::from_postgres)
                .transpose(),
            DbHandle::SQLite(conn) => self
                .run(stmt, sqlite::fetch_optional(conn, stmt))
                .await?
                .as_ref()
                .map(T::from_sqlite)
                .transpose(),
        };
        mapped.map_err(|e| self.fail(stmt, e))
    }

    /// Run a read that must yield exactly one row (scalar aggregates, probes).
    pub async fn query_one<T: FromDbRow>(
        &self,
        handle: DbHandle<'_>,
        stmt: &Statement,
    ) -> DbResult<T> {
        self.query_optional(handle, stmt)
            .await?
            .ok_or_else(|| DbError::internal(format!("{} returned no rows", stmt.intent)))
    }

    /// Run an insert and return the store-generated identity.
    ///
    /// Fails with an insert error when no row was written or no identity was
    /// produced.
    pub async fn insert_returning_id(
        &self,
        handle: DbHandle<'_>,
        stmt: &Statement,
    ) -> DbResult<i64> {
        let id = match handle {
            DbHandle::MySql(conn) => {
                let result = self.run(stmt, mysql::execute(conn, stmt)).await?;
                if result.rows_affected() == 0 {
                    return Err(no_rows(stmt));
                }
                i64::try_from(result.last_insert_id()).ok().filter(|id| *id > 0)
            }
            DbHandle::Postgres(conn) => {
                let row = self
                    .run(stmt, postgres::fetch_optional(conn, stmt))
                    .await?
                    .ok_or_else(|| no_rows(stmt))?;
                Some(<i64 as FromDbRow>::from_postgres(&row).map_err(|e| self.fail(stmt, e))?)
            }
            DbHandle::SQLite(conn) => {
                let result = self.run(stmt, sqlite::execute(conn, stmt)).await?;
                if result.rows_affected() == 0 {
                    return Err(no_rows(stmt));
                }
                Some(result.last_insert_rowid()).filter(|id| *id > 0)
            }
        };

        id.ok_or_else(|| {
            error!(intent = stmt.intent, sql = %stmt.sql, "Insert produced no identity");
            DbError::insert(format!("{}: no generated id returned", stmt.intent))
        })
    }

    /// Await a driver future under the timeout, classifying any failure.
    async fn run<T, F>(&self, stmt: &Statement, fut: F) -> DbResult<T>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        debug!(
            intent = stmt.intent,
            params = stmt.params.len(),
            timeout_secs = self.timeout.as_secs(),
            "Executing statement"
        );

        match timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(self.fail(stmt, e)),
            Err(_) => {
                error!(
                    intent = stmt.intent,
                    sql = %stmt.sql,
                    timeout_secs = self.timeout.as_secs(),
                    "Statement timed out"
                );
                Err(DbError::timeout(stmt.intent, self.timeout.as_secs() as u32))
            }
        }
    }

    fn fail(&self, stmt: &Statement, err: sqlx::Error) -> DbError {
        error!(
            intent = stmt.intent,
            sql = %stmt.sql,
            error = %error_summary(&err),
            "Statement failed"
        );
        match &stmt.unique_email {
            Some(email) => classify_write_error(err, email),
            None => DbError::from(err),
        }
    }
}

impl Default for QueryExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_QUERY_TIMEOUT_SECS))
    }
}

fn no_rows(stmt: &Statement) -> DbError {
    error!(intent = stmt.intent, sql = %stmt.sql, "Insert affected no rows");
    DbError::insert(format!("{}: no rows affected", stmt.intent))
}

/// Loggable description of a driver error.
///
/// Database errors are reduced to their SQLSTATE because some drivers echo
/// the offending value in the message (MySQL: `Duplicate entry 'x'`).
fn error_summary(err: &sqlx::Error) -> String {
    match err.as_database_error() {
        Some(db_err) => match db_err.code() {
            Some(code) => format!("database error (SQLSTATE {})", code),
            None => "database error".to_string(),
        },
        None => err.to_string(),
    }
}

// =============================================================================
// Database-Specific Implementations
// =============================================================================
//
// Each module below provides the same interface adapted to its database type.
// The code structure is intentionally parallel to make differences obvious.

mod mysql {
    use crate::db::params::mysql_query;
    use crate::models::Statement;
    use futures_util::TryStreamExt;
    use sqlx::MySqlConnection;
    use sqlx::mysql::{MySqlQueryResult, MySqlRow};

    pub async fn execute(
        conn: &mut MySqlConnection,
        stmt: &Statement,
    ) -> Result<MySqlQueryResult, sqlx::Error> {
        mysql_query(stmt).execute(conn).await
    }

    pub async fn fetch_all(
        conn: &mut MySqlConnection,
        stmt: &Statement,
    ) -> Result<Vec<MySqlRow>, sqlx::Error> {
        mysql_query(stmt).fetch(conn).try_collect().await
    }

    pub async fn fetch_optional(
        conn: &mut MySqlConnection,
        stmt: &Statement,
    ) -> Result<Option<MySqlRow>, sqlx::Error> {
        mysql_query(stmt).fetch_optional(conn).await
    }
}

mod postgres {
    use crate::db::params::postgres_query;
    use crate::models::Statement;
    use futures_util::TryStreamExt;
    use sqlx::PgConnection;
    use sqlx::postgres::{PgQueryResult, PgRow};

    pub async fn execute(
        conn: &mut PgConnection,
        stmt: &Statement,
    ) -> Result<PgQueryResult, sqlx::Error> {
        postgres_query(stmt).execute(conn).await
    }

    pub async fn fetch_all(
        conn: &mut PgConnection,
        stmt: &Statement,
    ) -> Result<Vec<PgRow>, sqlx::Error> {
        postgres_query(stmt).fetch(conn).try_collect().await
    }

    pub async fn fetch_optional(
        conn: &mut PgConnection,
        stmt: &Statement,
    ) -> Result<Option<PgRow>, sqlx::Error> {
        postgres_query(stmt).fetch_optional(conn).await
    }
}

mod sqlite {
    use crate::db::params::sqlite_query;
    use crate::models::Statement;
    use futures_util::TryStreamExt;
    use sqlx::SqliteConnection;
    use sqlx::sqlite::{SqliteQueryResult, SqliteRow};

    pub async fn execute(
        conn: &mut SqliteConnection,
        stmt: &Statement,
    ) -> Result<SqliteQueryResult, sqlx::Error> {
        sqlite_query(stmt).execute(conn).await
    }

    pub async fn fetch_all(
        conn: &mut SqliteConnection,
        stmt: &Statement,
    ) -> Result<Vec<SqliteRow>, sqlx::Error> {
        sqlite_query(stmt).fetch(conn).try_collect().await
    }

    pub async fn fetch_optional(
        conn: &mut SqliteConnection,
        stmt: &Statement,
    ) -> Result<Option<SqliteRow>, sqlx::Error> {
        sqlite_query(stmt).fetch_optional(conn).await
    }
}
