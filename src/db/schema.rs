//! Schema introspection module.
//!
//! This module reports database identity and capabilities, and the column
//! descriptors of a named table, for SQLite, PostgreSQL, and MySQL.
//!
//! # Architecture
//!
//! SQL queries are organized in the `queries` submodule with constants for each
//! database type. Table names are always bound as parameters, including the
//! SQLite pragma, which is read through the `pragma_table_info` table function.

use crate::db::executor::QueryExecutor;
use crate::db::pool::DbConnection;
use crate::error::{DbError, DbResult};
use crate::models::{ColumnDescriptor, ConnectionConfig, DatabaseInfo, DatabaseType, Statement};
use tracing::debug;

/// Version of the sqlx driver family this crate is built against.
pub const DRIVER_VERSION: &str = "0.8";

mod queries {
    pub mod postgres {
        pub const PRODUCT_VERSION: &str = "SELECT current_setting('server_version')";
        pub const CURRENT_USER: &str = "SELECT current_user::text";
        pub const CURRENT_DATABASE: &str = "SELECT current_database()::text";
        pub const MAX_CONNECTIONS: &str = "SELECT current_setting('max_connections')";

        pub const TABLE_COLUMNS: &str = r#"
        SELECT
            c.column_name::text AS name,
            c.data_type::text AS type,
            COALESCE(c.character_maximum_length, c.numeric_precision)::bigint AS size,
            c.is_nullable::text AS is_nullable,
            c.column_default::text AS column_default
        FROM information_schema.columns c
        WHERE c.table_schema = current_schema() AND c.table_name = $1
        ORDER BY c.ordinal_position
        "#;
    }

    pub mod mysql {
        pub const PRODUCT_VERSION: &str = "SELECT CONVERT(VERSION() USING utf8)";
        pub const CURRENT_USER: &str = "SELECT CONVERT(CURRENT_USER() USING utf8)";
        pub const CURRENT_DATABASE: &str = "SELECT CONVERT(DATABASE() USING utf8)";
        pub const MAX_CONNECTIONS: &str = "SELECT CAST(@@max_connections AS CHAR)";

        pub const TABLE_COLUMNS: &str = r#"
        SELECT
            CONVERT(COLUMN_NAME USING utf8) AS name,
            CONVERT(DATA_TYPE USING utf8) AS type,
            CAST(COALESCE(CHARACTER_MAXIMUM_LENGTH, NUMERIC_PRECISION) AS SIGNED) AS size,
            CONVERT(IS_NULLABLE USING utf8) AS is_nullable,
            CONVERT(COLUMN_DEFAULT USING utf8) AS column_default
        FROM information_schema.COLUMNS
        WHERE TABLE_SCHEMA = DATABASE() AND TABLE_NAME = ?
        ORDER BY ORDINAL_POSITION
        "#;
    }

    pub mod sqlite {
        pub const PRODUCT_VERSION: &str = "SELECT sqlite_version()";

        pub const TABLE_COLUMNS: &str = r#"
        SELECT name, type, "notnull", dflt_value, pk
        FROM pragma_table_info(?)
        ORDER BY cid
        "#;
    }
}

/// Schema inspector for database introspection.
pub struct SchemaInspector;

impl SchemaInspector {
    /// Identity and capabilities of the connected database.
    pub async fn database_info(
        executor: &QueryExecutor,
        conn: &mut DbConnection,
        config: &ConnectionConfig,
        pool_max_connections: u32,
    ) -> DbResult<DatabaseInfo> {
        let db_type = conn.db_type();
        let (product_version, user_name, max_connections) = match db_type {
            DatabaseType::PostgreSQL => {
                let version: String = scalar(executor, conn, queries::postgres::PRODUCT_VERSION).await?;
                let user: String = scalar(executor, conn, queries::postgres::CURRENT_USER).await?;
                let max: String = scalar(executor, conn, queries::postgres::MAX_CONNECTIONS).await?;
                (version, user, max.trim().parse::<i64>().ok())
            }
            DatabaseType::MySQL => {
                let version: String = scalar(executor, conn, queries::mysql::PRODUCT_VERSION).await?;
                let user: String = scalar(executor, conn, queries::mysql::CURRENT_USER).await?;
                let max: String = scalar(executor, conn, queries::mysql::MAX_CONNECTIONS).await?;
                (version, user, max.trim().parse::<i64>().ok())
            }
            DatabaseType::SQLite => {
                let version: String = scalar(executor, conn, queries::sqlite::PRODUCT_VERSION).await?;
                // File databases have no login and no server-side connection cap.
                (
                    version,
                    config.user_name().unwrap_or_default(),
                    Some(i64::from(pool_max_connections)),
                )
            }
        };

        Ok(DatabaseInfo {
            product_name: db_type.display_name().to_string(),
            product_version,
            driver_name: db_type.driver_name().to_string(),
            driver_version: DRIVER_VERSION.to_string(),
            url: config.masked_connection_string(),
            user_name,
            max_connections,
            supports_batch_updates: true,
            supports_transactions: true,
        })
    }

    /// Name of the current database/catalog. SQLite reports the configured file name.
    pub async fn current_database(
        executor: &QueryExecutor,
        conn: &mut DbConnection,
        config: &ConnectionConfig,
    ) -> DbResult<Option<String>> {
        match conn.db_type() {
            DatabaseType::PostgreSQL => {
                let stmt = Statement::new("current database", queries::postgres::CURRENT_DATABASE);
                executor.query_one(conn.handle(), &stmt).await
            }
            DatabaseType::MySQL => {
                let stmt = Statement::new("current database", queries::mysql::CURRENT_DATABASE);
                executor.query_one(conn.handle(), &stmt).await
            }
            DatabaseType::SQLite => Ok(config.database.clone()),
        }
    }

    /// Column descriptors of `table`, in catalog order.
    ///
    /// An empty catalog result means the table does not exist and is reported
    /// as not found on every backend.
    pub async fn table_columns(
        executor: &QueryExecutor,
        conn: &mut DbConnection,
        table: &str,
    ) -> DbResult<Vec<ColumnDescriptor>> {
        let table = table.trim();
        if table.is_empty() {
            return Err(DbError::validation("table_name", "table name is required"));
        }

        let sql = match conn.db_type() {
            DatabaseType::PostgreSQL => queries::postgres::TABLE_COLUMNS,
            DatabaseType::MySQL => queries::mysql::TABLE_COLUMNS,
            DatabaseType::SQLite => queries::sqlite::TABLE_COLUMNS,
        };
        let stmt = Statement::new("table columns", sql).bind(table);
        let columns: Vec<ColumnDescriptor> = executor.query(conn.handle(), &stmt).await?;

        debug!(table = %table, columns = columns.len(), "Described table");

        if columns.is_empty() {
            return Err(DbError::not_found("Table", table));
        }
        Ok(columns)
    }
}

async fn scalar(
    executor: &QueryExecutor,
    conn: &mut DbConnection,
    sql: &'static str,
) -> DbResult<String> {
    executor
        .query_one(conn.handle(), &Statement::new("database metadata", sql))
        .await
}
