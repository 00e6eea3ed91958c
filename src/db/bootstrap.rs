//! Startup DDL for the `users` table.

use crate::db::executor::QueryExecutor;
use crate::db::pool::DbConnection;
use crate::error::DbResult;
use crate::models::{DatabaseType, Statement};
use tracing::info;

const SQLITE_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name VARCHAR(50) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    department VARCHAR(100) NOT NULL,
    role VARCHAR(100) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMP,
    updated_at TIMESTAMP
)
"#;

const POSTGRES_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGSERIAL PRIMARY KEY,
    name VARCHAR(50) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    department VARCHAR(100) NOT NULL,
    role VARCHAR(100) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at TIMESTAMP,
    updated_at TIMESTAMP
)
"#;

const MYSQL_USERS: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    id BIGINT NOT NULL AUTO_INCREMENT PRIMARY KEY,
    name VARCHAR(50) NOT NULL,
    email VARCHAR(255) NOT NULL UNIQUE,
    department VARCHAR(100) NOT NULL,
    role VARCHAR(100) NOT NULL,
    active BOOLEAN NOT NULL DEFAULT TRUE,
    created_at DATETIME(6) NULL,
    updated_at DATETIME(6) NULL
)
"#;

/// `CREATE TABLE IF NOT EXISTS users` for the given backend.
pub fn users_table_ddl(dialect: DatabaseType) -> &'static str {
    match dialect {
        DatabaseType::SQLite => SQLITE_USERS,
        DatabaseType::PostgreSQL => POSTGRES_USERS,
        DatabaseType::MySQL => MYSQL_USERS,
    }
}

/// Create the `users` table if it is missing.
pub async fn ensure_schema(executor: &QueryExecutor, conn: &mut DbConnection) -> DbResult<()> {
    let dialect = conn.db_type();
    let stmt = Statement::new("create users table", users_table_ddl(dialect));
    executor.execute(conn.handle(), &stmt).await?;
    info!(db_type = %dialect, "Users table ready");
    Ok(())
}
