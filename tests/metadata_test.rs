//! Integration tests for the connection and schema metadata operations.

mod common;

use common::sqlite_repository;
use user_db_mcp_server::error::DbError;

#[tokio::test]
async fn test_connection_probe_names_the_product() {
    let (_dir, repo) = sqlite_repository().await;
    let message = repo.test_connection().await.unwrap();
    assert!(message.starts_with("Connected to SQLite"));
    assert!(message.contains("database: users"));
    assert!(message.ends_with("probe: 1"));
}

#[tokio::test]
async fn test_connection_info_keys() {
    let (_dir, repo) = sqlite_repository().await;
    let info = repo.connection_info().await.unwrap();

    let keys: Vec<&str> = info.keys().map(String::as_str).collect();
    assert_eq!(
        keys,
        vec![
            "database_product_name",
            "database_product_version",
            "driver_name",
            "driver_version",
            "max_connections",
            "read_only",
            "url",
            "user",
        ]
    );
    assert_eq!(info["database_product_name"], "SQLite");
    assert_eq!(info["read_only"], "false");
    assert!(info["url"].starts_with("sqlite:"));
}

#[tokio::test]
async fn test_database_info_report_lines() {
    let (_dir, repo) = sqlite_repository().await;
    let report = repo.get_database_info().await.unwrap();

    let lines: Vec<&str> = report.lines().collect();
    assert_eq!(lines.len(), 9);
    assert_eq!(lines[0], "Database Product: SQLite");
    assert!(lines[1].starts_with("Database Version: 3."));
    assert!(lines[4].starts_with("URL: sqlite:"));
    assert_eq!(lines[7], "Supports Batch Updates: true");
    assert_eq!(lines[8], "Supports Transactions: true");
}

#[tokio::test]
async fn test_users_table_columns() {
    let (_dir, repo) = sqlite_repository().await;
    let columns = repo.get_table_columns("users").await.unwrap();

    let names: Vec<&str> = columns.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "id",
            "name",
            "email",
            "department",
            "role",
            "active",
            "created_at",
            "updated_at"
        ]
    );

    let id = &columns[0];
    assert_eq!(id.data_type, "INTEGER");
    assert!(!id.nullable);

    let name = &columns[1];
    assert_eq!(name.data_type, "VARCHAR");
    assert_eq!(name.size, Some(50));
    assert!(!name.nullable);

    let created_at = &columns[6];
    assert!(created_at.nullable);
    assert!(created_at.default.is_none());
}

#[tokio::test]
async fn test_unknown_table_is_not_found() {
    let (_dir, repo) = sqlite_repository().await;
    let err = repo.get_table_columns("no_such_table").await.unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn test_blank_table_name_is_rejected() {
    let (_dir, repo) = sqlite_repository().await;
    let err = repo.get_table_columns("  ").await.unwrap_err();
    assert!(matches!(err, DbError::Validation { .. }));
}
