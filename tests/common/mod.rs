//! Shared setup for the integration tests.

#![allow(dead_code)]

use std::time::Duration;
use tempfile::TempDir;
use user_db_mcp_server::config::PoolOptions;
use user_db_mcp_server::models::{ConnectionConfig, NewUser};
use user_db_mcp_server::repository::UserRepository;

/// A repository on a fresh SQLite file with the users table created.
///
/// The returned `TempDir` must outlive the repository.
pub async fn sqlite_repository() -> (TempDir, UserRepository) {
    let dir = tempfile::tempdir().unwrap();
    let url = format!("sqlite:{}", dir.path().join("users.db").display());
    let config =
        ConnectionConfig::new(url, Some("users".to_string()), PoolOptions::default()).unwrap();
    let repository = UserRepository::connect(config, Duration::from_secs(5))
        .await
        .unwrap();
    repository.init_schema().await.unwrap();
    (dir, repository)
}

/// Repository for a server database named by `env_var`, or `None` when unset.
pub async fn server_repository(env_var: &str) -> Option<UserRepository> {
    let url = std::env::var(env_var).ok()?;
    let config = ConnectionConfig::new(url, None, PoolOptions::default()).unwrap();
    let repository = UserRepository::connect(config, Duration::from_secs(10))
        .await
        .unwrap();
    repository.init_schema().await.unwrap();
    Some(repository)
}

pub fn new_user(name: &str, email: &str, department: &str, role: &str) -> NewUser {
    NewUser::new(name, email, department, role)
}
