//! Connection-related data models.
//!
//! This module defines types for database connection configuration and state.

use crate::config::PoolOptions;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use url::Url;

/// Supported database types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseType {
    PostgreSQL,
    /// Includes MariaDB
    MySQL,
    SQLite,
}

impl DatabaseType {
    /// Parse database type from a connection string.
    pub fn from_connection_string(connection_string: &str) -> Option<Self> {
        let lower = connection_string.to_lowercase();
        if lower.starts_with("postgres://") || lower.starts_with("postgresql://") {
            Some(Self::PostgreSQL)
        } else if lower.starts_with("mysql://") || lower.starts_with("mariadb://") {
            Some(Self::MySQL)
        } else if lower.starts_with("sqlite://") || lower.starts_with("sqlite:") {
            Some(Self::SQLite)
        } else {
            None
        }
    }

    /// Get the display name for this database type.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "PostgreSQL",
            Self::MySQL => "MySQL",
            Self::SQLite => "SQLite",
        }
    }

    /// Name of the sqlx driver crate that talks to this backend.
    pub fn driver_name(&self) -> &'static str {
        match self {
            Self::PostgreSQL => "sqlx-postgres",
            Self::MySQL => "sqlx-mysql",
            Self::SQLite => "sqlx-sqlite",
        }
    }

    /// Render the placeholder for the `ordinal`-th bound parameter (1-based).
    pub fn placeholder(&self, ordinal: usize) -> String {
        match self {
            Self::PostgreSQL => format!("${}", ordinal),
            Self::MySQL | Self::SQLite => "?".to_string(),
        }
    }
}

impl std::fmt::Display for DatabaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Configuration for the database connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub db_type: DatabaseType,
    /// Contains sensitive data - never log
    #[serde(skip_serializing)]
    pub connection_string: String,
    /// Database name extracted from connection URL.
    pub database: Option<String>,
    #[serde(default)]
    pub pool_options: PoolOptions,
}

impl ConnectionConfig {
    /// Create a new connection configuration.
    pub fn new(
        connection_string: impl Into<String>,
        database: Option<String>,
        pool_options: PoolOptions,
    ) -> Result<Self, ConnectionConfigError> {
        let connection_string = connection_string.into();
        if connection_string.trim().is_empty() {
            return Err(ConnectionConfigError::EmptyConnectionString);
        }

        let db_type = DatabaseType::from_connection_string(&connection_string)
            .ok_or_else(|| ConnectionConfigError::UnknownDatabaseType(mask_url(&connection_string)))?;

        Ok(Self {
            db_type,
            connection_string,
            database,
            pool_options,
        })
    }

    /// Get a display-safe version of the connection string (credentials masked).
    pub fn masked_connection_string(&self) -> String {
        mask_url(&self.connection_string)
    }

    /// User name embedded in the connection URL, if any.
    pub fn user_name(&self) -> Option<String> {
        Url::parse(&self.connection_string)
            .ok()
            .map(|url| url.username().to_string())
            .filter(|u| !u.is_empty())
    }
}

/// Replace the password in a URL with `****`. Non-URL strings pass through.
pub fn mask_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) if url.password().is_some() => {
            if url.set_password(Some("****")).is_ok() {
                url.to_string()
            } else {
                raw.to_string()
            }
        }
        _ => raw.to_string(),
    }
}

/// Errors that can occur when creating a connection configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionConfigError {
    #[error("Connection string cannot be empty")]
    EmptyConnectionString,

    /// Could not determine database type from connection string
    #[error("Unknown database type in connection string: {0}")]
    UnknownDatabaseType(String),
}

/// Commit mode of a connection held by the transaction coordinator.
///
/// Moves `AutoCommit -> Manual -> (Committed | RolledBack) -> AutoCommit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionState {
    AutoCommit,
    Manual,
    Committed,
    RolledBack,
}

impl TransactionState {
    /// Check if the transaction is still open.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Manual)
    }
}
