//! Error types for the user data-access layer.
//!
//! This module defines all error types using `thiserror` for ergonomic error handling.
//! Every store-level failure is classified into one of these variants before it
//! leaves the crate; callers never see a raw `sqlx::Error`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Connection failed: {message}")]
    Connection { message: String, suggestion: String },

    #[error("Validation failed: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("Email '{email}' is already registered")]
    DuplicateEmail { email: String },

    #[error("{entity} not found: {key}")]
    NotFound { entity: String, key: String },

    #[error("Insert failed: {message}")]
    Insert { message: String },

    #[error("{}", transaction_message(.cause, .rollback_error.as_deref()))]
    Transaction {
        #[source]
        cause: Box<DbError>,
        rollback_error: Option<Box<DbError>>,
    },

    #[error("Database error: {message}")]
    Database {
        message: String,
        /// e.g., "23505" for unique violation
        sql_state: Option<String>,
        suggestion: String,
    },

    #[error("Timeout: {operation} exceeded {elapsed_secs}s")]
    Timeout {
        operation: String,
        elapsed_secs: u32,
    },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

fn transaction_message(cause: &DbError, rollback_error: Option<&DbError>) -> String {
    match rollback_error {
        Some(rb) => format!(
            "Transaction aborted: {}; rollback also failed: {}",
            cause, rb
        ),
        None => format!("Transaction rolled back: {}", cause),
    }
}

impl DbError {
    /// Create a connection error with a helpful suggestion.
    pub fn connection(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Create a validation error for a named field.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn duplicate_email(email: impl Into<String>) -> Self {
        Self::DuplicateEmail {
            email: email.into(),
        }
    }

    /// Create a not-found error for an entity (user, table) and its key.
    pub fn not_found(entity: impl Into<String>, key: impl ToString) -> Self {
        Self::NotFound {
            entity: entity.into(),
            key: key.to_string(),
        }
    }

    pub fn insert(message: impl Into<String>) -> Self {
        Self::Insert {
            message: message.into(),
        }
    }

    /// Wrap the failure that aborted a transaction, plus the rollback failure if any.
    pub fn transaction(cause: DbError, rollback_error: Option<DbError>) -> Self {
        Self::Transaction {
            cause: Box::new(cause),
            rollback_error: rollback_error.map(Box::new),
        }
    }

    /// Create a database error with optional SQL state.
    pub fn database(
        message: impl Into<String>,
        sql_state: Option<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self::Database {
            message: message.into(),
            sql_state,
            suggestion: suggestion.into(),
        }
    }

    /// Create a timeout error.
    pub fn timeout(operation: impl Into<String>, elapsed_secs: u32) -> Self {
        Self::Timeout {
            operation: operation.into(),
            elapsed_secs,
        }
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Get the suggestion for this error, if available.
    pub fn suggestion(&self) -> Option<&str> {
        match self {
            Self::Connection { suggestion, .. } => Some(suggestion),
            Self::Database { suggestion, .. } => Some(suggestion),
            Self::DuplicateEmail { .. } => Some("Use a different email address"),
            Self::Transaction { cause, .. } => cause.suggestion(),
            _ => None,
        }
    }
}

/// True when the driver reports a unique-constraint violation.
///
/// Uses the structured error kind rather than the message text, so it works the
/// same on SQLite, PostgreSQL and MySQL.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db_err| db_err.is_unique_violation())
}

/// Classify a write failure, turning unique violations into `DuplicateEmail`.
///
/// `email` is the only unique column besides the identity.
pub fn classify_write_error(err: sqlx::Error, email: &str) -> DbError {
    if is_unique_violation(&err) {
        DbError::duplicate_email(email)
    } else {
        DbError::from(err)
    }
}

/// Convert sqlx errors to DbError.
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Configuration(msg) => DbError::connection(
                msg.to_string(),
                "Check the connection string format and credentials",
            ),
            sqlx::Error::Database(db_err) => {
                let code = db_err.code().map(|c| c.to_string());
                DbError::database(
                    db_err.message(),
                    code,
                    "Check the SQL syntax and referenced objects",
                )
            }
            sqlx::Error::RowNotFound => DbError::database(
                "No rows returned",
                None,
                "Verify the query conditions match existing data",
            ),
            sqlx::Error::PoolTimedOut => DbError::connection(
                "Timed out acquiring a connection from the pool",
                "Check that the database is reachable or raise acquire_timeout",
            ),
            sqlx::Error::PoolClosed => {
                DbError::connection("Connection pool is closed", "Restart the server")
            }
            sqlx::Error::Io(io_err) => DbError::connection(
                format!("I/O error: {}", io_err),
                "Check network connectivity and database server status",
            ),
            sqlx::Error::Tls(tls_err) => DbError::connection(
                format!("TLS error: {}", tls_err),
                "Verify TLS configuration and certificates",
            ),
            sqlx::Error::Protocol(msg) => DbError::connection(
                format!("Protocol error: {}", msg),
                "Check database server compatibility",
            ),
            sqlx::Error::ColumnNotFound(col) => {
                DbError::internal(format!("Column not found: {}", col))
            }
            sqlx::Error::ColumnIndexOutOfBounds { index, len } => DbError::internal(format!(
                "Column index {} out of bounds (len: {})",
                index, len
            )),
            sqlx::Error::ColumnDecode { index, source } => {
                DbError::internal(format!("Failed to decode column {}: {}", index, source))
            }
            sqlx::Error::Decode(source) => DbError::internal(format!("Decode error: {}", source)),
            sqlx::Error::WorkerCrashed => DbError::internal("Database worker crashed"),
            _ => DbError::internal(format!("Unknown database error: {}", err)),
        }
    }
}

/// Result type alias for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Build suggestion data as JSON value.
fn suggestion_data(suggestion: Option<&str>) -> Option<serde_json::Value> {
    suggestion.map(|s| serde_json::json!({ "suggestion": s }))
}

/// Convert DbError to MCP ErrorData for semantic error categorization.
/// Includes the suggestion field in the `data` object when available.
impl From<DbError> for rmcp::ErrorData {
    fn from(err: DbError) -> Self {
        match &err {
            // Caller-correctable input -> invalid_params
            DbError::Validation { .. } | DbError::DuplicateEmail { .. } => {
                rmcp::ErrorData::invalid_params(err.to_string(), suggestion_data(err.suggestion()))
            }

            DbError::NotFound { .. } => rmcp::ErrorData::resource_not_found(
                err.to_string(),
                suggestion_data(err.suggestion()),
            ),

            // Database errors -> invalid_params with sql_state in message
            DbError::Database {
                message,
                sql_state,
                suggestion,
            } => {
                let msg = match sql_state {
                    Some(code) => format!("{} (SQLSTATE: {})", message, code),
                    None => message.clone(),
                };
                rmcp::ErrorData::invalid_params(msg, suggestion_data(Some(suggestion)))
            }

            DbError::Timeout { .. } => rmcp::ErrorData::internal_error(
                err.to_string(),
                suggestion_data(Some(
                    "Consider increasing the timeout or narrowing the request",
                )),
            ),

            DbError::Connection { .. }
            | DbError::Insert { .. }
            | DbError::Transaction { .. }
            | DbError::Internal { .. } => {
                rmcp::ErrorData::internal_error(err.to_string(), suggestion_data(err.suggestion()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DbError::connection("Failed to connect", "Check credentials");
        assert!(err.to_string().contains("Connection failed"));
    }

    #[test]
    fn test_error_suggestion() {
        let err = DbError::database(
            "Syntax error",
            Some("42601".to_string()),
            "Check SQL syntax",
        );
        assert_eq!(err.suggestion(), Some("Check SQL syntax"));
    }

    #[test]
    fn test_transaction_error_wraps_cause() {
        let err = DbError::transaction(DbError::duplicate_email("a@b.io"), None);
        let msg = err.to_string();
        assert!(msg.contains("rolled back"));
        assert!(msg.contains("a@b.io"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_transaction_error_reports_rollback_failure_separately() {
        let err = DbError::transaction(
            DbError::insert("no rows affected"),
            Some(DbError::connection("socket closed", "reconnect")),
        );
        let msg = err.to_string();
        assert!(msg.contains("no rows affected"));
        assert!(msg.contains("rollback also failed"));
        assert!(msg.contains("socket closed"));
        match err {
            DbError::Transaction {
                cause,
                rollback_error,
            } => {
                assert!(matches!(*cause, DbError::Insert { .. }));
                assert!(matches!(
                    rollback_error.as_deref(),
                    Some(DbError::Connection { .. })
                ));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_not_found_display() {
        let err = DbError::not_found("User", 42);
        assert_eq!(err.to_string(), "User not found: 42");
    }

    #[test]
    fn test_pool_closed_is_connection_error() {
        let err: DbError = sqlx::Error::PoolClosed.into();
        assert!(matches!(err, DbError::Connection { .. }));
    }

    #[test]
    fn test_non_database_error_is_not_unique_violation() {
        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
        let err = classify_write_error(sqlx::Error::RowNotFound, "a@b.io");
        assert!(matches!(err, DbError::Database { .. }));
    }

    // Tests for From<DbError> for rmcp::ErrorData

    #[test]
    fn test_validation_maps_to_invalid_params() {
        let err = DbError::validation("email", "bad format");
        let mcp_err: rmcp::ErrorData = err.into();
        // invalid_params uses -32602
        assert_eq!(mcp_err.code.0, -32602);
    }

    #[test]
    fn test_duplicate_email_maps_to_invalid_params() {
        let err = DbError::duplicate_email("a@b.io");
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32602);
        assert!(mcp_err.data.is_some());
    }

    #[test]
    fn test_not_found_maps_to_resource_not_found() {
        let err = DbError::not_found("Table", "missing");
        let mcp_err: rmcp::ErrorData = err.into();
        // resource_not_found uses -32002 in rmcp
        assert_eq!(mcp_err.code.0, -32002);
    }

    #[test]
    fn test_connection_maps_to_internal_error() {
        let err = DbError::connection("failed", "try again");
        let mcp_err: rmcp::ErrorData = err.into();
        // internal_error uses -32603
        assert_eq!(mcp_err.code.0, -32603);
        let data = mcp_err.data.unwrap();
        assert_eq!(data["suggestion"], "try again");
    }

    #[test]
    fn test_transaction_maps_to_internal_error() {
        let err = DbError::transaction(DbError::insert("nothing"), None);
        let mcp_err: rmcp::ErrorData = err.into();
        assert_eq!(mcp_err.code.0, -32603);
    }

    #[test]
    fn test_database_error_includes_sql_state() {
        let err = DbError::database("syntax error", Some("42601".to_string()), "check syntax");
        let mcp_err: rmcp::ErrorData = err.into();
        assert!(mcp_err.message.contains("42601"));
    }
}
