//! Data models for the user data-access layer.
//!
//! This module re-exports all model types used throughout the application.

pub mod connection;
pub mod query;
pub mod schema;
pub mod user;

// Re-export commonly used types
pub use connection::{
    ConnectionConfig, ConnectionConfigError, DatabaseType, TransactionState,
    mask_url,
};
pub use query::{DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT, QueryParam, Statement, UserQuery};
pub use schema::{ColumnDescriptor, DatabaseInfo, split_declared_type};
pub use user::{NewUser, User, UserUpdate};
