//! MCP tool implementations.
//!
//! This module contains the user tool handlers:
//! - `users`: create, read, update, delete, list, search, page and count users
//! - `transaction`: transactional transfer and best-effort batch insert
//! - `metadata`: connection probe, connection info, database info, table columns

pub mod metadata;
pub mod transaction;
pub mod users;

pub use metadata::{
    ConnectionInfoOutput, DatabaseInfoOutput, MetadataToolHandler, TableColumnsInput,
    TableColumnsOutput, TestConnectionOutput,
};
pub use transaction::{BatchInsertOutput, TransferOutput, TransferToolHandler, UserRecordsInput};
pub use users::{
    CountOutput, CreateUserInput, DeleteUserOutput, DepartmentInput, FindUserOutput,
    PaginationInput, UpdateUserInput, UserIdInput, UserListOutput, UserOutput, UserToolHandler,
};
