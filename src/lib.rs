//! User DB MCP Server Library
//!
//! A hand-written data-access layer for user records over SQLite, PostgreSQL
//! and MySQL, exposed to AI assistants as MCP (Model Context Protocol) tools.

pub mod config;
pub mod db;
pub mod error;
pub mod mcp;
pub mod models;
pub mod repository;
pub mod tools;
pub mod transport;

pub use config::Config;
pub use error::DbError;
pub use mcp::UserDbService;
pub use repository::UserRepository;
