//! Database access layer.
//!
//! This module provides the hand-written data-access machinery:
//! - Connection pool and guarded connection acquisition
//! - Statement execution with timeouts
//! - Row mapping
//! - Dynamic filter assembly
//! - Transactions and batches
//! - Schema introspection and bootstrap DDL
//! - Database dispatch macros for reducing code duplication

#[macro_use]
pub mod macros;
pub mod bootstrap;
pub mod executor;
pub mod filter;
pub mod mapper;
pub mod params;
pub mod pool;
pub mod schema;
pub mod statements;
pub mod transaction;

pub use executor::QueryExecutor;
pub use filter::FilterBuilder;
pub use mapper::FromDbRow;
pub use pool::{ConnectionGuard, ConnectionProvider, DbConnection, DbHandle, DbPool};
pub use schema::SchemaInspector;
pub use transaction::{Batch, BatchOutcome, BatchReport, DbTransaction, TransactionScope};
