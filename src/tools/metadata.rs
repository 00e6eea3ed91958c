//! Connection and schema metadata tools.

use crate::error::DbResult;
use crate::models::ColumnDescriptor;
use crate::repository::UserRepository;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Output from the test_connection tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TestConnectionOutput {
    pub message: String,
}

/// Output from the connection_info tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct ConnectionInfoOutput {
    pub info: BTreeMap<String, String>,
}

/// Output from the get_database_info tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DatabaseInfoOutput {
    /// Multi-line identity and capability report
    pub report: String,
}

/// Input for the get_table_columns tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct TableColumnsInput {
    /// Table name, matched exactly
    pub table_name: String,
}

/// Output from the get_table_columns tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TableColumnsOutput {
    pub table_name: String,
    pub columns: Vec<ColumnDescriptor>,
}

pub struct MetadataToolHandler {
    repository: Arc<UserRepository>,
}

impl MetadataToolHandler {
    pub fn new(repository: Arc<UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn test_connection(&self) -> DbResult<TestConnectionOutput> {
        let message = self.repository.test_connection().await?;
        Ok(TestConnectionOutput { message })
    }

    pub async fn connection_info(&self) -> DbResult<ConnectionInfoOutput> {
        let info = self.repository.connection_info().await?;
        Ok(ConnectionInfoOutput { info })
    }

    pub async fn get_database_info(&self) -> DbResult<DatabaseInfoOutput> {
        let report = self.repository.get_database_info().await?;
        Ok(DatabaseInfoOutput { report })
    }

    pub async fn get_table_columns(&self, input: TableColumnsInput) -> DbResult<TableColumnsOutput> {
        let columns = self
            .repository
            .get_table_columns(&input.table_name)
            .await?;
        Ok(TableColumnsOutput {
            table_name: input.table_name,
            columns,
        })
    }
}
