//! Schema-related data models.
//!
//! This module defines the column descriptors and database identity returned by
//! the metadata inspector.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// One column of a table, as reported by the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnDescriptor {
    pub name: String,
    /// SQL type name (e.g., `VARCHAR`, `bigint`, `TIMESTAMP`)
    #[serde(rename = "type")]
    pub data_type: String,
    /// Declared length or precision, when the type has one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<i64>,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<String>,
}

impl ColumnDescriptor {
    /// Create a new column descriptor.
    pub fn new(name: impl Into<String>, data_type: impl Into<String>, nullable: bool) -> Self {
        Self {
            name: name.into(),
            data_type: data_type.into(),
            size: None,
            nullable,
            default: None,
        }
    }

    pub fn with_size(mut self, size: Option<i64>) -> Self {
        self.size = size;
        self
    }

    pub fn with_default(mut self, default: Option<String>) -> Self {
        self.default = default;
        self
    }
}

/// Split a declared type such as `VARCHAR(50)` or `DECIMAL(10,2)` into its base
/// name and leading size.
pub fn split_declared_type(declared: &str) -> (String, Option<i64>) {
    let declared = declared.trim();
    match declared.find('(') {
        Some(open) => {
            let base = declared[..open].trim().to_string();
            let size = declared[open + 1..]
                .split(|c| c == ',' || c == ')')
                .next()
                .and_then(|s| s.trim().parse::<i64>().ok());
            (base, size)
        }
        None => (declared.to_string(), None),
    }
}

/// Identity and capabilities of the connected database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DatabaseInfo {
    pub product_name: String,
    pub product_version: String,
    pub driver_name: String,
    pub driver_version: String,
    /// Connection URL with the password masked
    pub url: String,
    pub user_name: String,
    pub max_connections: Option<i64>,
    pub supports_batch_updates: bool,
    pub supports_transactions: bool,
}

impl DatabaseInfo {
    /// Render the multi-line report returned by `get_database_info`.
    pub fn report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Database Product: {}", self.product_name);
        let _ = writeln!(out, "Database Version: {}", self.product_version);
        let _ = writeln!(out, "Driver Name: {}", self.driver_name);
        let _ = writeln!(out, "Driver Version: {}", self.driver_version);
        let _ = writeln!(out, "URL: {}", self.url);
        let _ = writeln!(out, "User: {}", self.user_name);
        let _ = writeln!(
            out,
            "Max Connections: {}",
            self.max_connections
                .map_or_else(|| "unknown".to_string(), |n| n.to_string())
        );
        let _ = writeln!(
            out,
            "Supports Batch Updates: {}",
            self.supports_batch_updates
        );
        let _ = write!(out, "Supports Transactions: {}", self.supports_transactions);
        out
    }
}
