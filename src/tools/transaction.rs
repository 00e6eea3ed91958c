//! Multi-record write tools.
//!
//! - `transfer_data`: all-or-nothing insert of a record set in one transaction
//! - `batch_insert_users`: best-effort insert where each record stands alone

use crate::error::DbResult;
use crate::models::User;
use crate::repository::UserRepository;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Input for the multi-record tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UserRecordsInput {
    /// Records to insert. Any `id` is ignored; missing timestamps are set to now.
    pub users: Vec<User>,
}

/// Output from the transfer_data tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct TransferOutput {
    /// True when every record was committed
    pub committed: bool,
    /// Number of records inserted
    pub records: usize,
}

/// Output from the batch_insert_users tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct BatchInsertOutput {
    /// Records written
    pub inserted: usize,
    /// Records submitted
    pub requested: usize,
}

pub struct TransferToolHandler {
    repository: Arc<UserRepository>,
}

impl TransferToolHandler {
    pub fn new(repository: Arc<UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn transfer_data(&self, input: UserRecordsInput) -> DbResult<TransferOutput> {
        let records = input.users.len();
        let committed = self.repository.transfer_data(input.users).await?;
        Ok(TransferOutput { committed, records })
    }

    pub async fn batch_insert_users(&self, input: UserRecordsInput) -> DbResult<BatchInsertOutput> {
        let requested = input.users.len();
        let inserted = self.repository.batch_insert_users(input.users).await?;
        Ok(BatchInsertOutput {
            inserted,
            requested,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_records_input_accepts_minimal_users() {
        let input: UserRecordsInput = serde_json::from_str(
            r#"{"users": [{"name": "Ana Lopez", "email": "ana@x.io", "department": "Eng", "role": "Dev"}]}"#,
        )
        .unwrap();
        let user = &input.users[0];
        assert!(user.id.is_none());
        assert!(user.active);
        assert!(user.created_at.is_none());
    }
}
