//! User CRUD and lookup tools.
//!
//! This module implements the MCP tools that create, read, update, delete,
//! list, search, page through and count users.

use crate::error::DbResult;
use crate::models::{NewUser, User, UserQuery, UserUpdate};
use crate::repository::UserRepository;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Input for the create_user tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct CreateUserInput {
    #[serde(flatten)]
    pub user: NewUser,
}

/// Input for tools addressing one user by id.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UserIdInput {
    /// Store-assigned user id
    pub id: i64,
}

/// Input for the update_user tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct UpdateUserInput {
    /// Id of the user to update
    pub id: i64,
    /// Fields to change. Omitted fields keep their stored values.
    #[serde(flatten)]
    pub changes: UserUpdate,
}

/// Input for department-scoped tools.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct DepartmentInput {
    /// Department name, matched exactly
    pub department: String,
}

/// Input for the find_users_with_pagination tool.
#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct PaginationInput {
    /// Rows to skip. Default: 0
    #[serde(default)]
    pub offset: i64,
    /// Page size. Default: 10, clamped to [1, 1000]
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    crate::models::DEFAULT_PAGE_LIMIT
}

/// A single user.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UserOutput {
    pub user: User,
}

/// Lookup result; `user` is absent when no row has the id.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct FindUserOutput {
    pub found: bool,
    pub user: Option<User>,
}

/// Output from the delete_user tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct DeleteUserOutput {
    /// Whether a row was removed
    pub deleted: bool,
}

/// A list of users.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct UserListOutput {
    pub users: Vec<User>,
    /// Number of users returned
    pub count: usize,
}

impl From<Vec<User>> for UserListOutput {
    fn from(users: Vec<User>) -> Self {
        let count = users.len();
        Self { users, count }
    }
}

/// Output from the execute_count_by_department tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CountOutput {
    pub department: String,
    /// Active users in the department
    pub count: i64,
}

pub struct UserToolHandler {
    repository: Arc<UserRepository>,
}

impl UserToolHandler {
    pub fn new(repository: Arc<UserRepository>) -> Self {
        Self { repository }
    }

    pub async fn create_user(&self, input: CreateUserInput) -> DbResult<UserOutput> {
        let user = self.repository.create_user(input.user).await?;
        Ok(UserOutput { user })
    }

    pub async fn find_user_by_id(&self, input: UserIdInput) -> DbResult<FindUserOutput> {
        let user = self.repository.find_user_by_id(input.id).await?;
        Ok(FindUserOutput {
            found: user.is_some(),
            user,
        })
    }

    pub async fn update_user(&self, input: UpdateUserInput) -> DbResult<UserOutput> {
        let user = self.repository.update_user(input.id, input.changes).await?;
        Ok(UserOutput { user })
    }

    pub async fn delete_user(&self, input: UserIdInput) -> DbResult<DeleteUserOutput> {
        let deleted = self.repository.delete_user(input.id).await?;
        Ok(DeleteUserOutput { deleted })
    }

    pub async fn find_all_users(&self) -> DbResult<UserListOutput> {
        Ok(self.repository.find_all_users().await?.into())
    }

    pub async fn find_users_by_department(&self, input: DepartmentInput) -> DbResult<UserListOutput> {
        Ok(self
            .repository
            .find_users_by_department(&input.department)
            .await?
            .into())
    }

    pub async fn search_users(&self, input: UserQuery) -> DbResult<UserListOutput> {
        let users = self.repository.search_users(&input).await?;
        info!(
            department = ?input.department,
            role = ?input.role,
            active = ?input.active,
            results = users.len(),
            "User search executed"
        );
        Ok(users.into())
    }

    pub async fn find_users_with_pagination(
        &self,
        input: PaginationInput,
    ) -> DbResult<UserListOutput> {
        Ok(self
            .repository
            .find_users_with_pagination(input.offset, input.limit)
            .await?
            .into())
    }

    pub async fn execute_count_by_department(&self, input: DepartmentInput) -> DbResult<CountOutput> {
        let count = self
            .repository
            .execute_count_by_department(&input.department)
            .await?;
        Ok(CountOutput {
            department: input.department,
            count,
        })
    }
}
