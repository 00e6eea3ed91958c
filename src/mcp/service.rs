//! MCP service implementation using rmcp.
//!
//! This module defines the UserDbService struct with every user data-access
//! operation exposed as an MCP tool through the rmcp framework's macros.

use crate::models::UserQuery;
use crate::repository::UserRepository;
use crate::tools::metadata::{
    ConnectionInfoOutput, DatabaseInfoOutput, MetadataToolHandler, TableColumnsInput,
    TableColumnsOutput, TestConnectionOutput,
};
use crate::tools::transaction::{
    BatchInsertOutput, TransferOutput, TransferToolHandler, UserRecordsInput,
};
use crate::tools::users::{
    CountOutput, CreateUserInput, DeleteUserOutput, DepartmentInput, FindUserOutput,
    PaginationInput, UpdateUserInput, UserIdInput, UserListOutput, UserOutput, UserToolHandler,
};
use rmcp::Json;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

#[derive(Clone)]
pub struct UserDbService {
    /// Shared repository for all user operations
    repository: Arc<UserRepository>,
    /// Tool router for MCP tool dispatch (auto-generated)
    tool_router: ToolRouter<Self>,
}

impl UserDbService {
    pub fn new(repository: Arc<UserRepository>) -> Self {
        Self {
            repository,
            tool_router: Self::tool_router(),
        }
    }

    fn users(&self) -> UserToolHandler {
        UserToolHandler::new(self.repository.clone())
    }

    fn transfers(&self) -> TransferToolHandler {
        TransferToolHandler::new(self.repository.clone())
    }

    fn metadata(&self) -> MetadataToolHandler {
        MetadataToolHandler::new(self.repository.clone())
    }
}

#[tool_router]
impl UserDbService {
    #[tool(
        description = "Probe the database connection.\nReturns the product name, version, current database and probe result."
    )]
    async fn test_connection(&self) -> Result<Json<TestConnectionOutput>, McpError> {
        self.metadata()
            .test_connection()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Connection metadata: URL (password masked), user, product name/version, driver name/version, max connections, read-only flag."
    )]
    async fn connection_info(&self) -> Result<Json<ConnectionInfoOutput>, McpError> {
        self.metadata()
            .connection_info()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Create a user.\nName must be 2-50 characters, email must be valid and unique, department and role are required.\nReturns the user with its generated id."
    )]
    async fn create_user(
        &self,
        Parameters(input): Parameters<CreateUserInput>,
    ) -> Result<Json<UserOutput>, McpError> {
        self.users()
            .create_user(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Find one user by id. Returns found: false when no user has the id.")]
    async fn find_user_by_id(
        &self,
        Parameters(input): Parameters<UserIdInput>,
    ) -> Result<Json<FindUserOutput>, McpError> {
        self.users()
            .find_user_by_id(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Update a user by id. Only the given fields change; updated_at is refreshed.\nFails if the user does not exist or the new email is taken."
    )]
    async fn update_user(
        &self,
        Parameters(input): Parameters<UpdateUserInput>,
    ) -> Result<Json<UserOutput>, McpError> {
        self.users()
            .update_user(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Delete a user by id. Returns deleted: false when no user has the id.")]
    async fn delete_user(
        &self,
        Parameters(input): Parameters<UserIdInput>,
    ) -> Result<Json<DeleteUserOutput>, McpError> {
        self.users()
            .delete_user(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "List every user, ordered by id.")]
    async fn find_all_users(&self) -> Result<Json<UserListOutput>, McpError> {
        self.users()
            .find_all_users()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "List active users of one department, ordered by name.")]
    async fn find_users_by_department(
        &self,
        Parameters(input): Parameters<DepartmentInput>,
    ) -> Result<Json<UserListOutput>, McpError> {
        self.users()
            .find_users_by_department(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Search users by optional department, role and active filters.\nResults are newest first. limit defaults to 10 (max 1000), offset to 0."
    )]
    async fn search_users(
        &self,
        Parameters(input): Parameters<UserQuery>,
    ) -> Result<Json<UserListOutput>, McpError> {
        self.users()
            .search_users(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Page through all users, newest first.\nlimit defaults to 10 (max 1000), offset to 0. A negative offset is rejected."
    )]
    async fn find_users_with_pagination(
        &self,
        Parameters(input): Parameters<PaginationInput>,
    ) -> Result<Json<UserListOutput>, McpError> {
        self.users()
            .find_users_with_pagination(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Insert a set of users in one transaction.\nIf any record is invalid or fails to insert, nothing is written."
    )]
    async fn transfer_data(
        &self,
        Parameters(input): Parameters<UserRecordsInput>,
    ) -> Result<Json<TransferOutput>, McpError> {
        self.transfers()
            .transfer_data(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Insert a set of users as a batch.\nEach record succeeds or fails on its own (e.g. duplicate email). Returns how many were inserted."
    )]
    async fn batch_insert_users(
        &self,
        Parameters(input): Parameters<UserRecordsInput>,
    ) -> Result<Json<BatchInsertOutput>, McpError> {
        self.transfers()
            .batch_insert_users(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Database identity and capability report: product, version, driver, URL, user, max connections, batch and transaction support."
    )]
    async fn get_database_info(&self) -> Result<Json<DatabaseInfoOutput>, McpError> {
        self.metadata()
            .get_database_info()
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(
        description = "Describe the columns of a table: name, type, size, nullable, default.\nFails with not found when the table does not exist."
    )]
    async fn get_table_columns(
        &self,
        Parameters(input): Parameters<TableColumnsInput>,
    ) -> Result<Json<TableColumnsOutput>, McpError> {
        self.metadata()
            .get_table_columns(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }

    #[tool(description = "Count active users in one department.")]
    async fn execute_count_by_department(
        &self,
        Parameters(input): Parameters<DepartmentInput>,
    ) -> Result<Json<CountOutput>, McpError> {
        self.users()
            .execute_count_by_department(input)
            .await
            .map(Json)
            .map_err(McpError::from)
    }
}

#[tool_handler]
impl ServerHandler for UserDbService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "user-db-mcp-server".to_owned(),
                title: Some("User DB MCP Server".to_owned()),
                version: env!("CARGO_PKG_VERSION").to_owned(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Tools for managing user records in a SQL database (SQLite, PostgreSQL or MySQL).\n\
                \n\
                ## Users\n\
                - `create_user`, `find_user_by_id`, `update_user`, `delete_user`\n\
                - `find_all_users` (by id), `find_users_by_department` (active only, by name)\n\
                - `search_users` and `find_users_with_pagination` (newest first, limit 1-1000)\n\
                - `execute_count_by_department` counts active users\n\
                \n\
                ## Multi-record writes\n\
                - `transfer_data` is all-or-nothing\n\
                - `batch_insert_users` keeps the records that succeed\n\
                \n\
                ## Metadata\n\
                - `test_connection`, `connection_info`, `get_database_info`, `get_table_columns`\n\
                \n\
                Emails are unique; a duplicate is reported as an invalid-params error."
                    .to_string(),
            ),
        }
    }
}
