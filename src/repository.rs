//! The user data-access operations.
//!
//! Every operation acquires one connection, builds its statement, executes it,
//! maps the rows and releases the connection. Multi-write operations run on
//! that one connection inside a [`TransactionScope`] or a [`Batch`].

use crate::db::bootstrap;
use crate::db::filter;
use crate::db::statements;
use crate::db::{
    Batch, ConnectionProvider, DbConnection, QueryExecutor, SchemaInspector, TransactionScope,
};
use crate::error::{DbError, DbResult};
use crate::models::user::now;
use crate::models::{
    ColumnDescriptor, ConnectionConfig, DatabaseInfo, DatabaseType, NewUser, User, UserQuery,
    UserUpdate,
};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug)]
pub struct UserRepository {
    provider: ConnectionProvider,
    executor: QueryExecutor,
}

impl UserRepository {
    pub fn new(provider: ConnectionProvider, executor: QueryExecutor) -> Self {
        Self { provider, executor }
    }

    /// Open the pool for `config` with the given per-statement timeout.
    pub async fn connect(config: ConnectionConfig, query_timeout: Duration) -> DbResult<Self> {
        let provider = ConnectionProvider::connect(config).await?;
        Ok(Self::new(provider, QueryExecutor::new(query_timeout)))
    }

    pub fn dialect(&self) -> DatabaseType {
        self.provider.db_type()
    }

    pub async fn close(&self) {
        self.provider.close().await;
    }

    /// Create the `users` table if it does not exist.
    pub async fn init_schema(&self) -> DbResult<()> {
        let mut guard = self.provider.acquire().await?;
        let result = bootstrap::ensure_schema(&self.executor, guard.connection()?).await;
        guard.release();
        result
    }

    /// Probe the connection and describe what it is connected to.
    pub async fn test_connection(&self) -> DbResult<String> {
        let mut guard = self.provider.acquire().await?;
        let result = self.test_connection_on(guard.connection()?).await;
        guard.release();
        result
    }

    async fn test_connection_on(&self, conn: &mut DbConnection) -> DbResult<String> {
        let probe: i64 = self
            .executor
            .query_one(conn.handle(), &statements::probe(self.dialect()))
            .await?;
        let info = SchemaInspector::database_info(
            &self.executor,
            conn,
            self.provider.config(),
            self.provider.max_connections(),
        )
        .await?;
        let database =
            SchemaInspector::current_database(&self.executor, conn, self.provider.config())
                .await?;
        Ok(format!(
            "Connected to {} {} | database: {} | probe: {}",
            info.product_name,
            info.product_version,
            database.as_deref().unwrap_or("(none)"),
            probe
        ))
    }

    /// Connection metadata as key/value pairs.
    pub async fn connection_info(&self) -> DbResult<BTreeMap<String, String>> {
        let info = self.database_info().await?;
        let mut map = BTreeMap::new();
        map.insert("url".to_string(), info.url);
        map.insert("user".to_string(), info.user_name);
        map.insert("database_product_name".to_string(), info.product_name);
        map.insert("database_product_version".to_string(), info.product_version);
        map.insert("driver_name".to_string(), info.driver_name);
        map.insert("driver_version".to_string(), info.driver_version);
        map.insert(
            "max_connections".to_string(),
            info.max_connections
                .map_or_else(|| "unknown".to_string(), |n| n.to_string()),
        );
        // The pool is always opened read-write.
        map.insert("read_only".to_string(), "false".to_string());
        Ok(map)
    }

    /// Insert a validated user and return it with its generated id.
    pub async fn create_user(&self, new_user: NewUser) -> DbResult<User> {
        new_user.validate()?;
        let mut user = new_user.into_user();
        let stmt = statements::insert_user(self.dialect(), &user);

        let mut guard = self.provider.acquire().await?;
        let result = self
            .executor
            .insert_returning_id(guard.handle()?, &stmt)
            .await;
        guard.release();

        let id = result?;
        user.id = Some(id);
        info!(user_id = id, "User created");
        Ok(user)
    }

    pub async fn find_user_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let stmt = statements::find_user_by_id(self.dialect(), id);
        let mut guard = self.provider.acquire().await?;
        let result = self.executor.query_optional(guard.handle()?, &stmt).await;
        guard.release();
        result
    }

    /// Merge `update` onto the stored user, validate, write, and re-read.
    pub async fn update_user(&self, id: i64, update: UserUpdate) -> DbResult<User> {
        let mut guard = self.provider.acquire().await?;
        let result = self.update_user_on(guard.connection()?, id, update).await;
        guard.release();
        result
    }

    async fn update_user_on(
        &self,
        conn: &mut DbConnection,
        id: i64,
        update: UserUpdate,
    ) -> DbResult<User> {
        let find = statements::find_user_by_id(self.dialect(), id);
        let mut user: User = self
            .executor
            .query_optional(conn.handle(), &find)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        if update.is_empty() {
            return Ok(user);
        }

        update.apply_to(&mut user);
        user.validate()?;

        let stmt = statements::update_user(self.dialect(), id, &user);
        let affected = self.executor.execute(conn.handle(), &stmt).await?;
        if affected == 0 {
            return Err(DbError::not_found("User", id));
        }

        let updated = self
            .executor
            .query_optional(conn.handle(), &find)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;
        info!(user_id = id, "User updated");
        Ok(updated)
    }

    /// Delete by id. Returns whether a row was removed.
    pub async fn delete_user(&self, id: i64) -> DbResult<bool> {
        let stmt = statements::delete_user(self.dialect(), id);
        let mut guard = self.provider.acquire().await?;
        let result = self.executor.execute(guard.handle()?, &stmt).await;
        guard.release();
        let deleted = result? > 0;
        if deleted {
            info!(user_id = id, "User deleted");
        }
        Ok(deleted)
    }

    /// All users in id order.
    pub async fn find_all_users(&self) -> DbResult<Vec<User>> {
        self.fetch_users(&statements::find_all_users()).await
    }

    /// Active users of one department, by name.
    pub async fn find_users_by_department(&self, department: &str) -> DbResult<Vec<User>> {
        self.fetch_users(&statements::find_users_by_department(
            self.dialect(),
            department,
        ))
        .await
    }

    /// Filtered, paginated search, newest first.
    pub async fn search_users(&self, query: &UserQuery) -> DbResult<Vec<User>> {
        let stmt = filter::user_search(self.dialect(), query)?;
        self.fetch_users(&stmt).await
    }

    /// One page of all users, newest first.
    pub async fn find_users_with_pagination(&self, offset: i64, limit: i64) -> DbResult<Vec<User>> {
        let stmt = filter::user_page(self.dialect(), offset, limit)?;
        self.fetch_users(&stmt).await
    }

    async fn fetch_users(&self, stmt: &crate::models::Statement) -> DbResult<Vec<User>> {
        let mut guard = self.provider.acquire().await?;
        let result = self.executor.query(guard.handle()?, stmt).await;
        guard.release();
        result
    }

    /// Insert every record in one transaction. Any invalid record or failed
    /// insert rolls the whole set back.
    pub async fn transfer_data(&self, users: Vec<User>) -> DbResult<bool> {
        let mut guard = self.provider.acquire().await?;
        let result = self.transfer_on(guard.connection()?, users).await;
        guard.release();
        result
    }

    async fn transfer_on(&self, conn: &mut DbConnection, users: Vec<User>) -> DbResult<bool> {
        let dialect = self.dialect();
        let total = users.len();
        let mut scope = TransactionScope::begin(conn)
            .await
            .map_err(|e| DbError::transaction(e, None))?;

        for user in users {
            let user = prepare_for_insert(user);
            let step = match user.validate() {
                Ok(()) => scope
                    .insert(&self.executor, &statements::insert_user(dialect, &user))
                    .await
                    .map(|_| ()),
                Err(e) => Err(e),
            };
            if let Err(cause) = step {
                return Err(scope.abort(cause).await);
            }
        }

        scope.commit().await?;
        info!(records = total, "Transfer committed");
        Ok(true)
    }

    /// Insert records as one batch; returns how many were written.
    ///
    /// Records that fail validation are skipped. A record whose email is
    /// already taken is reported as failed without affecting the others.
    pub async fn batch_insert_users(&self, users: Vec<User>) -> DbResult<usize> {
        let mut batch = Batch::new(self.dialect());
        for (index, user) in users.into_iter().enumerate() {
            let user = prepare_for_insert(user);
            match user.validate() {
                Ok(()) => batch.queue(user),
                Err(e) => warn!(index, error = %e, "Skipping invalid batch record"),
            }
        }
        if batch.is_empty() {
            return Ok(0);
        }

        let mut guard = self.provider.acquire().await?;
        let result = batch.flush(&self.executor, guard.connection()?).await;
        guard.release();

        let report = result?;
        for (index, err) in report.failures() {
            warn!(index, error = %err, "Batch record rejected");
        }
        Ok(report.applied())
    }

    pub async fn database_info(&self) -> DbResult<DatabaseInfo> {
        let mut guard = self.provider.acquire().await?;
        let result = SchemaInspector::database_info(
            &self.executor,
            guard.connection()?,
            self.provider.config(),
            self.provider.max_connections(),
        )
        .await;
        guard.release();
        result
    }

    /// Multi-line identity and capability report.
    pub async fn get_database_info(&self) -> DbResult<String> {
        Ok(self.database_info().await?.report())
    }

    pub async fn get_table_columns(&self, table: &str) -> DbResult<Vec<ColumnDescriptor>> {
        let mut guard = self.provider.acquire().await?;
        let result =
            SchemaInspector::table_columns(&self.executor, guard.connection()?, table).await;
        guard.release();
        result
    }

    /// Number of active users in `department`.
    pub async fn execute_count_by_department(&self, department: &str) -> DbResult<i64> {
        self.scalar(&statements::count_active_by_department(
            self.dialect(),
            department,
        ))
        .await
    }

    /// Total number of rows in `users`.
    pub async fn count_users(&self) -> DbResult<i64> {
        self.scalar(&statements::count_users()).await
    }

    async fn scalar(&self, stmt: &crate::models::Statement) -> DbResult<i64> {
        let mut guard = self.provider.acquire().await?;
        let result = self.executor.query_one(guard.handle()?, stmt).await;
        guard.release();
        result
    }
}

/// Store-assigned id cleared; missing timestamps set to now.
fn prepare_for_insert(mut user: User) -> User {
    let stamp = now();
    user.id = None;
    user.created_at.get_or_insert(stamp);
    user.updated_at.get_or_insert(stamp);
    user
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PoolOptions;
    use crate::models::Statement;

    #[test]
    fn test_prepare_for_insert_fills_missing_fields() {
        let mut user = User::new("Bo Chen", "bo@x.io", "Ops", "SRE").with_id(99);
        user.created_at = None;
        user.updated_at = None;
        let prepared = prepare_for_insert(user);
        assert!(prepared.id.is_none());
        assert!(prepared.created_at.is_some());
        assert_eq!(prepared.created_at, prepared.updated_at);
    }

    #[tokio::test]
    async fn test_transfer_wraps_failed_begin() {
        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite:{}", dir.path().join("begin.db").display());
        let config = ConnectionConfig::new(url, None, PoolOptions::default()).unwrap();
        let repo = UserRepository::connect(config, Duration::from_secs(5))
            .await
            .unwrap();
        repo.init_schema().await.unwrap();

        // A transaction opened behind the driver's back makes BEGIN fail.
        let mut guard = repo.provider.acquire().await.unwrap();
        let conn = guard.connection().unwrap();
        repo.executor
            .execute(conn.handle(), &Statement::new("open transaction", "BEGIN"))
            .await
            .unwrap();

        let err = repo
            .transfer_on(conn, vec![User::new("Bo Chen", "bo@x.io", "Ops", "SRE")])
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DbError::Transaction {
                rollback_error: None,
                ..
            }
        ));
    }

    #[test]
    fn test_prepare_for_insert_keeps_given_timestamps() {
        let user = User::new("Bo Chen", "bo@x.io", "Ops", "SRE");
        let created = user.created_at;
        assert_eq!(prepare_for_insert(user).created_at, created);
    }
}
