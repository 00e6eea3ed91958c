//! Manual transaction control and batched inserts.
//!
//! A [`TransactionScope`] owns a driver transaction on one exclusively
//! borrowed connection. It moves through
//! `AutoCommit -> Manual -> (Committed | RolledBack)`; `commit`, `rollback`
//! and `abort` consume the scope, so the end of a transaction happens exactly
//! once. A scope dropped while still `Manual` is rolled back by the driver
//! when the connection goes back to the pool, restoring auto-commit.

use crate::db::executor::QueryExecutor;
use crate::db::pool::{DbConnection, DbHandle};
use crate::db::statements;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, Statement, TransactionState, User};
use sqlx::{Connection, MySql, Postgres, Sqlite, Transaction};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Database-specific open transaction.
#[derive(Debug)]
pub enum DbTransaction<'c> {
    MySql(Transaction<'c, MySql>),
    Postgres(Transaction<'c, Postgres>),
    SQLite(Transaction<'c, Sqlite>),
}

impl DbTransaction<'_> {
    fn handle(&mut self) -> DbHandle<'_> {
        impl_db_dispatch!(DbTransaction, self, {
            MySql(tx) => DbHandle::MySql(&mut **tx),
            Postgres(tx) => DbHandle::Postgres(&mut **tx),
            SQLite(tx) => DbHandle::SQLite(&mut **tx),
        })
    }

    async fn commit(self) -> Result<(), sqlx::Error> {
        impl_db_dispatch!(DbTransaction, self, {
            MySql(tx) => tx.commit().await,
            Postgres(tx) => tx.commit().await,
            SQLite(tx) => tx.commit().await,
        })
    }

    async fn rollback(self) -> Result<(), sqlx::Error> {
        impl_db_dispatch!(DbTransaction, self, {
            MySql(tx) => tx.rollback().await,
            Postgres(tx) => tx.rollback().await,
            SQLite(tx) => tx.rollback().await,
        })
    }
}

/// An open transaction bound to one connection.
#[derive(Debug)]
pub struct TransactionScope<'c> {
    tx: Option<DbTransaction<'c>>,
    state: TransactionState,
    writes: usize,
}

impl<'c> TransactionScope<'c> {
    /// Disable auto-commit on `conn` by opening a transaction.
    pub async fn begin(conn: &'c mut DbConnection) -> DbResult<Self> {
        let tx = match conn {
            DbConnection::MySql(c) => DbTransaction::MySql((&mut **c).begin().await?),
            DbConnection::Postgres(c) => DbTransaction::Postgres((&mut **c).begin().await?),
            DbConnection::SQLite(c) => DbTransaction::SQLite((&mut **c).begin().await?),
        };
        debug!(
            from = ?TransactionState::AutoCommit,
            to = ?TransactionState::Manual,
            "Transaction started"
        );
        Ok(Self {
            tx: Some(tx),
            state: TransactionState::Manual,
            writes: 0,
        })
    }

    fn tx(&mut self) -> DbResult<&mut DbTransaction<'c>> {
        self.tx
            .as_mut()
            .ok_or_else(|| DbError::internal("Transaction already ended"))
    }

    /// Run an insert inside the transaction and return the generated id.
    pub async fn insert(&mut self, executor: &QueryExecutor, stmt: &Statement) -> DbResult<i64> {
        let id = executor.insert_returning_id(self.tx()?.handle(), stmt).await?;
        self.writes += 1;
        Ok(id)
    }

    /// Commit every write atomically.
    pub async fn commit(mut self) -> DbResult<()> {
        let tx = self.tx.take().ok_or_else(|| DbError::internal("Transaction already ended"))?;
        match tx.commit().await {
            Ok(()) => {
                self.state = TransactionState::Committed;
                info!(writes = self.writes, "Transaction committed");
                Ok(())
            }
            Err(e) => {
                // A failed COMMIT leaves nothing applied.
                self.state = TransactionState::RolledBack;
                warn!(writes = self.writes, "Commit failed, transaction rolled back");
                Err(DbError::transaction(DbError::from(e), None))
            }
        }
    }

    /// Undo every write.
    pub async fn rollback(mut self) -> DbResult<()> {
        let tx = self.tx.take().ok_or_else(|| DbError::internal("Transaction already ended"))?;
        self.state = TransactionState::RolledBack;
        warn!(writes = self.writes, "Rolling back transaction");
        tx.rollback().await.map_err(DbError::from)
    }

    /// Roll back because of `cause`, returning the error to report.
    ///
    /// A rollback failure is attached as a secondary cause rather than
    /// replacing the original one.
    pub async fn abort(self, cause: DbError) -> DbError {
        warn!(error = %cause, "Transaction aborted");
        aborted(cause, self.rollback().await)
    }
}

fn aborted(cause: DbError, rollback: DbResult<()>) -> DbError {
    DbError::transaction(cause, rollback.err())
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if self.tx.is_some() && self.state.is_active() {
            warn!(
                writes = self.writes,
                "Transaction scope dropped without commit; rolling back"
            );
        }
        debug!(state = ?self.state, "Auto-commit restored");
    }
}

/// Result of one queued batch entry.
#[derive(Debug)]
pub enum BatchOutcome {
    Applied,
    Failed(DbError),
}

impl BatchOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Users queued for a single multi-row insert on one connection.
///
/// The flush runs in auto-commit. A row rejected for a taken email is
/// reported as failed and does not undo the others.
#[derive(Debug)]
pub struct Batch {
    dialect: DatabaseType,
    queued: Vec<User>,
}

impl Batch {
    pub fn new(dialect: DatabaseType) -> Self {
        Self {
            dialect,
            queued: Vec::new(),
        }
    }

    pub fn queue(&mut self, user: User) {
        self.queued.push(user);
    }

    pub fn len(&self) -> usize {
        self.queued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queued.is_empty()
    }

    /// Write every queued user, one statement per [`statements::BATCH_ROWS`]
    /// rows, and return one outcome per entry in queue order.
    ///
    /// A store failure other than a taken email fails the flush.
    pub async fn flush(
        self,
        executor: &QueryExecutor,
        conn: &mut DbConnection,
    ) -> DbResult<BatchReport> {
        let mut outcomes = Vec::with_capacity(self.queued.len());
        for chunk in self.queued.chunks(statements::BATCH_ROWS) {
            let chunk_outcomes = match self.dialect {
                DatabaseType::MySQL => flush_counted(executor, conn, chunk).await?,
                DatabaseType::PostgreSQL | DatabaseType::SQLite => {
                    let stmt = statements::insert_users(self.dialect, chunk);
                    let written: Vec<String> = executor.query(conn.handle(), &stmt).await?;
                    match_written(chunk, written, |email| email.to_string())
                }
            };
            outcomes.extend(chunk_outcomes);
        }
        let report = BatchReport { outcomes };
        info!(
            queued = report.outcomes.len(),
            applied = report.applied(),
            "Batch flushed"
        );
        Ok(report)
    }
}

/// MySQL path: look up the taken emails first, then insert with `IGNORE`.
///
/// Emails compare case-insensitively, as under MySQL's default collation.
async fn flush_counted(
    executor: &QueryExecutor,
    conn: &mut DbConnection,
    chunk: &[User],
) -> DbResult<Vec<BatchOutcome>> {
    let emails: Vec<&str> = chunk.iter().map(|u| u.email.as_str()).collect();
    let lookup = statements::find_taken_emails(DatabaseType::MySQL, &emails);
    let taken: Vec<String> = executor.query(conn.handle(), &lookup).await?;
    let mut seen: HashSet<String> = taken.iter().map(|e| e.to_lowercase()).collect();

    let fresh: Vec<User> = chunk
        .iter()
        .filter(|u| seen.insert(u.email.to_lowercase()))
        .cloned()
        .collect();
    if fresh.is_empty() {
        return Ok(match_written(chunk, Vec::new(), str::to_lowercase));
    }

    let stmt = statements::insert_users(DatabaseType::MySQL, &fresh);
    let affected = executor.execute(conn.handle(), &stmt).await?;
    if affected != fresh.len() as u64 {
        warn!(
            expected = fresh.len(),
            affected, "Batch row count differs from lookup; a concurrent writer took an email"
        );
    }
    let written = fresh.iter().map(|u| u.email.clone()).collect();
    Ok(match_written(chunk, written, str::to_lowercase))
}

/// Pair each queued user with a written email. When an email repeats in the
/// queue, the first entry is the one that was written.
fn match_written(
    chunk: &[User],
    written: Vec<String>,
    key: impl Fn(&str) -> String,
) -> Vec<BatchOutcome> {
    let mut remaining: HashMap<String, usize> = HashMap::new();
    for email in &written {
        *remaining.entry(key(email)).or_default() += 1;
    }
    chunk
        .iter()
        .map(|user| match remaining.get_mut(&key(&user.email)) {
            Some(count) if *count > 0 => {
                *count -= 1;
                BatchOutcome::Applied
            }
            _ => BatchOutcome::Failed(DbError::duplicate_email(&user.email)),
        })
        .collect()
}

/// Per-entry outcomes of a flushed batch.
#[derive(Debug)]
pub struct BatchReport {
    pub outcomes: Vec<BatchOutcome>,
}

impl BatchReport {
    /// Number of entries that were written.
    pub fn applied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_applied()).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = (usize, &DbError)> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, o)| match o {
                BatchOutcome::Failed(e) => Some((i, e)),
                BatchOutcome::Applied => None,
            })
    }
}
