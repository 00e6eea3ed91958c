//! Fixed statements for the user operations.
//!
//! Each builder renders placeholders in the backend's dialect and returns a
//! [`Statement`] with its parameters already bound in order.

use crate::db::mapper::{USER_COLUMNS, user_params};
use crate::models::{DatabaseType, Statement, User};

/// Comma-separated placeholders for ordinals `start..start + count`.
fn placeholders(dialect: DatabaseType, start: usize, count: usize) -> String {
    (start..start + count)
        .map(|ordinal| dialect.placeholder(ordinal))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Insert one user. PostgreSQL returns the generated id through `RETURNING`.
pub fn insert_user(dialect: DatabaseType, user: &User) -> Statement {
    let mut sql = format!(
        "INSERT INTO users (name, email, department, role, active, created_at, updated_at) \
         VALUES ({})",
        placeholders(dialect, 1, 7)
    );
    if dialect == DatabaseType::PostgreSQL {
        sql.push_str(" RETURNING id");
    }
    Statement::new("insert user", sql)
        .with_params(user_params(user))
        .with_unique_email(user.email.clone())
}

/// Rows per multi-row insert. Keeps every backend under its bind-parameter cap.
pub const BATCH_ROWS: usize = 500;

const INSERT_COLUMNS: usize = 7;

/// Insert several users in one statement. A row whose email is already taken
/// is skipped instead of failing the statement.
///
/// SQLite and PostgreSQL return the email of every written row. MySQL has no
/// `RETURNING`, so it only reports the affected-row count.
pub fn insert_users(dialect: DatabaseType, users: &[User]) -> Statement {
    let rows = (0..users.len())
        .map(|row| {
            format!(
                "({})",
                placeholders(dialect, row * INSERT_COLUMNS + 1, INSERT_COLUMNS)
            )
        })
        .collect::<Vec<_>>()
        .join(", ");
    let sql = match dialect {
        DatabaseType::MySQL => format!(
            "INSERT IGNORE INTO users (name, email, department, role, active, created_at, \
             updated_at) VALUES {}",
            rows
        ),
        DatabaseType::PostgreSQL | DatabaseType::SQLite => format!(
            "INSERT INTO users (name, email, department, role, active, created_at, updated_at) \
             VALUES {} ON CONFLICT (email) DO NOTHING RETURNING email",
            rows
        ),
    };
    Statement::new("batch insert users", sql)
        .with_params(users.iter().flat_map(user_params).collect())
}

/// Which of `emails` are already registered.
pub fn find_taken_emails(dialect: DatabaseType, emails: &[&str]) -> Statement {
    let stmt = Statement::new(
        "find taken emails",
        format!(
            "SELECT email FROM users WHERE email IN ({})",
            placeholders(dialect, 1, emails.len())
        ),
    );
    emails.iter().fold(stmt, |stmt, email| stmt.bind(*email))
}

pub fn find_user_by_id(dialect: DatabaseType, id: i64) -> Statement {
    Statement::new(
        "find user by id",
        format!(
            "SELECT {} FROM users WHERE id = {}",
            USER_COLUMNS,
            dialect.placeholder(1)
        ),
    )
    .bind(id)
}

/// Rewrite every mutable column of an existing user. `created_at` is left alone.
pub fn update_user(dialect: DatabaseType, id: i64, user: &User) -> Statement {
    let p = |n| dialect.placeholder(n);
    Statement::new(
        "update user",
        format!(
            "UPDATE users SET name = {}, email = {}, department = {}, role = {}, \
             active = {}, updated_at = {} WHERE id = {}",
            p(1),
            p(2),
            p(3),
            p(4),
            p(5),
            p(6),
            p(7)
        ),
    )
    .bind(user.name.as_str())
    .bind(user.email.as_str())
    .bind(user.department.as_str())
    .bind(user.role.as_str())
    .bind(user.active)
    .bind(user.updated_at)
    .bind(id)
    .with_unique_email(user.email.clone())
}

pub fn delete_user(dialect: DatabaseType, id: i64) -> Statement {
    Statement::new(
        "delete user",
        format!("DELETE FROM users WHERE id = {}", dialect.placeholder(1)),
    )
    .bind(id)
}

pub fn find_all_users() -> Statement {
    Statement::new(
        "find all users",
        format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS),
    )
}

/// Active users of one department, by name.
pub fn find_users_by_department(dialect: DatabaseType, department: &str) -> Statement {
    Statement::new(
        "find users by department",
        format!(
            "SELECT {} FROM users WHERE department = {} AND active = {} ORDER BY name, id",
            USER_COLUMNS,
            dialect.placeholder(1),
            dialect.placeholder(2)
        ),
    )
    .bind(department)
    .bind(true)
}

/// Number of active users in one department.
pub fn count_active_by_department(dialect: DatabaseType, department: &str) -> Statement {
    Statement::new(
        "count users by department",
        format!(
            "SELECT COUNT(*) FROM users WHERE department = {} AND active = {}",
            dialect.placeholder(1),
            dialect.placeholder(2)
        ),
    )
    .bind(department)
    .bind(true)
}

pub fn count_users() -> Statement {
    Statement::new("count users", "SELECT COUNT(*) FROM users")
}

/// Liveness probe used by `test_connection`. Always yields a 64-bit integer.
pub fn probe(dialect: DatabaseType) -> Statement {
    let sql = match dialect {
        DatabaseType::PostgreSQL => "SELECT 1::bigint",
        DatabaseType::MySQL | DatabaseType::SQLite => "SELECT 1",
    };
    Statement::new("connection probe", sql)
}
