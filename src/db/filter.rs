//! Dynamic WHERE/ORDER/LIMIT assembly.
//!
//! [`FilterBuilder`] appends a clause and pushes its parameter in the same
//! call, rendering the placeholder from the parameter count at that moment.
//! SQL text and parameter list therefore cannot drift apart, and no user
//! value is ever interpolated into the text.

use crate::db::mapper::USER_COLUMNS;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, MAX_PAGE_LIMIT, QueryParam, Statement, UserQuery};

/// Newest first; `id` breaks ties between rows created in the same instant.
pub const NEWEST_FIRST: &str = "created_at DESC, id DESC";

#[derive(Debug, Clone)]
pub struct FilterBuilder {
    dialect: DatabaseType,
    sql: String,
    params: Vec<QueryParam>,
}

impl FilterBuilder {
    /// Start from `base` followed by a trivially-true predicate.
    pub fn new(dialect: DatabaseType, base: impl Into<String>) -> Self {
        let mut sql = base.into();
        sql.push_str(" WHERE 1=1");
        Self {
            dialect,
            sql,
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, value: QueryParam) -> String {
        self.params.push(value);
        self.dialect.placeholder(self.params.len())
    }

    /// Append `AND <column> = ?` and bind `value`.
    pub fn and_eq(mut self, column: &'static str, value: impl Into<QueryParam>) -> Self {
        let placeholder = self.push_param(value.into());
        self.sql
            .push_str(&format!(" AND {} = {}", column, placeholder));
        self
    }

    /// Like [`and_eq`](Self::and_eq), but an absent value adds nothing.
    pub fn and_eq_opt<V: Into<QueryParam>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.and_eq(column, v),
            None => self,
        }
    }

    pub fn order_by(mut self, ordering: &'static str) -> Self {
        self.sql.push_str(" ORDER BY ");
        self.sql.push_str(ordering);
        self
    }

    /// Append `LIMIT ? OFFSET ?`, binding limit first.
    pub fn limit_offset(mut self, limit: i64, offset: i64) -> Self {
        let limit_ph = self.push_param(QueryParam::Int(limit));
        let offset_ph = self.push_param(QueryParam::Int(offset));
        self.sql
            .push_str(&format!(" LIMIT {} OFFSET {}", limit_ph, offset_ph));
        self
    }

    pub fn build(self, intent: &'static str) -> Statement {
        Statement::new(intent, self.sql).with_params(self.params)
    }
}

/// Clamp `limit` to `[1, MAX_PAGE_LIMIT]` and reject a negative offset.
pub fn normalize_page(limit: i64, offset: i64) -> DbResult<(i64, i64)> {
    if offset < 0 {
        return Err(DbError::validation("offset", "offset must not be negative"));
    }
    Ok((limit.clamp(1, MAX_PAGE_LIMIT), offset))
}

/// Filtered, paginated user search.
///
/// Filters apply in the order department, role, active.
pub fn user_search(dialect: DatabaseType, query: &UserQuery) -> DbResult<Statement> {
    let (limit, offset) = normalize_page(query.limit, query.offset)?;
    Ok(
        FilterBuilder::new(dialect, format!("SELECT {} FROM users", USER_COLUMNS))
            .and_eq_opt("department", query.department.as_deref())
            .and_eq_opt("role", query.role.as_deref())
            .and_eq_opt("active", query.active)
            .order_by(NEWEST_FIRST)
            .limit_offset(limit, offset)
            .build("search users"),
    )
}

/// Unfiltered page of users, newest first. Same statement shape as an empty search.
pub fn user_page(dialect: DatabaseType, offset: i64, limit: i64) -> DbResult<Statement> {
    let query = UserQuery::default().with_page(limit, offset);
    let mut stmt = user_search(dialect, &query)?;
    stmt.intent = "find users with pagination";
    Ok(stmt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn select() -> String {
        format!("SELECT {} FROM users", USER_COLUMNS)
    }

    #[test]
    fn test_no_filters_still_orders_and_paginates() {
        let stmt = user_search(DatabaseType::SQLite, &UserQuery::default()).unwrap();
        assert_eq!(
            stmt.sql,
            format!(
                "{} WHERE 1=1 ORDER BY created_at DESC, id DESC LIMIT ? OFFSET ?",
                select()
            )
        );
        assert_eq!(stmt.params, vec![QueryParam::Int(10), QueryParam::Int(0)]);
    }

    #[test]
    fn test_filters_bind_in_order_for_postgres() {
        let query = UserQuery::default()
            .with_department("Engineering")
            .with_role("Developer")
            .with_active(true)
            .with_page(5, 20);
        let stmt = user_search(DatabaseType::PostgreSQL, &query).unwrap();
        assert!(stmt.sql.ends_with(
            "WHERE 1=1 AND department = $1 AND role = $2 AND active = $3 \
             ORDER BY created_at DESC, id DESC LIMIT $4 OFFSET $5"
        ));
        assert_eq!(
            stmt.params,
            vec![
                QueryParam::String("Engineering".into()),
                QueryParam::String("Developer".into()),
                QueryParam::Bool(true),
                QueryParam::Int(5),
                QueryParam::Int(20),
            ]
        );
    }

    #[test]
    fn test_absent_filters_are_skipped_not_bound_as_null() {
        let query = UserQuery::default().with_active(false);
        let stmt = user_search(DatabaseType::PostgreSQL, &query).unwrap();
        assert!(stmt.sql.contains("AND active = $1"));
        assert!(!stmt.sql.contains("department ="));
        assert!(!stmt.sql.contains("role ="));
        assert_eq!(
            stmt.params,
            vec![QueryParam::Bool(false), QueryParam::Int(10), QueryParam::Int(0)]
        );
    }

    #[test]
    fn test_placeholder_count_matches_params() {
        let query = UserQuery::default().with_role("Lead").with_page(3, 1);
        for dialect in [
            DatabaseType::SQLite,
            DatabaseType::MySQL,
            DatabaseType::PostgreSQL,
        ] {
            let stmt = user_search(dialect, &query).unwrap();
            let count = match dialect {
                DatabaseType::PostgreSQL => stmt.sql.matches('$').count(),
                _ => stmt.sql.matches('?').count(),
            };
            assert_eq!(count, stmt.params.len());
        }
    }

    #[test]
    fn test_values_never_interpolated() {
        let query = UserQuery::default().with_department("x' OR '1'='1");
        let stmt = user_search(DatabaseType::MySQL, &query).unwrap();
        assert!(!stmt.sql.contains("OR '1'"));
        assert_eq!(stmt.params[0], QueryParam::String("x' OR '1'='1".into()));
    }

    #[test]
    fn test_limit_is_clamped() {
        let stmt = user_search(DatabaseType::SQLite, &UserQuery::default().with_page(0, 0)).unwrap();
        assert_eq!(stmt.params[0], QueryParam::Int(1));
        let stmt =
            user_search(DatabaseType::SQLite, &UserQuery::default().with_page(5000, 0)).unwrap();
        assert_eq!(stmt.params[0], QueryParam::Int(MAX_PAGE_LIMIT));
    }

    #[test]
    fn test_negative_offset_rejected() {
        let err = user_search(DatabaseType::SQLite, &UserQuery::default().with_page(10, -1))
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { ref field, .. } if field == "offset"));
        assert!(user_page(DatabaseType::SQLite, -5, 10).is_err());
    }

    #[test]
    fn test_page_equals_empty_search() {
        let page = user_page(DatabaseType::PostgreSQL, 0, 10).unwrap();
        let search = user_search(DatabaseType::PostgreSQL, &UserQuery::default()).unwrap();
        assert_eq!(page.sql, search.sql);
        assert_eq!(page.params, search.params);
    }
}
