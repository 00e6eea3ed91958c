//! Query-related data models.
//!
//! This module defines bound parameter values, the statement type handed to the
//! executor, and the filter/pagination request used by `search_users`.

use chrono::NaiveDateTime;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default page size for search and pagination.
pub const DEFAULT_PAGE_LIMIT: i64 = 10;

/// Maximum allowed page size.
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// A parameter value for parameterized statements.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryParam {
    Bool(bool),
    /// Integer value (stored as i64 for maximum range)
    Int(i64),
    String(String),
    /// Nullable timestamp. Kept typed so PostgreSQL sees `timestamp`, not `text`, for NULL.
    Timestamp(Option<NaiveDateTime>),
}

impl From<bool> for QueryParam {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for QueryParam {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for QueryParam {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for QueryParam {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<Option<NaiveDateTime>> for QueryParam {
    fn from(v: Option<NaiveDateTime>) -> Self {
        Self::Timestamp(v)
    }
}

/// A parameterized statement ready for the executor.
///
/// `intent` names what the statement does ("find user by id"). It is what gets
/// logged when execution fails; bound values never are.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub intent: &'static str,
    pub sql: String,
    pub params: Vec<QueryParam>,
    /// Email written by this statement. A unique violation is reported as a
    /// duplicate of this address.
    pub unique_email: Option<String>,
}

impl Statement {
    pub fn new(intent: &'static str, sql: impl Into<String>) -> Self {
        Self {
            intent,
            sql: sql.into(),
            params: Vec::new(),
            unique_email: None,
        }
    }

    pub fn with_unique_email(mut self, email: impl Into<String>) -> Self {
        self.unique_email = Some(email.into());
        self
    }

    /// Add a parameter to this statement.
    pub fn bind(mut self, param: impl Into<QueryParam>) -> Self {
        self.params.push(param.into());
        self
    }

    /// Replace the parameter list.
    pub fn with_params(mut self, params: Vec<QueryParam>) -> Self {
        self.params = params;
        self
    }
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

/// Filter and pagination request for `search_users`.
///
/// Absent filters are skipped entirely; `limit` and `offset` always apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserQuery {
    /// Only users in this department
    #[serde(default)]
    pub department: Option<String>,
    /// Only users with this role
    #[serde(default)]
    pub role: Option<String>,
    /// Only active (true) or inactive (false) users
    #[serde(default)]
    pub active: Option<bool>,
    /// Page size. Default: 10, clamped to [1, 1000]
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// Rows to skip. Default: 0
    #[serde(default)]
    pub offset: i64,
}

impl Default for UserQuery {
    fn default() -> Self {
        Self {
            department: None,
            role: None,
            active: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }
}

impl UserQuery {
    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn with_page(mut self, limit: i64, offset: i64) -> Self {
        self.limit = limit;
        self.offset = offset;
        self
    }
}
