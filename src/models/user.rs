//! User entity and its create/update documents.

use crate::error::{DbError, DbResult};
use chrono::{NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is a valid regex")
});

/// Current wall-clock time as stored in the timestamp columns.
pub fn now() -> NaiveDateTime {
    Utc::now().naive_utc()
}

fn default_active() -> bool {
    true
}

/// A persisted user record.
///
/// Equality and hashing consider only `id` and `email`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct User {
    /// Store-assigned identity. Absent until the record is inserted.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub email: String,
    pub department: String,
    pub role: String,
    #[serde(default = "default_active")]
    pub active: bool,
    /// Creation time (UTC, ISO-8601)
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub created_at: Option<NaiveDateTime>,
    /// Last modification time (UTC, ISO-8601)
    #[serde(default)]
    #[schemars(with = "Option<String>")]
    pub updated_at: Option<NaiveDateTime>,
}

impl PartialEq for User {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.email == other.email
    }
}

impl Eq for User {}

impl Hash for User {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.email.hash(state);
    }
}

impl User {
    /// Build an unsaved, active user stamped with the current time.
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        department: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        let now = now();
        Self {
            id: None,
            name: name.into(),
            email: email.into(),
            department: department.into(),
            role: role.into(),
            active: true,
            created_at: Some(now),
            updated_at: Some(now),
        }
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
        self.touch();
    }

    pub fn set_email(&mut self, email: impl Into<String>) {
        self.email = email.into();
        self.touch();
    }

    pub fn set_department(&mut self, department: impl Into<String>) {
        self.department = department.into();
        self.touch();
    }

    pub fn set_role(&mut self, role: impl Into<String>) {
        self.role = role.into();
        self.touch();
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Some(now());
    }

    /// Check the field constraints enforced before any write.
    pub fn validate(&self) -> DbResult<()> {
        validate_fields(&self.name, &self.email, &self.department, &self.role)
    }
}

/// Fields for creating a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NewUser {
    /// Display name, 2-50 characters
    pub name: String,
    /// Unique email address
    pub email: String,
    pub department: String,
    pub role: String,
}

impl NewUser {
    pub fn new(
        name: impl Into<String>,
        email: impl Into<String>,
        department: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            department: department.into(),
            role: role.into(),
        }
    }

    pub fn validate(&self) -> DbResult<()> {
        validate_fields(&self.name, &self.email, &self.department, &self.role)
    }

    /// Turn the document into an unsaved, active `User`.
    pub fn into_user(self) -> User {
        User::new(self.name, self.email, self.department, self.role)
    }
}

/// Partial update document. Absent fields keep their stored values.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct UserUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub active: Option<bool>,
}

impl UserUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn department(mut self, department: impl Into<String>) -> Self {
        self.department = Some(department.into());
        self
    }

    pub fn role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn active(mut self, active: bool) -> Self {
        self.active = Some(active);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.email.is_none()
            && self.department.is_none()
            && self.role.is_none()
            && self.active.is_none()
    }

    /// Merge the present fields onto `user` through its setters.
    pub fn apply_to(self, user: &mut User) {
        if let Some(name) = self.name {
            user.set_name(name);
        }
        if let Some(email) = self.email {
            user.set_email(email);
        }
        if let Some(department) = self.department {
            user.set_department(department);
        }
        if let Some(role) = self.role {
            user.set_role(role);
        }
        if let Some(active) = self.active {
            user.set_active(active);
        }
    }
}

fn validate_fields(name: &str, email: &str, department: &str, role: &str) -> DbResult<()> {
    if name.trim().is_empty() {
        return Err(DbError::validation("name", "name is required"));
    }
    // Counted as stored, padding included; the column holds at most 50.
    if !(NAME_MIN_CHARS..=NAME_MAX_CHARS).contains(&name.chars().count()) {
        return Err(DbError::validation(
            "name",
            format!(
                "name must be between {} and {} characters",
                NAME_MIN_CHARS, NAME_MAX_CHARS
            ),
        ));
    }
    if email.trim().is_empty() {
        return Err(DbError::validation("email", "email is required"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(DbError::validation("email", "email must be a valid address"));
    }
    if department.trim().is_empty() {
        return Err(DbError::validation("department", "department is required"));
    }
    if role.trim().is_empty() {
        return Err(DbError::validation("role", "role is required"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn sample() -> User {
        User::new("Ana Lopez", "ana@example.com", "Engineering", "Developer")
    }

    #[test]
    fn test_new_user_defaults() {
        let user = sample();
        assert!(user.id.is_none());
        assert!(user.active);
        assert!(user.created_at.is_some());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn test_equality_uses_id_and_email_only() {
        let a = sample().with_id(1);
        let mut b = sample().with_id(1);
        b.name = "Someone Else".to_string();
        b.active = false;
        assert_eq!(a, b);

        let c = sample().with_id(2);
        assert_ne!(a, c);

        let mut set = HashSet::new();
        set.insert(a);
        assert!(set.contains(&b));
    }

    #[test]
    fn test_setters_refresh_updated_at() {
        let mut user = sample();
        user.updated_at = None;
        user.set_role("Lead");
        assert_eq!(user.role, "Lead");
        assert!(user.updated_at.is_some());
    }

    #[test]
    fn test_update_only_touches_present_fields() {
        let mut user = sample().with_id(9);
        let created = user.created_at;
        UserUpdate::default().name("Ana Maria").apply_to(&mut user);
        assert_eq!(user.name, "Ana Maria");
        assert_eq!(user.email, "ana@example.com");
        assert_eq!(user.department, "Engineering");
        assert_eq!(user.role, "Developer");
        assert!(user.active);
        assert_eq!(user.created_at, created);
    }

    #[test]
    fn test_empty_update() {
        assert!(UserUpdate::default().is_empty());
        assert!(!UserUpdate::default().active(false).is_empty());
    }

    #[test]
    fn test_validation_accepts_valid_user() {
        assert!(sample().validate().is_ok());
        assert!(
            NewUser::new("Al", "al@corp.io", "Sales", "Rep")
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_validation_rejects_bad_name() {
        let err = NewUser::new("A", "a@corp.io", "Sales", "Rep")
            .validate()
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { ref field, .. } if field == "name"));

        let long = "x".repeat(NAME_MAX_CHARS + 1);
        assert!(NewUser::new(long, "a@corp.io", "Sales", "Rep").validate().is_err());
        assert!(NewUser::new("   ", "a@corp.io", "Sales", "Rep").validate().is_err());
    }

    #[test]
    fn test_name_length_counts_surrounding_whitespace() {
        let padded = format!("{}Bob{}", " ".repeat(30), " ".repeat(30));
        let err = NewUser::new(padded, "pad@corp.io", "Sales", "Rep")
            .validate()
            .unwrap_err();
        assert!(matches!(err, DbError::Validation { ref field, .. } if field == "name"));

        // Multi-byte characters count once each.
        assert!(NewUser::new("é".repeat(NAME_MAX_CHARS), "e@corp.io", "Sales", "Rep")
            .validate()
            .is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_email() {
        for email in ["", "plain", "a@b", "a b@c.io", "@c.io"] {
            let err = NewUser::new("Ann", email, "Sales", "Rep")
                .validate()
                .unwrap_err();
            assert!(
                matches!(err, DbError::Validation { ref field, .. } if field == "email"),
                "{email} should be rejected"
            );
        }
    }

    #[test]
    fn test_validation_rejects_blank_department_and_role() {
        assert!(NewUser::new("Ann", "a@c.io", " ", "Rep").validate().is_err());
        assert!(NewUser::new("Ann", "a@c.io", "Sales", "").validate().is_err());
    }

    #[test]
    fn test_user_deserializes_with_defaults() {
        let user: User = serde_json::from_str(
            r#"{"name": "Bo", "email": "bo@x.io", "department": "Ops", "role": "SRE"}"#,
        )
        .unwrap();
        assert!(user.id.is_none());
        assert!(user.active);
        assert!(user.created_at.is_none());
    }
}
