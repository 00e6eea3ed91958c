//! Integration tests for single-user create, read, update and delete.
//!
//! Tests verify that:
//! - Created users get an id and default to active
//! - Invalid fields are rejected before touching the store
//! - Duplicate emails are reported as such on insert and update
//! - Updates merge only the given fields and refresh updated_at

mod common;

use common::{new_user, sqlite_repository};
use user_db_mcp_server::error::DbError;
use user_db_mcp_server::models::UserUpdate;

#[tokio::test]
async fn test_create_then_find_by_id() {
    let (_dir, repo) = sqlite_repository().await;

    let created = repo
        .create_user(new_user("Ana Lopez", "ana@example.com", "Engineering", "Developer"))
        .await
        .unwrap();
    let id = created.id.expect("generated id");
    assert!(created.active);
    assert!(created.created_at.is_some());

    let found = repo.find_user_by_id(id).await.unwrap().unwrap();
    assert_eq!(found.name, "Ana Lopez");
    assert_eq!(found.email, "ana@example.com");
    assert_eq!(found.department, "Engineering");
    assert_eq!(found.role, "Developer");
    assert!(found.active);
    assert_eq!(found, created);
}

#[tokio::test]
async fn test_find_missing_user_is_none() {
    let (_dir, repo) = sqlite_repository().await;
    assert!(repo.find_user_by_id(12345).await.unwrap().is_none());
}

#[tokio::test]
async fn test_create_rejects_invalid_fields() {
    let (_dir, repo) = sqlite_repository().await;

    let cases = [
        (new_user("A", "a@example.com", "Eng", "Dev"), "name"),
        (new_user(&"x".repeat(51), "x@example.com", "Eng", "Dev"), "name"),
        (new_user("Ana Lopez", "not-an-email", "Eng", "Dev"), "email"),
        (new_user("Ana Lopez", "", "Eng", "Dev"), "email"),
        (new_user("Ana Lopez", "ana@example.com", " ", "Dev"), "department"),
        (new_user("Ana Lopez", "ana@example.com", "Eng", ""), "role"),
    ];
    for (input, expected_field) in cases {
        match repo.create_user(input).await.unwrap_err() {
            DbError::Validation { field, .. } => assert_eq!(field, expected_field),
            other => panic!("expected validation error, got {other:?}"),
        }
    }
    assert_eq!(repo.count_users().await.unwrap(), 0);
}

#[tokio::test]
async fn test_name_length_bounds_are_inclusive() {
    let (_dir, repo) = sqlite_repository().await;
    repo.create_user(new_user("Al", "al@example.com", "Eng", "Dev"))
        .await
        .unwrap();
    repo.create_user(new_user(&"n".repeat(50), "long@example.com", "Eng", "Dev"))
        .await
        .unwrap();
    assert_eq!(repo.count_users().await.unwrap(), 2);
}

#[tokio::test]
async fn test_padded_name_over_limit_is_rejected() {
    let (_dir, repo) = sqlite_repository().await;
    let padded = format!("{}Bob{}", " ".repeat(30), " ".repeat(30));

    match repo
        .create_user(new_user(&padded, "pad@example.com", "Eng", "Dev"))
        .await
        .unwrap_err()
    {
        DbError::Validation { field, .. } => assert_eq!(field, "name"),
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(repo.count_users().await.unwrap(), 0);

    let id = repo
        .create_user(new_user("Bob Stone", "bob@example.com", "Eng", "Dev"))
        .await
        .unwrap()
        .id
        .unwrap();
    let err = repo
        .update_user(id, UserUpdate::default().name(padded))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Validation { .. }));
    let stored = repo.find_user_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.name, "Bob Stone");
}

#[tokio::test]
async fn test_duplicate_email_on_create() {
    let (_dir, repo) = sqlite_repository().await;
    repo.create_user(new_user("Ana Lopez", "ana@example.com", "Eng", "Dev"))
        .await
        .unwrap();

    let err = repo
        .create_user(new_user("Ana Other", "ana@example.com", "Sales", "Rep"))
        .await
        .unwrap_err();
    match err {
        DbError::DuplicateEmail { email } => assert_eq!(email, "ana@example.com"),
        other => panic!("expected duplicate email, got {other:?}"),
    }
    assert_eq!(repo.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_update_changes_only_given_fields() {
    let (_dir, repo) = sqlite_repository().await;
    let created = repo
        .create_user(new_user("Ana Lopez", "ana@example.com", "Engineering", "Developer"))
        .await
        .unwrap();
    let id = created.id.unwrap();

    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    let updated = repo
        .update_user(id, UserUpdate::default().name("Ana Maria Lopez"))
        .await
        .unwrap();

    assert_eq!(updated.name, "Ana Maria Lopez");
    assert_eq!(updated.email, "ana@example.com");
    assert_eq!(updated.department, "Engineering");
    assert_eq!(updated.role, "Developer");
    assert_eq!(updated.created_at, created.created_at);
    assert!(updated.updated_at > created.updated_at);
}

#[tokio::test]
async fn test_update_can_deactivate() {
    let (_dir, repo) = sqlite_repository().await;
    let id = repo
        .create_user(new_user("Ana Lopez", "ana@example.com", "Eng", "Dev"))
        .await
        .unwrap()
        .id
        .unwrap();

    let updated = repo
        .update_user(id, UserUpdate::default().active(false))
        .await
        .unwrap();
    assert!(!updated.active);
    assert_eq!(repo.execute_count_by_department("Eng").await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_missing_user_is_not_found() {
    let (_dir, repo) = sqlite_repository().await;
    let err = repo
        .update_user(999, UserUpdate::default().role("Lead"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound { .. }));
}

#[tokio::test]
async fn test_update_to_taken_email_is_duplicate() {
    let (_dir, repo) = sqlite_repository().await;
    repo.create_user(new_user("Ana Lopez", "ana@example.com", "Eng", "Dev"))
        .await
        .unwrap();
    let bo = repo
        .create_user(new_user("Bo Chen", "bo@example.com", "Eng", "Dev"))
        .await
        .unwrap();

    let err = repo
        .update_user(bo.id.unwrap(), UserUpdate::default().email("ana@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::DuplicateEmail { .. }));

    let unchanged = repo.find_user_by_id(bo.id.unwrap()).await.unwrap().unwrap();
    assert_eq!(unchanged.email, "bo@example.com");
}

#[tokio::test]
async fn test_update_rejects_invalid_merge() {
    let (_dir, repo) = sqlite_repository().await;
    let id = repo
        .create_user(new_user("Ana Lopez", "ana@example.com", "Eng", "Dev"))
        .await
        .unwrap()
        .id
        .unwrap();

    let err = repo
        .update_user(id, UserUpdate::default().email("broken"))
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Validation { .. }));
}

#[tokio::test]
async fn test_delete_reports_whether_a_row_was_removed() {
    let (_dir, repo) = sqlite_repository().await;
    let id = repo
        .create_user(new_user("Ana Lopez", "ana@example.com", "Eng", "Dev"))
        .await
        .unwrap()
        .id
        .unwrap();

    repo.create_user(new_user("Bo Chen", "bo@example.com", "Eng", "Dev"))
        .await
        .unwrap();
    assert_eq!(repo.count_users().await.unwrap(), 2);

    assert!(repo.delete_user(id).await.unwrap());
    assert!(repo.find_user_by_id(id).await.unwrap().is_none());
    assert_eq!(repo.count_users().await.unwrap(), 1);

    assert!(!repo.delete_user(id).await.unwrap());
    assert_eq!(repo.count_users().await.unwrap(), 1);
}

#[tokio::test]
async fn test_email_is_reusable_after_delete() {
    let (_dir, repo) = sqlite_repository().await;
    let id = repo
        .create_user(new_user("Ana Lopez", "ana@example.com", "Eng", "Dev"))
        .await
        .unwrap()
        .id
        .unwrap();
    repo.delete_user(id).await.unwrap();

    let again = repo
        .create_user(new_user("Ana Lopez", "ana@example.com", "Eng", "Dev"))
        .await
        .unwrap();
    assert_ne!(again.id, Some(id));
}
