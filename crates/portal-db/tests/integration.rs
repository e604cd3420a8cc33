//! Integration tests for portal-db
//!
//! Tests database operations with real SQLite in-memory database

use chrono::Utc;
use portal_db::{
    connect,
    entities::{account, onboarding_submission, support_request},
    migrate, unique_violation,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter, Set,
};
use uuid::Uuid;

/// Helper to create a test database
async fn setup_test_db() -> sea_orm::DatabaseConnection {
    let db = connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory database");

    migrate(&db).await.expect("Failed to run migrations");

    db
}

fn new_account(email: &str, code: &str) -> account::ActiveModel {
    let now = Utc::now();
    account::ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(email.to_string()),
        password_hash: Set("$argon2id$placeholder".to_string()),
        full_name: Set(Some("Test Staff".to_string())),
        phone: Set(None),
        avatar_url: Set(None),
        company_name: Set(None),
        account_code: Set(code.to_string()),
        role: Set("staff".to_string()),
        is_active: Set(true),
        must_change_password: Set(false),
        reset_token_hash: Set(None),
        reset_token_expires_at: Set(None),
        last_login_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

fn new_submission(company_email: &str, customer_id: &str) -> onboarding_submission::ActiveModel {
    let now = Utc::now();
    onboarding_submission::ActiveModel {
        id: Set(Uuid::new_v4()),
        customer_id: Set(customer_id.to_string()),
        company_name: Set("Acme".to_string()),
        company_email: Set(company_email.to_string()),
        contact_name: Set(None),
        contact_phone: Set(None),
        contact_email: Set(None),
        secondary_contact_name: Set(None),
        secondary_contact_phone: Set(None),
        secondary_contact_email: Set(None),
        number_of_accounts: Set(2),
        aliases: Set(r#"{"A":"sales","B":"hr"}"#.to_string()),
        other_aliases: Set(None),
        agree: Set(true),
        acknowledge: Set(true),
        confirm: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[tokio::test]
async fn test_database_connection() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let backend = db.get_database_backend();
    assert!(matches!(backend, sea_orm::DatabaseBackend::Sqlite));
}

#[tokio::test]
async fn test_migrations_run_successfully() {
    let db = connect("sqlite::memory:").await.expect("Failed to connect");

    let result = migrate(&db).await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_create_and_find_account_by_email() {
    let db = setup_test_db().await;

    new_account("staff@acme.test", "ST-AAAA1111")
        .insert(&db)
        .await
        .expect("Failed to insert account");

    let found = account::Entity::find()
        .filter(account::Column::Email.eq("staff@acme.test"))
        .one(&db)
        .await
        .expect("Failed to query")
        .expect("Account not found");

    assert_eq!(found.account_code, "ST-AAAA1111");
    assert!(found.is_active);
    assert!(!found.must_change_password);
}

#[tokio::test]
async fn test_account_email_unique_index() {
    let db = setup_test_db().await;

    new_account("dup@acme.test", "ST-AAAA1111")
        .insert(&db)
        .await
        .expect("First insert should succeed");

    let err = new_account("dup@acme.test", "ST-BBBB2222")
        .insert(&db)
        .await
        .expect_err("Second insert with same email must fail");

    let message = unique_violation(&err).expect("Expected a unique violation");
    assert!(message.contains("email"), "unexpected message: {message}");
}

#[tokio::test]
async fn test_company_email_unique_index_rejects_second_write() {
    let db = setup_test_db().await;

    new_submission("ops@acme.test", "CS-AAAA1111")
        .insert(&db)
        .await
        .expect("First insert should succeed");

    let err = new_submission("ops@acme.test", "CS-BBBB2222")
        .insert(&db)
        .await
        .expect_err("Duplicate company email must be rejected by storage");

    let message = unique_violation(&err).expect("Expected a unique violation");
    assert!(message.contains("company_email"), "unexpected message: {message}");

    let count = onboarding_submission::Entity::find()
        .count(&db)
        .await
        .expect("Failed to count");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn test_customer_id_unique_index() {
    let db = setup_test_db().await;

    new_submission("one@acme.test", "CS-SAME0001")
        .insert(&db)
        .await
        .expect("First insert should succeed");

    let err = new_submission("two@acme.test", "CS-SAME0001")
        .insert(&db)
        .await
        .expect_err("Duplicate customer id must be rejected by storage");

    let message = unique_violation(&err).expect("Expected a unique violation");
    assert!(message.contains("customer_id"), "unexpected message: {message}");
}

#[tokio::test]
async fn test_support_request_without_tracker_reference() {
    let db = setup_test_db().await;
    let now = Utc::now();

    let request = support_request::ActiveModel {
        id: Set(Uuid::new_v4()),
        kind: Set("support".to_string()),
        reporter_id: Set(Uuid::new_v4()),
        reporter_name: Set(None),
        reporter_email: Set("ops@acme.test".to_string()),
        customer_id: Set(Some("CS-AAAA1111".to_string())),
        subject: Set("Cannot log in".to_string()),
        description: Set("Login page spins forever".to_string()),
        priority: Set("high".to_string()),
        category: Set("access".to_string()),
        attachment: Set(None),
        tracker_key: Set(None),
        tracker_id: Set(None),
        tracker_url: Set(None),
        tracker_status: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&db)
    .await
    .expect("Failed to insert support request");

    assert!(request.tracker_key.is_none());
    assert_eq!(request.priority, "high");
}
