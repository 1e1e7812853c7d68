use axum::http::StatusCode;
use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, error};

use crate::auth::password::{
    hash_password, is_strong_enough, verify_against_dummy, verify_password,
};
use crate::users::dto::{is_valid_email, non_blank, normalize_email};
use crate::users::repo::StoreError;
use crate::users::repo_types::{NewUser, User, UserChanges};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("Name and Email cannot be empty.")]
    MissingField,
    #[error("Invalid email")]
    InvalidEmail,
    #[error("Password is required")]
    MissingPassword,
    #[error("Password must be at least 8 characters")]
    WeakPassword,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("password hashing failed: {0}")]
    Hash(anyhow::Error),
}

impl UserError {
    pub fn status(&self) -> StatusCode {
        match self {
            UserError::Store(e) => e.status(),
            UserError::Hash(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

/// Maps a service error to the `(status, message)` rejection the JSON
/// handlers return, logging anything that is our fault.
pub fn rejection(e: UserError) -> (StatusCode, String) {
    let status = e.status();
    if status.is_server_error() {
        error!(error = %e, "user operation failed");
    }
    (status, e.to_string())
}

fn checked_email(raw: &str) -> Result<String, UserError> {
    let email = normalize_email(raw);
    if !is_valid_email(&email) {
        return Err(UserError::InvalidEmail);
    }
    Ok(email)
}

fn checked_hash(password: &str) -> Result<String, UserError> {
    if !is_strong_enough(password) {
        return Err(UserError::WeakPassword);
    }
    hash_password(password).map_err(UserError::Hash)
}

/// Validate, hash and insert. Blank passwords are an error only when
/// `password_required` is set; otherwise the user is stored without one.
pub async fn create_user(
    db: &SqlitePool,
    username: &str,
    email: &str,
    password: Option<&str>,
    password_required: bool,
) -> Result<User, UserError> {
    let username = non_blank(Some(username)).ok_or(UserError::MissingField)?;
    let email = non_blank(Some(email)).ok_or(UserError::MissingField)?;
    let email = checked_email(&email)?;

    let password_hash = match password.filter(|p| !p.is_empty()) {
        Some(p) => Some(checked_hash(p)?),
        None if password_required => return Err(UserError::MissingPassword),
        None => None,
    };

    let user = User::create(
        db,
        NewUser {
            username,
            email,
            password_hash,
        },
    )
    .await?;
    Ok(user)
}

/// Partial update; blank fields are left as they are.
pub async fn update_user(
    db: &SqlitePool,
    id: i64,
    username: Option<&str>,
    email: Option<&str>,
    password: Option<&str>,
) -> Result<User, UserError> {
    let email = match non_blank(email) {
        Some(e) => Some(checked_email(&e)?),
        None => None,
    };
    let password_hash = match password.filter(|p| !p.is_empty()) {
        Some(p) => Some(checked_hash(p)?),
        None => None,
    };
    let changes = UserChanges {
        username: non_blank(username),
        email,
        password_hash,
    };
    if changes.is_empty() {
        debug!(id, "empty update");
    }
    let user = User::update(db, id, changes).await?;
    Ok(user)
}

pub async fn reset_password(
    db: &SqlitePool,
    email: &str,
    new_password: &str,
) -> Result<User, UserError> {
    let email = checked_email(email)?;
    if new_password.is_empty() {
        return Err(UserError::MissingPassword);
    }
    let hash = checked_hash(new_password)?;
    let user = User::set_password_by_email(db, &email, &hash).await?;
    Ok(user)
}

/// The user if `username` exists, has a password, and `password` matches.
pub async fn authenticate(
    db: &SqlitePool,
    username: &str,
    password: &str,
) -> Result<Option<User>, UserError> {
    let Some(user) = User::find_account(db, username.trim()).await? else {
        verify_against_dummy(password);
        return Ok(None);
    };
    let Some(hash) = user.password_hash.as_deref() else {
        verify_against_dummy(password);
        return Ok(None);
    };
    if !verify_password(password, hash).map_err(UserError::Hash)? {
        return Ok(None);
    }
    Ok(Some(user))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[tokio::test]
    async fn create_normalizes_and_hashes() {
        let db = db::memory().await;
        let user = create_user(&db, "  mohon ", " Mohon@Example.com", Some("abcd1234"), true)
            .await
            .expect("create");
        assert_eq!(user.username, "mohon");
        assert_eq!(user.email, "mohon@example.com");
        let hash = user.password_hash.expect("hash stored");
        assert_ne!(hash, "abcd1234");
        assert!(verify_password("abcd1234", &hash).unwrap());
    }

    #[tokio::test]
    async fn create_validates_input() {
        let db = db::memory().await;
        let err = create_user(&db, " ", "a@b.io", None, false).await.unwrap_err();
        assert!(matches!(err, UserError::MissingField));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);

        let err = create_user(&db, "ann", "nope", None, false).await.unwrap_err();
        assert!(matches!(err, UserError::InvalidEmail));

        let err = create_user(&db, "ann", "a@b.io", Some(""), true).await.unwrap_err();
        assert!(matches!(err, UserError::MissingPassword));

        let err = create_user(&db, "ann", "a@b.io", Some("short"), true).await.unwrap_err();
        assert!(matches!(err, UserError::WeakPassword));

        assert!(User::list(&db, None, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn duplicate_email_differing_in_case_conflicts() {
        let db = db::memory().await;
        create_user(&db, "ann", "ann@example.com", None, false).await.expect("ann");
        let err = create_user(&db, "ann2", "ANN@example.com", None, false)
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn authenticate_checks_password() {
        let db = db::memory().await;
        create_user(&db, "mohon", "mohon@example.com", Some("abcd1234"), true)
            .await
            .expect("create");
        create_user(&db, "nopass", "nopass@example.com", None, false)
            .await
            .expect("create");

        assert!(authenticate(&db, "mohon", "abcd1234").await.unwrap().is_some());
        assert!(authenticate(&db, "mohon", "wrong-pass").await.unwrap().is_none());
        assert!(authenticate(&db, "ghost", "abcd1234").await.unwrap().is_none());
        assert!(authenticate(&db, "nopass", "").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn authenticate_finds_account_among_same_name_rows() {
        let db = db::memory().await;
        create_user(&db, "ann", "ann@example.com", None, false).await.expect("plain");
        create_user(&db, "ann", "ann2@example.com", Some("abcd1234"), true)
            .await
            .expect("account");
        create_user(&db, "ann", "ann3@example.com", None, false).await.expect("plain");

        let user = authenticate(&db, "ann", "abcd1234").await.unwrap().expect("login");
        assert_eq!(user.email, "ann2@example.com");

        let err = create_user(&db, "ann", "ann4@example.com", Some("other-pass"), true)
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Store(StoreError::UsernameTaken)));
    }

    #[tokio::test]
    async fn unknown_username_costs_a_hash_verification() {
        let db = db::memory().await;
        create_user(&db, "mohon", "mohon@example.com", Some("abcd1234"), true)
            .await
            .expect("create");
        // first call builds the dummy hash
        authenticate(&db, "ghost", "abcd1234").await.unwrap();

        let start = std::time::Instant::now();
        assert!(authenticate(&db, "mohon", "wrong-pass").await.unwrap().is_none());
        let mismatch = start.elapsed();

        let start = std::time::Instant::now();
        assert!(authenticate(&db, "ghost", "wrong-pass").await.unwrap().is_none());
        let unknown = start.elapsed();

        assert!(unknown * 4 >= mismatch, "unknown {unknown:?} vs mismatch {mismatch:?}");
    }

    #[tokio::test]
    async fn reset_password_replaces_hash() {
        let db = db::memory().await;
        create_user(&db, "ann", "ann@example.com", Some("first-pass"), true)
            .await
            .expect("create");
        reset_password(&db, "ANN@example.com", "second-pass").await.expect("reset");

        assert!(authenticate(&db, "ann", "first-pass").await.unwrap().is_none());
        assert!(authenticate(&db, "ann", "second-pass").await.unwrap().is_some());

        let err = reset_password(&db, "ghost@example.com", "whatever1").await.unwrap_err();
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_ignores_blank_fields() {
        let db = db::memory().await;
        let ann = create_user(&db, "ann", "ann@example.com", None, false).await.expect("ann");
        let updated = update_user(&db, ann.id, Some(""), Some("  "), None)
            .await
            .expect("update");
        assert_eq!(updated.username, "ann");
        assert_eq!(updated.email, "ann@example.com");

        let updated = update_user(&db, ann.id, None, Some("New@Example.com"), Some("longpassword"))
            .await
            .expect("update");
        assert_eq!(updated.email, "new@example.com");
        assert!(updated.password_hash.is_some());
    }
}
