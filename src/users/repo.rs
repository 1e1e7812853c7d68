use axum::http::StatusCode;
use sqlx::SqlitePool;
use thiserror::Error;
use time::OffsetDateTime;

use crate::users::repo_types::{NewUser, User, UserChanges};

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("user not found")]
    NotFound,
    #[error("email already exists")]
    EmailTaken,
    #[error("username already exists")]
    UsernameTaken,
    #[error(transparent)]
    Database(sqlx::Error),
}

impl StoreError {
    pub fn status(&self) -> StatusCode {
        match self {
            StoreError::NotFound => StatusCode::NOT_FOUND,
            StoreError::EmailTaken | StoreError::UsernameTaken => StatusCode::CONFLICT,
            StoreError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                // SQLite reports "UNIQUE constraint failed: users.<column>"
                let msg = db_err.message();
                if msg.contains("users.email") {
                    return StoreError::EmailTaken;
                }
                if msg.contains("users.username") {
                    return StoreError::UsernameTaken;
                }
            }
        }
        StoreError::Database(e)
    }
}

impl User {
    /// Insert a new user. A duplicate email, or a duplicate username between
    /// two accounts with passwords, surfaces as a conflict from the schema.
    pub async fn create(db: &SqlitePool, new: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(new.username)
        .bind(new.email)
        .bind(new.password_hash)
        .bind(OffsetDateTime::now_utc())
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &SqlitePool, id: i64) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// The account that can log in under `username`. Rows without a password
    /// may share a name and are never returned here.
    pub async fn find_account(
        db: &SqlitePool,
        username: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE username = ?1 AND password_hash IS NOT NULL"
        ))
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = ?1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Users in id order. `limit = None` returns every row.
    pub async fn list(
        db: &SqlitePool,
        limit: Option<i64>,
        offset: i64,
    ) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(&format!(
            r#"
            SELECT {USER_COLUMNS}
            FROM users
            ORDER BY id ASC
            LIMIT ?1 OFFSET ?2
            "#
        ))
        // SQLite treats a negative LIMIT as unbounded
        .bind(limit.unwrap_or(-1))
        .bind(offset.max(0))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    pub async fn list_newest_first(db: &SqlitePool) -> Result<Vec<User>, StoreError> {
        let rows = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC, id DESC"
        ))
        .fetch_all(db)
        .await?;
        Ok(rows)
    }

    /// Apply a partial update in one statement, so a conflicting email or
    /// account username leaves the row untouched.
    pub async fn update(
        db: &SqlitePool,
        id: i64,
        changes: UserChanges,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET username      = COALESCE(?1, username),
                   email         = COALESCE(?2, email),
                   password_hash = COALESCE(?3, password_hash)
             WHERE id = ?4
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(changes.username)
        .bind(changes.email)
        .bind(changes.password_hash)
        .bind(id)
        .fetch_optional(db)
        .await?;
        user.ok_or(StoreError::NotFound)
    }

    pub async fn set_password_by_email(
        db: &SqlitePool,
        email: &str,
        password_hash: &str,
    ) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
               SET password_hash = ?1
             WHERE email = ?2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(password_hash)
        .bind(email)
        .fetch_optional(db)
        .await?;
        user.ok_or(StoreError::NotFound)
    }

    pub async fn delete(db: &SqlitePool, id: i64) -> Result<(), StoreError> {
        let res = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(db)
            .await?;
        if res.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
