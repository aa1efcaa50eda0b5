/// Postgres stores
///
/// Schema lives in `migrations/`. Queries are checked at runtime so the
/// crate builds without a live database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use super::{Session, SessionStore, User, UserStore};
use crate::error::StoreError;

type SessionRow = (String, String, String, bool, DateTime<Utc>, DateTime<Utc>);

fn session_from_row(row: SessionRow) -> Session {
    let (id, user_email, refresh_token_hash, is_revoked, expires_at, created_at) = row;
    Session {
        id,
        user_email,
        refresh_token_hash,
        is_revoked,
        expires_at,
        created_at,
    }
}

#[derive(Debug, Clone)]
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn create(&self, session: Session) -> Result<Session, StoreError> {
        sqlx::query(
            r#"
            INSERT INTO sessions (id, user_email, refresh_token_hash, is_revoked, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&session.id)
        .bind(&session.user_email)
        .bind(&session.refresh_token_hash)
        .bind(session.is_revoked)
        .bind(session.expires_at)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;

        Ok(session)
    }

    async fn get(&self, id: &str) -> Result<Session, StoreError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT id, user_email, refresh_token_hash, is_revoked, expires_at, created_at
            FROM sessions
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(session_from_row)
            .ok_or_else(|| StoreError::NotFound(format!("session {}", id)))
    }

    async fn revoke(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE sessions
            SET is_revoked = true, revoked_at = COALESCE(revoked_at, NOW())
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM sessions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn revoke_all_for_user(&self, email: &str) -> Result<u64, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE sessions
            SET is_revoked = true, revoked_at = NOW()
            WHERE user_email = $1 AND is_revoked = false
            "#,
        )
        .bind(email)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, (i64, String, String, String, bool)>(
            "SELECT id, name, email, password_hash, is_admin FROM users WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        let (id, name, email, password_hash, is_admin) =
            row.ok_or_else(|| StoreError::NotFound(format!("user {}", email)))?;

        Ok(User {
            id,
            name,
            email,
            password_hash,
            is_admin,
        })
    }
}
