/// Persistence contracts
///
/// The workflow talks to storage only through `SessionStore` and
/// `UserStore`. Each call is treated as atomic; implementations own all
/// durable state.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::error::StoreError;

pub use memory::{InMemorySessionStore, InMemoryUserStore};
pub use postgres::{PgSessionStore, PgUserStore};

/// Server-side record for one outstanding refresh token
///
/// Keyed by the refresh token's `jti`. Only the SHA-256 digest of the
/// refresh token is kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub user_email: String,
    pub refresh_token_hash: String,
    pub is_revoked: bool,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    /// Does `token` hash to the stored digest
    pub fn matches_refresh_token(&self, token: &str) -> bool {
        hash_token(token) == self.refresh_token_hash
    }
}

/// SHA-256 hex digest of a token string
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// A user row as seen by the login flow
#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub is_admin: bool,
}

/// Public part of a user returned to clients
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            is_admin: user.is_admin,
        }
    }
}

/// Refresh-bound session persistence
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert a new session; `Conflict` if the id already exists
    async fn create(&self, session: Session) -> Result<Session, StoreError>;

    /// `NotFound` if no session has this id
    async fn get(&self, id: &str) -> Result<Session, StoreError>;

    /// Mark revoked. Revoking a revoked or missing session succeeds.
    async fn revoke(&self, id: &str) -> Result<(), StoreError>;

    /// Remove the row. Deleting a missing session succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Revoke every live session bound to `email`, returning how many changed
    async fn revoke_all_for_user(&self, email: &str) -> Result<u64, StoreError>;
}

/// User lookup
#[async_trait]
pub trait UserStore: Send + Sync {
    /// `NotFound` if no user has this email
    async fn get_user_by_email(&self, email: &str) -> Result<User, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session(expires_at: DateTime<Utc>) -> Session {
        Session {
            id: "sid".to_string(),
            user_email: "a@x.com".to_string(),
            refresh_token_hash: hash_token("refresh"),
            is_revoked: false,
            expires_at,
            created_at: expires_at - Duration::hours(24),
        }
    }

    #[test]
    fn test_token_hashing() {
        let hash1 = hash_token("some.jwt.value");
        let hash2 = hash_token("some.jwt.value");

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, "some.jwt.value");
        assert_eq!(hash1.len(), 64);
        assert_ne!(hash1, hash_token("other.jwt.value"));
    }

    #[test]
    fn test_session_expiry() {
        let now = Utc::now();
        let s = session(now + Duration::hours(1));

        assert!(!s.is_expired_at(now));
        assert!(!s.is_expired_at(now + Duration::hours(1)));
        assert!(s.is_expired_at(now + Duration::hours(1) + Duration::milliseconds(1)));
    }

    #[test]
    fn test_matches_refresh_token() {
        let s = session(Utc::now());

        assert!(s.matches_refresh_token("refresh"));
        assert!(!s.matches_refresh_token("other"));
    }

    #[test]
    fn test_profile_omits_password_hash() {
        let user = User {
            id: 1,
            name: "Ann".to_string(),
            email: "a@x.com".to_string(),
            password_hash: "$2b$04$hash".to_string(),
            is_admin: false,
        };
        let value = serde_json::to_value(UserProfile::from(&user)).unwrap();

        assert!(value.get("password_hash").is_none());
        assert_eq!(value["email"], "a@x.com");
    }
}
