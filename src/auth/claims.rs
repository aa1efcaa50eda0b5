/// Token Claims
///
/// The signed payload carried by both access and refresh tokens. Field names
/// on the wire follow RFC 7519 where a registered claim exists.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Claims {
    /// Subject (numeric user ID)
    #[serde(rename = "id")]
    pub user_id: i64,
    /// User email, checked against the session binding on renewal
    pub email: String,
    pub is_admin: bool,
    /// Unique per minted token; doubles as the session key for refresh tokens
    #[serde(rename = "jti")]
    pub token_id: String,
    /// Issued at (Unix timestamp)
    #[serde(rename = "iat")]
    pub issued_at: i64,
    /// Expiration time (Unix timestamp)
    #[serde(rename = "exp")]
    pub expires_at: i64,
}

impl Claims {
    /// Build claims for a token issued at `now` that lives for `ttl`
    pub fn new(
        user_id: i64,
        email: String,
        is_admin: bool,
        now: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Self {
        let issued_at = now.timestamp();
        Self {
            user_id,
            email,
            is_admin,
            token_id: uuid::Uuid::new_v4().to_string(),
            issued_at,
            expires_at: issued_at + ttl.num_seconds(),
        }
    }

    /// Required fields present, non-empty token ID, expiry after issuance
    pub fn is_well_formed(&self) -> bool {
        !self.token_id.is_empty() && self.expires_at > self.issued_at
    }

    /// Expired strictly after `expires_at`, compared at full precision
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at_utc()
    }

    /// Time between issuance and expiry
    pub fn lifetime(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.expires_at - self.issued_at)
    }

    pub fn expires_at_utc(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(self.expires_at, 0).unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}
