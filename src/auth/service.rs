/// Authentication Workflow
///
/// Login, access-token renewal, logout and session revocation, composed
/// from the token maker, the password verifier and the two stores.
///
/// The service holds no session state of its own: every call reads and
/// writes through the `SessionStore`.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::auth::claims::Claims;
use crate::auth::password::PasswordVerifier;
use crate::auth::token::TokenMaker;
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::{AppError, AuthError, StoreError, TokenError, ValidationError};
use crate::store::{hash_token, Session, SessionStore, User, UserProfile, UserStore};

/// Lifetimes for the two token classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenLifetimes {
    pub access: Duration,
    pub refresh: Duration,
}

impl Default for TokenLifetimes {
    fn default() -> Self {
        Self {
            access: Duration::minutes(15),
            refresh: Duration::hours(24),
        }
    }
}

impl From<&JwtSettings> for TokenLifetimes {
    fn from(settings: &JwtSettings) -> Self {
        Self {
            access: settings.access_token_ttl(),
            refresh: settings.refresh_token_ttl(),
        }
    }
}

/// Result of a successful login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub session_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub access_token_expires_at: DateTime<Utc>,
    pub refresh_token_expires_at: DateTime<Utc>,
    pub user: UserProfile,
}

/// Result of a successful renewal
#[derive(Debug, Clone, Serialize)]
pub struct RenewAccessTokenResponse {
    pub access_token: String,
    pub access_token_expires_at: DateTime<Utc>,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    passwords: Arc<dyn PasswordVerifier>,
    tokens: TokenMaker,
    clock: Arc<dyn Clock>,
    lifetimes: TokenLifetimes,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserStore>,
        sessions: Arc<dyn SessionStore>,
        passwords: Arc<dyn PasswordVerifier>,
        tokens: TokenMaker,
        clock: Arc<dyn Clock>,
        lifetimes: TokenLifetimes,
    ) -> Self {
        Self {
            users,
            sessions,
            passwords,
            tokens,
            clock,
            lifetimes,
        }
    }

    /// Authenticate with email and password and open a session
    ///
    /// Mints an access token and a refresh token and persists one session
    /// keyed by the refresh token's `jti`.
    ///
    /// # Errors
    /// - `InvalidCredentials` for an unknown email or a wrong password
    /// - `TokenError::Signing` if minting fails
    /// - store errors from creating the session
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse, AppError> {
        let user = match self.authenticate(email, password).await {
            Ok(user) => user,
            Err(AppError::Auth(reason)) => {
                // Real reason stays in the server log only
                tracing::warn!(email = %email, reason = %reason, "Login rejected");
                return Err(AuthError::InvalidCredentials.into());
            }
            Err(e) => return Err(e),
        };

        let (access_token, access_claims) =
            self.tokens
                .create_token(user.id, &user.email, user.is_admin, self.lifetimes.access)?;
        let (refresh_token, refresh_claims) =
            self.tokens
                .create_token(user.id, &user.email, user.is_admin, self.lifetimes.refresh)?;

        let session = self
            .sessions
            .create(Session {
                id: refresh_claims.token_id.clone(),
                user_email: user.email.clone(),
                refresh_token_hash: hash_token(&refresh_token),
                is_revoked: false,
                expires_at: refresh_claims.expires_at_utc(),
                created_at: self.clock.now(),
            })
            .await?;

        tracing::info!(
            user_id = user.id,
            session_id = %session.id,
            "User logged in successfully"
        );

        Ok(LoginResponse {
            session_id: session.id,
            access_token,
            refresh_token,
            access_token_expires_at: access_claims.expires_at_utc(),
            refresh_token_expires_at: refresh_claims.expires_at_utc(),
            user: UserProfile::from(&user),
        })
    }

    /// Look up the user and check the password, keeping the two failure
    /// causes apart
    async fn authenticate(&self, email: &str, password: &str) -> Result<User, AppError> {
        let user = match self.users.get_user_by_email(email).await {
            Ok(user) => user,
            Err(StoreError::NotFound(_)) => return Err(AuthError::UserNotFound.into()),
            Err(e) => return Err(e.into()),
        };

        if !self.passwords.verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials.into());
        }

        Ok(user)
    }

    /// Exchange a refresh token for a new access token
    ///
    /// The refresh token and its session are left untouched, so one refresh
    /// token serves repeated renewals until it expires or is revoked.
    ///
    /// Checks run in a fixed order: signature, token expiry, session
    /// lookup, session expiry, revocation, identity binding.
    pub async fn renew_access_token(
        &self,
        refresh_token: &str,
    ) -> Result<RenewAccessTokenResponse, AppError> {
        let claims = self.tokens.verify_token(refresh_token)?;

        let session = match self.sessions.get(&claims.token_id).await {
            Ok(session) => session,
            Err(StoreError::NotFound(_)) => {
                tracing::warn!(session_id = %claims.token_id, "Refresh token has no session");
                return Err(AuthError::SessionNotFound.into());
            }
            Err(e) => return Err(e.into()),
        };

        if session.is_expired_at(self.clock.now()) {
            tracing::info!(session_id = %session.id, "Session expired");
            return Err(TokenError::Expired.into());
        }

        if session.is_revoked {
            tracing::warn!(session_id = %session.id, "Attempt to use revoked session");
            return Err(AuthError::SessionRevoked.into());
        }

        if session.user_email != claims.email || !session.matches_refresh_token(refresh_token) {
            tracing::warn!(
                session_id = %session.id,
                user_id = claims.user_id,
                "Refresh token does not match its session"
            );
            return Err(AuthError::IdentityMismatch.into());
        }

        let (access_token, access_claims) = self.tokens.create_token(
            claims.user_id,
            &claims.email,
            claims.is_admin,
            self.lifetimes.access,
        )?;

        tracing::info!(
            user_id = claims.user_id,
            session_id = %session.id,
            "Access token renewed"
        );

        Ok(RenewAccessTokenResponse {
            access_token,
            access_token_expires_at: access_claims.expires_at_utc(),
        })
    }

    /// Validate an access token presented on an API call
    ///
    /// Refresh tokens are refused. They are recognised by a lifetime longer
    /// than the access lifetime, or by a session row (live, revoked or
    /// expired) stored under their `jti`.
    pub async fn verify_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let claims = self.tokens.verify_token(token)?;

        if claims.lifetime() > self.lifetimes.access {
            tracing::warn!(user_id = claims.user_id, "Long-lived token presented as access token");
            return Err(AuthError::NotAnAccessToken.into());
        }

        match self.sessions.get(&claims.token_id).await {
            Ok(session) => {
                tracing::warn!(session_id = %session.id, "Refresh token presented as access token");
                Err(AuthError::NotAnAccessToken.into())
            }
            Err(StoreError::NotFound(_)) => Ok(claims),
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a session. Unknown ids count as already logged out.
    pub async fn logout(&self, session_id: &str) -> Result<(), AppError> {
        require_session_id(session_id)?;
        self.sessions.delete(session_id).await?;

        tracing::info!(session_id = %session_id, "Session deleted on logout");
        Ok(())
    }

    /// Logout on behalf of an authenticated caller, who must own the session
    pub async fn logout_as(&self, email: &str, session_id: &str) -> Result<(), AppError> {
        require_session_id(session_id)?;

        match self.sessions.get(session_id).await {
            Ok(session) if session.user_email != email => {
                tracing::warn!(session_id = %session_id, "Logout refused for another user's session");
                return Err(AuthError::Forbidden.into());
            }
            Ok(_) | Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }

        self.logout(session_id).await
    }

    /// Mark a session revoked, keeping the row for audit
    pub async fn revoke_session(&self, session_id: &str) -> Result<(), AppError> {
        require_session_id(session_id)?;
        self.sessions.revoke(session_id).await?;

        tracing::info!(session_id = %session_id, "Session revoked");
        Ok(())
    }

    /// Revoke every live session of a user
    pub async fn revoke_user_sessions(&self, email: &str) -> Result<u64, AppError> {
        if email.trim().is_empty() {
            return Err(ValidationError::EmptyField("email".to_string()).into());
        }
        let revoked = self.sessions.revoke_all_for_user(email).await?;

        tracing::info!(email = %email, revoked, "All sessions revoked for user");
        Ok(revoked)
    }
}

fn require_session_id(session_id: &str) -> Result<(), AppError> {
    if session_id.trim().is_empty() {
        return Err(ValidationError::EmptyField("session_id".to_string()).into());
    }
    Ok(())
}
