/// Token Signing and Verification
///
/// HS256 JWTs shared by access and refresh tokens. The two classes differ
/// only in lifetime and in whether a session row exists for their `jti`.

use std::sync::Arc;

use chrono::Duration;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};

use crate::auth::claims::Claims;
use crate::clock::Clock;
use crate::error::{ConfigError, TokenError};

/// Shortest signing secret accepted at startup
pub const MIN_SECRET_KEY_SIZE: usize = 32;

/// Signs and verifies tokens with a process-wide symmetric secret
#[derive(Clone)]
pub struct TokenMaker {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    clock: Arc<dyn Clock>,
}

impl TokenMaker {
    /// Build a token maker from the configured secret
    ///
    /// # Errors
    /// Returns `ConfigError::InvalidValue` if the secret is shorter than
    /// `MIN_SECRET_KEY_SIZE` bytes.
    pub fn new(secret: &str, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_KEY_SIZE {
            return Err(ConfigError::InvalidValue(format!(
                "jwt secret must be at least {} bytes",
                MIN_SECRET_KEY_SIZE
            )));
        }

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against the injected clock after the signature
        validation.validate_exp = false;
        validation.leeway = 0;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
            clock,
        })
    }

    /// Mint a signed token for a user
    ///
    /// # Errors
    /// Returns `TokenError::Signing` if the lifetime is shorter than one
    /// second or encoding fails
    pub fn create_token(
        &self,
        user_id: i64,
        email: &str,
        is_admin: bool,
        ttl: Duration,
    ) -> Result<(String, Claims), TokenError> {
        if ttl.num_seconds() <= 0 {
            return Err(TokenError::Signing(
                "token lifetime must be at least one second".to_string(),
            ));
        }

        let claims = Claims::new(user_id, email.to_string(), is_admin, self.clock.now(), ttl);

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok((token, claims))
    }

    /// Check a token's signature, shape and expiry, in that order
    ///
    /// # Errors
    /// - `InvalidSignature` when the signature does not match
    /// - `Malformed` for structurally invalid input or incomplete claims
    /// - `Expired` when the clock is past `exp`
    pub fn verify_token(&self, token: &str) -> Result<Claims, TokenError> {
        let claims = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })?;

        if !claims.is_well_formed() {
            return Err(TokenError::Malformed(
                "token id missing or lifetime invalid".to_string(),
            ));
        }

        if claims.is_expired_at(self.clock.now()) {
            return Err(TokenError::Expired);
        }

        Ok(claims)
    }
}
