/// Password Verification
///
/// The workflow only needs to check a password against a stored hash; the
/// hashing scheme lives behind `PasswordVerifier`. Bcrypt is the default.

use bcrypt::{hash, verify, DEFAULT_COST};

use crate::error::AppError;

/// Checks a plaintext password against a stored hash
pub trait PasswordVerifier: Send + Sync {
    /// `Ok(false)` on mismatch; `Err` only when the hash itself is unusable
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError>;
}

/// Bcrypt-backed verifier
#[derive(Debug, Default, Clone, Copy)]
pub struct BcryptVerifier;

impl PasswordVerifier for BcryptVerifier {
    fn verify(&self, password: &str, password_hash: &str) -> Result<bool, AppError> {
        verify_password(password, password_hash)
    }
}

/// Hash a password using bcrypt at the default cost
///
/// Used to seed user rows; registration policy is not enforced here.
///
/// # Errors
/// Returns error if bcrypt hashing fails
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash_password_with_cost(password, DEFAULT_COST)
}

/// Hash a password using bcrypt at an explicit cost
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its bcrypt hash
///
/// # Errors
/// Returns error if the stored hash is not a valid bcrypt hash
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, AppError> {
    verify(password, password_hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}
