/// Authentication module
///
/// Token signing/verification, password checking, and the session
/// workflow built on top of them.

mod claims;
mod password;
mod service;
mod token;

pub use claims::Claims;
pub use password::{hash_password, hash_password_with_cost, verify_password, BcryptVerifier, PasswordVerifier};
pub use service::{AuthService, LoginResponse, RenewAccessTokenResponse, TokenLifetimes};
pub use token::{TokenMaker, MIN_SECRET_KEY_SIZE};
