/// Authentication Routes
///
/// Thin HTTP adapters over `AuthService`: login, access-token renewal,
/// logout and current-user information.

use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthService, Claims};
use crate::error::{AppError, ErrorContext, ValidationError};

/// User login request
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token renewal request
#[derive(Deserialize)]
pub struct RenewAccessTokenRequest {
    pub refresh_token: String,
}

/// Claims of the calling access token
#[derive(Serialize)]
pub struct CurrentUserResponse {
    pub id: i64,
    pub email: String,
    pub is_admin: bool,
    pub token_expires_at: String,
}

/// POST /auth/login
///
/// Returns both tokens, their expiries, the session id and the user profile.
///
/// # Errors
/// - 400: Empty email
/// - 401: Invalid credentials (unknown email and wrong password look the same)
/// - 500: Token signing or store failure
pub async fn login(
    form: web::Json<LoginRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("user_login");

    let email = form.email.trim();
    if email.is_empty() {
        return Err(ValidationError::EmptyField("email".to_string()).into());
    }

    let response = auth.login(email, &form.password).await?;

    tracing::info!(
        request_id = %context.request_id,
        user_id = response.user.id,
        session_id = %response.session_id,
        "Login request completed"
    );

    Ok(HttpResponse::Ok().json(response))
}

/// POST /auth/renew
///
/// Exchanges a refresh token for a new access token. The refresh token
/// stays valid.
///
/// # Errors
/// - 401: Expired, forged or malformed refresh token; missing, revoked or
///   mismatched session
pub async fn renew_access_token(
    form: web::Json<RenewAccessTokenRequest>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("renew_access_token");

    if form.refresh_token.trim().is_empty() {
        return Err(ValidationError::EmptyField("refresh_token".to_string()).into());
    }

    let response = auth.renew_access_token(form.refresh_token.trim()).await?;

    tracing::info!(request_id = %context.request_id, "Renew request completed");

    Ok(HttpResponse::Ok().json(response))
}

/// DELETE /api/sessions/{id}
///
/// Logs out by deleting the session. Unknown ids still return 204.
/// **Requires an access token** belonging to the session's user.
///
/// # Errors
/// - 403: The session belongs to another user
pub async fn logout(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    auth.logout_as(&claims.email, &path.into_inner()).await?;
    Ok(HttpResponse::NoContent().finish())
}

/// GET /api/me
///
/// **Requires valid access token** in the Authorization header; claims are
/// injected by the JWT middleware.
pub async fn get_current_user(claims: web::ReqData<Claims>) -> HttpResponse {
    HttpResponse::Ok().json(CurrentUserResponse {
        id: claims.user_id,
        email: claims.email.clone(),
        is_admin: claims.is_admin,
        token_expires_at: claims.expires_at_utc().to_rfc3339(),
    })
}
