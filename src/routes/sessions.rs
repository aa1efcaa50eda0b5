/// Session Revocation Routes
///
/// Administrative revocation of single sessions or all of a user's
/// sessions, plus self-service "log out everywhere".

use actix_web::{web, HttpResponse};
use serde::Serialize;

use crate::auth::{AuthService, Claims};
use crate::error::{AppError, ErrorContext};

#[derive(Serialize)]
pub struct RevokedSessionsResponse {
    pub revoked: u64,
}

/// POST /admin/sessions/{id}/revoke
///
/// Marks the session revoked without deleting it. Idempotent.
/// **Requires an admin access token.**
pub async fn revoke_session(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context = ErrorContext::new("revoke_session").with_user_id(claims.user_id.to_string());
    let session_id = path.into_inner();

    auth.revoke_session(&session_id).await?;

    tracing::info!(
        request_id = %context.request_id,
        admin_id = ?context.user_id,
        session_id = %session_id,
        "Session revoked by admin"
    );

    Ok(HttpResponse::NoContent().finish())
}

/// POST /admin/users/{email}/sessions/revoke
///
/// **Requires an admin access token.**
pub async fn revoke_user_sessions(
    path: web::Path<String>,
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let context =
        ErrorContext::new("revoke_user_sessions").with_user_id(claims.user_id.to_string());

    let revoked = auth.revoke_user_sessions(&path.into_inner()).await?;

    tracing::info!(
        request_id = %context.request_id,
        admin_id = ?context.user_id,
        revoked,
        "User sessions revoked by admin"
    );

    Ok(HttpResponse::Ok().json(RevokedSessionsResponse { revoked }))
}

/// POST /api/sessions/revoke-all
///
/// Revokes every session of the calling user.
pub async fn revoke_own_sessions(
    claims: web::ReqData<Claims>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, AppError> {
    let revoked = auth.revoke_user_sessions(&claims.email).await?;
    Ok(HttpResponse::Ok().json(RevokedSessionsResponse { revoked }))
}
