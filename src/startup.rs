use actix_web::dev::Server;
use actix_web::{web, App, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, BcryptVerifier, TokenLifetimes, TokenMaker};
use crate::clock::Clock;
use crate::configuration::JwtSettings;
use crate::error::ConfigError;
use crate::logger::LoggerMiddleware;
use crate::middleware::JwtMiddleware;
use crate::routes::{
    get_current_user, health_check, login, logout, renew_access_token, revoke_own_sessions,
    revoke_session, revoke_user_sessions,
};
use crate::store::{SessionStore, UserStore};

/// Wire the workflow from its collaborators
///
/// # Errors
/// Returns `ConfigError` for an unusable signing secret or token lifetime
pub fn build_auth_service(
    jwt: &JwtSettings,
    users: Arc<dyn UserStore>,
    sessions: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
) -> Result<AuthService, ConfigError> {
    jwt.validate()?;
    let tokens = TokenMaker::new(&jwt.secret, clock.clone())?;

    Ok(AuthService::new(
        users,
        sessions,
        Arc::new(BcryptVerifier),
        tokens,
        clock,
        TokenLifetimes::from(jwt),
    ))
}

pub fn run(listener: TcpListener, auth: AuthService) -> Result<Server, std::io::Error> {
    let auth = web::Data::new(auth);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)
            .app_data(auth.clone())

            // Public routes
            .route("/health_check", web::get().to(health_check))
            .route("/auth/login", web::post().to(login))
            .route("/auth/renew", web::post().to(renew_access_token))

            // Any valid access token
            .service(
                web::scope("/api")
                    .wrap(JwtMiddleware::new(auth.clone()))
                    .route("/me", web::get().to(get_current_user))
                    .route("/sessions/revoke-all", web::post().to(revoke_own_sessions))
                    .route("/sessions/{id}", web::delete().to(logout)),
            )

            // Admin access token only
            .service(
                web::scope("/admin")
                    .wrap(JwtMiddleware::admin_only(auth.clone()))
                    .route("/sessions/{id}/revoke", web::post().to(revoke_session))
                    .route(
                        "/users/{email}/sessions/revoke",
                        web::post().to(revoke_user_sessions),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
