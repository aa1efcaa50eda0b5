/// Access Token Middleware
///
/// Validates the bearer token from the Authorization header and injects
/// its claims into request extensions for route handlers.

use actix_web::{
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    web, Error, HttpMessage,
};
use futures::future::LocalBoxFuture;
use std::rc::Rc;

use crate::auth::AuthService;
use crate::error::{AppError, AuthError};

/// Guard for routes that need a valid access token
pub struct JwtMiddleware {
    auth: web::Data<AuthService>,
    require_admin: bool,
}

impl JwtMiddleware {
    pub fn new(auth: web::Data<AuthService>) -> Self {
        Self {
            auth,
            require_admin: false,
        }
    }

    /// Also reject tokens whose `is_admin` claim is false
    pub fn admin_only(auth: web::Data<AuthService>) -> Self {
        Self {
            auth,
            require_admin: true,
        }
    }
}

impl<S, B> Transform<S, ServiceRequest> for JwtMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = JwtMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(JwtMiddlewareService {
            service: Rc::new(service),
            auth: self.auth.clone(),
            require_admin: self.require_admin,
        }))
    }
}

pub struct JwtMiddlewareService<S> {
    service: Rc<S>,
    auth: web::Data<AuthService>,
    require_admin: bool,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

impl<S, B> Service<ServiceRequest> for JwtMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let token = bearer_token(&req);
        let auth = self.auth.clone();
        let require_admin = self.require_admin;
        let service = self.service.clone();

        Box::pin(async move {
            let token = match token {
                Some(token) => token,
                None => {
                    tracing::warn!(path = %req.path(), "Missing or invalid Authorization header");
                    return Err(Error::from(AppError::Auth(AuthError::MissingToken)));
                }
            };

            let claims = match auth.verify_access_token(&token).await {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::warn!(path = %req.path(), error = %e, "Access token rejected");
                    return Err(Error::from(e));
                }
            };

            if require_admin && !claims.is_admin {
                tracing::warn!(user_id = claims.user_id, path = %req.path(), "Admin route refused");
                return Err(Error::from(AppError::Auth(AuthError::Forbidden)));
            }

            tracing::debug!(
                user_id = claims.user_id,
                email = %claims.email,
                "Access token validated"
            );
            req.extensions_mut().insert(claims);

            service.call(req).await
        })
    }
}
