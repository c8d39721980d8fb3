use crate::error::AppError;
use crate::utils::{JwtService, SESSION_COOKIE};
use actix_web::http::{Method, header};
use actix_web::{
    Error, HttpMessage,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
};
use futures_util::future::LocalBoxFuture;
use std::future::{Ready, ready};

pub const LOGIN_REQUIRED_MESSAGE: &str = "Please log in to access this page.";

/// Id of the signed-in user, stored in request extensions by [`AuthMiddleware`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurrentUser(pub i64);

struct PublicPaths {
    exact_paths: Vec<&'static str>,
    prefix_paths: Vec<&'static str>,
    // reachable with an expired or unreadable session so the stale cookie can be cleared
    session_exit_paths: Vec<&'static str>,
}

impl PublicPaths {
    fn new() -> Self {
        Self {
            exact_paths: vec![
                "/",
                "/api/v1/auth/register",
                "/api/v1/auth/login",
                "/api/v1/plans",
                "/mpesa/callback",
                "/swagger-ui",
                "/api-docs/openapi.json",
            ],
            prefix_paths: vec!["/swagger-ui/", "/api-docs/"],
            session_exit_paths: vec!["/api/v1/auth/logout"],
        }
    }

    fn is_public_path(&self, path: &str) -> bool {
        if self.exact_paths.contains(&path) {
            return true;
        }

        self.prefix_paths
            .iter()
            .any(|&prefix| path.starts_with(prefix))
    }

    fn is_session_exit_path(&self, path: &str) -> bool {
        self.session_exit_paths.contains(&path)
    }
}

/// Session token from the `session` cookie, else from an `Authorization: Bearer` header.
fn session_token(req: &ServiceRequest) -> Option<String> {
    if let Some(cookie) = req.cookie(SESSION_COOKIE)
        && !cookie.value().is_empty()
    {
        return Some(cookie.value().to_string());
    }

    req.headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::to_string)
}

pub struct AuthMiddleware {
    jwt_service: JwtService,
}

impl AuthMiddleware {
    pub fn new(jwt_service: JwtService) -> Self {
        Self { jwt_service }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = AuthMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service,
            jwt_service: self.jwt_service.clone(),
            public_paths: PublicPaths::new(),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: S,
    jwt_service: JwtService,
    public_paths: PublicPaths,
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        if req.method() == Method::OPTIONS {
            return Box::pin(self.service.call(req));
        }

        // public pages still learn who is signed in, they just don't insist
        let session = session_token(&req).map(|token| self.jwt_service.session_user_id(&token));
        let is_public = self.public_paths.is_public_path(req.path());

        match session {
            Some(Ok(user_id)) => {
                req.extensions_mut().insert(CurrentUser(user_id));
                Box::pin(self.service.call(req))
            }
            _ if is_public => Box::pin(self.service.call(req)),
            Some(Err(e)) if self.public_paths.is_session_exit_path(req.path()) => {
                log::info!("Clearing rejected session on {}: {e}", req.path());
                Box::pin(self.service.call(req))
            }
            Some(Err(e)) => {
                log::warn!("Rejected session for {}: {e}", req.path());
                let error = AppError::AuthError(LOGIN_REQUIRED_MESSAGE.to_string());
                Box::pin(async move { Err(error.into()) })
            }
            None => {
                let error = AppError::AuthError(LOGIN_REQUIRED_MESSAGE.to_string());
                Box::pin(async move { Err(error.into()) })
            }
        }
    }
}
