use crate::config::SessionConfig;
use crate::handlers::{current_user_id, see_other};
use crate::models::*;
use crate::services::{AuthService, DASHBOARD_PATH};
use crate::utils::SESSION_COOKIE;
use actix_web::cookie::{Cookie, SameSite, time::Duration};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

fn session_cookie(auth: &AuthResponse, session: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, auth.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(session.cookie_secure)
        .finish();
    // without remember-me the cookie dies with the browser session
    if auth.remember {
        cookie.set_max_age(Duration::seconds(auth.expires_in));
    }
    cookie
}

fn cleared_session_cookie(session: &SessionConfig) -> Cookie<'static> {
    let mut cookie = Cookie::build(SESSION_COOKIE, "")
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(session.cookie_secure)
        .finish();
    cookie.make_removal();
    cookie
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created, session cookie set", body = AuthResponse),
        (status = 303, description = "Already signed in, redirected to the dashboard"),
        (status = 400, description = "Missing fields, mismatched or weak password, bad phone, duplicate account"),
        (status = 500, description = "Account could not be stored")
    )
)]
pub async fn register(
    auth_service: web::Data<AuthService>,
    session: web::Data<SessionConfig>,
    req: HttpRequest,
    request: web::Json<RegisterRequest>,
) -> Result<HttpResponse> {
    if current_user_id(&req).is_some() {
        return Ok(see_other(DASHBOARD_PATH));
    }

    match auth_service.register(request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok()
            .cookie(session_cookie(&response, &session))
            .json(ApiResponse::success_with_message(
                response,
                "Account created successfully!",
            ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    params(LoginQuery),
    responses(
        (status = 200, description = "Signed in, session cookie set", body = AuthResponse),
        (status = 303, description = "Already signed in, redirected to the dashboard"),
        (status = 400, description = "Missing fields or bad phone format"),
        (status = 401, description = "Invalid phone number or password")
    )
)]
pub async fn login(
    auth_service: web::Data<AuthService>,
    session: web::Data<SessionConfig>,
    req: HttpRequest,
    query: web::Query<LoginQuery>,
    request: web::Json<LoginRequest>,
) -> Result<HttpResponse> {
    if current_user_id(&req).is_some() {
        return Ok(see_other(DASHBOARD_PATH));
    }

    match auth_service
        .login(request.into_inner(), query.next.as_deref())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok()
            .cookie(session_cookie(&response, &session))
            .json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Session cookie cleared"),
        (status = 401, description = "Not signed in")
    )
)]
pub async fn logout(session: web::Data<SessionConfig>) -> Result<HttpResponse> {
    Ok(HttpResponse::Ok()
        .cookie(cleared_session_cookie(&session))
        .json(ApiResponse::message("You have been logged out.")))
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/register", web::post().to(register))
            .route("/login", web::post().to(login))
            .route("/logout", web::post().to(logout)),
    );
}
