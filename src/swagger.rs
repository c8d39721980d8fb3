use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{ApiKey, ApiKeyValue, Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{TransactionStatus, TransactionType};
use crate::handlers;
use crate::models::*;
use crate::utils::SESSION_COOKIE;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
            components.add_security_scheme(
                "session_cookie",
                SecurityScheme::ApiKey(ApiKey::Cookie(ApiKeyValue::new(SESSION_COOKIE))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::index::index,
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::logout,
        handlers::plan::list_plans,
        handlers::dashboard::dashboard,
        handlers::payment::initiate_payment,
        handlers::payment::payment_status,
        handlers::callback::mpesa_callback,
    ),
    components(
        schemas(
            RegisterRequest,
            LoginRequest,
            UserResponse,
            AuthResponse,
            PlanResponse,
            DashboardResponse,
            InitiatePaymentRequest,
            InitiatePaymentResponse,
            TransactionResponse,
            TransactionStatus,
            TransactionType,
            PaymentStatusResponse,
            CallbackAck,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "portal", description = "Captive portal landing"),
        (name = "auth", description = "Registration and sessions"),
        (name = "plans", description = "Access plan catalog"),
        (name = "dashboard", description = "Account overview"),
        (name = "payments", description = "M-Pesa payments"),
    ),
    info(
        title = "Hotspot Billing API",
        version = "0.1.0",
        description = "Wi-Fi hotspot access sold by the hour over M-Pesa"
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
