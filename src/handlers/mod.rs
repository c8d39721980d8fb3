pub mod auth;
pub mod callback;
pub mod dashboard;
pub mod index;
pub mod payment;
pub mod plan;

pub use auth::auth_config;
pub use callback::callback_config;
pub use dashboard::dashboard_config;
pub use index::index_config;
pub use payment::payment_config;
pub use plan::plan_config;

use crate::error::{AppError, AppResult};
use crate::middlewares::{CurrentUser, LOGIN_REQUIRED_MESSAGE};
use actix_web::http::header;
use actix_web::{HttpMessage, HttpRequest, HttpResponse};

fn current_user_id(req: &HttpRequest) -> Option<i64> {
    req.extensions().get::<CurrentUser>().map(|user| user.0)
}

fn require_user_id(req: &HttpRequest) -> AppResult<i64> {
    current_user_id(req).ok_or_else(|| AppError::AuthError(LOGIN_REQUIRED_MESSAGE.to_string()))
}

fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, location))
        .finish()
}
