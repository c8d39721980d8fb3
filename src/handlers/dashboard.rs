use crate::handlers::require_user_id;
use crate::models::*;
use crate::services::UserService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/api/v1/dashboard",
    tag = "dashboard",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Profile, plans and purchase history", body = DashboardResponse),
        (status = 401, description = "Not signed in"),
        (status = 500, description = "Dashboard could not be loaded")
    )
)]
pub async fn dashboard(user_service: web::Data<UserService>, req: HttpRequest) -> Result<HttpResponse> {
    let user_id = match require_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match user_service.dashboard(user_id).await {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn dashboard_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/dashboard", web::get().to(dashboard));
}
