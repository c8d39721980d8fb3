use crate::handlers::{current_user_id, see_other};
use crate::models::*;
use crate::services::{DASHBOARD_PATH, PlanService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/",
    tag = "portal",
    responses(
        (status = 200, description = "Landing page: the plan catalog", body = [PlanResponse]),
        (status = 303, description = "Signed in, redirected to the dashboard")
    )
)]
pub async fn index(plan_service: web::Data<PlanService>, req: HttpRequest) -> Result<HttpResponse> {
    if current_user_id(&req).is_some() {
        return Ok(see_other(DASHBOARD_PATH));
    }

    match plan_service.list_plans().await {
        Ok(plans) => Ok(HttpResponse::Ok().json(ApiResponse::success(plans))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn index_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index));
}
