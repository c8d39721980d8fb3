use crate::models::*;
use crate::services::PlanService;
use actix_web::{HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    get,
    path = "/api/v1/plans",
    tag = "plans",
    responses(
        (status = 200, description = "All plans, in catalog order", body = [PlanResponse])
    )
)]
pub async fn list_plans(plan_service: web::Data<PlanService>) -> Result<HttpResponse> {
    match plan_service.list_plans().await {
        Ok(plans) => Ok(HttpResponse::Ok().json(ApiResponse::success(plans))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn plan_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/plans", web::get().to(list_plans));
}
