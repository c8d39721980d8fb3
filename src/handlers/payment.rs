use crate::handlers::require_user_id;
use crate::models::*;
use crate::services::{PAYMENT_INITIATED_MESSAGE, PaymentService};
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};

#[utoipa::path(
    post,
    path = "/api/v1/payments/initiate",
    tag = "payments",
    request_body = InitiatePaymentRequest,
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Pending transaction created and prompt sent", body = InitiatePaymentResponse),
        (status = 400, description = "Invalid plan selected"),
        (status = 401, description = "Not signed in"),
        (status = 404, description = "Plan not found"),
        (status = 502, description = "Gateway refused the push; transaction marked failed")
    )
)]
pub async fn initiate_payment(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    request: web::Json<InitiatePaymentRequest>,
) -> Result<HttpResponse> {
    let user_id = match require_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match payment_service
        .initiate_payment(user_id, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            response,
            PAYMENT_INITIATED_MESSAGE,
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/payments/{transaction_id}/status",
    tag = "payments",
    params(
        ("transaction_id" = i64, Path, description = "Transaction id")
    ),
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "Current status and receipt", body = PaymentStatusResponse),
        (status = 401, description = "Not signed in"),
        (status = 403, description = "Transaction belongs to another user"),
        (status = 404, description = "Transaction not found")
    )
)]
pub async fn payment_status(
    payment_service: web::Data<PaymentService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = match require_user_id(&req) {
        Ok(id) => id,
        Err(e) => return Ok(e.error_response()),
    };

    match payment_service
        .check_payment_status(user_id, path.into_inner())
        .await
    {
        Ok(status) => Ok(HttpResponse::Ok().json(ApiResponse::success(status))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn payment_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/payments")
            .route("/initiate", web::post().to(initiate_payment))
            .route("/{transaction_id}/status", web::get().to(payment_status)),
    );
}
