use crate::external::StkCallbackEnvelope;
use crate::models::CallbackAck;
use crate::services::PaymentService;
use actix_web::{HttpResponse, Result, web};
use log::{error, info, warn};

/// Receives the gateway's asynchronous STK push result.
///
/// Unreadable bodies and unknown checkout ids are acknowledged and logged. A
/// callback that could not be stored is answered with a non-zero `ResultCode` so
/// the gateway sends it again.
#[utoipa::path(
    post,
    path = "/mpesa/callback",
    tag = "payments",
    responses(
        (status = 200, description = "Callback acknowledged", body = CallbackAck),
        (status = 500, description = "Callback not stored, gateway should retry", body = CallbackAck)
    )
)]
pub async fn mpesa_callback(
    payment_service: web::Data<PaymentService>,
    body: web::Bytes,
) -> Result<HttpResponse> {
    let envelope: StkCallbackEnvelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            warn!("Unreadable M-Pesa callback: {e}");
            return Ok(HttpResponse::Ok().json(CallbackAck::accepted()));
        }
    };

    info!(
        "Received M-Pesa callback for {} (result {})",
        envelope.body.stk_callback.checkout_request_id, envelope.body.stk_callback.result_code
    );

    match payment_service.handle_callback(envelope).await {
        Ok(()) => Ok(HttpResponse::Ok().json(CallbackAck::accepted())),
        Err(e) => {
            error!("Failed to apply M-Pesa callback: {e}");
            Ok(HttpResponse::InternalServerError().json(CallbackAck::rejected()))
        }
    }
}

pub fn callback_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/mpesa/callback", web::post().to(mpesa_callback));
}
