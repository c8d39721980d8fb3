use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use serde_json::json;
use thiserror::Error;

pub type AppResult<T> = Result<T, AppError>;

/// Message shown to users when something unexpected happens on our side.
pub const GENERIC_ERROR_MESSAGE: &str =
    "An error occurred while processing your request. Please try again.";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sea_orm::DbErr),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Auth error: {0}")]
    AuthError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unauthorized")]
    Forbidden,

    #[error("External API error: {0}")]
    ExternalApiError(String),

    #[error("Gateway rejected request ({code}): {message}")]
    GatewayError { code: String, message: String },

    /// Failure whose message is safe to show, e.g. "Error creating account. Please try again."
    #[error("{0}")]
    OperationFailed(String),

    #[error("Internal server error: {0}")]
    InternalError(String),

    #[error("Session token error: {0}")]
    JwtError(#[from] jsonwebtoken::errors::Error),

    #[error("HTTP request error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("JSON serialization/deserialization error: {0}")]
    SerdeJsonError(#[from] serde_json::Error),
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) | AppError::JwtError(_) => StatusCode::UNAUTHORIZED,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::ExternalApiError(_)
            | AppError::GatewayError { .. }
            | AppError::ReqwestError(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            AppError::ValidationError(msg) => {
                log::warn!("Validation error: {msg}");
                ("VALIDATION_ERROR", msg.clone())
            }
            AppError::AuthError(msg) => {
                log::warn!("Authentication error: {msg}");
                ("AUTH_ERROR", msg.clone())
            }
            AppError::JwtError(err) => {
                log::warn!("Session token rejected: {err}");
                ("AUTH_ERROR", "Invalid session".to_string())
            }
            AppError::NotFound(msg) => ("NOT_FOUND", msg.clone()),
            AppError::Forbidden => {
                log::warn!("Forbidden access");
                ("FORBIDDEN", "Unauthorized".to_string())
            }
            AppError::ExternalApiError(msg) => {
                log::error!("External API error: {msg}");
                ("EXTERNAL_API_ERROR", msg.clone())
            }
            AppError::GatewayError { code, message } => {
                log::error!("Payment gateway error {code}: {message}");
                ("GATEWAY_ERROR", message.clone())
            }
            AppError::ReqwestError(err) => {
                log::error!("Payment gateway unreachable: {err}");
                ("EXTERNAL_API_ERROR", "Payment gateway unreachable".to_string())
            }
            AppError::OperationFailed(msg) => ("OPERATION_FAILED", msg.clone()),
            AppError::DatabaseError(err) => {
                log::error!("Database error: {err}");
                ("DATABASE_ERROR", GENERIC_ERROR_MESSAGE.to_string())
            }
            _ => {
                log::error!("Internal error: {self}");
                ("INTERNAL_ERROR", GENERIC_ERROR_MESSAGE.to_string())
            }
        };

        HttpResponse::build(self.status_code()).json(json!({
            "success": false,
            "error": {
                "code": error_code,
                "message": message
            }
        }))
    }
}
