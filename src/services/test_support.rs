use crate::config::DatabaseConfig;
use crate::database::{create_pool, run_migrations};
use crate::error::{AppError, AppResult};
use crate::external::{PaymentGateway, PushRequest, StkPushResponse, StkQueryResponse};
use async_trait::async_trait;
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

/// Fresh migrated in-memory database. One connection, so every query sees the same memory db.
pub async fn memory_pool() -> DatabaseConnection {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        reset_on_startup: false,
    };
    let pool = create_pool(&config).await.unwrap();
    run_migrations(&pool, false).await.unwrap();
    pool
}

/// Migrated SQLite file under `dir`, shared by several connections like a deployed server.
pub async fn file_pool(dir: &Path) -> DatabaseConnection {
    let config = DatabaseConfig {
        url: format!("sqlite://{}?mode=rwc", dir.join("billing.db").display()),
        max_connections: 5,
        reset_on_startup: false,
    };
    let pool = create_pool(&config).await.unwrap();
    run_migrations(&pool, false).await.unwrap();
    pool
}

/// Scripted gateway that records every push it is asked to send.
#[derive(Default)]
pub struct FakeGateway {
    pub pushes: Mutex<Vec<PushRequest>>,
    pub reject_push: bool,
    pub query_result: Mutex<Option<Result<(String, String), String>>>,
    pub query_results_by_checkout: Mutex<HashMap<String, (String, String)>>,
}

impl FakeGateway {
    pub fn rejecting() -> Self {
        Self {
            reject_push: true,
            ..Default::default()
        }
    }

    /// Next status query answers with this result code and description.
    pub fn answer_query(&self, code: &str, desc: &str) {
        *self.query_result.lock().unwrap() = Some(Ok((code.to_string(), desc.to_string())));
    }

    /// Status queries for this checkout id answer with this result, whatever the default.
    pub fn answer_query_for(&self, checkout_request_id: &str, code: &str, desc: &str) {
        self.query_results_by_checkout.lock().unwrap().insert(
            checkout_request_id.to_string(),
            (code.to_string(), desc.to_string()),
        );
    }

    /// Next status query fails with this gateway error code.
    pub fn fail_query(&self, error_code: &str) {
        *self.query_result.lock().unwrap() = Some(Err(error_code.to_string()));
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn initiate_push(&self, request: &PushRequest) -> AppResult<StkPushResponse> {
        let mut pushes = self.pushes.lock().unwrap();
        pushes.push(request.clone());
        if self.reject_push {
            return Err(AppError::GatewayError {
                code: "400.002.02".into(),
                message: "Bad Request - Invalid PhoneNumber".into(),
            });
        }
        let n = pushes.len();
        Ok(StkPushResponse {
            merchant_request_id: format!("mr-{n}"),
            checkout_request_id: format!("ws_CO_{n}"),
            response_code: "0".into(),
            response_description: "Success. Request accepted for processing".into(),
            customer_message: Some("Success. Request accepted for processing".into()),
        })
    }

    async fn query_status(&self, checkout_request_id: &str) -> AppResult<StkQueryResponse> {
        let scripted = self
            .query_results_by_checkout
            .lock()
            .unwrap()
            .get(checkout_request_id)
            .cloned()
            .map(Ok);
        match scripted.or_else(|| self.query_result.lock().unwrap().clone()) {
            Some(Ok((code, desc))) => Ok(StkQueryResponse {
                response_code: "0".into(),
                response_description: "The service request has been accepted successfully".into(),
                merchant_request_id: "mr".into(),
                checkout_request_id: checkout_request_id.to_string(),
                result_code: code,
                result_desc: desc,
            }),
            Some(Err(code)) => Err(AppError::GatewayError {
                code,
                message: "The transaction is being processed".into(),
            }),
            None => Err(AppError::ExternalApiError("no scripted answer".into())),
        }
    }
}
