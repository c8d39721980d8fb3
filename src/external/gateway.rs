use crate::error::AppResult;
use crate::external::mpesa::{StkPushResponse, StkQueryResponse};
use async_trait::async_trait;

/// One push-payment prompt sent to a payer's phone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRequest {
    pub phone: String,
    pub amount: i64,
    pub account_reference: String,
    pub description: String,
}

/// The mobile-money operations the payment flow depends on.
///
/// `MpesaClient` talks to the real gateway; tests substitute an in-memory fake.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn initiate_push(&self, request: &PushRequest) -> AppResult<StkPushResponse>;

    async fn query_status(&self, checkout_request_id: &str) -> AppResult<StkQueryResponse>;
}
