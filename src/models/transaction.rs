use crate::entities::{TransactionStatus, TransactionType, plan_entity, transaction_entity};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InitiatePaymentRequest {
    pub plan_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TransactionResponse {
    pub id: i64,
    pub plan_id: i64,
    pub plan_name: Option<String>,
    pub amount: i64,
    pub transaction_type: TransactionType,
    pub status: TransactionStatus,
    pub checkout_request_id: Option<String>,
    pub receipt_number: Option<String>,
    pub result_description: Option<String>,
    pub transaction_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl TransactionResponse {
    pub fn with_plan(m: transaction_entity::Model, plan: Option<plan_entity::Model>) -> Self {
        let mut resp = Self::from(m);
        resp.plan_name = plan.map(|p| p.name);
        resp
    }
}

impl From<transaction_entity::Model> for TransactionResponse {
    fn from(m: transaction_entity::Model) -> Self {
        Self {
            id: m.id,
            plan_id: m.plan_id,
            plan_name: None,
            amount: m.amount,
            transaction_type: m.transaction_type,
            status: m.status,
            checkout_request_id: m.checkout_request_id,
            receipt_number: m.mpesa_receipt_number,
            result_description: m.result_description,
            transaction_date: m.transaction_date,
            created_at: m.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct InitiatePaymentResponse {
    pub transaction: TransactionResponse,
    pub customer_message: Option<String>,
}

/// What the status poll returns: lowercase status plus the receipt once paid.
#[derive(Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct PaymentStatusResponse {
    pub status: TransactionStatus,
    pub receipt_number: Option<String>,
}

impl From<&transaction_entity::Model> for PaymentStatusResponse {
    fn from(m: &transaction_entity::Model) -> Self {
        Self {
            status: m.status,
            receipt_number: m.mpesa_receipt_number.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CallbackAck {
    #[serde(rename = "ResultCode")]
    pub result_code: i32,
    #[serde(rename = "ResultDesc")]
    pub result_desc: String,
}

impl CallbackAck {
    pub fn accepted() -> Self {
        Self {
            result_code: 0,
            result_desc: "Accepted".to_string(),
        }
    }

    /// Non-zero result so the gateway delivers the callback again.
    pub fn rejected() -> Self {
        Self {
            result_code: 1,
            result_desc: "Rejected".to_string(),
        }
    }
}
