use crate::models::{PlanResponse, TransactionResponse, UserResponse};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DashboardResponse {
    pub user: UserResponse,
    pub plans: Vec<PlanResponse>,
    /// Newest first.
    pub transactions: Vec<TransactionResponse>,
}
