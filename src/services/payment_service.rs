use crate::entities::{
    TransactionStatus, TransactionType, plan_entity as plans, transaction_entity as transactions,
    user_entity as users,
};
use crate::error::{AppError, AppResult};
use crate::external::{
    PaymentGateway, PushRequest, STK_QUERY_PROCESSING_CODE, StkCallback, StkCallbackEnvelope,
};
use crate::models::*;
use crate::services::PlanService;
use chrono::{DateTime, Duration, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tokio::sync::Mutex;

pub const PAYMENT_INITIATED_MESSAGE: &str = "Payment initiated. Please complete the M-PESA payment.";

/// Gateway result code for a completed payment.
const RESULT_SUCCESS: &str = "0";
/// Gateway result code for a prompt the payer dismissed.
const RESULT_CANCELLED_BY_USER: &str = "1032";

const RECONCILE_BATCH_SIZE: u64 = 50;

/// Outcome reported by the gateway for one checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub status: TransactionStatus,
    pub description: String,
    pub receipt_number: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Settlement {
    pub fn from_result(result_code: &str, description: impl Into<String>) -> Self {
        Self {
            status: status_for_result_code(result_code),
            description: description.into(),
            receipt_number: None,
            completed_at: None,
        }
    }
}

impl From<&StkCallback> for Settlement {
    fn from(callback: &StkCallback) -> Self {
        Self {
            receipt_number: callback.receipt_number(),
            completed_at: callback.transaction_date(),
            ..Self::from_result(&callback.result_code, callback.result_desc.clone())
        }
    }
}

pub fn status_for_result_code(result_code: &str) -> TransactionStatus {
    match result_code.trim() {
        RESULT_SUCCESS => TransactionStatus::Completed,
        RESULT_CANCELLED_BY_USER => TransactionStatus::Cancelled,
        _ => TransactionStatus::Failed,
    }
}

/// New expiry after buying `hours` of access: unused time is kept, lapsed time is not.
pub fn extend_access(
    active_until: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    hours: i32,
) -> DateTime<Utc> {
    let base = active_until.filter(|until| *until > now).unwrap_or(now);
    base + Duration::hours(i64::from(hours))
}

#[derive(Clone)]
pub struct PaymentService {
    pool: DatabaseConnection,
    gateway: Arc<dyn PaymentGateway>,
    plan_service: PlanService,
    // shared by clones; settlements in this process run one at a time
    settle_lock: Arc<Mutex<()>>,
}

impl PaymentService {
    pub fn new(pool: DatabaseConnection, gateway: Arc<dyn PaymentGateway>) -> Self {
        let plan_service = PlanService::new(pool.clone());
        Self {
            pool,
            gateway,
            plan_service,
            settle_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Records a pending transaction for the chosen plan and prompts the user's phone.
    pub async fn initiate_payment(
        &self,
        user_id: i64,
        request: InitiatePaymentRequest,
    ) -> AppResult<InitiatePaymentResponse> {
        let plan_id = request
            .plan_id
            .filter(|id| *id > 0)
            .ok_or_else(|| AppError::ValidationError("Invalid plan selected".into()))?;
        let plan = self.plan_service.get_plan(plan_id).await?;

        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;

        let now = Utc::now();
        let pending = transactions::ActiveModel {
            user_id: Set(user.id),
            plan_id: Set(plan.id),
            amount: Set(plan.price),
            transaction_type: Set(TransactionType::Mpesa),
            status: Set(TransactionStatus::Pending),
            merchant_request_id: Set(None),
            checkout_request_id: Set(None),
            result_description: Set(None),
            mpesa_receipt_number: Set(None),
            transaction_date: Set(now),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&self.pool)
        .await?;

        let push = PushRequest {
            phone: user.phone.clone(),
            amount: plan.price,
            account_reference: format!("WIFI{}", pending.id),
            description: plan.name.clone(),
        };

        match self.gateway.initiate_push(&push).await {
            Ok(accepted) => {
                let mut am = pending.into_active_model();
                am.merchant_request_id = Set(Some(accepted.merchant_request_id));
                am.checkout_request_id = Set(Some(accepted.checkout_request_id));
                am.result_description = Set(Some(accepted.response_description));
                am.updated_at = Set(Utc::now());
                let updated = am.update(&self.pool).await?;

                log::info!(
                    "Payment {} initiated for user {} on plan {}",
                    updated.id,
                    user.id,
                    plan.id
                );
                Ok(InitiatePaymentResponse {
                    transaction: TransactionResponse::with_plan(updated, Some(plan)),
                    customer_message: accepted.customer_message,
                })
            }
            Err(e) => {
                log::error!("STK push failed for transaction {}: {e}", pending.id);
                let mut am = pending.into_active_model();
                am.status = Set(TransactionStatus::Failed);
                am.result_description = Set(Some(e.to_string()));
                am.updated_at = Set(Utc::now());
                am.update(&self.pool).await?;
                Err(e)
            }
        }
    }

    /// Reports a transaction's status, asking the gateway once if it is still pending.
    pub async fn check_payment_status(
        &self,
        user_id: i64,
        transaction_id: i64,
    ) -> AppResult<PaymentStatusResponse> {
        let tx = transactions::Entity::find_by_id(transaction_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        if tx.user_id != user_id {
            return Err(AppError::Forbidden);
        }
        if tx.status.is_final() {
            return Ok((&tx).into());
        }

        let current = self.poll_gateway(&tx).await?;
        Ok(current.as_ref().unwrap_or(&tx).into())
    }

    /// Asks the gateway about transactions still pending after `older_than`, least
    /// recently checked first. Returns how many reached a final status.
    pub async fn reconcile_pending(&self, older_than: Duration) -> AppResult<usize> {
        let cutoff = Utc::now() - older_than;
        let stale = transactions::Entity::find()
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending))
            .filter(transactions::Column::CheckoutRequestId.is_not_null())
            .filter(transactions::Column::CreatedAt.lte(cutoff))
            .order_by_asc(transactions::Column::UpdatedAt)
            .order_by_asc(transactions::Column::Id)
            .limit(RECONCILE_BATCH_SIZE)
            .all(&self.pool)
            .await?;

        let mut settled = 0;
        for tx in &stale {
            if let Some(current) = self.poll_gateway(tx).await?
                && current.status.is_final()
            {
                settled += 1;
            }
        }
        Ok(settled)
    }

    /// Queries the gateway once for a pending transaction and settles it on a final answer.
    /// `None` means it is still pending as far as we know; such rows are stamped as checked
    /// so the next sweep reaches others first.
    async fn poll_gateway(
        &self,
        tx: &transactions::Model,
    ) -> AppResult<Option<transactions::Model>> {
        let Some(checkout_request_id) = tx.checkout_request_id.as_deref() else {
            return Ok(None);
        };

        match self.gateway.query_status(checkout_request_id).await {
            Ok(result) => {
                let settlement = Settlement::from_result(&result.result_code, result.result_desc);
                self.settle(checkout_request_id, settlement).await
            }
            Err(AppError::GatewayError { code, .. }) if code == STK_QUERY_PROCESSING_CODE => {
                log::debug!("Transaction {} is still being processed", tx.id);
                self.mark_checked(tx.id).await?;
                Ok(None)
            }
            Err(e) => {
                log::warn!("Status query for transaction {} failed: {e}", tx.id);
                self.mark_checked(tx.id).await?;
                Ok(None)
            }
        }
    }

    async fn mark_checked(&self, transaction_id: i64) -> AppResult<()> {
        transactions::Entity::update_many()
            .col_expr(transactions::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(transactions::Column::Id.eq(transaction_id))
            .filter(transactions::Column::Status.eq(TransactionStatus::Pending))
            .exec(&self.pool)
            .await?;
        Ok(())
    }

    /// Applies an asynchronous gateway callback. Unknown checkout ids are logged and dropped.
    pub async fn handle_callback(&self, envelope: StkCallbackEnvelope) -> AppResult<()> {
        let callback = envelope.body.stk_callback;
        let settlement = Settlement::from(&callback);

        match self.settle(&callback.checkout_request_id, settlement).await? {
            Some(tx) => log::info!(
                "Callback for {} applied, transaction {} is {}",
                callback.checkout_request_id,
                tx.id,
                tx.status
            ),
            None => log::warn!(
                "Callback for unknown checkout request {}",
                callback.checkout_request_id
            ),
        }
        Ok(())
    }

    /// Moves a pending transaction to its final status and grants access on completion.
    ///
    /// A transaction leaves PENDING at most once. Later reports only fill in a
    /// receipt number that the first report lacked. Returns the stored row, or
    /// `None` when no transaction carries this checkout id.
    pub async fn settle(
        &self,
        checkout_request_id: &str,
        settlement: Settlement,
    ) -> AppResult<Option<transactions::Model>> {
        let _settling = self.settle_lock.lock().await;
        let txn = self.pool.begin().await?;

        // write before reading so the transaction holds the database write lock from the start
        let claimed = transactions::Entity::update_many()
            .col_expr(
                transactions::Column::UpdatedAt,
                Expr::col(transactions::Column::UpdatedAt).into(),
            )
            .filter(transactions::Column::CheckoutRequestId.eq(checkout_request_id))
            .exec(&txn)
            .await?;
        if claimed.rows_affected == 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let Some(tx) = transactions::Entity::find()
            .filter(transactions::Column::CheckoutRequestId.eq(checkout_request_id))
            .one(&txn)
            .await?
        else {
            txn.rollback().await?;
            return Ok(None);
        };

        let now = Utc::now();

        if tx.status.is_final() {
            let late_receipt = tx.status == TransactionStatus::Completed
                && settlement.status == TransactionStatus::Completed
                && tx.mpesa_receipt_number.is_none()
                && settlement.receipt_number.is_some();
            if !late_receipt {
                txn.rollback().await?;
                log::info!("Transaction {} already settled as {}", tx.id, tx.status);
                return Ok(Some(tx));
            }

            let mut am = tx.into_active_model();
            am.mpesa_receipt_number = Set(settlement.receipt_number);
            if let Some(at) = settlement.completed_at {
                am.transaction_date = Set(at);
            }
            am.updated_at = Set(now);
            let updated = am.update(&txn).await?;
            txn.commit().await?;
            return Ok(Some(updated));
        }

        if settlement.status == TransactionStatus::Completed {
            let plan = plans::Entity::find_by_id(tx.plan_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("Plan not found".into()))?;
            let user = users::Entity::find_by_id(tx.user_id)
                .one(&txn)
                .await?
                .ok_or_else(|| AppError::NotFound("User not found".into()))?;

            let active_until = extend_access(user.active_until, now, plan.duration_hours);
            let user_id = user.id;
            let mut um = user.into_active_model();
            um.active_until = Set(Some(active_until));
            um.update(&txn).await?;
            log::info!("User {user_id} has access until {active_until}");
        }

        let mut am = tx.into_active_model();
        am.status = Set(settlement.status);
        am.result_description = Set(Some(settlement.description));
        if settlement.receipt_number.is_some() {
            am.mpesa_receipt_number = Set(settlement.receipt_number);
        }
        am.transaction_date = Set(settlement.completed_at.unwrap_or(now));
        am.updated_at = Set(now);
        let updated = am.update(&txn).await?;

        txn.commit().await?;
        log::info!("Transaction {} settled as {}", updated.id, updated.status);
        Ok(Some(updated))
    }
}
