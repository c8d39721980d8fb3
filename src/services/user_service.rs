use crate::entities::{plan_entity as plans, transaction_entity as transactions, user_entity as users};
use crate::error::{AppError, AppResult};
use crate::models::*;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};

#[derive(Clone)]
pub struct UserService {
    pool: DatabaseConnection,
}

impl UserService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    pub async fn get_user(&self, user_id: i64) -> AppResult<UserResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("User not found".into()))?;
        Ok(user.into())
    }

    /// Newest first, each row carrying its plan name.
    pub async fn list_transactions(&self, user_id: i64) -> AppResult<Vec<TransactionResponse>> {
        let rows = transactions::Entity::find()
            .filter(transactions::Column::UserId.eq(user_id))
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .find_also_related(plans::Entity)
            .all(&self.pool)
            .await?;

        Ok(rows
            .into_iter()
            .map(|(tx, plan)| TransactionResponse::with_plan(tx, plan))
            .collect())
    }

    /// Profile, catalog and purchase history in one payload. Storage failures are
    /// reported as "An error occurred while loading the dashboard".
    pub async fn dashboard(&self, user_id: i64) -> AppResult<DashboardResponse> {
        self.load_dashboard(user_id).await.map_err(|e| match e {
            AppError::DatabaseError(err) => {
                log::error!("Error loading dashboard for user {user_id}: {err}");
                AppError::OperationFailed("An error occurred while loading the dashboard".into())
            }
            other => other,
        })
    }

    async fn load_dashboard(&self, user_id: i64) -> AppResult<DashboardResponse> {
        let user = self.get_user(user_id).await?;
        let plans = plans::Entity::find()
            .order_by_asc(plans::Column::Id)
            .all(&self.pool)
            .await?
            .into_iter()
            .map(PlanResponse::from)
            .collect();
        let transactions = self.list_transactions(user_id).await?;

        Ok(DashboardResponse {
            user,
            plans,
            transactions,
        })
    }
}
