use crate::entities::plan_entity as plans;
use crate::error::{AppError, AppResult};
use crate::models::PlanResponse;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};

/// Plans offered on a fresh install: (name, duration in hours, price in shillings).
pub const DEFAULT_PLANS: [(&str, i32, i64); 3] = [
    ("1 Hour Access", 1, 50),
    ("12 Hour Access", 12, 200),
    ("24 Hour Access", 24, 300),
];

#[derive(Clone)]
pub struct PlanService {
    pool: DatabaseConnection,
}

impl PlanService {
    pub fn new(pool: DatabaseConnection) -> Self {
        Self { pool }
    }

    /// Inserts the default catalog when no plan exists yet. Returns how many were added.
    pub async fn seed_default_plans(&self) -> AppResult<usize> {
        if plans::Entity::find().one(&self.pool).await?.is_some() {
            return Ok(0);
        }

        let models = DEFAULT_PLANS
            .iter()
            .map(|(name, duration_hours, price)| plans::ActiveModel {
                name: Set(name.to_string()),
                duration_hours: Set(*duration_hours),
                price: Set(*price),
                ..Default::default()
            });
        plans::Entity::insert_many(models).exec(&self.pool).await?;

        log::info!("Seeded {} default plans", DEFAULT_PLANS.len());
        Ok(DEFAULT_PLANS.len())
    }

    pub async fn list_plans(&self) -> AppResult<Vec<PlanResponse>> {
        let rows = plans::Entity::find()
            .order_by_asc(plans::Column::Id)
            .all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(PlanResponse::from).collect())
    }

    pub async fn get_plan(&self, plan_id: i64) -> AppResult<plans::Model> {
        plans::Entity::find_by_id(plan_id)
            .one(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Plan not found".into()))
    }
}
