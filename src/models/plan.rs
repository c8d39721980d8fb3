use crate::entities::plan_entity;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanResponse {
    pub id: i64,
    #[schema(example = "1 Hour Access")]
    pub name: String,
    pub duration_hours: i32,
    /// Whole shillings.
    pub price: i64,
}

impl From<plan_entity::Model> for PlanResponse {
    fn from(m: plan_entity::Model) -> Self {
        Self {
            id: m.id,
            name: m.name,
            duration_hours: m.duration_hours,
            price: m.price,
        }
    }
}
