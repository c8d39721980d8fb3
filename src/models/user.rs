use crate::entities::user_entity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RegisterRequest {
    #[schema(example = "0712345678")]
    pub phone: Option<String>,
    #[schema(example = "Passw0rd!")]
    pub password: Option<String>,
    #[schema(example = "Passw0rd!")]
    pub confirm_password: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "0712345678")]
    pub phone: Option<String>,
    #[schema(example = "Passw0rd!")]
    pub password: Option<String>,
    /// Keep the session across browser restarts (defaults to true).
    pub remember: Option<bool>,
}

#[derive(Debug, Serialize, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct LoginQuery {
    /// Local path to continue to after signing in.
    pub next: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub active_until: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl From<user_entity::Model> for UserResponse {
    fn from(user: user_entity::Model) -> Self {
        Self {
            is_active: user.has_active_access(Utc::now()),
            id: user.id,
            phone: user.phone,
            created_at: user.created_at,
            active_until: user.active_until,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuthResponse {
    pub user: UserResponse,
    /// Also set as the `session` cookie; usable as a bearer token.
    pub token: String,
    pub expires_in: i64,
    #[serde(skip)]
    pub remember: bool,
    pub redirect_to: String,
}
