use crate::entities::user_entity as users;
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::*;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};

/// Where a signed-in visitor lands when no other destination applies.
pub const DASHBOARD_PATH: &str = "/api/v1/dashboard";

const DUPLICATE_PHONE_MESSAGE: &str = "An account with this phone number already exists";
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid phone number or password";

#[derive(Clone)]
pub struct AuthService {
    pool: DatabaseConnection,
    jwt_service: JwtService,
}

impl AuthService {
    pub fn new(pool: DatabaseConnection, jwt_service: JwtService) -> Self {
        Self { pool, jwt_service }
    }

    /// Creates an account and signs it in. Checks run in a fixed order and the
    /// first failure decides the message.
    pub async fn register(&self, request: RegisterRequest) -> AppResult<AuthResponse> {
        let (Some(phone), Some(password), Some(confirm_password)) = (
            non_empty(request.phone),
            non_empty(request.password),
            non_empty(request.confirm_password),
        ) else {
            return Err(AppError::ValidationError("All fields are required".into()));
        };

        if password != confirm_password {
            return Err(AppError::ValidationError("Passwords do not match".into()));
        }

        let phone = validate_phone(&phone)?;

        if self.find_by_phone(&phone).await?.is_some() {
            return Err(AppError::ValidationError(DUPLICATE_PHONE_MESSAGE.into()));
        }

        validate_password(&password)?;

        let password_hash = hash_password(&password)?;
        let user = self.create_user(&phone, password_hash).await?;

        log::info!("Registered user {} ({})", user.id, user.phone);
        self.open_session(user, false, DASHBOARD_PATH.to_string())
    }

    /// Verifies credentials and issues a session. `remember` defaults to true.
    pub async fn login(&self, request: LoginRequest, next: Option<&str>) -> AppResult<AuthResponse> {
        let (Some(phone), Some(password)) = (non_empty(request.phone), non_empty(request.password))
        else {
            return Err(AppError::ValidationError(
                "Both phone number and password are required".into(),
            ));
        };

        let phone = validate_phone(&phone)?;

        let Some(user) = self.find_by_phone(&phone).await? else {
            log::warn!("Login attempt for unknown phone {phone}");
            return Err(AppError::AuthError(INVALID_CREDENTIALS_MESSAGE.into()));
        };

        if !verify_password(&password, &user.password_hash)? {
            log::warn!("Wrong password for user {}", user.id);
            return Err(AppError::AuthError(INVALID_CREDENTIALS_MESSAGE.into()));
        }

        let remember = request.remember.unwrap_or(true);
        self.open_session(user, remember, safe_redirect(next))
    }

    async fn find_by_phone(&self, phone: &str) -> AppResult<Option<users::Model>> {
        Ok(users::Entity::find()
            .filter(users::Column::Phone.eq(phone))
            .one(&self.pool)
            .await?)
    }

    async fn create_user(&self, phone: &str, password_hash: String) -> AppResult<users::Model> {
        let txn = self.pool.begin().await?;
        let inserted = users::ActiveModel {
            phone: Set(phone.to_string()),
            password_hash: Set(password_hash),
            created_at: Set(Utc::now()),
            active_until: Set(None),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        match inserted {
            Ok(user) => {
                txn.commit().await?;
                Ok(user)
            }
            Err(e) => {
                txn.rollback().await?;
                // a concurrent registration can win the race past the lookup above
                if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                    return Err(AppError::ValidationError(DUPLICATE_PHONE_MESSAGE.into()));
                }
                log::error!("Error creating account for {phone}: {e}");
                Err(AppError::OperationFailed(
                    "Error creating account. Please try again.".into(),
                ))
            }
        }
    }

    fn open_session(
        &self,
        user: users::Model,
        remember: bool,
        redirect_to: String,
    ) -> AppResult<AuthResponse> {
        let token = self
            .jwt_service
            .generate_session_token(user.id, &user.phone, remember)?;

        Ok(AuthResponse {
            user: user.into(),
            token,
            expires_in: self.jwt_service.expires_in(remember),
            remember,
            redirect_to,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Only local absolute paths are honoured as post-login destinations.
pub fn safe_redirect(next: Option<&str>) -> String {
    match next {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.starts_with("/\\") => {
            path.to_string()
        }
        _ => DASHBOARD_PATH.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::memory_pool;
    use sea_orm::ConnectionTrait;

    fn register_request(phone: &str, password: &str, confirm: &str) -> RegisterRequest {
        RegisterRequest {
            phone: Some(phone.into()),
            password: Some(password.into()),
            confirm_password: Some(confirm.into()),
        }
    }

    fn login_request(phone: &str, password: &str) -> LoginRequest {
        LoginRequest {
            phone: Some(phone.into()),
            password: Some(password.into()),
            remember: None,
        }
    }

    async fn service() -> AuthService {
        AuthService::new(memory_pool().await, JwtService::new("test-secret", 3600, 86400))
    }

    fn validation_message(result: AppResult<AuthResponse>) -> String {
        match result {
            Err(AppError::ValidationError(msg)) => msg,
            Err(other) => panic!("expected validation error, got {other:?}"),
            Ok(_) => panic!("expected validation error, got success"),
        }
    }

    #[tokio::test]
    async fn test_insert_race_reports_duplicate_phone() {
        let service = service().await;
        service
            .create_user("0712345678", "hash".into())
            .await
            .unwrap();

        // a second insert that slipped past the lookup hits the unique index
        let raced = service.create_user("0712345678", "hash".into()).await;
        assert!(matches!(
            raced,
            Err(AppError::ValidationError(msg)) if msg == DUPLICATE_PHONE_MESSAGE
        ));
        let stored = users::Entity::find().all(&service.pool).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_failure_reports_generic_error() {
        let service = service().await;
        service
            .pool
            .execute_unprepared("DROP TABLE users")
            .await
            .unwrap();

        let created = service.create_user("0712345678", "hash".into()).await;
        assert!(matches!(
            created,
            Err(AppError::OperationFailed(msg)) if msg == "Error creating account. Please try again."
        ));
    }

    #[test]
    fn test_safe_redirect() {
        assert_eq!(safe_redirect(Some("/api/v1/plans")), "/api/v1/plans");
        assert_eq!(safe_redirect(Some("https://evil.example")), DASHBOARD_PATH);
        assert_eq!(safe_redirect(Some("//evil.example")), DASHBOARD_PATH);
        assert_eq!(safe_redirect(None), DASHBOARD_PATH);
    }

    #[tokio::test]
    async fn test_register_then_login() {
        let service = service().await;

        let registered = service
            .register(register_request("0712 345 678", "Passw0rd!", "Passw0rd!"))
            .await
            .unwrap();
        assert_eq!(registered.user.phone, "0712345678");
        assert!(!registered.user.is_active);
        assert!(!registered.remember);
        assert_eq!(registered.redirect_to, DASHBOARD_PATH);

        let logged_in = service
            .login(login_request("0712345678", "Passw0rd!"), Some("/api/v1/plans"))
            .await
            .unwrap();
        assert_eq!(logged_in.user.id, registered.user.id);
        assert!(logged_in.remember);
        assert_eq!(logged_in.expires_in, 86400);
        assert_eq!(logged_in.redirect_to, "/api/v1/plans");
    }

    #[tokio::test]
    async fn test_register_check_order() {
        let service = service().await;

        let missing = RegisterRequest {
            phone: Some("0712345678".into()),
            password: Some("Passw0rd!".into()),
            confirm_password: None,
        };
        assert_eq!(
            validation_message(service.register(missing).await),
            "All fields are required"
        );
        // mismatch is reported before the malformed phone
        assert_eq!(
            validation_message(service.register(register_request("123", "a", "b")).await),
            "Passwords do not match"
        );
        // malformed phone is reported before the weak password
        assert_eq!(
            validation_message(service.register(register_request("123", "weak", "weak")).await),
            INVALID_PHONE_MESSAGE
        );

        service
            .register(register_request("0712345678", "Passw0rd!", "Passw0rd!"))
            .await
            .unwrap();
        // duplicate is reported before the weak password
        assert_eq!(
            validation_message(
                service
                    .register(register_request("0712345678", "weak", "weak"))
                    .await
            ),
            DUPLICATE_PHONE_MESSAGE
        );
        assert_eq!(
            validation_message(
                service
                    .register(register_request("0722345678", "weak", "weak"))
                    .await
            ),
            "Password must be at least 7 characters long"
        );
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = service().await;
        service
            .register(register_request("0712345678", "Passw0rd!", "Passw0rd!"))
            .await
            .unwrap();

        let missing = LoginRequest {
            phone: Some("0712345678".into()),
            password: Some("   ".into()),
            remember: None,
        };
        assert_eq!(
            validation_message(service.login(missing, None).await),
            "Both phone number and password are required"
        );

        for request in [
            login_request("0712345678", "WrongPassw0rd!"),
            login_request("0799999999", "Passw0rd!"),
        ] {
            assert!(matches!(
                service.login(request, None).await,
                Err(AppError::AuthError(msg)) if msg == INVALID_CREDENTIALS_MESSAGE
            ));
        }
    }
}
