use crate::error::{AppError, AppResult};
use bcrypt::{DEFAULT_COST, hash, verify};

const SPECIAL_CHARACTERS: &str = "!@#$%^&*(),.?\":{}|<>";

/// Checks password strength; the first failing rule decides the message.
pub fn validate_password(password: &str) -> AppResult<()> {
    let rule = |ok: bool, message: &str| {
        if ok {
            Ok(())
        } else {
            Err(AppError::ValidationError(message.to_string()))
        }
    };

    rule(
        password.chars().count() >= 7,
        "Password must be at least 7 characters long",
    )?;
    rule(
        password.chars().any(|c| c.is_ascii_uppercase()),
        "Password must contain at least one uppercase letter",
    )?;
    rule(
        password.chars().any(|c| c.is_ascii_lowercase()),
        "Password must contain at least one lowercase letter",
    )?;
    rule(
        password.chars().any(|c| c.is_ascii_digit()),
        "Password must contain at least one number",
    )?;
    rule(
        password.chars().any(|c| SPECIAL_CHARACTERS.contains(c)),
        "Password must contain at least one special character",
    )
}

pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    verify(password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification failed: {e}")))
}
