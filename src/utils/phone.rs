use crate::error::{AppError, AppResult};
use regex::Regex;
use std::sync::LazyLock;

static LOCAL_MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^07\d{8}$").expect("valid phone regex"));

pub const INVALID_PHONE_MESSAGE: &str =
    "Invalid phone number format. Please use format: 07XXXXXXXX";

/// Validates a Kenyan mobile number and returns it in stored `07XXXXXXXX` form.
///
/// Every non-digit character is dropped before matching, so `0712 345 678`
/// and `0712-345-678` are both accepted.
pub fn validate_phone(phone: &str) -> AppResult<String> {
    let digits: String = phone.chars().filter(|c| c.is_ascii_digit()).collect();

    if !LOCAL_MOBILE.is_match(&digits) {
        return Err(AppError::ValidationError(INVALID_PHONE_MESSAGE.to_string()));
    }

    Ok(digits)
}

/// Formats a phone number the way the payment gateway expects it (`2547XXXXXXXX`).
pub fn to_international(phone: &str) -> String {
    let phone: String = phone.chars().filter(|c| *c != '+' && *c != ' ').collect();

    if let Some(rest) = phone.strip_prefix('0') {
        format!("254{rest}")
    } else if phone.starts_with("254") {
        phone
    } else {
        format!("254{phone}")
    }
}
