use crate::config::SessionConfig;
use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Name of the cookie carrying the session token.
pub const SESSION_COOKIE: &str = "session";

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub phone: String,
    pub exp: i64,
    pub iat: i64,
    pub remember: bool,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    session_expires_in: i64,
    remember_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, session_expires_in: i64, remember_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            session_expires_in,
            remember_expires_in,
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self::new(
            &config.secret,
            config.expires_in,
            config.remember_expires_in,
        )
    }

    /// Issues a session token; remembered sessions live longer.
    pub fn generate_session_token(
        &self,
        user_id: i64,
        phone: &str,
        remember: bool,
    ) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expires_in(remember));

        let claims = Claims {
            sub: user_id.to_string(),
            phone: phone.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            remember,
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_session_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    /// Resolves a token to the user id it was issued for.
    pub fn session_user_id(&self, token: &str) -> AppResult<i64> {
        let claims = self.verify_session_token(token)?;
        claims
            .sub
            .parse::<i64>()
            .map_err(|_| AppError::AuthError("Invalid session".to_string()))
    }

    pub fn expires_in(&self, remember: bool) -> i64 {
        if remember {
            self.remember_expires_in
        } else {
            self.session_expires_in
        }
    }
}
