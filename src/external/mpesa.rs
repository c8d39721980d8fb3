use crate::config::MpesaConfig;
use crate::error::{AppError, AppResult};
use crate::external::gateway::{PaymentGateway, PushRequest};
use crate::utils::{format_gateway_timestamp, parse_gateway_timestamp, to_international};
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;

const OAUTH_PATH: &str = "/oauth/v1/generate";
const STK_PUSH_PATH: &str = "/mpesa/stkpush/v1/processrequest";
const STK_QUERY_PATH: &str = "/mpesa/stkpushquery/v1/query";

/// Error code the status query returns while the payer has not answered the prompt yet.
pub const STK_QUERY_PROCESSING_CODE: &str = "500.001.1001";

/// Refresh the token this long before the gateway says it expires.
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "de_opt_string_or_number")]
    expires_in: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GatewayErrorBody {
    #[serde(default)]
    request_id: Option<String>,
    error_code: String,
    error_message: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkPushPayload<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    transaction_type: &'a str,
    amount: i64,
    party_a: String,
    party_b: &'a str,
    phone_number: String,
    #[serde(rename = "CallBackURL")]
    callback_url: &'a str,
    account_reference: &'a str,
    transaction_desc: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StkQueryPayload<'a> {
    business_short_code: &'a str,
    password: String,
    timestamp: String,
    #[serde(rename = "CheckoutRequestID")]
    checkout_request_id: &'a str,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StkPushResponse {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(deserialize_with = "de_string_or_number")]
    pub response_code: String,
    pub response_description: String,
    #[serde(default)]
    pub customer_message: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "PascalCase")]
pub struct StkQueryResponse {
    #[serde(deserialize_with = "de_string_or_number")]
    pub response_code: String,
    pub response_description: String,
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(deserialize_with = "de_string_or_number")]
    pub result_code: String,
    pub result_desc: String,
}

/// Body of the asynchronous result the gateway posts to our callback URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkCallbackEnvelope {
    #[serde(rename = "Body")]
    pub body: StkCallbackBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StkCallbackBody {
    #[serde(rename = "stkCallback")]
    pub stk_callback: StkCallback,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StkCallback {
    #[serde(rename = "MerchantRequestID")]
    pub merchant_request_id: String,
    #[serde(rename = "CheckoutRequestID")]
    pub checkout_request_id: String,
    #[serde(deserialize_with = "de_string_or_number")]
    pub result_code: String,
    pub result_desc: String,
    #[serde(default)]
    pub callback_metadata: Option<CallbackMetadata>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CallbackMetadata {
    #[serde(rename = "Item", default)]
    pub items: Vec<CallbackItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CallbackItem {
    pub name: String,
    #[serde(default)]
    pub value: Option<Value>,
}

impl StkCallback {
    fn metadata_value(&self, name: &str) -> Option<&Value> {
        self.callback_metadata
            .as_ref()?
            .items
            .iter()
            .find(|item| item.name == name)?
            .value
            .as_ref()
    }

    pub fn receipt_number(&self) -> Option<String> {
        self.metadata_value("MpesaReceiptNumber")
            .and_then(value_to_string)
    }

    /// Completion time reported by the gateway.
    pub fn transaction_date(&self) -> Option<DateTime<Utc>> {
        self.metadata_value("TransactionDate")
            .and_then(value_to_string)
            .and_then(|raw| parse_gateway_timestamp(&raw))
    }
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// The gateway is inconsistent about quoting numeric codes.
fn de_string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(&value)
        .ok_or_else(|| serde::de::Error::custom(format!("expected string or number, got {value}")))
}

fn de_opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(value_to_string))
}

/// Base64 of `shortcode + passkey + timestamp`, the per-request STK password.
pub fn stk_password(shortcode: &str, passkey: &str, timestamp: &str) -> String {
    STANDARD.encode(format!("{shortcode}{passkey}{timestamp}"))
}

/// When a token issued at `now` should be refreshed. `None` when the gateway gave no
/// usable lifetime.
fn token_expiry(now: DateTime<Utc>, expires_in: Option<&str>) -> Option<DateTime<Utc>> {
    let secs = expires_in?.trim().parse::<i64>().ok()?;
    let lifetime = Duration::try_seconds(secs.checked_sub(TOKEN_EXPIRY_MARGIN_SECS)?)?;
    now.checked_add_signed(lifetime)
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl CachedToken {
    fn is_valid(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_none_or(|at| at > now)
    }
}

/// HTTP client for the M-Pesa Daraja API (OAuth, STK push, STK query).
#[derive(Clone)]
pub struct MpesaClient {
    client: Client,
    config: MpesaConfig,
    token: Arc<RwLock<Option<CachedToken>>>,
}

impl MpesaClient {
    pub fn new(config: MpesaConfig) -> AppResult<Self> {
        let client = Client::builder()
            .user_agent("hotspot-billing/mpesa")
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config,
            token: Arc::new(RwLock::new(None)),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Returns the cached bearer token, fetching a new one when missing or expired.
    pub async fn access_token(&self) -> AppResult<String> {
        let now = Utc::now();
        {
            let token = self.token.read().await;
            if let Some(cached) = token.as_ref()
                && cached.is_valid(now)
            {
                return Ok(cached.value.clone());
            }
        }

        let mut token = self.token.write().await;
        // another request may have refreshed it while we waited for the lock
        if let Some(cached) = token.as_ref()
            && cached.is_valid(now)
        {
            return Ok(cached.value.clone());
        }

        let fresh = self.fetch_access_token().await.map_err(|e| {
            log::error!("Error getting access token: {e}");
            AppError::ExternalApiError("Could not get access token".to_string())
        })?;
        let value = fresh.value.clone();
        *token = Some(fresh);
        Ok(value)
    }

    async fn fetch_access_token(&self) -> AppResult<CachedToken> {
        let response = self
            .client
            .get(self.url(OAUTH_PATH))
            .basic_auth(&self.config.consumer_key, Some(&self.config.consumer_secret))
            .query(&[("grant_type", "client_credentials")])
            .send()
            .await?;

        let body: AccessTokenResponse = Self::read_response(response).await?;
        let expires_at = token_expiry(Utc::now(), body.expires_in.as_deref());

        log::info!("Obtained M-Pesa access token, expires at {expires_at:?}");

        Ok(CachedToken {
            value: body.access_token,
            expires_at,
        })
    }

    /// Asks the gateway to prompt `phone` for a payment of `amount`.
    pub async fn initiate_stk_push(
        &self,
        phone: &str,
        amount: i64,
        account_reference: &str,
        transaction_desc: &str,
    ) -> AppResult<StkPushResponse> {
        let phone_number = to_international(phone);
        let timestamp = format_gateway_timestamp(Utc::now());
        let shortcode = self.config.business_shortcode.as_str();

        let payload = StkPushPayload {
            business_short_code: shortcode,
            password: stk_password(shortcode, &self.config.passkey, &timestamp),
            timestamp,
            transaction_type: &self.config.transaction_type,
            amount,
            party_a: phone_number.clone(),
            party_b: shortcode,
            phone_number,
            callback_url: &self.config.callback_url,
            account_reference,
            transaction_desc,
        };

        let response: StkPushResponse = self.post_json(STK_PUSH_PATH, &payload).await?;
        if response.response_code != "0" {
            return Err(AppError::GatewayError {
                code: response.response_code,
                message: response.response_description,
            });
        }

        log::info!(
            "STK push accepted: merchant_request_id={}, checkout_request_id={}",
            response.merchant_request_id,
            response.checkout_request_id
        );
        Ok(response)
    }

    /// Looks up the outcome of an earlier push by its checkout request id.
    pub async fn query_stk_status(&self, checkout_request_id: &str) -> AppResult<StkQueryResponse> {
        let timestamp = format_gateway_timestamp(Utc::now());
        let shortcode = self.config.business_shortcode.as_str();

        let payload = StkQueryPayload {
            business_short_code: shortcode,
            password: stk_password(shortcode, &self.config.passkey, &timestamp),
            timestamp,
            checkout_request_id,
        };

        self.post_json(STK_QUERY_PATH, &payload).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(&self, path: &str, body: &B) -> AppResult<T> {
        let token = self.access_token().await?;

        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(token)
            .json(body)
            .send()
            .await?;

        Self::read_response(response).await
    }

    async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<T>().await?);
        }

        let text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        match serde_json::from_str::<GatewayErrorBody>(&text) {
            Ok(err) => {
                log::warn!(
                    "Gateway returned HTTP {} (request {:?}): {} {}",
                    status.as_u16(),
                    err.request_id,
                    err.error_code,
                    err.error_message
                );
                Err(AppError::GatewayError {
                    code: err.error_code,
                    message: err.error_message,
                })
            }
            Err(_) => Err(AppError::ExternalApiError(format!(
                "Gateway returned HTTP {}: {}",
                status.as_u16(),
                text
            ))),
        }
    }
}

#[async_trait]
impl PaymentGateway for MpesaClient {
    async fn initiate_push(&self, request: &PushRequest) -> AppResult<StkPushResponse> {
        self.initiate_stk_push(
            &request.phone,
            request.amount,
            &request.account_reference,
            &request.description,
        )
        .await
    }

    async fn query_status(&self, checkout_request_id: &str) -> AppResult<StkQueryResponse> {
        self.query_stk_status(checkout_request_id).await
    }
}
