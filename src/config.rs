use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub session: SessionConfig,
    pub mpesa: MpesaConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    /// Drop and recreate every table on startup.
    #[serde(default)]
    pub reset_on_startup: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub secret: String,
    pub expires_in: i64,          // seconds
    pub remember_expires_in: i64, // seconds
    #[serde(default)]
    pub cookie_secure: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MpesaConfig {
    #[serde(default = "default_mpesa_base_url")]
    pub base_url: String,
    pub consumer_key: String,
    pub consumer_secret: String,
    pub business_shortcode: String,
    pub passkey: String,
    pub callback_url: String,
    #[serde(default = "default_transaction_type")]
    pub transaction_type: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Background sweep that asks the gateway about payments whose callback never arrived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    /// Seconds between sweeps; 0 disables the sweep.
    pub reconcile_interval_secs: u64,
    /// Only transactions pending for at least this many seconds are queried.
    pub reconcile_after_secs: i64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            reconcile_interval_secs: 60,
            reconcile_after_secs: 120,
        }
    }
}

fn default_mpesa_base_url() -> String {
    "https://sandbox.safaricom.co.ke".to_string()
}

fn default_transaction_type() -> String {
    "CustomerPayBillOnline".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    pub fn from_toml() -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        let mut config: Config = match std::fs::read_to_string(&config_path) {
            Ok(config_str) => toml::from_str(&config_str)
                .map_err(|e| format!("Failed to parse config file {config_path}: {e}"))?,
            Err(e) if e.kind() == ErrorKind::NotFound => Self::from_env_defaults(),
            Err(e) => {
                return Err(format!("Failed to read config file {config_path}: {e}").into());
            }
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Builds a configuration purely from defaults; `apply_env_overrides` fills in the rest.
    fn from_env_defaults() -> Self {
        Config {
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "sqlite://instance/wifi_payment.db?mode=rwc".to_string(),
                max_connections: 10,
                reset_on_startup: false,
            },
            session: SessionConfig {
                secret: "change-me-in-production".to_string(),
                expires_in: 86_400,
                remember_expires_in: 2_592_000,
                cookie_secure: false,
            },
            mpesa: MpesaConfig {
                base_url: default_mpesa_base_url(),
                consumer_key: String::new(),
                consumer_secret: String::new(),
                business_shortcode: String::new(),
                passkey: String::new(),
                callback_url: String::new(),
                transaction_type: default_transaction_type(),
                timeout_secs: default_timeout_secs(),
            },
            tasks: TasksConfig::default(),
        }
    }

    fn apply_env_overrides(&mut self) {
        fn parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
            env::var(name).ok().and_then(|v| v.parse::<T>().ok())
        }

        if let Ok(v) = env::var("SERVER_HOST") {
            self.server.host = v;
        }
        if let Some(p) = parsed("SERVER_PORT") {
            self.server.port = p;
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = v;
        }
        if let Some(mc) = parsed("DB_MAX_CONNECTIONS") {
            self.database.max_connections = mc;
        }
        if let Some(b) = parsed("DB_RESET_ON_STARTUP") {
            self.database.reset_on_startup = b;
        }
        if let Ok(v) = env::var("SESSION_SECRET") {
            self.session.secret = v;
        }
        if let Some(n) = parsed("SESSION_EXPIRES_IN") {
            self.session.expires_in = n;
        }
        if let Some(n) = parsed("SESSION_REMEMBER_EXPIRES_IN") {
            self.session.remember_expires_in = n;
        }
        if let Some(b) = parsed("SESSION_COOKIE_SECURE") {
            self.session.cookie_secure = b;
        }
        if let Ok(v) = env::var("MPESA_BASE_URL") {
            self.mpesa.base_url = v;
        }
        if let Ok(v) = env::var("MPESA_CONSUMER_KEY") {
            self.mpesa.consumer_key = v;
        }
        if let Ok(v) = env::var("MPESA_CONSUMER_SECRET") {
            self.mpesa.consumer_secret = v;
        }
        if let Ok(v) = env::var("MPESA_SHORTCODE") {
            self.mpesa.business_shortcode = v;
        }
        if let Ok(v) = env::var("MPESA_PASSKEY") {
            self.mpesa.passkey = v;
        }
        if let Ok(v) = env::var("MPESA_CALLBACK_URL") {
            self.mpesa.callback_url = v;
        }
        if let Ok(v) = env::var("MPESA_TRANSACTION_TYPE") {
            self.mpesa.transaction_type = v;
        }
        if let Some(n) = parsed("MPESA_TIMEOUT_SECS") {
            self.mpesa.timeout_secs = n;
        }
        if let Some(n) = parsed("RECONCILE_INTERVAL_SECS") {
            self.tasks.reconcile_interval_secs = n;
        }
        if let Some(n) = parsed("RECONCILE_AFTER_SECS") {
            self.tasks.reconcile_after_secs = n;
        }
    }
}
