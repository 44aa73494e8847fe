use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::env;
use validator::Validate;

/// Default values for configuration
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_ENV: &str = "development";
const DEFAULT_PORT: u16 = 8080;
const CONFIG_DIR: &str = "config";

/// Flat shipping rates per postal zone, in whole currency units.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ShippingConfig {
    /// Rate for city postal codes (1000-1499)
    #[serde(default = "default_metro_rate")]
    pub metro: i64,

    /// Rate for the surrounding belt (1500-1999)
    #[serde(default = "default_greater_metro_rate")]
    pub greater_metro: i64,

    /// Rate for the rest of the country; also the fallback for codes outside
    /// every zone
    #[serde(default = "default_interior_rate")]
    pub interior: i64,
}

impl Default for ShippingConfig {
    fn default() -> Self {
        Self {
            metro: default_metro_rate(),
            greater_metro: default_greater_metro_rate(),
            interior: default_interior_rate(),
        }
    }
}

fn default_metro_rate() -> i64 {
    3500
}
fn default_greater_metro_rate() -> i64 {
    5800
}
fn default_interior_rate() -> i64 {
    8500
}

/// Hosted-checkout payment provider settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaymentConfig {
    /// Provider API base URL
    #[serde(default = "default_payment_base_url")]
    pub base_url: String,

    /// Provider API access token
    pub access_token: String,

    /// Timeout for provider calls, in seconds
    #[serde(default = "default_provider_timeout_secs")]
    pub timeout_secs: u64,

    /// Shared secret for inbound webhook signature verification; verification
    /// is skipped when unset
    #[serde(default)]
    pub webhook_secret: Option<String>,

    /// Maximum accepted age of a signed webhook timestamp, in seconds
    #[serde(default = "default_webhook_tolerance_secs")]
    pub webhook_tolerance_secs: u64,
}

fn default_payment_base_url() -> String {
    "https://api.mercadopago.com".to_string()
}
fn default_provider_timeout_secs() -> u64 {
    10
}
fn default_webhook_tolerance_secs() -> u64 {
    300
}

/// Outbound transactional-mail API settings.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MailConfig {
    /// Mail API endpoint receiving the JSON send requests
    pub api_url: String,

    /// Mail API bearer token
    pub api_token: String,

    /// From address on every outbound mail
    pub sender: String,

    /// Operator mailbox for sale alerts and contact messages
    pub admin_address: String,

    /// Timeout for mail API calls, in seconds
    #[serde(default = "default_mail_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_mail_timeout_secs() -> u64 {
    10
}

/// Application configuration structure with validation
#[derive(Clone, Debug, Deserialize, Validate)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// Database connection URL
    pub database_url: String,

    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Application environment
    #[serde(default = "default_environment")]
    pub environment: String,

    /// Logging level
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log in JSON format (structured logging)
    #[serde(default)]
    pub log_json: bool,

    /// ISO 4217 currency code used on every line item
    #[validate(length(equal = 3))]
    #[serde(default = "default_currency")]
    pub currency: String,

    /// Public storefront base URL; payment-result pages hang off this
    pub store_base_url: String,

    /// Where the provider should deliver payment notifications
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Allowed CORS origins; empty means any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Static catalog file loaded into an empty products table on startup
    #[serde(default = "default_catalog_seed_path")]
    pub catalog_seed_path: String,

    /// Directory for uploaded proof-of-transfer files
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,

    /// Shipping zone rates
    #[serde(default)]
    pub shipping: ShippingConfig,

    /// Payment provider settings
    pub payment: PaymentConfig,

    /// Transactional mail settings
    pub mail: MailConfig,
}

impl AppConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_environment() -> String {
    DEFAULT_ENV.to_string()
}
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}
fn default_currency() -> String {
    "ARS".to_string()
}
fn default_catalog_seed_path() -> String {
    "data/catalog.json".to_string()
}
fn default_uploads_dir() -> String {
    "uploads".to_string()
}

/// Loads application configuration
///
/// Layers configuration sources in this order:
/// 1. Default config (config/default.toml)
/// 2. Environment-specific config (config/{RUN_ENV}.toml)
/// 3. Environment variables (APP__*)
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let environment = env::var("RUN_ENV").unwrap_or_else(|_| DEFAULT_ENV.to_string());

    let cfg: AppConfig = Config::builder()
        .add_source(File::with_name(&format!("{CONFIG_DIR}/default")).required(false))
        .add_source(File::with_name(&format!("{CONFIG_DIR}/{environment}")).required(false))
        .add_source(Environment::with_prefix("APP").separator("__"))
        .build()?
        .try_deserialize()?;

    cfg.validate()
        .map_err(|err| ConfigError::Message(err.to_string()))?;
    Ok(cfg)
}

/// Initializes tracing using the provided log level as the default filter
pub fn init_tracing(level: &str, json: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default_directive = format!("storefront_api={level},tower_http=debug");
    let filter_directive = env::var("RUST_LOG")
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or(default_directive);

    if json {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .json()
            .try_init();
    } else {
        let _ = fmt()
            .with_env_filter(EnvFilter::new(filter_directive))
            .try_init();
    }
}
