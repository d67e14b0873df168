//! Service configuration parsed from environment variables.
//!
//! Required:
//! - `DATABASE_URL`
//!
//! Optional:
//! - `PORT`: default 3000
//! - `DB_MAX_CONNECTIONS`: default 5
//! - `CURRENCY_SYMBOL`: default `₹`
//! - `SERVICE_FEE_PERCENT`: default 5
//! - `FUNCTIONS_BASE_URL` / `FUNCTIONS_API_KEY`: payment function endpoint
//! - `STORAGE_DIR`: default `./storage`
//! - `PUBLIC_BASE_URL`: prefix for public storage URLs, default empty
//! - `RESEND_API_KEY` / `RESEND_FROM`: MFA code delivery

use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;
pub const DEFAULT_CURRENCY_SYMBOL: &str = "₹";
pub const DEFAULT_SERVICE_FEE_PERCENT: u32 = 5;
pub const DEFAULT_STORAGE_DIR: &str = "./storage";
pub const DEFAULT_RESEND_FROM: &str = "Sportsbnb <no-reply@sportsbnb.app>";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var: {0}")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Platform fee and currency display settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricingConfig {
    pub currency_symbol: String,
    pub service_fee_percent: u32,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self { currency_symbol: DEFAULT_CURRENCY_SYMBOL.into(), service_fee_percent: DEFAULT_SERVICE_FEE_PERCENT }
    }
}

/// Where the payment functions live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionsConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailConfig {
    pub resend_api_key: String,
    pub from: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub port: u16,
    pub pricing: PricingConfig,
    /// `None` disables payment verification and refunds.
    pub functions: Option<FunctionsConfig>,
    pub storage_dir: PathBuf,
    pub public_base_url: String,
    /// `None` means MFA codes are logged instead of mailed.
    pub mail: Option<MailConfig>,
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if `DATABASE_URL` is missing or a numeric var does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;
        let db_max_connections = env_parse("DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS)?;
        let port = env_parse("PORT", DEFAULT_PORT)?;

        let pricing = PricingConfig {
            currency_symbol: std::env::var("CURRENCY_SYMBOL").unwrap_or_else(|_| DEFAULT_CURRENCY_SYMBOL.into()),
            service_fee_percent: env_parse("SERVICE_FEE_PERCENT", DEFAULT_SERVICE_FEE_PERCENT)?,
        };

        let functions = non_empty_var("FUNCTIONS_BASE_URL").map(|base_url| FunctionsConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: non_empty_var("FUNCTIONS_API_KEY"),
        });

        let storage_dir = non_empty_var("STORAGE_DIR").map_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR), PathBuf::from);
        let public_base_url = std::env::var("PUBLIC_BASE_URL")
            .unwrap_or_default()
            .trim_end_matches('/')
            .to_string();

        let mail = non_empty_var("RESEND_API_KEY").map(|resend_api_key| MailConfig {
            resend_api_key,
            from: non_empty_var("RESEND_FROM").unwrap_or_else(|| DEFAULT_RESEND_FROM.into()),
        });

        Ok(Self { database_url, db_max_connections, port, pricing, functions, storage_dir, public_base_url, mail })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T>(key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::Invalid { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
