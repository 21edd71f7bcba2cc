//! Configuration module for payment-callback-service.

use secrecy::Secret;
use service_core::config as core_config;
use service_core::error::AppError;
use std::env;

#[derive(Debug, Clone)]
pub struct PaymentCallbackConfig {
    pub common: core_config::Config,
    pub service_name: String,
    pub service_version: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
    pub payload: PayloadConfig,
    pub redirect: RedirectConfig,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: Secret<String>,
    pub max_connections: u32,
    pub min_connections: u32,
}

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Key the gateway signs its return parameters with.
    pub sign_key: Secret<String>,
}

#[derive(Debug, Clone)]
pub struct PayloadConfig {
    /// Key for the checksum embedded in the `body` payload.
    pub checksum_key: Secret<String>,
}

/// Where the browser is sent after a successful payment.
#[derive(Debug, Clone)]
pub struct RedirectConfig {
    pub goods_url: String,
    pub recharge_url: String,
    pub delay_seconds: u32,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            goods_url: "/user/orders".to_string(),
            recharge_url: "/user/account".to_string(),
            delay_seconds: 3,
        }
    }
}

impl PaymentCallbackConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let common = core_config::Config::load()?;
        let redirect_defaults = RedirectConfig::default();

        Ok(Self {
            common,
            service_name: env::var("SERVICE_NAME")
                .unwrap_or_else(|_| "payment-callback-service".to_string()),
            service_version: env::var("SERVICE_VERSION")
                .unwrap_or_else(|_| env!("CARGO_PKG_VERSION").to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|s| !s.is_empty()),
            database: DatabaseConfig {
                url: required_secret("DATABASE_URL")?,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(10),
                min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(2),
            },
            gateway: GatewayConfig {
                sign_key: required_secret("GATEWAY_SIGN_KEY")?,
            },
            payload: PayloadConfig {
                checksum_key: required_secret("PAYLOAD_CHECKSUM_KEY")?,
            },
            redirect: RedirectConfig {
                goods_url: env::var("GOODS_REDIRECT_URL").unwrap_or(redirect_defaults.goods_url),
                recharge_url: env::var("RECHARGE_REDIRECT_URL")
                    .unwrap_or(redirect_defaults.recharge_url),
                delay_seconds: env::var("REDIRECT_DELAY_SECONDS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(redirect_defaults.delay_seconds),
            },
        })
    }
}

fn required_secret(name: &str) -> Result<Secret<String>, AppError> {
    match env::var(name) {
        Ok(value) if !value.is_empty() => Ok(Secret::new(value)),
        _ => Err(AppError::ConfigError(anyhow::anyhow!("{} is required", name))),
    }
}
