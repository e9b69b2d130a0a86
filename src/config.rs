//! Environment-driven configuration

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::signals::policy::PolicyPreset;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_KIS_BASE_URL: &str = "https://openapi.koreainvestment.com:9443";
pub const DEFAULT_RATE_LIMIT_MS: u64 = 500;
pub const DEFAULT_TOKEN_PATH: &str = "data/.access_token.json";
/// 23:00 UTC, which is 08:00 KST after the US close
pub const DEFAULT_COLLECT_SCHEDULE: &str = "0 0 23 * * *";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Deployment environment name, lower-cased (`ENVIRONMENT`, default `sandbox`)
pub fn get_environment() -> String {
    env::var("ENVIRONMENT")
        .unwrap_or_else(|_| "sandbox".to_string())
        .to_lowercase()
}

pub fn is_production() -> bool {
    matches!(get_environment().as_str(), "production" | "prod")
}

#[derive(Debug, Clone)]
pub struct KisConfig {
    pub base_url: String,
    pub app_key: String,
    pub app_secret: String,
    pub rate_limit: Duration,
    pub token_path: PathBuf,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub kis: KisConfig,
    pub collect_schedule: String,
    pub scheduler_enabled: bool,
    pub notify_webhook_url: Option<String>,
    pub signal_policy: PolicyPreset,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let kis = KisConfig {
            base_url: var_or("KIS_BASE_URL", DEFAULT_KIS_BASE_URL),
            app_key: required("KIS_APP_KEY")?,
            app_secret: required("KIS_APP_SECRET")?,
            rate_limit: Duration::from_millis(parsed_or("KIS_RATE_LIMIT_MS", DEFAULT_RATE_LIMIT_MS)?),
            token_path: PathBuf::from(var_or("KIS_TOKEN_PATH", DEFAULT_TOKEN_PATH)),
        };

        Ok(Self {
            environment: get_environment(),
            port: parsed_or("PORT", DEFAULT_PORT)?,
            database_url: optional("DATABASE_URL"),
            kis,
            collect_schedule: var_or("COLLECT_SCHEDULE", DEFAULT_COLLECT_SCHEDULE),
            scheduler_enabled: parsed_or("SCHEDULER_ENABLED", true)?,
            notify_webhook_url: optional("NOTIFY_WEBHOOK_URL"),
            signal_policy: parsed_or("SIGNAL_POLICY", PolicyPreset::default())?,
        })
    }
}

fn optional(key: &'static str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    optional(key).ok_or(ConfigError::Missing(key))
}

fn var_or(key: &'static str, default: &str) -> String {
    optional(key).unwrap_or_else(|| default.to_string())
}

fn parsed_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
