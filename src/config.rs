//! Environment-driven configuration

use crate::error::AdvisoryError;
use crate::retry::RetryPolicy;
use crate::Result;
use std::env;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const DEFAULT_PORT: u16 = 8000;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    /// Postgres connection string; both binaries refuse to start without one
    pub database_url: Option<String>,
    pub port: u16,
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup so parsing can be tested without
    /// touching the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .or_else(|| lookup("POSTGRES_URL"))
            .filter(|v| !v.trim().is_empty());

        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => parse_var("PORT", &raw)?,
            None => DEFAULT_PORT,
        };

        let max_attempts = match lookup("INFERENCE_MAX_ATTEMPTS") {
            Some(raw) => parse_var::<u32>("INFERENCE_MAX_ATTEMPTS", &raw)?,
            None => RetryPolicy::DEFAULT_MAX_ATTEMPTS,
        };
        if max_attempts == 0 {
            return Err(AdvisoryError::ConfigError(
                "INFERENCE_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }

        let base_delay = match lookup("INFERENCE_BASE_DELAY_SECS") {
            Some(raw) => Duration::from_secs(parse_var("INFERENCE_BASE_DELAY_SECS", &raw)?),
            None => RetryPolicy::DEFAULT_BASE_DELAY,
        };

        Ok(Self {
            gemini_api_key: lookup("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: lookup("GEMINI_MODEL")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            database_url,
            port,
            max_attempts,
            base_delay,
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, self.base_delay)
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AdvisoryError::ConfigError(format!("{} has invalid value '{}'", key, raw)))
}
