//! Runtime settings
//!
//! Everything comes from the environment (optionally seeded by a `.env` file).

use crate::error::OrchestrationError;
use crate::Result;
use std::env;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_RAWG_BASE_URL: &str = "https://api.rawg.io/api";
pub const DEFAULT_PORT: u16 = 8080;
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct Settings {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub rawg_api_key: String,
    pub rawg_base_url: String,
    pub port: u16,
    /// Applied to data-source requests only.
    pub http_timeout: Duration,
}

impl Settings {
    /// Load `.env` if present, then read settings from the process environment.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let port = match non_empty("PORT").or_else(|| non_empty("API_PORT")) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                OrchestrationError::Config(format!("invalid PORT '{}': {}", raw, e))
            })?,
            None => DEFAULT_PORT,
        };

        let http_timeout_secs = match non_empty("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|e| {
                OrchestrationError::Config(format!("invalid HTTP_TIMEOUT_SECS '{}': {}", raw, e))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        Ok(Self {
            gemini_api_key: non_empty("GEMINI_API_KEY").unwrap_or_default(),
            gemini_model: non_empty("GEMINI_MODEL")
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            rawg_api_key: non_empty("RAWG_API_KEY").unwrap_or_default(),
            rawg_base_url: non_empty("RAWG_BASE_URL")
                .unwrap_or_else(|| DEFAULT_RAWG_BASE_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            port,
            http_timeout: Duration::from_secs(http_timeout_secs),
        })
    }
}
