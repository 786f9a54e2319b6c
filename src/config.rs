//! Runtime configuration
//!
//! Everything comes from the process environment; binaries call
//! `dotenv::dotenv()` first so a local `.env` file works too.

use crate::error::RouterError;
use crate::Result;
use std::collections::HashMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.0-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_ALPHA_VANTAGE_BASE_URL: &str = "https://www.alphavantage.co";
pub const DEFAULT_NEWS_API_BASE_URL: &str = "https://newsapi.org";
pub const DEFAULT_FRED_BASE_URL: &str = "https://api.stlouisfed.org";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub gemini_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub temperature: f32,

    pub alpha_vantage_api_key: Option<String>,
    pub alpha_vantage_base_url: String,
    pub news_api_key: Option<String>,
    pub news_api_base_url: String,
    pub fred_api_key: Option<String>,
    pub fred_base_url: String,

    pub http_timeout: Duration,
    pub port: u16,
    pub log_dir: Option<PathBuf>,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_model: DEFAULT_GEMINI_MODEL.to_string(),
            gemini_base_url: DEFAULT_GEMINI_BASE_URL.to_string(),
            temperature: 0.0,
            alpha_vantage_api_key: None,
            alpha_vantage_base_url: DEFAULT_ALPHA_VANTAGE_BASE_URL.to_string(),
            news_api_key: None,
            news_api_base_url: DEFAULT_NEWS_API_BASE_URL.to_string(),
            fred_api_key: None,
            fred_base_url: DEFAULT_FRED_BASE_URL.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            port: DEFAULT_PORT,
            log_dir: None,
        }
    }
}

impl RouterConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an explicit key/value map (used by tests).
    pub fn from_map(vars: &HashMap<String, String>) -> Result<Self> {
        Self::from_lookup(|key| vars.get(key).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Blank values count as unset.
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let defaults = Self::default();

        let temperature = match get("GEMINI_TEMPERATURE") {
            Some(raw) => raw.parse::<f32>().map_err(|_| {
                RouterError::Config(format!("GEMINI_TEMPERATURE is not a number: {}", raw))
            })?,
            None => defaults.temperature,
        };

        let http_timeout = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => Duration::from_secs(raw.parse::<u64>().map_err(|_| {
                RouterError::Config(format!("HTTP_TIMEOUT_SECS is not an integer: {}", raw))
            })?),
            None => defaults.http_timeout,
        };

        let port = match get("PORT").or_else(|| get("API_PORT")) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|_| RouterError::Config(format!("PORT is not a valid port: {}", raw)))?,
            None => defaults.port,
        };

        Ok(Self {
            gemini_api_key: get("GEMINI_API_KEY"),
            gemini_model: get("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: trim_base(get("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url)),
            temperature,
            alpha_vantage_api_key: get("ALPHA_VANTAGE_API_KEY"),
            alpha_vantage_base_url: trim_base(
                get("ALPHA_VANTAGE_BASE_URL").unwrap_or(defaults.alpha_vantage_base_url),
            ),
            news_api_key: get("NEWS_API_KEY"),
            news_api_base_url: trim_base(
                get("NEWS_API_BASE_URL").unwrap_or(defaults.news_api_base_url),
            ),
            fred_api_key: get("FRED_API_KEY"),
            fred_base_url: trim_base(get("FRED_BASE_URL").unwrap_or(defaults.fred_base_url)),
            http_timeout,
            port,
            log_dir: get("LOG_DIR").map(PathBuf::from),
        })
    }

    /// The Gemini key is the one hard requirement for running the pipeline.
    pub fn require_model_key(&self) -> Result<&str> {
        self.gemini_api_key.as_deref().ok_or_else(|| {
            RouterError::Config(
                "GEMINI_API_KEY not set. Add it to the environment or a .env file".to_string(),
            )
        })
    }
}

fn trim_base(url: String) -> String {
    url.trim_end_matches('/').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_empty() {
        let config = RouterConfig::from_map(&HashMap::new()).unwrap();
        assert_eq!(config.gemini_model, DEFAULT_GEMINI_MODEL);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert!(config.news_api_key.is_none());
        assert!(config.require_model_key().is_err());
    }

    #[test]
    fn test_overrides_and_trailing_slash() {
        let config = RouterConfig::from_map(&vars(&[
            ("GEMINI_API_KEY", "abc"),
            ("FRED_BASE_URL", "http://localhost:9000/"),
            ("API_PORT", "9090"),
            ("HTTP_TIMEOUT_SECS", "5"),
            ("NEWS_API_KEY", "   "),
        ]))
        .unwrap();

        assert_eq!(config.require_model_key().unwrap(), "abc");
        assert_eq!(config.fred_base_url, "http://localhost:9000");
        assert_eq!(config.port, 9090);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        assert!(config.news_api_key.is_none());
    }

    #[test]
    fn test_port_prefers_port_over_api_port() {
        let config =
            RouterConfig::from_map(&vars(&[("PORT", "3000"), ("API_PORT", "9090")])).unwrap();
        assert_eq!(config.port, 3000);
    }

    #[test]
    fn test_bad_numbers_are_config_errors() {
        let err = RouterConfig::from_map(&vars(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));

        let err = RouterConfig::from_map(&vars(&[("GEMINI_TEMPERATURE", "warm")])).unwrap_err();
        assert!(matches!(err, RouterError::Config(_)));
    }
}
