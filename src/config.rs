use crate::datasource::limitless::DEFAULT_BASE_URL;
use crate::domain::Decimal;
use crate::engine::DEFAULT_MATCH_THRESHOLD;
use crate::ingest::IngestMode;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Clone)]
pub struct Config {
    pub port: u16,
    pub trades_file: Option<PathBuf>,
    pub api_base_url: String,
    pub session_cookie: Option<String>,
    pub ingest_mode: IngestMode,
    pub match_threshold: f64,
    pub resolution_threshold: Decimal,
    pub max_pages: u32,
    pub page_limit: u32,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("trades_file", &self.trades_file)
            .field("api_base_url", &self.api_base_url)
            .field("session_cookie", &self.session_cookie.as_ref().map(|_| "<redacted>"))
            .field("ingest_mode", &self.ingest_mode)
            .field("match_threshold", &self.match_threshold)
            .field("resolution_threshold", &self.resolution_threshold)
            .field("max_pages", &self.max_pages)
            .field("page_limit", &self.page_limit)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
    #[error("No trade input: set TRADES_FILE and/or SESSION_COOKIE")]
    NoInput,
}

fn invalid(key: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue(key.to_string(), reason.into())
}

fn non_empty<'a>(env_map: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env_map
        .get(key)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn parse_threshold(env_map: &HashMap<String, String>, key: &str, default: f64) -> Result<f64, ConfigError> {
    let value = match non_empty(env_map, key) {
        Some(raw) => raw
            .parse::<f64>()
            .map_err(|_| invalid(key, "must be a number"))?,
        None => default,
    };
    if !(0.0..=1.0).contains(&value) {
        return Err(invalid(key, format!("must be within 0..=1, got {}", value)));
    }
    Ok(value)
}

fn parse_count(env_map: &HashMap<String, String>, key: &str, default: u32) -> Result<u32, ConfigError> {
    let value = match non_empty(env_map, key) {
        Some(raw) => raw
            .parse::<u32>()
            .map_err(|_| invalid(key, "must be a positive integer"))?,
        None => default,
    };
    if value == 0 {
        return Err(invalid(key, "must be at least 1"));
    }
    Ok(value)
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_env_map(std::env::vars().collect())
    }

    pub fn from_env_map(env_map: HashMap<String, String>) -> Result<Self, ConfigError> {
        let port = non_empty(&env_map, "PORT")
            .unwrap_or("8080")
            .parse::<u16>()
            .map_err(|_| invalid("PORT", "must be a valid u16"))?;

        let trades_file = non_empty(&env_map, "TRADES_FILE").map(PathBuf::from);

        let api_base_url = non_empty(&env_map, "API_BASE_URL")
            .unwrap_or(DEFAULT_BASE_URL)
            .to_string();

        let session_cookie = non_empty(&env_map, "SESSION_COOKIE").map(str::to_string);

        let ingest_mode = match non_empty(&env_map, "INGEST_MODE").unwrap_or("lenient") {
            "lenient" => IngestMode::Lenient,
            "strict" => IngestMode::Strict,
            other => {
                return Err(invalid(
                    "INGEST_MODE",
                    format!("must be strict or lenient, got {}", other),
                ))
            }
        };

        let match_threshold = parse_threshold(&env_map, "MATCH_THRESHOLD", DEFAULT_MATCH_THRESHOLD)?;

        let resolution_threshold = match non_empty(&env_map, "RESOLUTION_THRESHOLD") {
            Some(raw) => Decimal::from_str_canonical(raw)
                .map_err(|_| invalid("RESOLUTION_THRESHOLD", "must be a number"))?,
            None => crate::engine::default_resolution_threshold(),
        };
        if resolution_threshold.is_negative() || resolution_threshold > Decimal::from(1) {
            return Err(invalid(
                "RESOLUTION_THRESHOLD",
                format!("must be within 0..=1, got {}", resolution_threshold),
            ));
        }

        let max_pages = parse_count(&env_map, "MAX_PAGES", 100)?;
        let page_limit = parse_count(&env_map, "PAGE_LIMIT", 100)?;

        if trades_file.is_none() && session_cookie.is_none() {
            return Err(ConfigError::NoInput);
        }

        Ok(Config {
            port,
            trades_file,
            api_base_url,
            session_cookie,
            ingest_mode,
            match_threshold,
            resolution_threshold,
            max_pages,
            page_limit,
        })
    }
}
