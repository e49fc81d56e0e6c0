use std::net::IpAddr;
use std::time::Duration;

use axum::http::HeaderValue;
use ipnet::IpNet;

use crate::credentials::{self, ServiceAccount};
use crate::error::ConfigError;
use crate::submission::schema::{Schema, ValidationMode};

#[derive(Debug, Clone)]
pub struct Config {
    pub spreadsheet_id: Option<String>,
    pub credentials: Option<ServiceAccount>,
    pub sheet_name: String,
    pub schema: Schema,
    pub validation: ValidationMode,
    pub allowed_origins: AllowedOrigins,
    pub host: IpAddr,
    pub port: u16,
    pub max_body_size: usize,
    pub rate_limit: RateLimitConfig,
    pub trusted_proxies: Vec<IpNet>,
    pub sheets_api_base: String,
    pub sheets_timeout: Duration,
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    pub max_requests: u32,
    pub window_secs: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AllowedOrigins {
    Any,
    List(Vec<HeaderValue>),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from whatever `get` returns for each variable name.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env_or = |key: &str, default: &str| get(key).unwrap_or_else(|| default.to_string());

        let spreadsheet_id = get("SPREADSHEET_ID")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let credentials = credentials::load_from_lookup(&get)?;

        let sheet_name = env_or("FORMSHEET_SHEET_NAME", "Sheet1");

        let schema = match get("FORMSHEET_FIELDS").filter(|s| !s.trim().is_empty()) {
            Some(json) => Schema::from_json(&json)?,
            None => {
                let name = env_or("FORMSHEET_SCHEMA", "contact");
                Schema::builtin(&name).ok_or_else(|| {
                    ConfigError::Invalid(format!("Unknown FORMSHEET_SCHEMA: {name}"))
                })?
            }
        };

        let validation = match env_or("FORMSHEET_VALIDATION", "strict").as_str() {
            "strict" => ValidationMode::Strict,
            "basic" => ValidationMode::Basic,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "Invalid FORMSHEET_VALIDATION: {other}"
                )));
            }
        };

        let allowed_origins = parse_origins(&env_or("ALLOWED_ORIGINS", "*"))?;

        let host: IpAddr = env_or("FORMSHEET_HOST", "0.0.0.0")
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid FORMSHEET_HOST: {e}")))?;

        let port: u16 = env_or("PORT", "3001")
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid PORT: {e}")))?;

        let max_body_size: usize = env_or("FORMSHEET_MAX_BODY_SIZE", "65536")
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid FORMSHEET_MAX_BODY_SIZE: {e}")))?;

        let max_requests: u32 = env_or("FORMSHEET_RATE_LIMIT", "10")
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid FORMSHEET_RATE_LIMIT: {e}")))?;

        let window_secs: u64 = env_or("FORMSHEET_RATE_WINDOW_SECS", "60")
            .parse()
            .map_err(|e| ConfigError::Invalid(format!("Invalid FORMSHEET_RATE_WINDOW_SECS: {e}")))?;

        let trusted_proxies: Vec<IpNet> = env_or("FORMSHEET_TRUSTED_PROXIES", "")
            .split(',')
            .filter(|s| !s.trim().is_empty())
            .map(|s| {
                s.trim().parse().map_err(|e| {
                    ConfigError::Invalid(format!(
                        "Invalid FORMSHEET_TRUSTED_PROXIES entry '{s}': {e}"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let sheets_api_base = env_or("FORMSHEET_SHEETS_API_BASE", "https://sheets.googleapis.com");

        let timeout_secs: u64 = env_or("FORMSHEET_SHEETS_TIMEOUT_SECS", "10")
            .parse()
            .map_err(|e| {
                ConfigError::Invalid(format!("Invalid FORMSHEET_SHEETS_TIMEOUT_SECS: {e}"))
            })?;

        let log_level = env_or("FORMSHEET_LOG_LEVEL", "info");

        Ok(Config {
            spreadsheet_id,
            credentials,
            sheet_name,
            schema,
            validation,
            allowed_origins,
            host,
            port,
            max_body_size,
            rate_limit: RateLimitConfig {
                max_requests,
                window_secs,
            },
            trusted_proxies,
            sheets_api_base,
            sheets_timeout: Duration::from_secs(timeout_secs),
            log_level,
        })
    }
}

/// `*` (or an empty value) allows every origin; anything else is a comma
/// separated list of exact origins.
pub fn parse_origins(raw: &str) -> Result<AllowedOrigins, ConfigError> {
    let entries: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if entries.is_empty() || entries.contains(&"*") {
        return Ok(AllowedOrigins::Any);
    }

    entries
        .into_iter()
        .map(|origin| {
            HeaderValue::from_str(origin.trim_end_matches('/')).map_err(|e| {
                ConfigError::Invalid(format!("Invalid ALLOWED_ORIGINS entry '{origin}': {e}"))
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(AllowedOrigins::List)
}
