//! Application configuration loaded from environment variables.

use std::time::Duration;

use axum::http::{HeaderName, HeaderValue, Method};

use crate::error::ConfigError;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8000;
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_AGE_SECS: u64 = 600;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `8000`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT` — `plain` or `json` (default: `plain`)
/// - `CORS_*` — cross-origin policy, see [`CorsConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub cors: CorsConfig,
}

/// Output format of the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Plain,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "plain" => Ok(LogFormat::Plain),
            "json" => Ok(LogFormat::Json),
            _ => Err(ConfigError::InvalidLogFormat {
                var: "LOG_FORMAT",
                value: raw.to_string(),
            }),
        }
    }
}

/// Origins allowed to read responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origins {
    Any,
    List(Vec<HeaderValue>),
}

/// Methods granted to pre-flight requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Methods {
    Any,
    List(Vec<Method>),
}

/// Request headers granted to pre-flight requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Headers {
    Any,
    List(Vec<HeaderName>),
}

/// Cross-origin policy applied to every route.
///
/// Environment variables:
/// - `CORS_ALLOW_ORIGINS` — comma-separated origins or `*` (default: `*`)
/// - `CORS_ALLOW_CREDENTIALS` — boolean (default: `true`)
/// - `CORS_ALLOW_METHODS` — comma-separated methods or `*` (default: `*`)
/// - `CORS_ALLOW_HEADERS` — comma-separated header names or `*` (default: `*`)
/// - `CORS_MAX_AGE_SECS` — pre-flight cache lifetime (default: `600`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allow_origins: Origins,
    pub allow_credentials: bool,
    pub allow_methods: Methods,
    pub allow_headers: Headers,
    pub max_age: Duration,
}

impl CorsConfig {
    /// Any origin, any method, any header, credentials allowed.
    pub fn permissive() -> Self {
        Self {
            allow_origins: Origins::Any,
            allow_credentials: true,
            allow_methods: Methods::Any,
            allow_headers: Headers::Any,
            max_age: Duration::from_secs(DEFAULT_MAX_AGE_SECS),
        }
    }

    fn from_lookup<F>(lookup: &F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::permissive();

        let allow_origins = match lookup("CORS_ALLOW_ORIGINS") {
            Some(raw) => parse_origins(&raw)?,
            None => defaults.allow_origins,
        };
        let allow_credentials = match lookup("CORS_ALLOW_CREDENTIALS") {
            Some(raw) => parse_bool("CORS_ALLOW_CREDENTIALS", &raw)?,
            None => defaults.allow_credentials,
        };
        let allow_methods = match lookup("CORS_ALLOW_METHODS") {
            Some(raw) => parse_methods(&raw)?,
            None => defaults.allow_methods,
        };
        let allow_headers = match lookup("CORS_ALLOW_HEADERS") {
            Some(raw) => parse_headers(&raw)?,
            None => defaults.allow_headers,
        };
        let max_age = match lookup("CORS_MAX_AGE_SECS") {
            Some(raw) => raw
                .trim()
                .parse()
                .map(Duration::from_secs)
                .map_err(|_| ConfigError::InvalidMaxAge {
                    var: "CORS_MAX_AGE_SECS",
                    value: raw,
                })?,
            None => defaults.max_age,
        };

        Ok(Self {
            allow_origins,
            allow_credentials,
            allow_methods,
            allow_headers,
            max_age,
        })
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self::permissive()
    }
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let port = match lookup("PORT") {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort {
                    var: "PORT",
                    value: raw,
                })?,
            None => DEFAULT_PORT,
        };

        let log_format = match lookup("LOG_FORMAT") {
            Some(raw) => raw.parse::<LogFormat>()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            host: lookup("HOST").unwrap_or_else(|| DEFAULT_HOST.to_string()),
            port,
            log_level: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            log_format,
            cors: CorsConfig::from_lookup(&lookup)?,
        })
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            log_format: LogFormat::Plain,
            cors: CorsConfig::permissive(),
        }
    }
}

/// Splits a comma-separated list. `None` means the list contained `*`.
fn split_list(var: &'static str, raw: &str) -> Result<Option<Vec<String>>, ConfigError> {
    let entries: Vec<String> = raw
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect();

    if entries.is_empty() {
        return Err(ConfigError::EmptyList { var });
    }
    if entries.iter().any(|entry| entry == "*") {
        return Ok(None);
    }
    Ok(Some(entries))
}

fn parse_origins(raw: &str) -> Result<Origins, ConfigError> {
    const VAR: &str = "CORS_ALLOW_ORIGINS";
    let Some(entries) = split_list(VAR, raw)? else {
        return Ok(Origins::Any);
    };

    entries
        .into_iter()
        .map(|origin| {
            HeaderValue::from_str(&origin).map_err(|_| ConfigError::InvalidOrigin {
                var: VAR,
                value: origin,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Origins::List)
}

fn parse_methods(raw: &str) -> Result<Methods, ConfigError> {
    const VAR: &str = "CORS_ALLOW_METHODS";
    let Some(entries) = split_list(VAR, raw)? else {
        return Ok(Methods::Any);
    };

    entries
        .into_iter()
        .map(|method| {
            Method::from_bytes(method.to_ascii_uppercase().as_bytes()).map_err(|_| {
                ConfigError::InvalidMethod {
                    var: VAR,
                    value: method,
                }
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Methods::List)
}

fn parse_headers(raw: &str) -> Result<Headers, ConfigError> {
    const VAR: &str = "CORS_ALLOW_HEADERS";
    let Some(entries) = split_list(VAR, raw)? else {
        return Ok(Headers::Any);
    };

    entries
        .into_iter()
        .map(|header| {
            HeaderName::from_bytes(header.as_bytes()).map_err(|_| ConfigError::InvalidHeader {
                var: VAR,
                value: header,
            })
        })
        .collect::<Result<Vec<_>, _>>()
        .map(Headers::List)
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: raw.to_string(),
        }),
    }
}
