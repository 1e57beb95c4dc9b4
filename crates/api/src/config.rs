//! Environment-driven configuration.
//!
//! [`AppConfig::from_env`] reads the process environment (after `dotenvy`
//! has loaded any `.env` file). Parsing goes through
//! [`AppConfig::from_lookup`] so tests can feed values without touching
//! the real environment. Invalid values fail startup with a [`ConfigError`].

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use faultwatch_core::alert::DEFAULT_ALERT_COOLDOWN;
use faultwatch_core::prediction::{
    Thresholds, DEFAULT_TEMPERATURE_CRITICAL, DEFAULT_TEMPERATURE_WARN,
    DEFAULT_VIBRATION_CRITICAL, DEFAULT_VIBRATION_WARN,
};
use faultwatch_core::telemetry::MAX_QUERY_LIMIT;
use faultwatch_db::store::DEFAULT_STORE_TIMEOUT;

use crate::engine::dispatcher::{DEFAULT_HISTORY_LIMIT, DEFAULT_NOTIFIER_TIMEOUT};

/// Value of `STORE_CONNECTION` selecting the in-process store.
const MEMORY_STORE: &str = "memory";

/// Startup configuration failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid alert thresholds: {0}")]
    Thresholds(String),
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Path prefix for the machine routes, normalised to `""` or
    /// `/segment[/segment...]` without a trailing slash.
    pub api_prefix: String,
    /// Allowed CORS origins; `["*"]` allows any origin.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

/// Where telemetry and alert state live.
#[derive(Clone, PartialEq, Eq)]
pub enum StoreConnection {
    Memory,
    Postgres(String),
}

impl StoreConnection {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::Postgres(_) => "postgres",
        }
    }
}

// Hand-written so database credentials never reach a log line.
impl std::fmt::Debug for StoreConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind())
    }
}

/// Fault detection and alerting settings.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub store: StoreConnection,
    pub store_timeout: Duration,
    pub db_max_connections: u32,
    /// SNS topic ARN, webhook URL or `log`.
    pub notifier_endpoint: String,
    pub notifier_timeout: Duration,
    pub thresholds: Thresholds,
    pub alert_cooldown: Duration,
    /// Samples handed to the predictor on each read.
    pub history_limit: i64,
}

/// Complete service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

impl AppConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default                      |
    /// |--------------------------|------------------------------|
    /// | `HOST`                   | `0.0.0.0`                    |
    /// | `PORT`                   | `3000`                       |
    /// | `API_PREFIX`             | (empty)                      |
    /// | `CORS_ORIGINS`           | `*`                          |
    /// | `REQUEST_TIMEOUT_SECS`   | `30`                         |
    /// | `STORE_CONNECTION`       | `DATABASE_URL`, else `memory`|
    /// | `STORE_TIMEOUT_SECS`     | `5`                          |
    /// | `DB_MAX_CONNECTIONS`     | `10`                         |
    /// | `NOTIFIER_ENDPOINT`      | `log`                        |
    /// | `NOTIFIER_TIMEOUT_SECS`  | `5`                          |
    /// | `TEMPERATURE_WARN`       | `74.0`                       |
    /// | `TEMPERATURE_CRITICAL`   | `82.0`                       |
    /// | `VIBRATION_WARN`         | `2.3`                        |
    /// | `VIBRATION_CRITICAL`     | `3.0`                        |
    /// | `ALERT_COOLDOWN_SECONDS` | `300`                        |
    /// | `HISTORY_LIMIT`          | `10`                         |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Parse configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(lookup);
        Ok(Self {
            server: ServerConfig::parse(&vars)?,
            monitor: MonitorConfig::parse(&vars)?,
        })
    }
}

impl ServerConfig {
    fn parse<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<Self, ConfigError> {
        let cors_raw = vars.string("CORS_ORIGINS", "*");
        let cors_origins: Vec<String> = cors_raw
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in cors_origins.iter().filter(|o| o.as_str() != "*") {
            if HeaderValue::from_str(origin).is_err() {
                return Err(invalid("CORS_ORIGINS", origin, "not a valid header value"));
            }
        }

        Ok(Self {
            host: vars.string("HOST", "0.0.0.0"),
            port: vars.parse("PORT", 3000)?,
            api_prefix: normalize_prefix(&vars.string("API_PREFIX", "")),
            cors_origins,
            request_timeout_secs: vars.positive("REQUEST_TIMEOUT_SECS", 30)?,
        })
    }

    /// Whether every origin is allowed.
    pub fn allows_any_origin(&self) -> bool {
        self.cors_origins.is_empty() || self.cors_origins.iter().any(|o| o == "*")
    }
}

impl MonitorConfig {
    fn parse<F: Fn(&str) -> Option<String>>(vars: &Vars<F>) -> Result<Self, ConfigError> {
        let connection = vars
            .get("STORE_CONNECTION")
            .or_else(|| vars.get("DATABASE_URL"))
            .unwrap_or_else(|| MEMORY_STORE.to_string());
        let store = if connection.eq_ignore_ascii_case(MEMORY_STORE) {
            StoreConnection::Memory
        } else {
            StoreConnection::Postgres(connection)
        };

        let thresholds = Thresholds {
            temperature_warn: vars.parse("TEMPERATURE_WARN", DEFAULT_TEMPERATURE_WARN)?,
            temperature_critical: vars
                .parse("TEMPERATURE_CRITICAL", DEFAULT_TEMPERATURE_CRITICAL)?,
            vibration_warn: vars.parse("VIBRATION_WARN", DEFAULT_VIBRATION_WARN)?,
            vibration_critical: vars.parse("VIBRATION_CRITICAL", DEFAULT_VIBRATION_CRITICAL)?,
        };
        thresholds
            .validate()
            .map_err(|e| ConfigError::Thresholds(e.to_string()))?;

        let history_limit: i64 = vars.parse("HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?;
        if !(1..=MAX_QUERY_LIMIT).contains(&history_limit) {
            return Err(invalid(
                "HISTORY_LIMIT",
                &history_limit.to_string(),
                &format!("must be between 1 and {MAX_QUERY_LIMIT}"),
            ));
        }

        let db_max_connections: u32 = vars.parse("DB_MAX_CONNECTIONS", 10)?;
        if db_max_connections == 0 {
            return Err(invalid("DB_MAX_CONNECTIONS", "0", "must be at least 1"));
        }

        Ok(Self {
            store,
            store_timeout: Duration::from_secs(
                vars.positive("STORE_TIMEOUT_SECS", DEFAULT_STORE_TIMEOUT.as_secs())?,
            ),
            db_max_connections,
            notifier_endpoint: vars.string("NOTIFIER_ENDPOINT", "log"),
            notifier_timeout: Duration::from_secs(
                vars.positive("NOTIFIER_TIMEOUT_SECS", DEFAULT_NOTIFIER_TIMEOUT.as_secs())?,
            ),
            thresholds,
            alert_cooldown: Duration::from_secs(
                vars.parse("ALERT_COOLDOWN_SECONDS", DEFAULT_ALERT_COOLDOWN.as_secs())?,
            ),
            history_limit,
        })
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Vars<F>(F);

impl<F: Fn(&str) -> Option<String>> Vars<F> {
    /// Trimmed, non-empty value of `name`.
    fn get(&self, name: &str) -> Option<String> {
        (self.0)(name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn string(&self, name: &str, default: &str) -> String {
        self.get(name).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get(name) {
            None => Ok(default),
            Some(raw) => raw
                .parse()
                .map_err(|e: T::Err| invalid(name, &raw, &e.to_string())),
        }
    }

    fn positive(&self, name: &'static str, default: u64) -> Result<u64, ConfigError> {
        let value = self.parse(name, default)?;
        if value == 0 {
            return Err(invalid(name, "0", "must be greater than zero"));
        }
        Ok(value)
    }
}

fn invalid(name: &'static str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

/// `"api/v1/"` -> `"/api/v1"`, `"/"` -> `""`.
fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("/{trimmed}")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
