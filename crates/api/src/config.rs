//! Application configuration loaded from environment variables.

use std::time::Duration;

use common::Locale;
use notifier::WorkerConfig;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    fn parse(value: &str) -> Self {
        if value.trim().eq_ignore_ascii_case("json") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `DATABASE_URL`: PostgreSQL URL; unset runs on the in-memory store
/// - `APP_URL`: frontend base URL used in notification links
///   (default: `"http://localhost:9000"`)
/// - `APP_LOCALE`: `en` or `pt-BR` (default: `en`)
/// - `NOTIFY_MAX_ATTEMPTS`: delivery attempts per notification (default: `3`)
/// - `NOTIFY_BACKOFF_MS`: pause between attempts (default: `500`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub database_url: Option<String>,
    pub app_url: String,
    pub locale: Locale,
    pub notify_max_attempts: u32,
    pub notify_backoff_ms: u64,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through `lookup`, falling back to defaults for
    /// missing or unparseable values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        Self {
            host: lookup("HOST").unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.port),
            log_level: lookup("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: lookup("LOG_FORMAT")
                .map(|f| LogFormat::parse(&f))
                .unwrap_or(defaults.log_format),
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            app_url: lookup("APP_URL").unwrap_or(defaults.app_url),
            locale: lookup("APP_LOCALE")
                .and_then(|l| l.parse().ok())
                .unwrap_or(defaults.locale),
            notify_max_attempts: lookup("NOTIFY_MAX_ATTEMPTS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.notify_max_attempts),
            notify_backoff_ms: lookup("NOTIFY_BACKOFF_MS")
                .and_then(|n| n.parse().ok())
                .unwrap_or(defaults.notify_backoff_ms),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Settings for the notification worker.
    pub fn worker_config(&self) -> WorkerConfig {
        WorkerConfig {
            app_url: self.app_url.clone(),
            locale: self.locale,
            max_attempts: self.notify_max_attempts,
            backoff: Duration::from_millis(self.notify_backoff_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            database_url: None,
            app_url: "http://localhost:9000".to_string(),
            locale: Locale::En,
            notify_max_attempts: 3,
            notify_backoff_ms: 500,
        }
    }
}
