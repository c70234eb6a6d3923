//! Application configuration loaded from environment variables.

use std::time::Duration;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — Postgres connection string; when absent the
///   server runs standalone on in-memory backends
/// - `SWEEP_INTERVAL_SECS` — seconds between auto-cancellation passes
///   (default: `300`)
/// - `PENDING_TIMEOUT_SECS` — age in seconds past which a pending order
///   is auto-cancelled (default: `1800`)
/// - `REQUEST_TIMEOUT_SECS` — per-request deadline (default: `30`)
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub sweep_interval: Duration,
    pub pending_timeout: Duration,
    pub request_timeout: Duration,
    pub log_level: String,
}

fn env_secs(name: &str, default: u64) -> Duration {
    Duration::from_secs(
        std::env::var(name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default),
    )
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
            database_url: std::env::var("DATABASE_URL").ok(),
            sweep_interval: env_secs("SWEEP_INTERVAL_SECS", 5 * 60),
            pending_timeout: env_secs("PENDING_TIMEOUT_SECS", 30 * 60),
            request_timeout: env_secs("REQUEST_TIMEOUT_SECS", 30),
            log_level: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            sweep_interval: Duration::from_secs(5 * 60),
            pending_timeout: Duration::from_secs(30 * 60),
            request_timeout: Duration::from_secs(30),
            log_level: "info".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_values() {
        let config = Config::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert!(config.database_url.is_none());
        assert_eq!(config.sweep_interval, Duration::from_secs(300));
        assert_eq!(config.pending_timeout, Duration::from_secs(1800));
    }

    #[test]
    fn test_addr_formatting() {
        let config = Config {
            host: "127.0.0.1".to_string(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.addr(), "127.0.0.1:8080");
    }
}
