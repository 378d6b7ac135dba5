//! Configuration loaded from environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use domain::payment::RetryPolicy;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

/// Runtime settings with sensible defaults.
///
/// Reads from environment variables:
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LOG_FORMAT`: `text` or `json` (default: `text`)
/// - `PAYMENT_MAX_RETRIES`: gateway retries before a payment fails (default: `3`)
/// - `PAYMENT_RETRY_BASE_DELAY_MS`: first retry backoff (default: `500`)
/// - `RESERVATION_TTL_HOURS`: lifetime of a stock reservation (default: `24`)
/// - `RESERVATION_SWEEP_INTERVAL_SECS`: sweeper tick (default: `60`)
/// - `METRICS_ADDR`: Prometheus scrape listener (default: `"0.0.0.0:9000"`)
///
/// A variable that is set but does not parse falls back to its default.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub log_format: LogFormat,
    pub payment_max_retries: u32,
    pub payment_retry_base_delay: Duration,
    pub reservation_ttl_hours: i64,
    pub sweep_interval: Duration,
    pub metrics_addr: SocketAddr,
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: parsed("LOG_FORMAT").unwrap_or(defaults.log_format),
            payment_max_retries: parsed("PAYMENT_MAX_RETRIES")
                .unwrap_or(defaults.payment_max_retries),
            payment_retry_base_delay: parsed("PAYMENT_RETRY_BASE_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.payment_retry_base_delay),
            reservation_ttl_hours: parsed("RESERVATION_TTL_HOURS")
                .filter(|hours: &i64| *hours > 0)
                .unwrap_or(defaults.reservation_ttl_hours),
            sweep_interval: parsed("RESERVATION_SWEEP_INTERVAL_SECS")
                .filter(|secs: &u64| *secs > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.sweep_interval),
            metrics_addr: parsed("METRICS_ADDR").unwrap_or(defaults.metrics_addr),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.payment_max_retries, self.payment_retry_base_delay)
    }

    pub fn reservation_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.reservation_ttl_hours)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            payment_max_retries: 3,
            payment_retry_base_delay: Duration::from_millis(500),
            reservation_ttl_hours: 24,
            sweep_interval: Duration::from_secs(60),
            metrics_addr: SocketAddr::from(([0, 0, 0, 0], 9000)),
        }
    }
}

fn parsed<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}
