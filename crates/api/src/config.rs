use std::time::Duration;

use vizcode_core::{RefundPolicy, Tier};

/// Account id used for the local editing session.
///
/// The ledger itself is multi-account; the HTTP surface serves the single
/// session account until real authentication lands.
pub const SESSION_ACCOUNT_ID: &str = "session";

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Number of history entries retained (default: `10`).
    pub history_capacity: usize,
    /// Ceiling for one file's generation step in seconds (default: `30`).
    pub file_timeout_secs: u64,
    /// Simulated generation latency floor in milliseconds (default: `500`).
    pub latency_min_ms: u64,
    /// Simulated generation latency ceiling in milliseconds (default: `1500`).
    pub latency_max_ms: u64,
    /// Plan tier of the session account (default: `free`).
    pub account_plan: Tier,
    /// Credit quota of the session account (default: `25`).
    pub account_credits: u32,
    /// Whether failed/cancelled jobs refund their debit (default: `false`).
    pub refund_on_failure: bool,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    /// | `HISTORY_CAPACITY`     | `10`                       |
    /// | `FILE_TIMEOUT_SECS`    | `30`                       |
    /// | `LATENCY_MIN_MS`       | `500`                      |
    /// | `LATENCY_MAX_MS`       | `1500`                     |
    /// | `ACCOUNT_PLAN`         | `free`                     |
    /// | `ACCOUNT_CREDITS`      | `25`                       |
    /// | `REFUND_ON_FAILURE`    | `false`                    |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let history_capacity: usize = std::env::var("HISTORY_CAPACITY")
            .unwrap_or_else(|_| "10".into())
            .parse()
            .expect("HISTORY_CAPACITY must be a valid usize");

        let file_timeout_secs: u64 = std::env::var("FILE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("FILE_TIMEOUT_SECS must be a valid u64");

        let latency_min_ms: u64 = std::env::var("LATENCY_MIN_MS")
            .unwrap_or_else(|_| "500".into())
            .parse()
            .expect("LATENCY_MIN_MS must be a valid u64");

        let latency_max_ms: u64 = std::env::var("LATENCY_MAX_MS")
            .unwrap_or_else(|_| "1500".into())
            .parse()
            .expect("LATENCY_MAX_MS must be a valid u64");

        let account_plan: Tier = std::env::var("ACCOUNT_PLAN")
            .unwrap_or_else(|_| "free".into())
            .parse()
            .expect("ACCOUNT_PLAN must be one of: free, pro, enterprise");

        let account_credits: u32 = std::env::var("ACCOUNT_CREDITS")
            .unwrap_or_else(|_| "25".into())
            .parse()
            .expect("ACCOUNT_CREDITS must be a valid u32");

        let refund_on_failure: bool = std::env::var("REFUND_ON_FAILURE")
            .unwrap_or_else(|_| "false".into())
            .parse()
            .expect("REFUND_ON_FAILURE must be true or false");

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            history_capacity,
            file_timeout_secs,
            latency_min_ms,
            latency_max_ms,
            account_plan,
            account_credits,
            refund_on_failure,
        }
    }

    pub fn file_timeout(&self) -> Duration {
        Duration::from_secs(self.file_timeout_secs)
    }

    pub fn refund_policy(&self) -> RefundPolicy {
        if self.refund_on_failure {
            RefundPolicy::Refund
        } else {
            RefundPolicy::Keep
        }
    }
}
