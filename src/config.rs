//! Application configuration
//!
//! Centralized configuration from environment variables with sensible
//! defaults; everything timing- or rate-related is tunable without a
//! rebuild.

use std::env;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Remote scores API configuration
    pub api: ApiConfig,
    /// Outbound rate limiting
    pub limiter: LimiterConfig,
    /// Score store configuration
    pub store: StoreConfig,
    /// Batch job configuration
    pub batch: BatchConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to bind the server to
    pub port: u16,
}

/// Remote scores API configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL of the scores API
    pub base_url: String,
    /// Per-request timeout for outbound calls (seconds)
    pub request_timeout_secs: u64,
}

/// Outbound rate limiting
#[derive(Debug, Clone)]
pub struct LimiterConfig {
    /// Maximum burst size in tokens
    pub capacity: f64,
    /// Steady-state refill rate in tokens per second
    pub refill_per_sec: f64,
}

/// Score store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path to the SQLite database file
    pub db_path: String,
}

/// Batch job configuration
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Wall-clock budget for one batch job (seconds)
    pub timeout_secs: u64,
    /// Progress report interval in items
    pub progress_every: u64,
    /// Defensive cap on pages per paginated fetch
    pub page_cap: usize,
}

impl Config {
    /// Load configuration from environment variables with defaults.
    pub fn from_env() -> Self {
        Self {
            server: ServerConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(8080),
            },
            api: ApiConfig {
                base_url: env::var("SCORES_API_URL")
                    .unwrap_or_else(|_| "http://localhost:8081/api/v2".to_string()),
                request_timeout_secs: env::var("SCORES_API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(30),
            },
            limiter: LimiterConfig {
                capacity: env::var("RATE_LIMIT_CAPACITY")
                    .ok()
                    .and_then(|c| c.parse().ok())
                    .filter(|c: &f64| *c > 0.0)
                    .unwrap_or(2.0),
                refill_per_sec: env::var("RATE_LIMIT_REFILL_PER_SEC")
                    .ok()
                    .and_then(|r| r.parse().ok())
                    .filter(|r: &f64| *r > 0.0)
                    .unwrap_or(2.0),
            },
            store: StoreConfig {
                db_path: env::var("DATABASE_PATH").unwrap_or_else(|_| {
                    if let Some(home) = env::var_os("HOME") {
                        format!("{}/.score-sync/scores.db", home.to_string_lossy())
                    } else {
                        ".score-sync/scores.db".to_string()
                    }
                }),
            },
            batch: BatchConfig {
                // Long enough for a many-thousand-item batch at the default
                // refill rate.
                timeout_secs: env::var("BATCH_TIMEOUT_SECS")
                    .ok()
                    .and_then(|t| t.parse().ok())
                    .unwrap_or(60 * 60 * 48),
                progress_every: env::var("BATCH_PROGRESS_EVERY")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .filter(|p: &u64| *p > 0)
                    .unwrap_or(100),
                page_cap: env::var("FETCH_PAGE_CAP")
                    .ok()
                    .and_then(|p| p.parse().ok())
                    .unwrap_or(200),
            },
        }
    }

    /// Get the server bind address as a string.
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
