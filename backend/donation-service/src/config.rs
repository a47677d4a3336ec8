/// Configuration management for Donation Service
///
/// Loaded from environment variables (a `.env` file is honoured in main).
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::services::aggregation::DEFAULT_LEADERBOARD_LIMIT;
use crate::services::DEFAULT_NEARBY_RADIUS_KM;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application settings
    pub app: AppConfig,
    /// Database configuration
    pub database: DatabaseConfig,
    /// Lifecycle engine and background job settings
    pub lifecycle: LifecycleConfig,
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application environment (development, staging, production)
    pub env: String,
    /// Server host to bind to
    pub host: String,
    /// Server port to bind to
    pub port: u16,
}

/// Which store backs the lifecycle engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    /// Process-local and lost on restart; local development and tests only
    Memory,
}

impl StoreBackend {
    fn parse(s: &str) -> Result<Self, String> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" | "in-memory" => Ok(StoreBackend::Memory),
            other => Err(format!("Unknown STORE_BACKEND '{}'", other)),
        }
    }
}

/// Database configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// PostgreSQL connection URL
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
    /// Seconds to wait for the `SELECT 1` check after connecting
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("backend", &self.backend)
            .field("url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

/// Lifecycle settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LifecycleConfig {
    /// Seconds between expiry sweeps; 0 disables the background sweeper
    pub expiry_sweep_interval_secs: u64,
    /// Radius for the nearby listing when the caller gives none
    pub nearby_default_radius_km: f64,
    /// Donors shown on the leaderboard
    pub leaderboard_limit: i64,
}

impl LifecycleConfig {
    pub fn expiry_sweep_interval(&self) -> Option<Duration> {
        (self.expiry_sweep_interval_secs > 0)
            .then(|| Duration::from_secs(self.expiry_sweep_interval_secs))
    }
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, String> {
        let app_env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let backend = match std::env::var("STORE_BACKEND") {
            Ok(value) => StoreBackend::parse(&value)?,
            Err(_) => StoreBackend::Postgres,
        };

        let url = match std::env::var("DATABASE_URL") {
            Ok(value) => value,
            Err(_) if backend == StoreBackend::Postgres
                && app_env.eq_ignore_ascii_case("production") =>
            {
                return Err("DATABASE_URL must be set in production".to_string())
            }
            Err(_) => "postgres://localhost/food_share".to_string(),
        };

        if backend == StoreBackend::Memory && app_env.eq_ignore_ascii_case("production") {
            return Err("STORE_BACKEND=memory is not allowed in production".to_string());
        }

        let nearby_default_radius_km = env_or("NEARBY_DEFAULT_RADIUS_KM", DEFAULT_NEARBY_RADIUS_KM);
        if !nearby_default_radius_km.is_finite() || nearby_default_radius_km <= 0.0 {
            return Err("NEARBY_DEFAULT_RADIUS_KM must be a positive number".to_string());
        }

        Ok(Config {
            app: AppConfig {
                env: app_env,
                host: std::env::var("DONATION_SERVICE_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env_or("DONATION_SERVICE_PORT", 8090),
            },
            database: DatabaseConfig {
                backend,
                url,
                max_connections: env_or("DB_MAX_CONNECTIONS", 10),
                min_connections: env_or("DB_MIN_CONNECTIONS", 2),
                acquire_timeout_secs: env_or("DB_ACQUIRE_TIMEOUT_SECS", 10),
                connect_timeout_secs: env_or("DB_CONNECT_TIMEOUT_SECS", 5),
                idle_timeout_secs: env_or("DB_IDLE_TIMEOUT_SECS", 600),
                max_lifetime_secs: env_or("DB_MAX_LIFETIME_SECS", 1800),
            },
            lifecycle: LifecycleConfig {
                expiry_sweep_interval_secs: env_or("EXPIRY_SWEEP_INTERVAL_SECS", 300),
                nearby_default_radius_km,
                leaderboard_limit: env_or("LEADERBOARD_LIMIT", DEFAULT_LEADERBOARD_LIMIT),
            },
        })
    }
}
