use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub redis_url: String,
    pub port: u16,
    pub expo_access_token: Option<String>,
    pub allowed_origins: Vec<String>,
    pub dispatch: DispatchConfig,
}

/// Tunables for the dispatch engine.
///
/// Every duration here maps to a TTL on a Redis key or to the acceptance
/// window of a single offer. Defaults follow the production deployment.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// How long one driver may hold an open offer before it times out
    pub offer_timeout: Duration,
    /// Lifetime of the candidate queue; a request unserved past this is exhausted
    pub queue_ttl: Duration,
    /// Retention of accepted-state keys (assigned driver, ETA)
    pub accepted_ttl: Duration,
    /// Retention of the append-only response log
    pub response_log_ttl: Duration,
    /// Presence freshness window; drivers silent longer are not candidates
    pub liveness_ttl: Duration,
    /// Candidate search radius around the pickup point
    pub search_radius_km: f64,
    /// Maximum candidates seeded per request
    pub search_limit: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            offer_timeout: Duration::from_secs(60),
            queue_ttl: Duration::from_secs(600),
            accepted_ttl: Duration::from_secs(3600),
            response_log_ttl: Duration::from_secs(86_400),
            liveness_ttl: Duration::from_secs(300),
            search_radius_km: 5.0,
            search_limit: 10,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Self::validate_env_vars();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://localhost:6379".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            expo_access_token: env::var("EXPO_ACCESS_TOKEN").ok(),
            allowed_origins: env::var("ALLOWED_ORIGINS")
                .unwrap_or_else(|_| {
                    if cfg!(debug_assertions) {
                        "http://localhost:3000,http://localhost:19006,http://localhost:8081"
                            .to_string()
                    } else {
                        "".to_string()
                    }
                })
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            dispatch: DispatchConfig {
                offer_timeout: env_secs("OFFER_TIMEOUT_SECONDS", 60)?,
                queue_ttl: env_secs("QUEUE_TTL_SECONDS", 600)?,
                accepted_ttl: env_secs("ACCEPTED_TTL_SECONDS", 3600)?,
                response_log_ttl: env_secs("RESPONSE_LOG_TTL_SECONDS", 86_400)?,
                liveness_ttl: env_secs("LIVENESS_TTL_SECONDS", 300)?,
                search_radius_km: env::var("SEARCH_RADIUS_KM")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("SEARCH_RADIUS_KM must be a number")?,
                search_limit: env::var("SEARCH_LIMIT")
                    .unwrap_or_else(|_| "10".to_string())
                    .parse()
                    .context("SEARCH_LIMIT must be a number")?,
            },
        })
    }

    /// Validate environment variables and print warnings
    fn validate_env_vars() {
        let required_vars = ["DATABASE_URL"];

        let optional_vars = [
            ("REDIS_URL", "redis://localhost:6379"),
            ("PORT", "8080"),
            ("EXPO_ACCESS_TOKEN", "none"),
            ("ALLOWED_ORIGINS", "auto-configured"),
            ("OFFER_TIMEOUT_SECONDS", "60"),
            ("QUEUE_TTL_SECONDS", "600"),
            ("ACCEPTED_TTL_SECONDS", "3600"),
            ("RESPONSE_LOG_TTL_SECONDS", "86400"),
            ("LIVENESS_TTL_SECONDS", "300"),
            ("SEARCH_RADIUS_KM", "5"),
            ("SEARCH_LIMIT", "10"),
        ];

        let mut missing_required = Vec::new();
        let mut missing_optional = Vec::new();

        for var in &required_vars {
            if env::var(var).is_err() {
                missing_required.push(*var);
            }
        }

        for (var, default) in &optional_vars {
            if env::var(var).is_err() {
                missing_optional.push((*var, *default));
            }
        }

        if !missing_optional.is_empty() {
            tracing::warn!("Optional environment variables not set (using defaults):");
            for (var, default) in missing_optional {
                tracing::warn!("  ⚠️  {} (default: {})", var, default);
            }
        }

        if !missing_required.is_empty() {
            tracing::error!("❌ Required environment variables are missing:");
            for var in &missing_required {
                tracing::error!("  ❌  {}", var);
            }
            tracing::error!("Server will fail to start without these variables!");
        }
    }
}

fn env_secs(var: &str, default: u64) -> Result<Duration> {
    let secs = match env::var(var) {
        Ok(v) => v
            .parse()
            .with_context(|| format!("{} must be a number of seconds", var))?,
        Err(_) => default,
    };
    Ok(Duration::from_secs(secs))
}
