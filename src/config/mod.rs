use chrono::NaiveDate;
use serde::Deserialize;
use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use crate::services::pricing::DEFAULT_TAX_RATE_BPS;
use crate::services::reservation::PromoPolicy;

pub mod promo;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to load promo codes from {path}: {source}")]
    PromoFile {
        path: String,
        #[source]
        source: ::config::ConfigError,
    },

    #[error("promo code {code}: {reason}")]
    PromoRule { code: String, reason: String },
}

// Top-level container for every settings section
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub reservation: ReservationConfig,
    pub pricing: PricingConfig,
    pub seed: SeedConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("expected postgres or memory, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected pretty or json, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub environment: String,
    pub rust_log: String,
    pub log_format: LogFormat,
    pub store_backend: StoreBackend,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub pool_size: u32,
    pub acquire_timeout_secs: u64,
    /// Upper bound on waiting for a slot row lock inside a reservation.
    pub lock_timeout_ms: u64,
    /// Upper bound on any single statement of a reservation transaction.
    pub statement_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: Option<String>,
    pub listing_ttl_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReservationConfig {
    pub slot_lock_timeout_ms: u64,
    pub promo_policy: PromoPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    pub tax_rate_bps: i64,
    pub promo_config_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedConfig {
    pub enabled: bool,
    pub first_date: NaiveDate,
}

impl ReservationConfig {
    pub fn slot_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.slot_lock_timeout_ms)
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn lock_timeout(&self) -> Duration {
        Duration::from_millis(self.lock_timeout_ms)
    }

    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars(&lookup);

        let config = Config {
            app: AppConfig {
                host: vars.string("HOST", "0.0.0.0"),
                port: vars.parse("PORT", 8000)?,
                environment: vars.string("ENVIRONMENT", "development"),
                rust_log: vars.string(
                    "RUST_LOG",
                    "experience_booking=debug,tower_http=debug",
                ),
                log_format: vars.parse("LOG_FORMAT", LogFormat::Pretty)?,
                store_backend: vars.parse("STORE_BACKEND", StoreBackend::Postgres)?,
            },
            database: DatabaseConfig {
                url: vars.optional("DATABASE_URL"),
                pool_size: vars.parse("DB_POOL_SIZE", 20)?,
                acquire_timeout_secs: vars.parse("DB_ACQUIRE_TIMEOUT_SECONDS", 5)?,
                lock_timeout_ms: vars.parse("DB_LOCK_TIMEOUT_MS", 2_000)?,
                statement_timeout_ms: vars.parse("DB_STATEMENT_TIMEOUT_MS", 5_000)?,
            },
            redis: RedisConfig {
                url: vars.optional("REDIS_URL"),
                listing_ttl_secs: vars.parse("CACHE_LISTING_TTL_SECONDS", 3_600)?,
            },
            reservation: ReservationConfig {
                slot_lock_timeout_ms: vars.parse("RESERVATION_SLOT_LOCK_TIMEOUT_MS", 2_000)?,
                promo_policy: vars.parse("INVALID_PROMO_POLICY", PromoPolicy::Ignore)?,
            },
            pricing: PricingConfig {
                tax_rate_bps: vars.parse("TAX_RATE_BPS", DEFAULT_TAX_RATE_BPS)?,
                promo_config_path: vars.optional("PROMO_CONFIG_PATH"),
            },
            seed: SeedConfig {
                enabled: vars.parse("SEED_CATALOG", false)?,
                first_date: vars.parse("SEED_FIRST_DATE", default_seed_date())?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.app.store_backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }
        if self.pricing.tax_rate_bps < 0 {
            return Err(ConfigError::Invalid {
                key: "TAX_RATE_BPS",
                value: self.pricing.tax_rate_bps.to_string(),
                reason: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}

/// In-memory defaults for tests and local runs without a database.
impl Default for Config {
    fn default() -> Self {
        Config {
            app: AppConfig {
                host: "127.0.0.1".to_string(),
                port: 8000,
                environment: "test".to_string(),
                rust_log: "experience_booking=debug".to_string(),
                log_format: LogFormat::Pretty,
                store_backend: StoreBackend::Memory,
            },
            database: DatabaseConfig {
                url: None,
                pool_size: 5,
                acquire_timeout_secs: 5,
                lock_timeout_ms: 2_000,
                statement_timeout_ms: 5_000,
            },
            redis: RedisConfig {
                url: None,
                listing_ttl_secs: 3_600,
            },
            reservation: ReservationConfig {
                slot_lock_timeout_ms: 2_000,
                promo_policy: PromoPolicy::Ignore,
            },
            pricing: PricingConfig {
                tax_rate_bps: DEFAULT_TAX_RATE_BPS,
                promo_config_path: None,
            },
            seed: SeedConfig {
                enabled: false,
                first_date: default_seed_date(),
            },
        }
    }
}

fn default_seed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 22).unwrap_or_default()
}

struct Vars<'a, F>(&'a F);

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    fn string(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.optional(key) {
            None => Ok(default),
            Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }
}
