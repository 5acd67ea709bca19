pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use axum::{routing::get, Router};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::cache::CacheService;
use crate::config::{promo::load_promo_table, Config, ConfigError, StoreBackend};
use crate::database::Database;
use crate::redis_client::RedisClient;
use crate::services::catalog::CatalogService;
use crate::services::pricing::PricingCalculator;
use crate::services::reservation::{EngineSettings, ReservationEngine};
use crate::store::{MemoryStore, PgStore, Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("catalog seeding failed: {0}")]
    Seed(#[from] StoreError),
}

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub catalog: CatalogService,
    pub engine: ReservationEngine,
    pub pricing: PricingCalculator,
}

impl AppState {
    /// Connects the configured backend, runs migrations, attaches the
    /// optional Redis cache and seeds the catalog when asked to.
    pub async fn new(config: Config) -> Result<Arc<Self>, StartupError> {
        let store: Arc<dyn Store> = match config.app.store_backend {
            StoreBackend::Postgres => {
                let url = config
                    .database
                    .url
                    .as_deref()
                    .ok_or(ConfigError::Missing("DATABASE_URL"))?;
                let db = Database::new(
                    url,
                    config.database.pool_size,
                    config.database.acquire_timeout(),
                )
                .await?;
                info!("Database connected");
                db.run_migrations().await?;
                Arc::new(PgStore::new(
                    db,
                    config.database.lock_timeout(),
                    config.database.statement_timeout(),
                ))
            }
            StoreBackend::Memory => {
                warn!("Using in-memory store; bookings are lost on restart");
                Arc::new(MemoryStore::new(config.reservation.slot_lock_timeout()))
            }
        };

        let cache = match config.redis.url.as_deref() {
            Some(url) => match RedisClient::connect(url, Duration::from_secs(3)).await {
                Ok(redis) => {
                    info!("Redis connected");
                    Some(CacheService::new(redis, config.redis.listing_ttl_secs))
                }
                Err(e) => {
                    warn!("Redis unavailable, listing cache disabled: {:?}", e);
                    None
                }
            },
            None => None,
        };

        let state = Self::with_store(config, store.clone(), cache)?;

        if state.config.seed.enabled {
            let added =
                services::seed::seed_if_empty(store.as_ref(), state.config.seed.first_date).await?;
            if added > 0 {
                state.catalog.invalidate_listing().await;
            }
        }

        Ok(state)
    }

    /// Wires services around an already-built store.
    pub fn with_store(
        config: Config,
        store: Arc<dyn Store>,
        cache: Option<CacheService>,
    ) -> Result<Arc<Self>, ConfigError> {
        let promos = load_promo_table(config.pricing.promo_config_path.as_deref())?;
        let pricing = PricingCalculator::new(promos, config.pricing.tax_rate_bps);
        let engine = ReservationEngine::new(
            store.clone(),
            pricing.clone(),
            EngineSettings {
                promo_policy: config.reservation.promo_policy,
            },
        );

        Ok(Arc::new(Self {
            catalog: CatalogService::new(store, cache),
            engine,
            pricing,
            config,
        }))
    }
}

/// The full HTTP surface, ready for `axum::serve` or `oneshot` in tests.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Experience Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api", controllers::routes())
        .with_state(state)
}
