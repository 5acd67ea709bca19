use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::cache::CacheService;
use crate::models::{Experience, ExperienceDetail, ExperienceSummary};
use crate::store::{Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Experience not found")]
    NotFound,

    #[error("storage unavailable: {0}")]
    Storage(#[from] StoreError),
}

/// Read side of the catalog. Never mutates anything in the store.
#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
    cache: Option<CacheService>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>, cache: Option<CacheService>) -> Self {
        Self { store, cache }
    }

    pub async fn list_experiences(&self) -> Result<Vec<ExperienceSummary>, CatalogError> {
        if let Some(cache) = &self.cache {
            match cache.get_cached_experiences().await {
                Ok(Some(experiences)) => {
                    debug!("Experience listing served from cache");
                    return Ok(experiences);
                }
                Ok(None) => {}
                Err(e) => warn!("Listing cache read failed: {:?}", e),
            }
        }

        let experiences = self.store.list_experiences().await?;

        if let Some(cache) = &self.cache {
            if let Err(e) = cache.cache_experiences(&experiences).await {
                warn!("Listing cache write failed: {:?}", e);
            }
        }
        Ok(experiences)
    }

    pub async fn get_experience(&self, id: Uuid) -> Result<Experience, CatalogError> {
        self.store
            .get_experience(id)
            .await?
            .ok_or(CatalogError::NotFound)
    }

    /// Live availability; never served from cache.
    pub async fn get_experience_detail(&self, id: Uuid) -> Result<ExperienceDetail, CatalogError> {
        Ok(self.get_experience(id).await?.detail())
    }

    pub async fn invalidate_listing(&self) {
        if let Some(cache) = &self.cache {
            cache.invalidate_experiences().await;
        }
    }
}
