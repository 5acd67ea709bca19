use crate::cache::CacheService;
use crate::models::ExperienceSummary;
use redis::AsyncCommands;
use tracing::info;

const LISTING_KEY: &str = "experiences:listing";

impl CacheService {
    pub async fn get_cached_experiences(
        &self,
    ) -> Result<Option<Vec<ExperienceSummary>>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(LISTING_KEY).await?;
        let Some(data) = data else {
            return Ok(None);
        };
        let experiences = serde_json::from_str(&data).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Parse error"))
        })?;
        Ok(Some(experiences))
    }

    pub async fn cache_experiences(
        &self,
        experiences: &[ExperienceSummary],
    ) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(experiences).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(LISTING_KEY, data, self.listing_ttl_secs).await
    }

    pub async fn invalidate_experiences(&self) {
        let mut conn = self.redis.conn.clone();
        let _: Result<(), _> = conn.del(LISTING_KEY).await;
        info!("Invalidated experience listing cache");
    }
}
