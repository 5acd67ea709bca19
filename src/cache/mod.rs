use crate::redis_client::RedisClient;

pub mod experiences;

/// Read-through Redis cache for catalog listings. Slot availability is never
/// cached; detail views always go to the store.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    listing_ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, listing_ttl_secs: u64) -> Self {
        Self {
            redis,
            listing_ttl_secs,
        }
    }
}
