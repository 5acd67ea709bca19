use redis::{aio::MultiplexedConnection, Client, RedisError, ErrorKind};
use std::time::Duration;

#[derive(Clone)]
pub struct RedisClient {
    pub conn: MultiplexedConnection,
}

impl RedisClient {
    /// Opens a multiplexed connection and pings it, giving up after `timeout`.
    pub async fn connect(redis_url: &str, timeout: Duration) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let connecting = async {
            let mut conn = client.get_multiplexed_tokio_connection().await?;
            let _: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, RedisError>(conn)
        };

        let conn = tokio::time::timeout(timeout, connecting)
            .await
            .map_err(|_| RedisError::from((ErrorKind::IoError, "Redis connect timed out")))??;
        Ok(RedisClient { conn })
    }
}
