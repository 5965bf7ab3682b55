use redis::{
    aio::{ConnectionManager, ConnectionManagerConfig},
    Client, ErrorKind, RedisError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

/// Redis handle that connects on first use, so a cold Redis never blocks startup.
///
/// A failed connect is not cached: the next call tries again, bounded by
/// `connect_timeout` and without the connection manager's retry backoff.
#[derive(Clone)]
pub struct RedisClient {
    client: Client,
    conn: Arc<OnceCell<ConnectionManager>>,
    connect_timeout: Duration,
}

impl RedisClient {
    pub fn new(redis_url: &str, connect_timeout: Duration) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        Ok(RedisClient {
            client,
            conn: Arc::new(OnceCell::new()),
            connect_timeout,
        })
    }

    pub async fn connection(&self) -> redis::RedisResult<ConnectionManager> {
        let conn = self
            .conn
            .get_or_try_init(|| self.connect())
            .await?;
        Ok(conn.clone())
    }

    async fn connect(&self) -> redis::RedisResult<ConnectionManager> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(0)
            .set_connection_timeout(self.connect_timeout)
            .set_response_timeout(self.connect_timeout);

        tokio::time::timeout(
            self.connect_timeout,
            ConnectionManager::new_with_config(self.client.clone(), config),
        )
        .await
        .map_err(|_| RedisError::from((ErrorKind::IoError, "Redis connect timed out")))?
    }
}
