//! Redis 缓存实现

use crate::error::StorageError;
use crate::traits::CacheStore;
use redis::AsyncCommands;
use redis::aio::MultiplexedConnection;

/// Redis key/value 缓存
pub struct RedisCacheStore {
    client: redis::Client,
}

impl RedisCacheStore {
    pub fn new(client: redis::Client) -> Self {
        Self { client }
    }

    pub fn connect(redis_url: &str) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client))
    }

    async fn connection(&self) -> Result<MultiplexedConnection, StorageError> {
        let connection = self.client.get_multiplexed_tokio_connection().await?;
        Ok(connection)
    }
}

#[async_trait::async_trait]
impl CacheStore for RedisCacheStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut connection = self.connection().await?;
        let value: Option<String> = connection.get(key).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        connection.set::<_, _, ()>(key, value).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StorageError> {
        let mut connection = self.connection().await?;
        connection.del::<_, ()>(key).await?;
        Ok(())
    }
}
