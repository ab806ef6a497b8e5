//! 运营方设备计数协作方。
//!
//! 绑定引擎只在状态真正变化时通知：新建绑定 → entered，解绑命中 → left。
//! 幂等绑定、冲突、解绑未命中都不会通知。

use async_trait::async_trait;
use domain::OperatorId;
use fleet_config::CacheKeyConfig;
use fleet_storage::StorageError;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// 运营方设备计数接口。
#[async_trait]
pub trait DeviceCounter: Send + Sync {
    async fn on_device_entered(
        &self,
        operator_id: OperatorId,
        device_id: &str,
    ) -> Result<(), StorageError>;

    async fn on_device_left(
        &self,
        operator_id: OperatorId,
        device_id: &str,
    ) -> Result<(), StorageError>;
}

/// 空计数器（未接入计数时使用）。
#[derive(Debug, Default)]
pub struct NoopDeviceCounter;

#[async_trait]
impl DeviceCounter for NoopDeviceCounter {
    async fn on_device_entered(
        &self,
        _operator_id: OperatorId,
        _device_id: &str,
    ) -> Result<(), StorageError> {
        Ok(())
    }

    async fn on_device_left(
        &self,
        _operator_id: OperatorId,
        _device_id: &str,
    ) -> Result<(), StorageError> {
        Ok(())
    }
}

/// 内存计数器，记录每个运营方的设备数和通知次数。
#[derive(Debug, Default)]
pub struct InMemoryDeviceCounter {
    counts: Mutex<HashMap<OperatorId, i64>>,
    entered: AtomicU64,
    left: AtomicU64,
}

impl InMemoryDeviceCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, operator_id: OperatorId) -> i64 {
        self.counts
            .lock()
            .map(|counts| counts.get(&operator_id).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn entered_calls(&self) -> u64 {
        self.entered.load(Ordering::SeqCst)
    }

    pub fn left_calls(&self) -> u64 {
        self.left.load(Ordering::SeqCst)
    }

    fn adjust(&self, operator_id: OperatorId, delta: i64) -> Result<(), StorageError> {
        let mut counts = self
            .counts
            .lock()
            .map_err(|_| StorageError::new("device counter lock poisoned"))?;
        *counts.entry(operator_id).or_insert(0) += delta;
        Ok(())
    }
}

#[async_trait]
impl DeviceCounter for InMemoryDeviceCounter {
    async fn on_device_entered(
        &self,
        operator_id: OperatorId,
        _device_id: &str,
    ) -> Result<(), StorageError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.adjust(operator_id, 1)
    }

    async fn on_device_left(
        &self,
        operator_id: OperatorId,
        _device_id: &str,
    ) -> Result<(), StorageError> {
        self.left.fetch_add(1, Ordering::SeqCst);
        self.adjust(operator_id, -1)
    }
}

/// Redis 计数器。
///
/// - 设备归属：`{device_operator_prefix}{device}` → 运营方 ID
/// - 运营方设备数：`{operator_count_prefix}{operator}` → 整数
///
/// 两条命令放在同一个原子 pipeline 中执行。
pub struct RedisDeviceCounter {
    client: redis::Client,
    device_operator_prefix: String,
    operator_count_prefix: String,
}

impl RedisDeviceCounter {
    pub fn new(client: redis::Client, keys: &CacheKeyConfig) -> Self {
        Self {
            client,
            device_operator_prefix: keys.device_operator_prefix.clone(),
            operator_count_prefix: keys.operator_count_prefix.clone(),
        }
    }

    pub fn connect(redis_url: &str, keys: &CacheKeyConfig) -> Result<Self, StorageError> {
        let client = redis::Client::open(redis_url)?;
        Ok(Self::new(client, keys))
    }

    fn device_key(&self, device_id: &str) -> String {
        format!("{}{}", self.device_operator_prefix, device_id)
    }

    fn count_key(&self, operator_id: OperatorId) -> String {
        format!("{}{}", self.operator_count_prefix, operator_id)
    }
}

#[async_trait]
impl DeviceCounter for RedisDeviceCounter {
    async fn on_device_entered(
        &self,
        operator_id: OperatorId,
        device_id: &str,
    ) -> Result<(), StorageError> {
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        redis::pipe()
            .atomic()
            .set(self.device_key(device_id), operator_id)
            .ignore()
            .incr(self.count_key(operator_id), 1)
            .ignore()
            .query_async::<_, ()>(&mut connection)
            .await?;
        Ok(())
    }

    async fn on_device_left(
        &self,
        operator_id: OperatorId,
        device_id: &str,
    ) -> Result<(), StorageError> {
        let mut connection = self.client.get_multiplexed_tokio_connection().await?;
        redis::pipe()
            .atomic()
            .del(self.device_key(device_id))
            .ignore()
            .decr(self.count_key(operator_id), 1)
            .ignore()
            .query_async::<_, ()>(&mut connection)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_counter_tracks_per_operator() {
        let counter = InMemoryDeviceCounter::new();
        counter.on_device_entered(7, "a").await.expect("enter");
        counter.on_device_entered(7, "b").await.expect("enter");
        counter.on_device_left(7, "a").await.expect("leave");
        counter.on_device_entered(8, "c").await.expect("enter");

        assert_eq!(counter.count(7), 1);
        assert_eq!(counter.count(8), 1);
        assert_eq!(counter.count(9), 0);
        assert_eq!(counter.entered_calls(), 3);
        assert_eq!(counter.left_calls(), 1);
    }

    #[test]
    fn redis_counter_keys_use_configured_prefixes() {
        let client = redis::Client::open("redis://127.0.0.1:6379").expect("client");
        let counter = RedisDeviceCounter::new(client, &CacheKeyConfig::default());
        assert_eq!(counter.device_key("DEV-IMEI-01"), "imeiAgentBinding_DEV-IMEI-01");
        assert_eq!(counter.count_key(12), "agentDeviceCount_12");
    }
}
