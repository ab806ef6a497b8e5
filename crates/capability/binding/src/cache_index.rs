//! 绑定反查缓存索引。
//!
//! 三个 key 空间：车辆→设备、设备→车辆、车辆→电压方案快照。
//! 所有条目都可由关系库的活跃绑定重新推导，缓存本身不是权威数据。

use domain::VehicleId;
use fleet_config::CacheKeyConfig;
use fleet_storage::{CacheStore, StorageError};
use std::sync::Arc;
use tracing::warn;

pub struct CacheIndex {
    cache: Arc<dyn CacheStore>,
    keys: CacheKeyConfig,
}

impl CacheIndex {
    pub fn new(cache: Arc<dyn CacheStore>, keys: CacheKeyConfig) -> Self {
        Self { cache, keys }
    }

    pub fn vehicle_device_key(&self, vehicle_id: VehicleId) -> String {
        format!("{}{}", self.keys.vehicle_device_prefix, vehicle_id)
    }

    pub fn device_vehicle_key(&self, device_id: &str) -> String {
        format!("{}{}", self.keys.device_vehicle_prefix, device_id)
    }

    pub fn vehicle_program_key(&self, vehicle_id: VehicleId) -> String {
        format!("{}{}", self.keys.vehicle_program_prefix, vehicle_id)
    }

    /// 缓存中车辆绑定的设备。
    pub async fn device_of(&self, vehicle_id: VehicleId) -> Result<Option<String>, StorageError> {
        self.cache.get(&self.vehicle_device_key(vehicle_id)).await
    }

    /// 缓存中设备绑定的车辆；无法解析的值视为未命中。
    pub async fn vehicle_of(&self, device_id: &str) -> Result<Option<VehicleId>, StorageError> {
        let key = self.device_vehicle_key(device_id);
        let Some(value) = self.cache.get(&key).await? else {
            return Ok(None);
        };
        match value.trim().parse::<VehicleId>() {
            Ok(vehicle_id) => Ok(Some(vehicle_id)),
            Err(_) => {
                warn!(target: "fleet.binding", key = %key, value = %value, "cache_vehicle_unparsable");
                Ok(None)
            }
        }
    }

    /// 写入双向索引。两条都会尝试写入，返回第一个错误。
    pub async fn put_pair(&self, vehicle_id: VehicleId, device_id: &str) -> Result<(), StorageError> {
        let by_device = self
            .cache
            .set(&self.device_vehicle_key(device_id), &vehicle_id.to_string())
            .await;
        let by_vehicle = self
            .cache
            .set(&self.vehicle_device_key(vehicle_id), device_id)
            .await;
        by_device.and(by_vehicle)
    }

    /// 删除双向索引。两条都会尝试删除，返回第一个错误。
    pub async fn remove_pair(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
    ) -> Result<(), StorageError> {
        let by_device = self.cache.delete(&self.device_vehicle_key(device_id)).await;
        let by_vehicle = self.cache.delete(&self.vehicle_device_key(vehicle_id)).await;
        by_device.and(by_vehicle)
    }

    /// 仅当设备→车辆条目指向 `vehicle_id` 时删除它。
    pub async fn remove_device_entry_if(
        &self,
        device_id: &str,
        vehicle_id: VehicleId,
    ) -> Result<(), StorageError> {
        if self.vehicle_of(device_id).await? == Some(vehicle_id) {
            self.cache.delete(&self.device_vehicle_key(device_id)).await?;
        }
        Ok(())
    }

    pub async fn remove_vehicle_entry(&self, vehicle_id: VehicleId) -> Result<(), StorageError> {
        self.cache.delete(&self.vehicle_device_key(vehicle_id)).await
    }

    pub async fn program_snapshot(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<String>, StorageError> {
        self.cache.get(&self.vehicle_program_key(vehicle_id)).await
    }

    pub async fn put_program(&self, vehicle_id: VehicleId, snapshot: &str) -> Result<(), StorageError> {
        self.cache
            .set(&self.vehicle_program_key(vehicle_id), snapshot)
            .await
    }

    pub async fn remove_program(&self, vehicle_id: VehicleId) -> Result<(), StorageError> {
        self.cache.delete(&self.vehicle_program_key(vehicle_id)).await
    }
}
