//! 车辆内存存储实现
//!
//! 仅用于测试和本地演示。

use crate::error::StorageError;
use crate::models::VehicleRecord;
use crate::traits::VehicleStore;
use crate::validation::ensure_vehicle_id;
use domain::VehicleId;
use std::collections::HashMap;
use std::sync::RwLock;

/// 车辆内存存储
pub struct InMemoryVehicleStore {
    vehicles: RwLock<HashMap<VehicleId, VehicleRecord>>,
}

impl InMemoryVehicleStore {
    pub fn new() -> Self {
        Self {
            vehicles: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryVehicleStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl VehicleStore for InMemoryVehicleStore {
    async fn insert_vehicles(
        &self,
        records: Vec<VehicleRecord>,
    ) -> Result<Vec<VehicleRecord>, StorageError> {
        let mut map = self
            .vehicles
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        // 先整体校验，保证批量录入要么全部成功要么全部失败
        for (index, record) in records.iter().enumerate() {
            ensure_vehicle_id(record.vehicle_id)?;
            let duplicated_in_batch = records[..index].iter().any(|other| {
                other.vehicle_id == record.vehicle_id || other.car_no == record.car_no
            });
            let duplicated_in_store = map.values().any(|existing| {
                existing.vehicle_id == record.vehicle_id || existing.car_no == record.car_no
            });
            if duplicated_in_batch || duplicated_in_store {
                return Err(StorageError::Conflict(format!(
                    "vehicle {} / car_no {} exists",
                    record.vehicle_id, record.car_no
                )));
            }
        }
        for record in &records {
            map.insert(record.vehicle_id, record.clone());
        }
        Ok(records)
    }

    async fn find_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<VehicleRecord>, StorageError> {
        let map = self
            .vehicles
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(map.get(&vehicle_id).cloned())
    }

    async fn set_voltage_program(
        &self,
        vehicle_id: VehicleId,
        program_id: Option<i64>,
    ) -> Result<bool, StorageError> {
        let mut map = self
            .vehicles
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        match map.get_mut(&vehicle_id) {
            Some(vehicle) => {
                vehicle.voltage_program_id = program_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn poisoned_lock_is_an_error_not_a_miss() {
        let store = Arc::new(InMemoryVehicleStore::new());
        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.vehicles.write().expect("write");
            panic!("poison vehicle table");
        })
        .join();

        let err = store.find_vehicle(100600001).await.expect_err("poisoned");
        assert_eq!(err.to_string(), "lock failed");
    }
}
