//! 绑定关系内存存储实现
//!
//! 行为与 Postgres 实现保持一致：
//! - 软删除：解绑只写入 `deleted_at_ms`
//! - 活跃行唯一：同一车辆/设备最多一条活跃绑定
//! - upsert 按 (车辆, 设备) 幂等

use crate::error::StorageError;
use crate::models::BindingRecord;
use crate::traits::BindingStore;
use crate::validation::ensure_vehicle_id;
use domain::VehicleId;
use std::sync::RwLock;

struct BindingTable {
    rows: Vec<BindingRecord>,
    next_id: i64,
}

/// 绑定关系内存存储
///
/// 使用 RwLock + Vec 保存全部行（含已软删除的历史行）。
pub struct InMemoryBindingStore {
    table: RwLock<BindingTable>,
}

impl InMemoryBindingStore {
    /// 创建新的绑定存储
    pub fn new() -> Self {
        Self {
            table: RwLock::new(BindingTable {
                rows: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// 全部行（含历史行），用于测试
    pub fn all_rows(&self) -> Vec<BindingRecord> {
        self.table
            .read()
            .map(|table| table.rows.clone())
            .unwrap_or_default()
    }
}

impl Default for InMemoryBindingStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl BindingStore for InMemoryBindingStore {
    async fn find_active_by_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(table
            .rows
            .iter()
            .find(|row| row.is_active() && row.vehicle_id == vehicle_id)
            .cloned())
    }

    async fn find_active_by_device(
        &self,
        device_id: &str,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(table
            .rows
            .iter()
            .find(|row| row.is_active() && row.device_id == device_id)
            .cloned())
    }

    async fn find_active_by_device_suffix(
        &self,
        suffix: &str,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let table = self
            .table
            .read()
            .map_err(|_| StorageError::new("lock failed"))?;
        Ok(table
            .rows
            .iter()
            .filter(|row| row.is_active() && row.device_id.ends_with(suffix))
            .max_by_key(|row| row.binding_id)
            .cloned())
    }

    async fn upsert(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
        now_ms: i64,
    ) -> Result<BindingRecord, StorageError> {
        ensure_vehicle_id(vehicle_id)?;
        let mut table = self
            .table
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let mut taken = false;
        for row in table.rows.iter().filter(|row| row.is_active()) {
            if row.vehicle_id == vehicle_id && row.device_id == device_id {
                return Ok(row.clone());
            }
            if row.vehicle_id == vehicle_id || row.device_id == device_id {
                taken = true;
            }
        }
        if taken {
            return Err(StorageError::Conflict(format!(
                "active binding exists for vehicle {} or device {}",
                vehicle_id, device_id
            )));
        }
        let record = BindingRecord {
            binding_id: table.next_id,
            vehicle_id,
            device_id: device_id.to_string(),
            created_at_ms: now_ms,
            deleted_at_ms: None,
        };
        table.next_id += 1;
        table.rows.push(record.clone());
        Ok(record)
    }

    async fn soft_delete_by_vehicle(
        &self,
        vehicle_id: VehicleId,
        now_ms: i64,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let row = table
            .rows
            .iter_mut()
            .find(|row| row.is_active() && row.vehicle_id == vehicle_id);
        Ok(row.map(|row| {
            row.deleted_at_ms = Some(now_ms);
            row.clone()
        }))
    }

    async fn purge_deleted_before(&self, cutoff_ms: i64) -> Result<u64, StorageError> {
        let mut table = self
            .table
            .write()
            .map_err(|_| StorageError::new("lock failed"))?;
        let before = table.rows.len();
        table
            .rows
            .retain(|row| !matches!(row.deleted_at_ms, Some(deleted) if deleted < cutoff_ms));
        Ok((before - table.rows.len()) as u64)
    }
}
