//! 存储接口 Trait 定义
//!
//! - BindingStore：车辆-设备绑定关系（权威数据）
//! - VehicleStore：车辆出库信息
//! - ProgramCatalog：电压方案目录
//! - CacheStore：字符串 key/value 缓存（反查索引、方案快照）
//!
//! 设计原则：
//! - "未找到" 一律返回 `Ok(None)`，不作为错误
//! - 所有接口返回 StorageError
//! - 使用 async_trait 支持动态分发

use crate::error::StorageError;
use crate::models::{BindingRecord, VehicleRecord};
use async_trait::async_trait;
use domain::{VehicleId, VoltageProgram};

/// 绑定关系存储接口
///
/// 同一车辆、同一设备各自最多只有一条活跃绑定。
#[async_trait]
pub trait BindingStore: Send + Sync {
    /// 查找车辆当前的活跃绑定
    async fn find_active_by_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<BindingRecord>, StorageError>;

    /// 查找设备当前的活跃绑定
    async fn find_active_by_device(
        &self,
        device_id: &str,
    ) -> Result<Option<BindingRecord>, StorageError>;

    /// 按设备 ID 尾号查找活跃绑定（多条命中时取最新一条）
    async fn find_active_by_device_suffix(
        &self,
        suffix: &str,
    ) -> Result<Option<BindingRecord>, StorageError>;

    /// 按 (车辆, 设备) 创建活跃绑定；已存在时返回原记录
    ///
    /// 车辆或设备已有其他活跃绑定时返回 `StorageError::Conflict`。
    async fn upsert(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
        now_ms: i64,
    ) -> Result<BindingRecord, StorageError>;

    /// 软删除车辆的活跃绑定，返回被删除的记录
    async fn soft_delete_by_vehicle(
        &self,
        vehicle_id: VehicleId,
        now_ms: i64,
    ) -> Result<Option<BindingRecord>, StorageError>;

    /// 物理删除解绑时间早于 `cutoff_ms` 的历史记录，返回删除条数
    async fn purge_deleted_before(&self, cutoff_ms: i64) -> Result<u64, StorageError>;
}

/// 车辆存储接口
#[async_trait]
pub trait VehicleStore: Send + Sync {
    /// 批量录入车辆
    async fn insert_vehicles(
        &self,
        records: Vec<VehicleRecord>,
    ) -> Result<Vec<VehicleRecord>, StorageError>;

    /// 查找车辆
    async fn find_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<VehicleRecord>, StorageError>;

    /// 设置或清除车辆的电压方案，返回是否命中车辆
    async fn set_voltage_program(
        &self,
        vehicle_id: VehicleId,
        program_id: Option<i64>,
    ) -> Result<bool, StorageError>;
}

/// 电压方案目录接口
#[async_trait]
pub trait ProgramCatalog: Send + Sync {
    async fn find_program(&self, program_id: i64) -> Result<Option<VoltageProgram>, StorageError>;
}

/// 字符串 key/value 缓存接口
#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    async fn delete(&self, key: &str) -> Result<(), StorageError>;
}
