//! Postgres 绑定关系存储实现
//!
//! 设计要点：
//! - upsert 使用 `on conflict do nothing`，冲突后按 (车辆, 设备) 回查，保证重试幂等
//! - 回查不到说明车辆或设备被其他活跃行占用，返回 Conflict

use crate::error::StorageError;
use crate::models::BindingRecord;
use crate::traits::BindingStore;
use crate::validation::{ensure_vehicle_id, like_suffix_pattern};
use domain::VehicleId;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

const BINDING_COLUMNS: &str = "binding_id, vehicle_id, device_id, created_at_ms, deleted_at_ms";

pub struct PgBindingStore {
    pub pool: PgPool,
}

impl PgBindingStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool =
            crate::connection::connect_pool(database_url, crate::DEFAULT_MAX_CONNECTIONS).await?;
        Ok(Self { pool })
    }

    async fn find_active_pair(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "select {} from vehicle_device_bindings \
             where vehicle_id = $1 and device_id = $2 and deleted_at_ms is null",
            BINDING_COLUMNS
        ))
        .bind(vehicle_id)
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| binding_from_row(&row)).transpose()
    }
}

fn binding_from_row(row: &PgRow) -> Result<BindingRecord, StorageError> {
    Ok(BindingRecord {
        binding_id: row.try_get("binding_id")?,
        vehicle_id: row.try_get("vehicle_id")?,
        device_id: row.try_get("device_id")?,
        created_at_ms: row.try_get("created_at_ms")?,
        deleted_at_ms: row.try_get("deleted_at_ms")?,
    })
}

#[async_trait::async_trait]
impl BindingStore for PgBindingStore {
    async fn find_active_by_vehicle(
        &self,
        vehicle_id: VehicleId,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "select {} from vehicle_device_bindings \
             where vehicle_id = $1 and deleted_at_ms is null",
            BINDING_COLUMNS
        ))
        .bind(vehicle_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| binding_from_row(&row)).transpose()
    }

    async fn find_active_by_device(
        &self,
        device_id: &str,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "select {} from vehicle_device_bindings \
             where device_id = $1 and deleted_at_ms is null",
            BINDING_COLUMNS
        ))
        .bind(device_id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| binding_from_row(&row)).transpose()
    }

    async fn find_active_by_device_suffix(
        &self,
        suffix: &str,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "select {} from vehicle_device_bindings \
             where device_id like $1 escape '\\' and deleted_at_ms is null \
             order by binding_id desc limit 1",
            BINDING_COLUMNS
        ))
        .bind(like_suffix_pattern(suffix))
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| binding_from_row(&row)).transpose()
    }

    async fn upsert(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
        now_ms: i64,
    ) -> Result<BindingRecord, StorageError> {
        ensure_vehicle_id(vehicle_id)?;
        let row = sqlx::query(&format!(
            "insert into vehicle_device_bindings (vehicle_id, device_id, created_at_ms) \
             values ($1, $2, $3) \
             on conflict do nothing \
             returning {}",
            BINDING_COLUMNS
        ))
        .bind(vehicle_id)
        .bind(device_id)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;
        if let Some(row) = row {
            return binding_from_row(&row);
        }
        match self.find_active_pair(vehicle_id, device_id).await? {
            Some(existing) => Ok(existing),
            None => Err(StorageError::Conflict(format!(
                "active binding exists for vehicle {} or device {}",
                vehicle_id, device_id
            ))),
        }
    }

    async fn soft_delete_by_vehicle(
        &self,
        vehicle_id: VehicleId,
        now_ms: i64,
    ) -> Result<Option<BindingRecord>, StorageError> {
        let row = sqlx::query(&format!(
            "update vehicle_device_bindings set deleted_at_ms = $2 \
             where vehicle_id = $1 and deleted_at_ms is null \
             returning {}",
            BINDING_COLUMNS
        ))
        .bind(vehicle_id)
        .bind(now_ms)
        .fetch_optional(&self.pool)
        .await?;
        row.map(|row| binding_from_row(&row)).transpose()
    }

    async fn purge_deleted_before(&self, cutoff_ms: i64) -> Result<u64, StorageError> {
        let result = sqlx::query(
            "delete from vehicle_device_bindings \
             where deleted_at_ms is not null and deleted_at_ms < $1",
        )
        .bind(cutoff_ms)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
