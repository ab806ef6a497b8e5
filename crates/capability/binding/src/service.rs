//! 绑定/解绑编排。
//!
//! 每次变更的顺序固定：加锁 → 判定 → 写关系库 → 写缓存 → 通知计数。
//! 关系库失败直接返回，缓存和计数不做任何修改；
//! 关系库成功后的缓存/计数失败只记录告警和指标，不影响结果。

use crate::cache_index::CacheIndex;
use crate::counter::DeviceCounter;
use crate::error::BindingError;
use crate::locks::{KeyedLocks, device_lock_key, vehicle_lock_key};
use crate::resolver::{BindingResolver, BindingState};
use domain::{BindingSide, OperatorId, VehicleId, normalize_device_id};
use fleet_config::RetentionPolicy;
use fleet_storage::{BindingRecord, BindingStore, StorageError};
use fleet_telemetry::{
    new_operation_id, record_bind_conflict, record_bind_created, record_bind_idempotent,
    record_cache_write_failure, record_counter_failure, record_store_failure, record_unbind,
    record_unbind_conflict, record_unbind_miss,
};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// 绑定结果。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindOutcome {
    pub record: BindingRecord,
    /// 本次是否新建了绑定；已互相绑定时为 false。
    pub created: bool,
}

#[derive(Debug, Clone)]
pub struct BindingServiceConfig {
    pub retention: RetentionPolicy,
}

impl Default for BindingServiceConfig {
    fn default() -> Self {
        Self {
            retention: RetentionPolicy::Indefinite,
        }
    }
}

pub struct BindingService {
    store: Arc<dyn BindingStore>,
    resolver: BindingResolver,
    index: Arc<CacheIndex>,
    counter: Arc<dyn DeviceCounter>,
    locks: Arc<KeyedLocks>,
    config: BindingServiceConfig,
}

impl BindingService {
    pub fn new(
        store: Arc<dyn BindingStore>,
        index: Arc<CacheIndex>,
        counter: Arc<dyn DeviceCounter>,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self::new_with_config(store, index, counter, locks, BindingServiceConfig::default())
    }

    pub fn new_with_config(
        store: Arc<dyn BindingStore>,
        index: Arc<CacheIndex>,
        counter: Arc<dyn DeviceCounter>,
        locks: Arc<KeyedLocks>,
        config: BindingServiceConfig,
    ) -> Self {
        Self {
            resolver: BindingResolver::new(store.clone()),
            store,
            index,
            counter,
            locks,
            config,
        }
    }

    /// 绑定车辆与设备。
    ///
    /// 已互相绑定时幂等成功（`created = false`），并重写缓存；
    /// 任一方已绑定其他对象时返回 `BindingError::Conflict`。
    pub async fn bind(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
        operator_id: OperatorId,
    ) -> Result<BindOutcome, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        let device_id = validate_device_id(device_id)?;
        let operation_id = new_operation_id();
        info!(
            target: "fleet.binding",
            operation_id = %operation_id,
            vehicle_id,
            device_id = %device_id,
            operator_id,
            "binding_bind_requested"
        );
        let _guard = self
            .locks
            .acquire(&[vehicle_lock_key(vehicle_id), device_lock_key(device_id)])
            .await;

        match self.resolve_state(vehicle_id, device_id, &operation_id).await? {
            BindingState::Conflict {
                side,
                conflicting_id,
            } => {
                record_bind_conflict();
                info!(
                    target: "fleet.binding",
                    operation_id = %operation_id,
                    vehicle_id,
                    device_id = %device_id,
                    side = %side,
                    conflicting_id = %conflicting_id,
                    "binding_bind_conflict"
                );
                return Err(conflict_error(side, vehicle_id, device_id, conflicting_id));
            }
            BindingState::SelfBound(record) => {
                record_bind_idempotent();
                self.write_cache_pair(vehicle_id, device_id, &operation_id).await;
                info!(
                    target: "fleet.binding",
                    operation_id = %operation_id,
                    vehicle_id,
                    device_id = %device_id,
                    binding_id = record.binding_id,
                    "binding_bind_idempotent"
                );
                return Ok(BindOutcome {
                    record,
                    created: false,
                });
            }
            BindingState::Unbound => {}
        }

        let record = match self.store.upsert(vehicle_id, device_id, now_epoch_ms()).await {
            Ok(record) => record,
            Err(err) if err.is_conflict() => {
                // 进程外的并发写入抢先占用了车辆或设备
                warn!(
                    target: "fleet.binding",
                    operation_id = %operation_id,
                    vehicle_id,
                    device_id = %device_id,
                    error = %err,
                    "binding_upsert_conflict"
                );
                return self
                    .conflict_after_race(vehicle_id, device_id, &operation_id, err)
                    .await;
            }
            Err(err) => return Err(self.store_failure(err, &operation_id, "binding_upsert_failed")),
        };

        self.write_cache_pair(vehicle_id, device_id, &operation_id).await;
        if let Err(err) = self.counter.on_device_entered(operator_id, device_id).await {
            record_counter_failure();
            warn!(
                target: "fleet.binding",
                operation_id = %operation_id,
                operator_id,
                device_id = %device_id,
                error = %err,
                "binding_counter_enter_failed"
            );
        }
        record_bind_created();
        info!(
            target: "fleet.binding",
            operation_id = %operation_id,
            vehicle_id,
            device_id = %device_id,
            operator_id,
            binding_id = record.binding_id,
            "binding_bound"
        );
        Ok(BindOutcome {
            record,
            created: true,
        })
    }

    /// 解绑车辆与设备，返回是否真正解除了一条绑定。
    ///
    /// 二者并未互相绑定（任一方绑定了其他对象）时返回 `BindingError::Conflict`。
    pub async fn unbind(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
        operator_id: OperatorId,
    ) -> Result<bool, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        let device_id = validate_device_id(device_id)?;
        let operation_id = new_operation_id();
        info!(
            target: "fleet.binding",
            operation_id = %operation_id,
            vehicle_id,
            device_id = %device_id,
            operator_id,
            "binding_unbind_requested"
        );
        let _guard = self
            .locks
            .acquire(&[vehicle_lock_key(vehicle_id), device_lock_key(device_id)])
            .await;

        match self.resolve_state(vehicle_id, device_id, &operation_id).await? {
            BindingState::Unbound => {
                record_unbind_miss();
                info!(
                    target: "fleet.binding",
                    operation_id = %operation_id,
                    vehicle_id,
                    device_id = %device_id,
                    "binding_unbind_miss"
                );
                return Ok(false);
            }
            BindingState::Conflict {
                side,
                conflicting_id,
            } => {
                record_unbind_conflict();
                info!(
                    target: "fleet.binding",
                    operation_id = %operation_id,
                    vehicle_id,
                    device_id = %device_id,
                    side = %side,
                    conflicting_id = %conflicting_id,
                    "binding_unbind_conflict"
                );
                return Err(conflict_error(side, vehicle_id, device_id, conflicting_id));
            }
            BindingState::SelfBound(_) => {}
        }

        let removed = self
            .store
            .soft_delete_by_vehicle(vehicle_id, now_epoch_ms())
            .await
            .map_err(|err| self.store_failure(err, &operation_id, "binding_soft_delete_failed"))?;
        let Some(removed) = removed else {
            record_unbind_miss();
            info!(
                target: "fleet.binding",
                operation_id = %operation_id,
                vehicle_id,
                device_id = %device_id,
                "binding_unbind_miss"
            );
            return Ok(false);
        };

        if let Err(err) = self.index.remove_pair(vehicle_id, device_id).await {
            record_cache_write_failure();
            warn!(
                target: "fleet.binding",
                operation_id = %operation_id,
                vehicle_id,
                device_id = %device_id,
                error = %err,
                "binding_cache_remove_failed"
            );
        }
        if let Err(err) = self.counter.on_device_left(operator_id, device_id).await {
            record_counter_failure();
            warn!(
                target: "fleet.binding",
                operation_id = %operation_id,
                operator_id,
                device_id = %device_id,
                error = %err,
                "binding_counter_leave_failed"
            );
        }
        record_unbind();
        info!(
            target: "fleet.binding",
            operation_id = %operation_id,
            vehicle_id,
            device_id = %device_id,
            operator_id,
            binding_id = removed.binding_id,
            "binding_unbound"
        );
        Ok(true)
    }

    /// 缓存中车辆当前绑定的设备。
    pub async fn current_device(&self, vehicle_id: VehicleId) -> Result<Option<String>, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        Ok(self.index.device_of(vehicle_id).await?)
    }

    /// 缓存中设备当前绑定的车辆。
    pub async fn current_vehicle(&self, device_id: &str) -> Result<Option<VehicleId>, BindingError> {
        let device_id = validate_device_id(device_id)?;
        Ok(self.index.vehicle_of(device_id).await?)
    }

    /// 基于关系库判定 (车辆, 设备) 的绑定状态，不加锁。
    pub async fn resolve(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
    ) -> Result<BindingState, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        let device_id = validate_device_id(device_id)?;
        let operation_id = new_operation_id();
        self.resolve_state(vehicle_id, device_id, &operation_id).await
    }

    /// 按关系库重建车辆的缓存索引，返回权威的绑定设备。
    ///
    /// 除车辆 key 外还锁住缓存中记录的旧设备 key，清理旧设备条目时不会覆盖并发绑定的写入。
    /// 加锁后缓存中的设备发生变化则重新加锁。
    pub async fn refresh_cache(&self, vehicle_id: VehicleId) -> Result<Option<String>, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        let operation_id = new_operation_id();
        let mut cached = self.index.device_of(vehicle_id).await?;
        let _guard = loop {
            let mut keys = vec![vehicle_lock_key(vehicle_id)];
            if let Some(stale) = cached.as_deref() {
                keys.push(device_lock_key(stale));
            }
            let guard = self.locks.acquire(&keys).await;
            let current = self.index.device_of(vehicle_id).await?;
            if current == cached {
                break guard;
            }
            drop(guard);
            cached = current;
        };

        let active = self
            .store
            .find_active_by_vehicle(vehicle_id)
            .await
            .map_err(|err| self.store_failure(err, &operation_id, "binding_refresh_read_failed"))?;
        if let Some(stale) = cached.as_deref() {
            let still_bound = active
                .as_ref()
                .map(|record| record.device_id == stale)
                .unwrap_or(false);
            if !still_bound {
                self.index.remove_device_entry_if(stale, vehicle_id).await?;
            }
        }
        let device_id = match active {
            Some(record) => {
                self.index.put_pair(vehicle_id, &record.device_id).await?;
                Some(record.device_id)
            }
            None => {
                self.index.remove_vehicle_entry(vehicle_id).await?;
                None
            }
        };
        info!(
            target: "fleet.binding",
            operation_id = %operation_id,
            vehicle_id,
            cached_device = ?cached,
            device_id = ?device_id,
            "binding_cache_refreshed"
        );
        Ok(device_id)
    }

    /// 按设备 ID 尾号查找活跃绑定（读关系库）。
    pub async fn find_by_device_suffix(
        &self,
        suffix: &str,
    ) -> Result<Option<BindingRecord>, BindingError> {
        let suffix = suffix.trim();
        if suffix.is_empty() {
            return Err(BindingError::InvalidInput(
                "device id suffix is empty".to_string(),
            ));
        }
        self.store
            .find_active_by_device_suffix(suffix)
            .await
            .map_err(|err| {
                record_store_failure();
                BindingError::from(err)
            })
    }

    /// 按保留策略清理历史绑定，返回删除条数。
    pub async fn purge_history(&self) -> Result<u64, BindingError> {
        self.purge_history_at(now_epoch_ms()).await
    }

    /// 以 `now_ms` 为当前时间清理历史绑定。
    pub async fn purge_history_at(&self, now_ms: i64) -> Result<u64, BindingError> {
        let Some(cutoff_ms) = self.config.retention.cutoff_ms(now_ms) else {
            return Ok(0);
        };
        let operation_id = new_operation_id();
        let removed = self
            .store
            .purge_deleted_before(cutoff_ms)
            .await
            .map_err(|err| self.store_failure(err, &operation_id, "binding_purge_failed"))?;
        info!(
            target: "fleet.binding",
            operation_id = %operation_id,
            cutoff_ms,
            removed,
            "binding_history_purged"
        );
        Ok(removed)
    }

    async fn resolve_state(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
        operation_id: &str,
    ) -> Result<BindingState, BindingError> {
        self.resolver
            .resolve(vehicle_id, device_id)
            .await
            .map_err(|err| self.store_failure(err, operation_id, "binding_resolve_failed"))
    }

    async fn conflict_after_race(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
        operation_id: &str,
        upsert_err: StorageError,
    ) -> Result<BindOutcome, BindingError> {
        match self.resolve_state(vehicle_id, device_id, operation_id).await? {
            BindingState::Conflict {
                side,
                conflicting_id,
            } => {
                record_bind_conflict();
                Err(conflict_error(side, vehicle_id, device_id, conflicting_id))
            }
            BindingState::SelfBound(record) => {
                record_bind_idempotent();
                self.write_cache_pair(vehicle_id, device_id, operation_id).await;
                Ok(BindOutcome {
                    record,
                    created: false,
                })
            }
            BindingState::Unbound => Err(BindingError::from(upsert_err)),
        }
    }

    async fn write_cache_pair(&self, vehicle_id: VehicleId, device_id: &str, operation_id: &str) {
        if let Err(err) = self.index.put_pair(vehicle_id, device_id).await {
            record_cache_write_failure();
            warn!(
                target: "fleet.binding",
                operation_id = %operation_id,
                vehicle_id,
                device_id = %device_id,
                error = %err,
                "binding_cache_write_failed"
            );
        }
    }

    fn store_failure(&self, err: StorageError, operation_id: &str, event: &str) -> BindingError {
        record_store_failure();
        warn!(
            target: "fleet.binding",
            operation_id = %operation_id,
            stage = event,
            retryable = err.is_unavailable(),
            error = %err,
            "binding_store_failed"
        );
        BindingError::from(err)
    }
}

fn conflict_error(
    side: BindingSide,
    vehicle_id: VehicleId,
    device_id: &str,
    conflicting_id: String,
) -> BindingError {
    let id = match side {
        BindingSide::Vehicle => vehicle_id.to_string(),
        BindingSide::Device => device_id.to_string(),
    };
    BindingError::Conflict {
        side,
        id,
        conflicting_id,
    }
}

pub(crate) fn validate_vehicle_id(vehicle_id: VehicleId) -> Result<(), BindingError> {
    if vehicle_id <= 0 {
        return Err(BindingError::InvalidInput(format!(
            "invalid vehicle_id: {}",
            vehicle_id
        )));
    }
    Ok(())
}

pub(crate) fn validate_device_id(device_id: &str) -> Result<&str, BindingError> {
    normalize_device_id(device_id).map_err(|err| BindingError::InvalidInput(err.to_string()))
}

/// 当前时间（Unix 毫秒）。
pub fn now_epoch_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
