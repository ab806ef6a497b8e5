//! 电压方案缓存管理。
//!
//! 车辆行保存方案 ID，缓存保存方案快照（JSON）。
//! 读路径只读缓存；缓存缺失或快照损坏都视为"无方案"。

use crate::cache_index::CacheIndex;
use crate::error::BindingError;
use crate::locks::{KeyedLocks, vehicle_lock_key};
use crate::service::{validate_device_id, validate_vehicle_id};
use domain::{VehicleId, VoltageProgram};
use fleet_storage::{ProgramCatalog, VehicleStore};
use fleet_telemetry::{new_operation_id, record_cache_write_failure, record_store_failure};
use std::sync::Arc;
use tracing::{info, warn};

/// 方案分配结果。
#[derive(Debug, Clone, PartialEq)]
pub struct AssignOutcome {
    /// 车辆行是否存在并已更新。
    pub vehicle_updated: bool,
    /// 目录中找到的方案；未找到时为 None，缓存条目被清除。
    pub program: Option<VoltageProgram>,
}

pub struct VoltageProgramManager {
    vehicles: Arc<dyn VehicleStore>,
    catalog: Arc<dyn ProgramCatalog>,
    index: Arc<CacheIndex>,
    locks: Arc<KeyedLocks>,
}

impl VoltageProgramManager {
    pub fn new(
        vehicles: Arc<dyn VehicleStore>,
        catalog: Arc<dyn ProgramCatalog>,
        index: Arc<CacheIndex>,
        locks: Arc<KeyedLocks>,
    ) -> Self {
        Self {
            vehicles,
            catalog,
            index,
            locks,
        }
    }

    /// 为车辆分配电压方案。
    ///
    /// 车辆行按调用方给出的 `program_id` 写入（无论目录中是否存在）；
    /// 缓存只在车辆存在且方案存在时写入快照，否则删除。
    pub async fn assign(
        &self,
        vehicle_id: VehicleId,
        program_id: i64,
    ) -> Result<AssignOutcome, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        let operation_id = new_operation_id();
        let _guard = self.locks.acquire(&[vehicle_lock_key(vehicle_id)]).await;

        let program = self.catalog.find_program(program_id).await.map_err(|err| {
            record_store_failure();
            BindingError::from(err)
        })?;
        let vehicle_updated = self
            .vehicles
            .set_voltage_program(vehicle_id, Some(program_id))
            .await
            .map_err(|err| {
                record_store_failure();
                BindingError::from(err)
            })?;
        if !vehicle_updated {
            warn!(
                target: "fleet.binding",
                operation_id = %operation_id,
                vehicle_id,
                program_id,
                "program_vehicle_missing"
            );
        }
        let snapshot = if vehicle_updated { program.as_ref() } else { None };
        self.write_snapshot(vehicle_id, snapshot, &operation_id).await;
        info!(
            target: "fleet.binding",
            operation_id = %operation_id,
            vehicle_id,
            program_id,
            program_found = program.is_some(),
            vehicle_updated,
            "program_assigned"
        );
        Ok(AssignOutcome {
            vehicle_updated,
            program,
        })
    }

    /// 清除车辆的电压方案，返回是否命中车辆。
    pub async fn unassign(&self, vehicle_id: VehicleId) -> Result<bool, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        let operation_id = new_operation_id();
        let _guard = self.locks.acquire(&[vehicle_lock_key(vehicle_id)]).await;

        let vehicle_updated = self
            .vehicles
            .set_voltage_program(vehicle_id, None)
            .await
            .map_err(|err| {
                record_store_failure();
                BindingError::from(err)
            })?;
        self.write_snapshot(vehicle_id, None, &operation_id).await;
        info!(
            target: "fleet.binding",
            operation_id = %operation_id,
            vehicle_id,
            vehicle_updated,
            "program_unassigned"
        );
        Ok(vehicle_updated)
    }

    /// 方案定义变更后重写缓存快照，不修改车辆行。
    pub async fn sync_cache(
        &self,
        vehicle_id: VehicleId,
        program_id: i64,
    ) -> Result<Option<VoltageProgram>, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        let _guard = self.locks.acquire(&[vehicle_lock_key(vehicle_id)]).await;

        let program = self.catalog.find_program(program_id).await.map_err(|err| {
            record_store_failure();
            BindingError::from(err)
        })?;
        match &program {
            Some(program) => {
                let snapshot = program
                    .to_snapshot()
                    .map_err(|err| BindingError::Storage(err.to_string()))?;
                self.index.put_program(vehicle_id, &snapshot).await?;
            }
            None => self.index.remove_program(vehicle_id).await?,
        }
        Ok(program)
    }

    /// 缓存中车辆的电压方案。
    pub async fn lookup(&self, vehicle_id: VehicleId) -> Result<Option<VoltageProgram>, BindingError> {
        validate_vehicle_id(vehicle_id)?;
        let Some(snapshot) = self.index.program_snapshot(vehicle_id).await? else {
            return Ok(None);
        };
        match VoltageProgram::from_snapshot(&snapshot) {
            Ok(program) => Ok(Some(program)),
            Err(err) => {
                warn!(
                    target: "fleet.binding",
                    vehicle_id,
                    error = %err,
                    "program_snapshot_corrupt"
                );
                Ok(None)
            }
        }
    }

    /// 经设备→车辆缓存索引查找电压方案。
    pub async fn lookup_by_device(
        &self,
        device_id: &str,
    ) -> Result<Option<VoltageProgram>, BindingError> {
        let device_id = validate_device_id(device_id)?;
        match self.index.vehicle_of(device_id).await? {
            Some(vehicle_id) => self.lookup(vehicle_id).await,
            None => Ok(None),
        }
    }

    async fn write_snapshot(
        &self,
        vehicle_id: VehicleId,
        program: Option<&VoltageProgram>,
        operation_id: &str,
    ) {
        let result = match program {
            Some(program) => match program.to_snapshot() {
                Ok(snapshot) => self.index.put_program(vehicle_id, &snapshot).await,
                Err(err) => Err(fleet_storage::StorageError::new(err.to_string())),
            },
            None => self.index.remove_program(vehicle_id).await,
        };
        if let Err(err) = result {
            record_cache_write_failure();
            warn!(
                target: "fleet.binding",
                operation_id = %operation_id,
                vehicle_id,
                error = %err,
                "program_cache_write_failed"
            );
        }
    }
}
