//! 数据模型
//!
//! - 绑定模型：BindingRecord（车辆-设备绑定行，支持软删除）
//! - 车辆模型：VehicleRecord（车辆出库信息）

use domain::VehicleId;

/// 车辆-设备绑定记录。
///
/// `deleted_at_ms` 为空表示活跃绑定；解绑时只写入删除时间，不物理删除。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingRecord {
    pub binding_id: i64,
    pub vehicle_id: VehicleId,
    pub device_id: String,
    pub created_at_ms: i64,
    pub deleted_at_ms: Option<i64>,
}

impl BindingRecord {
    pub fn is_active(&self) -> bool {
        self.deleted_at_ms.is_none()
    }
}

/// 车辆出库信息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VehicleRecord {
    pub vehicle_id: VehicleId,
    /// 车牌号（唯一）。
    pub car_no: String,
    pub brand: String,
    pub model: String,
    /// 投放区域。
    pub area: String,
    pub voltage_program_id: Option<i64>,
    /// 是否配置了头盔。
    pub has_helmet: bool,
    /// 资方代码。
    pub investor: String,
}
