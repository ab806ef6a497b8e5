pub mod program;

pub use program::VoltageProgram;

/// 车辆内部 ID（车辆出库时分配，从 100600000 起递增）。
pub type VehicleId = i64;

/// 运营方（代理商）ID。
pub type OperatorId = i64;

/// 设备硬件 ID 最大长度（IMEI 列宽）。
pub const MAX_DEVICE_ID_LEN: usize = 32;

/// 绑定关系的一侧：车辆侧或设备侧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindingSide {
    Vehicle,
    Device,
}

impl BindingSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingSide::Vehicle => "vehicle",
            BindingSide::Device => "device",
        }
    }
}

impl std::fmt::Display for BindingSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 设备 ID 校验错误。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceIdError {
    Empty,
    TooLong(usize),
}

impl std::fmt::Display for DeviceIdError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceIdError::Empty => write!(f, "device id is empty"),
            DeviceIdError::TooLong(len) => write!(
                f,
                "device id length {} exceeds {}",
                len, MAX_DEVICE_ID_LEN
            ),
        }
    }
}

impl std::error::Error for DeviceIdError {}

/// 规范化设备 ID（去除首尾空白）并校验长度。
pub fn normalize_device_id(device_id: &str) -> Result<&str, DeviceIdError> {
    let trimmed = device_id.trim();
    if trimmed.is_empty() {
        return Err(DeviceIdError::Empty);
    }
    let len = trimmed.chars().count();
    if len > MAX_DEVICE_ID_LEN {
        return Err(DeviceIdError::TooLong(len));
    }
    Ok(trimmed)
}
