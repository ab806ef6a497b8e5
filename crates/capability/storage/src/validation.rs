//! 验证辅助函数
//!
//! - ensure_vehicle_id：车辆 ID 必须为正数
//! - like_suffix_pattern：构造按尾号匹配的 LIKE 模式（转义通配符）

use crate::error::StorageError;
use domain::VehicleId;

/// 验证车辆 ID 为正数。
pub fn ensure_vehicle_id(vehicle_id: VehicleId) -> Result<(), StorageError> {
    if vehicle_id <= 0 {
        return Err(StorageError::new(format!("invalid vehicle_id: {}", vehicle_id)));
    }
    Ok(())
}

/// 构造 `%<suffix>` 模式，`%`、`_`、`\` 按字面匹配。
pub fn like_suffix_pattern(suffix: &str) -> String {
    let mut pattern = String::with_capacity(suffix.len() + 1);
    pattern.push('%');
    for ch in suffix.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern
}
