//! 绑定状态判定。
//!
//! 只读关系库（权威数据），不读缓存，避免基于过期缓存做出变更决策。

use domain::{BindingSide, VehicleId};
use fleet_storage::{BindingRecord, BindingStore, StorageError};
use std::sync::Arc;

/// (车辆, 设备) 当前的绑定状态。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingState {
    /// 双方都没有活跃绑定。
    Unbound,
    /// 双方已互相绑定。
    SelfBound(BindingRecord),
    /// 至少一方绑定了其他对象。
    ///
    /// `side` 为车辆时 `conflicting_id` 是该车辆已绑定的设备；
    /// `side` 为设备时 `conflicting_id` 是该设备已绑定的车辆。
    Conflict {
        side: BindingSide,
        conflicting_id: String,
    },
}

#[derive(Clone)]
pub struct BindingResolver {
    store: Arc<dyn BindingStore>,
}

impl BindingResolver {
    pub fn new(store: Arc<dyn BindingStore>) -> Self {
        Self { store }
    }

    pub async fn resolve(
        &self,
        vehicle_id: VehicleId,
        device_id: &str,
    ) -> Result<BindingState, StorageError> {
        let by_vehicle = self.store.find_active_by_vehicle(vehicle_id).await?;
        let by_device = self.store.find_active_by_device(device_id).await?;
        Ok(classify(
            vehicle_id,
            device_id,
            by_vehicle.as_ref(),
            by_device.as_ref(),
        ))
    }
}

/// 根据两侧的活跃绑定判定状态。先检查车辆侧，再检查设备侧。
pub fn classify(
    vehicle_id: VehicleId,
    device_id: &str,
    by_vehicle: Option<&BindingRecord>,
    by_device: Option<&BindingRecord>,
) -> BindingState {
    match (by_vehicle, by_device) {
        (None, None) => return BindingState::Unbound,
        (Some(bound), Some(reverse))
            if bound.device_id == device_id && reverse.vehicle_id == vehicle_id =>
        {
            return BindingState::SelfBound(bound.clone());
        }
        _ => {}
    }
    if let Some(bound) = by_vehicle {
        if bound.device_id != device_id {
            return BindingState::Conflict {
                side: BindingSide::Vehicle,
                conflicting_id: bound.device_id.clone(),
            };
        }
    }
    if let Some(reverse) = by_device {
        if reverse.vehicle_id != vehicle_id {
            return BindingState::Conflict {
                side: BindingSide::Device,
                conflicting_id: reverse.vehicle_id.to_string(),
            };
        }
    }
    // 只有一侧指向对方：两张反查结果不一致，同样按冲突处理
    match (by_vehicle, by_device) {
        (Some(bound), _) => BindingState::Conflict {
            side: BindingSide::Vehicle,
            conflicting_id: bound.device_id.clone(),
        },
        (None, Some(reverse)) => BindingState::Conflict {
            side: BindingSide::Device,
            conflicting_id: reverse.vehicle_id.to_string(),
        },
        (None, None) => BindingState::Unbound,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(binding_id: i64, vehicle_id: VehicleId, device_id: &str) -> BindingRecord {
        BindingRecord {
            binding_id,
            vehicle_id,
            device_id: device_id.to_string(),
            created_at_ms: 0,
            deleted_at_ms: None,
        }
    }

    #[test]
    fn unbound_when_both_sides_free() {
        assert_eq!(classify(1, "d", None, None), BindingState::Unbound);
    }

    #[test]
    fn self_bound_when_mutual() {
        let bound = row(1, 1, "d");
        assert_eq!(
            classify(1, "d", Some(&bound), Some(&bound)),
            BindingState::SelfBound(bound.clone())
        );
    }

    #[test]
    fn vehicle_side_conflict_reports_bound_device() {
        let bound = row(1, 1, "other");
        assert_eq!(
            classify(1, "d", Some(&bound), None),
            BindingState::Conflict {
                side: BindingSide::Vehicle,
                conflicting_id: "other".to_string(),
            }
        );
    }

    #[test]
    fn device_side_conflict_reports_bound_vehicle() {
        let reverse = row(1, 100600001, "d");
        assert_eq!(
            classify(100600002, "d", None, Some(&reverse)),
            BindingState::Conflict {
                side: BindingSide::Device,
                conflicting_id: "100600001".to_string(),
            }
        );
    }

    #[test]
    fn vehicle_side_wins_when_both_conflict() {
        let bound = row(1, 1, "other-device");
        let reverse = row(2, 2, "d");
        assert_eq!(
            classify(1, "d", Some(&bound), Some(&reverse)),
            BindingState::Conflict {
                side: BindingSide::Vehicle,
                conflicting_id: "other-device".to_string(),
            }
        );
    }

    #[test]
    fn half_bound_pair_is_conflict() {
        let bound = row(1, 1, "d");
        assert_eq!(
            classify(1, "d", Some(&bound), None),
            BindingState::Conflict {
                side: BindingSide::Vehicle,
                conflicting_id: "d".to_string(),
            }
        );
        assert_eq!(
            classify(1, "d", None, Some(&bound)),
            BindingState::Conflict {
                side: BindingSide::Device,
                conflicting_id: "1".to_string(),
            }
        );
    }
}
