//! 绑定引擎错误类型。

use domain::BindingSide;
use fleet_storage::StorageError;

/// 绑定引擎错误。
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    /// 车辆或设备已被其他对象绑定（需先解绑冲突一侧）。
    #[error("{side} {id} is already bound to {conflicting_id}")]
    Conflict {
        side: BindingSide,
        id: String,
        conflicting_id: String,
    },
    /// 关系库或缓存不可达，可重试。
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl BindingError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, BindingError::StoreUnavailable(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, BindingError::Conflict { .. })
    }
}

impl From<StorageError> for BindingError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Unavailable(message) => BindingError::StoreUnavailable(message),
            other => BindingError::Storage(other.to_string()),
        }
    }
}
