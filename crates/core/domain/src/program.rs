use serde::{Deserialize, Serialize};

/// 电压方案（车辆电池电压配置）。
///
/// 缓存中保存的是该结构的 JSON 快照，读取方按此结构反序列化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoltageProgram {
    pub program_id: i64,
    pub name: String,
    /// 方案参数（电压阈值等），原样透传。
    #[serde(default)]
    pub config: serde_json::Value,
}

impl VoltageProgram {
    pub fn new(program_id: i64, name: impl Into<String>, config: serde_json::Value) -> Self {
        Self {
            program_id,
            name: name.into(),
            config,
        }
    }

    /// 序列化为缓存快照。
    pub fn to_snapshot(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// 从缓存快照反序列化。
    pub fn from_snapshot(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}
