//! 应用运行配置加载。

use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required env: {0}")]
    Missing(String),
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// 历史绑定记录（软删除行）的保留策略。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetentionPolicy {
    /// 永久保留。
    Indefinite,
    /// 解绑超过 N 天的记录可被物理删除。
    Days(u64),
}

impl RetentionPolicy {
    /// 计算清理截止时间（毫秒），永久保留时返回 None。
    pub fn cutoff_ms(&self, now_ms: i64) -> Option<i64> {
        match self {
            RetentionPolicy::Indefinite => None,
            RetentionPolicy::Days(days) => {
                let span = i64::try_from(days.saturating_mul(86_400_000)).unwrap_or(i64::MAX);
                Some(now_ms.saturating_sub(span))
            }
        }
    }
}

/// 缓存 key 前缀。
///
/// 默认值与线上已有读取方使用的 key 保持一致。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyConfig {
    pub vehicle_device_prefix: String,
    pub device_vehicle_prefix: String,
    pub vehicle_program_prefix: String,
    pub device_operator_prefix: String,
    pub operator_count_prefix: String,
}

impl Default for CacheKeyConfig {
    fn default() -> Self {
        Self {
            vehicle_device_prefix: "carImeiBindings_".to_string(),
            device_vehicle_prefix: "imeiCarBindings_".to_string(),
            vehicle_program_prefix: "xc_battery_Name_".to_string(),
            device_operator_prefix: "imeiAgentBinding_".to_string(),
            operator_count_prefix: "agentDeviceCount_".to_string(),
        }
    }
}

/// 应用运行配置。
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub redis_url: String,
    pub pg_max_connections: u32,
    pub retention: RetentionPolicy,
    pub cache_keys: CacheKeyConfig,
}

impl AppConfig {
    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// 从任意 key/value 来源读取配置（测试时可注入固定来源）。
    pub fn from_source<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("FLEET_DATABASE_URL")
            .filter(|value| !value.is_empty())
            .ok_or_else(|| ConfigError::Missing("FLEET_DATABASE_URL".to_string()))?;
        let redis_url = lookup("FLEET_REDIS_URL")
            .unwrap_or_else(|| "redis://127.0.0.1:6379".to_string());
        let pg_max_connections = read_u32_with_default(&lookup, "FLEET_PG_MAX_CONNECTIONS", 8)?;
        if pg_max_connections == 0 {
            return Err(ConfigError::Invalid(
                "FLEET_PG_MAX_CONNECTIONS".to_string(),
                "0".to_string(),
            ));
        }
        let retention = match read_optional_u64(&lookup, "FLEET_BINDING_RETENTION_DAYS")? {
            Some(days) if days > 0 => RetentionPolicy::Days(days),
            _ => RetentionPolicy::Indefinite,
        };

        let defaults = CacheKeyConfig::default();
        let cache_keys = CacheKeyConfig {
            vehicle_device_prefix: read_prefix(
                &lookup,
                "FLEET_CACHE_VEHICLE_DEVICE_PREFIX",
                defaults.vehicle_device_prefix,
            ),
            device_vehicle_prefix: read_prefix(
                &lookup,
                "FLEET_CACHE_DEVICE_VEHICLE_PREFIX",
                defaults.device_vehicle_prefix,
            ),
            vehicle_program_prefix: read_prefix(
                &lookup,
                "FLEET_CACHE_VEHICLE_PROGRAM_PREFIX",
                defaults.vehicle_program_prefix,
            ),
            device_operator_prefix: read_prefix(
                &lookup,
                "FLEET_COUNTER_DEVICE_OPERATOR_PREFIX",
                defaults.device_operator_prefix,
            ),
            operator_count_prefix: read_prefix(
                &lookup,
                "FLEET_COUNTER_OPERATOR_COUNT_PREFIX",
                defaults.operator_count_prefix,
            ),
        };
        if cache_keys.vehicle_device_prefix == cache_keys.device_vehicle_prefix {
            return Err(ConfigError::Invalid(
                "FLEET_CACHE_DEVICE_VEHICLE_PREFIX".to_string(),
                cache_keys.device_vehicle_prefix,
            ));
        }

        Ok(Self {
            database_url,
            redis_url,
            pg_max_connections,
            retention,
            cache_keys,
        })
    }
}

fn read_u32_with_default<F>(lookup: &F, key: &str, default: u32) -> Result<u32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let value = match lookup(key) {
        Some(value) if !value.is_empty() => value,
        _ => return Ok(default),
    };
    value
        .parse::<u32>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if value.is_empty() => Ok(None),
        Some(value) => value
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::Invalid(key.to_string(), value)),
        None => Ok(None),
    }
}

fn read_prefix<F>(lookup: &F, key: &str, default: String) -> String
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(value) if !value.is_empty() => value,
        _ => default,
    }
}
