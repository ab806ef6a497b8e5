//! 引擎组装：显式注入存储、缓存、计数与方案目录。

use crate::cache_index::CacheIndex;
use crate::counter::{DeviceCounter, RedisDeviceCounter};
use crate::error::BindingError;
use crate::locks::KeyedLocks;
use crate::program::VoltageProgramManager;
use crate::service::{BindingService, BindingServiceConfig};
use fleet_config::{AppConfig, CacheKeyConfig, RetentionPolicy};
use fleet_storage::{
    BindingStore, CacheStore, PgBindingStore, PgProgramCatalog, PgVehicleStore, ProgramCatalog,
    RedisCacheStore, VehicleStore, connect_pool,
};
use std::sync::Arc;
use tracing::info;

/// 引擎依赖的全部协作方。
pub struct EngineParts {
    pub bindings: Arc<dyn BindingStore>,
    pub vehicles: Arc<dyn VehicleStore>,
    pub catalog: Arc<dyn ProgramCatalog>,
    pub cache: Arc<dyn CacheStore>,
    pub counter: Arc<dyn DeviceCounter>,
}

/// 绑定服务与电压方案管理共用同一张锁表和缓存索引。
pub struct FleetEngine {
    pub bindings: BindingService,
    pub programs: VoltageProgramManager,
}

impl FleetEngine {
    pub fn assemble(
        parts: EngineParts,
        cache_keys: CacheKeyConfig,
        retention: RetentionPolicy,
    ) -> Self {
        let index = Arc::new(CacheIndex::new(parts.cache, cache_keys));
        let locks = Arc::new(KeyedLocks::new());
        let bindings = BindingService::new_with_config(
            parts.bindings,
            index.clone(),
            parts.counter,
            locks.clone(),
            BindingServiceConfig { retention },
        );
        let programs = VoltageProgramManager::new(parts.vehicles, parts.catalog, index, locks);
        Self { bindings, programs }
    }

    /// 按配置连接 Postgres 与 Redis 并组装引擎。
    pub async fn connect(config: &AppConfig) -> Result<Self, BindingError> {
        let pool = connect_pool(&config.database_url, config.pg_max_connections).await?;
        let cache = RedisCacheStore::connect(&config.redis_url)?;
        let counter = RedisDeviceCounter::connect(&config.redis_url, &config.cache_keys)?;
        info!(
            target: "fleet.binding",
            pg_max_connections = config.pg_max_connections,
            retention = ?config.retention,
            "engine_connected"
        );
        let parts = EngineParts {
            bindings: Arc::new(PgBindingStore::new(pool.clone())),
            vehicles: Arc::new(PgVehicleStore::new(pool.clone())),
            catalog: Arc::new(PgProgramCatalog::new(pool)),
            cache: Arc::new(cache),
            counter: Arc::new(counter),
        };
        Ok(Self::assemble(
            parts,
            config.cache_keys.clone(),
            config.retention,
        ))
    }
}
