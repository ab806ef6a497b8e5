//! # Fleet Binding 模块
//!
//! 车辆与设备（IMEI）一对一绑定的一致性引擎。
//!
//! - `resolver`：基于关系库判定绑定状态（未绑定 / 已互相绑定 / 冲突）
//! - `service`：绑定/解绑编排，按 key 加锁后依次写关系库、缓存、计数
//! - `cache_index`：车辆↔设备反查缓存与电压方案快照
//! - `counter`：运营方设备计数协作方
//! - `program`：电压方案分配与缓存读取
//! - `bootstrap`：按配置组装引擎
//!
//! 关系库是唯一权威来源。缓存写失败不会让绑定失败，可用 `refresh_cache` 修复。

pub mod bootstrap;
pub mod cache_index;
pub mod counter;
pub mod error;
pub mod locks;
pub mod program;
pub mod resolver;
pub mod service;

pub use bootstrap::{EngineParts, FleetEngine};
pub use cache_index::CacheIndex;
pub use counter::{DeviceCounter, InMemoryDeviceCounter, NoopDeviceCounter, RedisDeviceCounter};
pub use error::BindingError;
pub use locks::{KeyedGuard, KeyedLocks, device_lock_key, vehicle_lock_key};
pub use program::{AssignOutcome, VoltageProgramManager};
pub use resolver::{BindingResolver, BindingState, classify};
pub use service::{BindOutcome, BindingService, BindingServiceConfig, now_epoch_ms};
