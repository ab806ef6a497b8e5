//! # PostgreSQL 存储实现模块
//!
//! 本模块提供绑定、车辆、电压方案目录的 PostgreSQL 实现，用于生产环境。
//!
//! ## 设计原则
//!
//! 1. **参数化查询**：所有 SQL 使用参数绑定（`$1`, `$2` …），禁止拼接
//! 2. **软删除**：解绑只写入 `deleted_at_ms`，历史行按保留策略清理
//! 3. **唯一性兜底**：活跃行上的部分唯一索引是跨进程并发绑定的最后防线
//!
//! ## 数据库模式要求
//!
//! ```sql
//! create table vehicle_device_bindings (
//!     binding_id     bigserial primary key,
//!     vehicle_id     bigint      not null,
//!     device_id      varchar(32) not null,
//!     created_at_ms  bigint      not null,
//!     deleted_at_ms  bigint
//! );
//! create unique index uniq_bindings_active_vehicle
//!     on vehicle_device_bindings (vehicle_id) where deleted_at_ms is null;
//! create unique index uniq_bindings_active_device
//!     on vehicle_device_bindings (device_id) where deleted_at_ms is null;
//! create index idx_bindings_deleted_at
//!     on vehicle_device_bindings (deleted_at_ms) where deleted_at_ms is not null;
//!
//! create table vehicles (
//!     vehicle_id          bigint primary key,
//!     car_no              varchar(16) not null unique,
//!     brand               varchar(16) not null default '',
//!     model               varchar(16) not null default '',
//!     area                varchar(32) not null default '',
//!     voltage_program_id  bigint,
//!     has_helmet          boolean not null default false,
//!     investor            varchar(32) not null default ''
//! );
//!
//! create table voltage_programs (
//!     program_id  bigint primary key,
//!     name        text not null,
//!     config      text not null default '{}'
//! );
//! ```
//!
//! 建表由外部迁移流程负责，本模块不执行 DDL。
//!
//! ## 错误处理
//!
//! - 唯一约束冲突（SQLSTATE 23505）映射为 `StorageError::Conflict`
//! - 连接/IO/连接池超时映射为 `StorageError::Unavailable`（可重试）
//! - 返回 `Option<T>` 表示"可能不存在"

pub mod binding;
pub mod program;
pub mod vehicle;

pub use binding::*;
pub use program::*;
pub use vehicle::*;
