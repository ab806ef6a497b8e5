//! 内存存储实现模块
//!
//! 用于单元测试、集成测试和本地演示。
//!
//! 包含以下实现：
//! - BindingStore: InMemoryBindingStore
//! - VehicleStore: InMemoryVehicleStore
//! - ProgramCatalog: InMemoryProgramCatalog
//! - CacheStore: InMemoryCacheStore

pub mod binding;
pub mod cache;
pub mod program;
pub mod vehicle;

pub use binding::*;
pub use cache::*;
pub use program::*;
pub use vehicle::*;
