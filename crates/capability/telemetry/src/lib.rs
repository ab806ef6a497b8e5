//! 追踪初始化、操作 ID 生成与绑定指标。

use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing_subscriber::{EnvFilter, fmt};

/// 绑定指标快照。
#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsSnapshot {
    pub binds_created: u64,
    pub binds_idempotent: u64,
    pub bind_conflicts: u64,
    pub unbinds: u64,
    pub unbind_misses: u64,
    pub unbind_conflicts: u64,
    pub cache_write_failures: u64,
    pub counter_failures: u64,
    pub store_failures: u64,
}

/// 绑定指标（进程级计数）。
pub struct TelemetryMetrics {
    binds_created: AtomicU64,
    binds_idempotent: AtomicU64,
    bind_conflicts: AtomicU64,
    unbinds: AtomicU64,
    unbind_misses: AtomicU64,
    unbind_conflicts: AtomicU64,
    cache_write_failures: AtomicU64,
    counter_failures: AtomicU64,
    store_failures: AtomicU64,
}

impl TelemetryMetrics {
    pub fn new() -> Self {
        Self {
            binds_created: AtomicU64::new(0),
            binds_idempotent: AtomicU64::new(0),
            bind_conflicts: AtomicU64::new(0),
            unbinds: AtomicU64::new(0),
            unbind_misses: AtomicU64::new(0),
            unbind_conflicts: AtomicU64::new(0),
            cache_write_failures: AtomicU64::new(0),
            counter_failures: AtomicU64::new(0),
            store_failures: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            binds_created: self.binds_created.load(Ordering::Relaxed),
            binds_idempotent: self.binds_idempotent.load(Ordering::Relaxed),
            bind_conflicts: self.bind_conflicts.load(Ordering::Relaxed),
            unbinds: self.unbinds.load(Ordering::Relaxed),
            unbind_misses: self.unbind_misses.load(Ordering::Relaxed),
            unbind_conflicts: self.unbind_conflicts.load(Ordering::Relaxed),
            cache_write_failures: self.cache_write_failures.load(Ordering::Relaxed),
            counter_failures: self.counter_failures.load(Ordering::Relaxed),
            store_failures: self.store_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for TelemetryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

static METRICS: OnceLock<TelemetryMetrics> = OnceLock::new();

/// 获取全局指标实例。
pub fn metrics() -> &'static TelemetryMetrics {
    METRICS.get_or_init(TelemetryMetrics::new)
}

/// 初始化 tracing（默认 info）。
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).try_init();
}

/// 生成绑定/解绑操作 ID，用于串联同一次操作的日志。
pub fn new_operation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// 记录新建绑定次数。
pub fn record_bind_created() {
    metrics().binds_created.fetch_add(1, Ordering::Relaxed);
}

/// 记录幂等绑定（已互相绑定）次数。
pub fn record_bind_idempotent() {
    metrics().binds_idempotent.fetch_add(1, Ordering::Relaxed);
}

/// 记录绑定冲突次数。
pub fn record_bind_conflict() {
    metrics().bind_conflicts.fetch_add(1, Ordering::Relaxed);
}

/// 记录解绑成功次数。
pub fn record_unbind() {
    metrics().unbinds.fetch_add(1, Ordering::Relaxed);
}

/// 记录解绑未命中（无可解绑记录）次数。
pub fn record_unbind_miss() {
    metrics().unbind_misses.fetch_add(1, Ordering::Relaxed);
}

/// 记录解绑冲突（车辆与设备并未互相绑定）次数。
pub fn record_unbind_conflict() {
    metrics().unbind_conflicts.fetch_add(1, Ordering::Relaxed);
}

/// 记录缓存写入失败次数（关系库已成功）。
pub fn record_cache_write_failure() {
    metrics()
        .cache_write_failures
        .fetch_add(1, Ordering::Relaxed);
}

/// 记录运营方计数通知失败次数。
pub fn record_counter_failure() {
    metrics().counter_failures.fetch_add(1, Ordering::Relaxed);
}

/// 记录关系库操作失败次数。
pub fn record_store_failure() {
    metrics().store_failures.fetch_add(1, Ordering::Relaxed);
}
