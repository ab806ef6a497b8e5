//! 按 key 的异步互斥锁。
//!
//! 绑定/解绑全流程（判定 → 写库 → 写缓存 → 计数）在车辆 key 与设备 key 上串行执行。
//! 多个 key 按字典序加锁，避免交叉等待；释放后无人引用的条目从锁表移除。

use domain::VehicleId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

pub fn vehicle_lock_key(vehicle_id: VehicleId) -> String {
    format!("vehicle:{}", vehicle_id)
}

pub fn device_lock_key(device_id: &str) -> String {
    format!("device:{}", device_id)
}

#[derive(Default)]
pub struct KeyedLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// 持有期间对应 key 保持锁定。
pub struct KeyedGuard<'a> {
    locks: &'a KeyedLocks,
    keys: Vec<String>,
    guards: Vec<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, keys: &[String]) -> KeyedGuard<'_> {
        let mut keys = keys.to_vec();
        keys.sort();
        keys.dedup();
        let mut guards = Vec::with_capacity(keys.len());
        for key in &keys {
            let mutex = self.entry(key);
            guards.push(mutex.lock_owned().await);
        }
        KeyedGuard {
            locks: self,
            keys,
            guards,
        }
    }

    /// 锁表中的条目数（用于测试）。
    pub fn len(&self) -> usize {
        self.table.lock().map(|table| table.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut table = self
            .table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        table
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }
}

impl Drop for KeyedGuard<'_> {
    fn drop(&mut self) {
        self.guards.clear();
        let mut table = self
            .locks
            .table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for key in &self.keys {
            let unused = table
                .get(key)
                .map(|mutex| Arc::strong_count(mutex) == 1)
                .unwrap_or(false);
            if unused {
                table.remove(key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn table_is_pruned_after_release() {
        let locks = KeyedLocks::new();
        {
            let _guard = locks
                .acquire(&[vehicle_lock_key(1), device_lock_key("d")])
                .await;
            assert_eq!(locks.len(), 2);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn duplicate_keys_do_not_deadlock() {
        let locks = KeyedLocks::new();
        let key = vehicle_lock_key(1);
        let _guard = locks.acquire(&[key.clone(), key]).await;
        assert_eq!(locks.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn same_key_is_serialized() {
        let locks = Arc::new(KeyedLocks::new());
        let active = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let active = active.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(&[device_lock_key("d")]).await;
                let now = active.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
                active.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.expect("join");
        }
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }
}
