//! 同步原语的统一入口。
//
// 教案级说明：Loom 模型检查需要接管原子类型与互斥锁才能枚举调度交错，
// 因此在 `--cfg loom` + `loom-model` Feature 下切换到 Loom 实现；常规构建保持
// `core` 原子与 `spin::Mutex`。`Arc`/`Weak` 维持标准实现，回收池依赖 `Weak` 回指。

#[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
pub(crate) use core::sync::atomic::{AtomicIsize, AtomicU64, AtomicUsize, Ordering};
#[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
pub(crate) use loom::sync::atomic::{AtomicIsize, AtomicU64, AtomicUsize, Ordering};

/// 空闲链表使用的互斥锁，屏蔽 `spin` 与 Loom 在 `lock` 签名上的差异。
pub(crate) struct Mutex<T> {
    #[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
    inner: spin::Mutex<T>,
    #[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
    inner: loom::sync::Mutex<T>,
}

impl<T> Mutex<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            #[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
            inner: spin::Mutex::new(value),
            #[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
            inner: loom::sync::Mutex::new(value),
        }
    }

    /// 在临界区内执行 `f`；临界区只做 O(1) 的链表操作，等待时间有界。
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut T) -> R) -> R {
        #[cfg(not(all(feature = "loom-model", any(loom, spark_loom))))]
        let mut guard = self.inner.lock();
        #[cfg(all(feature = "loom-model", any(loom, spark_loom)))]
        let mut guard = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        f(&mut guard)
    }
}
