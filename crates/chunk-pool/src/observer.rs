use crate::pool::PoolUsage;

/// 用量事件的严重程度。
///
/// - `Routine`：常规租借、归还、分配，仅用于运行可见性；
/// - `Elevated`：有界池溢出分配或溢出丢弃，提示持续的内存压力。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Severity {
    Routine,
    Elevated,
}

/// 用量事件的类别。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PoolEventKind {
    /// 有界池完成预分配。
    Initialized,
    /// 回收池新分配了一块缓冲。
    Allocated,
    /// 缓冲被租借出池。
    Acquired,
    /// 缓冲回到空闲集合。
    Released,
    /// 共享缓冲的引用计数发生变化（增或减但未归零）。
    Referenced,
    /// 有界池空闲耗尽，铸造了池外溢出缓冲。
    Overflow,
    /// 有界池空闲集合已满，归还的缓冲被丢弃。
    Discarded,
}

/// 单条用量事件。
///
/// # 契约说明（What）
/// - `buffer_id`：事件涉及的缓冲标识，`Initialized` 为 `None`；
/// - `refs`：引用计数变化后的值，仅回收池的 `Referenced`/`Released` 事件携带；
/// - `usage`：事件发生后读取的用量快照，并发下只保证最终一致。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PoolEvent {
    pub kind: PoolEventKind,
    pub severity: Severity,
    pub buffer_id: Option<u64>,
    pub refs: Option<isize>,
    pub usage: PoolUsage,
}

impl PoolEvent {
    pub(crate) fn routine(kind: PoolEventKind, buffer_id: Option<u64>, usage: PoolUsage) -> Self {
        Self {
            kind,
            severity: Severity::Routine,
            buffer_id,
            refs: None,
            usage,
        }
    }

    pub(crate) fn elevated(kind: PoolEventKind, buffer_id: Option<u64>, usage: PoolUsage) -> Self {
        Self {
            kind,
            severity: Severity::Elevated,
            buffer_id,
            refs: None,
            usage,
        }
    }

    pub(crate) fn with_refs(mut self, refs: isize) -> Self {
        self.refs = Some(refs);
        self
    }
}

/// 缓冲池诊断观察者。
///
/// # 设计背景（Why）
/// - 用量日志只服务于运维可见性，不应把具体日志后端硬编码进池实现；
/// - 测试需要能够录制事件序列，断言溢出/丢弃等降级路径确实发生。
///
/// # 契约说明（What）
/// - 实现必须线程安全且不得阻塞：事件在租借/归还的热路径上同步发出；
/// - 观察者的存在与否、实现为何，都不得改变池的行为。
pub trait PoolObserver: Send + Sync + 'static {
    fn on_event(&self, event: &PoolEvent);
}

/// 丢弃全部事件的观察者，适用于基准测试与模型检查。
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl PoolObserver for NoopObserver {
    fn on_event(&self, _event: &PoolEvent) {}
}

/// 默认观察者：把用量事件写入 `tracing`。
///
/// # 级别映射（How）
/// - `Elevated` → `warn!`，溢出分配与溢出丢弃需要在默认日志级别下可见；
/// - `Referenced` → `trace!`，引用计数变化频率高，仅在排查共享问题时打开；
/// - 其余常规事件 → `debug!`。
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl PoolObserver for TracingObserver {
    fn on_event(&self, event: &PoolEvent) {
        let PoolUsage {
            allocated,
            in_use,
            idle,
            ..
        } = event.usage;
        match (event.severity, event.kind) {
            (Severity::Elevated, kind) => tracing::warn!(
                target: "chunk_pool",
                ?kind,
                buffer_id = event.buffer_id,
                in_use,
                allocated,
                idle,
                "buffer pool usage {in_use} / {allocated} ({kind:?})"
            ),
            (Severity::Routine, PoolEventKind::Referenced) => tracing::trace!(
                target: "chunk_pool",
                buffer_id = event.buffer_id,
                refs = event.refs,
                "buffer references changed"
            ),
            (Severity::Routine, kind) => tracing::debug!(
                target: "chunk_pool",
                ?kind,
                buffer_id = event.buffer_id,
                refs = event.refs,
                in_use,
                allocated,
                idle,
                "buffer pool usage {in_use} / {allocated} ({kind:?})"
            ),
        }
    }
}


#[cfg(test)]
mod tests {
    use tracing_test::traced_test;

    use super::*;

    fn usage() -> PoolUsage {
        PoolUsage {
            allocated: 3,
            in_use: 3,
            idle: 0,
            overflow_allocations: 1,
            discarded: 0,
        }
    }

    #[test]
    #[traced_test]
    fn elevated_events_are_logged_as_warnings() {
        TracingObserver.on_event(&PoolEvent::elevated(
            PoolEventKind::Overflow,
            Some(4),
            usage(),
        ));
        assert!(logs_contain("WARN"));
        assert!(logs_contain("buffer pool usage 3 / 3 (Overflow)"));
    }

    #[test]
    #[traced_test]
    fn routine_events_are_logged_at_debug() {
        TracingObserver.on_event(&PoolEvent::routine(
            PoolEventKind::Acquired,
            Some(1),
            usage(),
        ));
        assert!(logs_contain("DEBUG"));
        assert!(logs_contain("(Acquired)"));
        assert!(!logs_contain("WARN"));
    }
}
