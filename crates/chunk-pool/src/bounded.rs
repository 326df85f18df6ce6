use std::{
    io::{self, Read},
    ops::{Deref, DerefMut},
    sync::Arc,
};

use bytes::BytesMut;
use crossbeam_queue::ArrayQueue;

use crate::{
    fill::fill_from,
    observer::{PoolEvent, PoolEventKind, PoolObserver, TracingObserver},
    pool::{BufferPool, PoolUsage},
    sync::{AtomicU64, AtomicUsize, Ordering},
};

/// `BoundedPool` 在构造时一次性预分配固定数量的缓冲，租借与归还均不阻塞。
///
/// # 模块角色（Why）
/// - 为内存上限敏感的宿主提供稳定的常驻占用：稳态下只有 `capacity` 块缓冲在流转；
/// - 压力超出容量时宁可临时多分配，也不让读取线程停下来等缓冲。
///
/// # 核心机制（How）
/// - 空闲集合为 `crossbeam_queue::ArrayQueue`，`pop`/`push` 都是立即返回的无锁尝试；
/// - 空闲耗尽时铸造池外的溢出缓冲并以 `Elevated` 级别上报；
/// - 归还时先把长度恢复为配置值，空闲集合已满（溢出缓冲回流所致）则直接丢弃，同样以 `Elevated` 上报。
///
/// # 契约说明（What）
/// - **前置条件**：`capacity >= 2`，否则构造即 `panic`；需要可恢复校验时走 [`PoolConfig`](crate::PoolConfig)；
/// - **后置条件**：构造完成后恰有 `capacity` 块空闲缓冲；任何操作都不会让调用方等待。
///
/// # 设计权衡（Trade-offs）
/// - 用“可能多分配 / 可能多丢弃”换取非阻塞，容量只是稳态目标而非硬上限。
#[derive(Clone)]
pub struct BoundedPool {
    inner: Arc<BoundedInner>,
}

struct BoundedInner {
    buffer_len: usize,
    capacity: usize,
    idle: ArrayQueue<FixedBuffer>,
    next_id: AtomicU64,
    overflow_allocations: AtomicUsize,
    discarded: AtomicUsize,
    observer: Arc<dyn PoolObserver>,
}

impl BoundedPool {
    /// 创建有界池，用量事件写入 `tracing`。
    ///
    /// # Panics
    /// `capacity` 小于 2 时 `panic`。
    pub fn new(capacity: usize, buffer_len: usize) -> Self {
        Self::with_observer(capacity, buffer_len, Arc::new(TracingObserver))
    }

    /// # Panics
    /// `capacity` 小于 2 时 `panic`。
    pub fn with_observer(
        capacity: usize,
        buffer_len: usize,
        observer: Arc<dyn PoolObserver>,
    ) -> Self {
        if capacity <= 1 {
            panic!("invalid bounded buffer pool capacity {capacity}: at least 2 slots are required");
        }
        let inner = BoundedInner {
            buffer_len,
            capacity,
            idle: ArrayQueue::new(capacity),
            next_id: AtomicU64::new(0),
            overflow_allocations: AtomicUsize::new(0),
            discarded: AtomicUsize::new(0),
            observer,
        };
        for _ in 0..capacity {
            // 队列容量与预分配数量相同，push 不会失败。
            let _ = inner.idle.push(inner.mint());
        }
        inner.emit(PoolEvent::routine(
            PoolEventKind::Initialized,
            None,
            inner.usage(),
        ));
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}

impl BufferPool for BoundedPool {
    type Buffer = FixedBuffer;

    fn acquire(&self) -> FixedBuffer {
        let inner = &self.inner;
        match inner.idle.pop() {
            Some(buffer) => {
                inner.emit(PoolEvent::routine(
                    PoolEventKind::Acquired,
                    Some(buffer.id),
                    inner.usage(),
                ));
                buffer
            }
            None => {
                inner.overflow_allocations.fetch_add(1, Ordering::Relaxed);
                let buffer = inner.mint();
                inner.emit(PoolEvent::elevated(
                    PoolEventKind::Overflow,
                    Some(buffer.id),
                    inner.usage(),
                ));
                buffer
            }
        }
    }

    fn release(&self, mut buffer: FixedBuffer) {
        let inner = &self.inner;
        let id = buffer.id;
        buffer.restore(inner.buffer_len);
        match inner.idle.push(buffer) {
            Ok(()) => inner.emit(PoolEvent::routine(
                PoolEventKind::Released,
                Some(id),
                inner.usage(),
            )),
            Err(_discarded) => {
                inner.discarded.fetch_add(1, Ordering::Relaxed);
                inner.emit(PoolEvent::elevated(
                    PoolEventKind::Discarded,
                    Some(id),
                    inner.usage(),
                ));
            }
        }
    }

    fn usage(&self) -> PoolUsage {
        self.inner.usage()
    }

    fn buffer_len(&self) -> usize {
        self.inner.buffer_len
    }
}

impl BoundedInner {
    fn mint(&self) -> FixedBuffer {
        FixedBuffer {
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            bytes: BytesMut::zeroed(self.buffer_len),
        }
    }

    fn usage(&self) -> PoolUsage {
        let overflow_allocations = self.overflow_allocations.load(Ordering::Relaxed);
        let discarded = self.discarded.load(Ordering::Relaxed);
        let allocated = (self.capacity + overflow_allocations).saturating_sub(discarded);
        let idle = self.idle.len();
        PoolUsage {
            allocated,
            in_use: allocated.saturating_sub(idle),
            idle,
            overflow_allocations,
            discarded,
        }
    }

    fn emit(&self, event: PoolEvent) {
        self.observer.on_event(&event);
    }
}

/// 有界池租借出的独占缓冲。
///
/// 始终只有一个持有者，没有引用计数；调用方可以 [`truncate`](Self::truncate) 标记已用部分，
/// 归还时长度会被恢复为池的配置值，内容不做保证。
#[derive(Debug)]
pub struct FixedBuffer {
    id: u64,
    bytes: BytesMut,
}

impl FixedBuffer {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// 缩短可见长度；`len` 不小于当前长度时无效果。
    pub fn truncate(&mut self, len: usize) {
        self.bytes.truncate(len);
    }

    /// 从字节源填充当前可见区域，语义见 [`fill_from`](crate::fill_from)。
    pub fn fill_from<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<usize> {
        fill_from(&mut self.bytes, source)
    }

    fn restore(&mut self, len: usize) {
        self.bytes.resize(len, 0);
    }
}

impl Deref for FixedBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes
    }
}

impl DerefMut for FixedBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.bytes
    }
}
