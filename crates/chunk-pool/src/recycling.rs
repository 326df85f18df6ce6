use std::{
    fmt,
    io::{self, Read},
    ops::{Deref, DerefMut},
    sync::{Arc, Weak},
};

use spin::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::{
    fill::fill_from,
    observer::{PoolEvent, PoolEventKind, PoolObserver, TracingObserver},
    pool::{BufferPool, PoolUsage},
    sync::{AtomicIsize, AtomicU64, AtomicUsize, Mutex, Ordering},
};

/// `RecyclingPool` 是无容量上限、按需分配的回收缓冲池。
///
/// # 模块角色（Why）
/// - 分块读取时同一块数据常被扇出给多个下游读者，缓冲只能在最后一个读者用完后复用；
/// - 通过显式的原子引用计数确定“最后一个持有者”，不依赖各读者的析构顺序。
///
/// # 核心机制（How）
/// - 空闲链表为 `Mutex<Vec<Arc<Slot>>>`，临界区仅做一次 `push`/`pop`，等待时间有界；
/// - 空闲链表为空时分配新缓冲，分配时引用计数为 0，`acquire` 以一次 CAS 将其从 0 置为 1 完成认领；
/// - 每块缓冲以 `Weak` 回指所属池，引用计数归零的那一次递减负责把缓冲放回空闲链表。
///
/// # 契约说明（What）
/// - **线程安全**：全部操作可被任意数量的线程并发调用，不会挂起调用方；
/// - **前置条件**：每份所有权恰好释放一次，释放次数多于持有次数会触发 `panic`；
/// - **后置条件**：缓冲位于空闲链表当且仅当其引用计数为 0；复用的缓冲内容不会被清零。
///
/// # 设计权衡（Trade-offs）
/// - 不设上限：持续高水位时池会保留峰值数量的缓冲，内存不会回落，换取租借路径上零阻塞；
/// - 持有句柄在未释放的情况下被丢弃，只会让这块缓冲退出复用，不影响其它缓冲的正确性。
#[derive(Clone)]
pub struct RecyclingPool {
    inner: Arc<PoolInner>,
}

impl RecyclingPool {
    /// 创建回收池，用量事件写入 `tracing`。
    pub fn new(buffer_len: usize) -> Self {
        Self::with_observer(buffer_len, Arc::new(TracingObserver))
    }

    pub fn with_observer(buffer_len: usize, observer: Arc<dyn PoolObserver>) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                buffer_len,
                idle: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                allocated: AtomicUsize::new(0),
                in_use: AtomicUsize::new(0),
                observer,
            }),
        }
    }

    fn allocate(&self) -> Arc<Slot> {
        let inner = &self.inner;
        let id = inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        inner.allocated.fetch_add(1, Ordering::Relaxed);
        inner.emit(PoolEvent::routine(
            PoolEventKind::Allocated,
            Some(id),
            inner.usage(),
        ));
        Arc::new(Slot {
            id,
            len: inner.buffer_len,
            refs: AtomicIsize::new(0),
            bytes: RwLock::new(vec![0u8; inner.buffer_len].into_boxed_slice()),
            pool: Arc::downgrade(inner),
        })
    }
}

impl BufferPool for RecyclingPool {
    type Buffer = SharedBuffer;

    fn acquire(&self) -> SharedBuffer {
        let slot = match self.inner.idle.with(|idle| idle.pop()) {
            Some(slot) => slot,
            None => self.allocate(),
        };
        if let Err(refs) = slot
            .refs
            .compare_exchange(0, 1, Ordering::AcqRel, Ordering::Acquire)
        {
            panic!(
                "buffer {} claimed from the idle list with {refs} live references",
                slot.id
            );
        }
        self.inner.in_use.fetch_add(1, Ordering::Relaxed);
        self.inner.emit(PoolEvent::routine(
            PoolEventKind::Acquired,
            Some(slot.id),
            self.inner.usage(),
        ));
        SharedBuffer { slot }
    }

    /// 释放调用方持有的一份引用，等价于 [`SharedBuffer::unref`]。
    fn release(&self, buffer: SharedBuffer) {
        buffer.unref();
    }

    fn usage(&self) -> PoolUsage {
        self.inner.usage()
    }

    fn buffer_len(&self) -> usize {
        self.inner.buffer_len
    }
}

struct PoolInner {
    buffer_len: usize,
    idle: Mutex<Vec<Arc<Slot>>>,
    next_id: AtomicU64,
    allocated: AtomicUsize,
    in_use: AtomicUsize,
    observer: Arc<dyn PoolObserver>,
}

impl PoolInner {
    fn usage(&self) -> PoolUsage {
        PoolUsage {
            allocated: self.allocated.load(Ordering::Relaxed),
            in_use: self.in_use.load(Ordering::Relaxed),
            idle: self.idle.with(|idle| idle.len()),
            overflow_allocations: 0,
            discarded: 0,
        }
    }

    fn emit(&self, event: PoolEvent) {
        self.observer.on_event(&event);
    }

    /// 引用计数归零后的唯一回收入口。
    fn recycle(&self, slot: Arc<Slot>) {
        let id = slot.id;
        // 每次回收都对应一次成功认领的 acquire，递减不会下溢。
        self.in_use.fetch_sub(1, Ordering::Relaxed);
        self.idle.with(|idle| idle.push(slot));
        self.emit(
            PoolEvent::routine(PoolEventKind::Released, Some(id), self.usage()).with_refs(0),
        );
    }
}

struct Slot {
    id: u64,
    len: usize,
    refs: AtomicIsize,
    bytes: RwLock<Box<[u8]>>,
    pool: Weak<PoolInner>,
}

/// 回收池租借出的共享缓冲句柄。
///
/// # 所有权模型（How）
/// - 所有权单位由内部原子引用计数记录，而非句柄数量：`acquire` 返回时计数为 1；
/// - 扇出给额外读者时调用 [`share`](Self::share) 得到新句柄，或对已有句柄调用 [`add_ref`](Self::add_ref)；
/// - 每个持有单位调用一次 [`unref`](Self::unref)（或经由 [`BufferPool::release`]），归零时缓冲回到空闲链表。
///
/// # 内容访问
/// - 多个持有者共享同一块内存，读写通过 [`read`](Self::read)/[`write`](Self::write) 守卫串行化；
///   池本身只管理簿记，不关心内容。
pub struct SharedBuffer {
    slot: Arc<Slot>,
}

impl SharedBuffer {
    pub fn id(&self) -> u64 {
        self.slot.id
    }

    pub fn len(&self) -> usize {
        self.slot.len
    }

    pub fn is_empty(&self) -> bool {
        self.slot.len == 0
    }

    /// 当前引用计数，仅用于诊断。
    pub fn ref_count(&self) -> isize {
        self.slot.refs.load(Ordering::Acquire)
    }

    /// 为一个额外的独立持有者增加引用。
    ///
    /// # Panics
    /// 计数已归零（缓冲已回到空闲链表）时 `panic`：增加引用必须经由仍持有所有权的句柄。
    pub fn add_ref(&self) {
        let refs = match self
            .slot
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |refs| {
                (refs > 0).then_some(refs + 1)
            }) {
            Ok(prev) => prev + 1,
            Err(_) => panic!("reference added to released buffer {}", self.slot.id),
        };
        if let Some(pool) = self.slot.pool.upgrade() {
            pool.emit(
                PoolEvent::routine(PoolEventKind::Referenced, Some(self.slot.id), pool.usage())
                    .with_refs(refs),
            );
        }
    }

    /// 增加引用并返回交给新持有者的句柄。
    pub fn share(&self) -> SharedBuffer {
        self.add_ref();
        SharedBuffer {
            slot: Arc::clone(&self.slot),
        }
    }

    /// 释放一份引用。
    ///
    /// # 契约说明（What）
    /// - 递减与“是否归零”的判断由同一次 `fetch_sub` 完成，每次归零恰有一个调用方负责回收；
    /// - 递减后为负说明发生了重复释放，立即 `panic`；
    /// - 所属池已被丢弃时，归零的缓冲随最后一个句柄一起释放。
    pub fn unref(&self) {
        let refs = self.slot.refs.fetch_sub(1, Ordering::AcqRel) - 1;
        if refs < 0 {
            panic!("buffer {} has negative reference count", self.slot.id);
        }
        let Some(pool) = self.slot.pool.upgrade() else {
            return;
        };
        if refs == 0 {
            pool.recycle(Arc::clone(&self.slot));
        } else {
            pool.emit(
                PoolEvent::routine(PoolEventKind::Referenced, Some(self.slot.id), pool.usage())
                    .with_refs(refs),
            );
        }
    }

    pub fn read(&self) -> BufferRead<'_> {
        BufferRead(self.slot.bytes.read())
    }

    pub fn write(&self) -> BufferWrite<'_> {
        BufferWrite(self.slot.bytes.write())
    }

    /// 从字节源填充整块缓冲，语义见 [`fill_from`](crate::fill_from)。
    pub fn fill_from<R: Read + ?Sized>(&self, source: &mut R) -> io::Result<usize> {
        fill_from(&mut self.write(), source)
    }
}

impl fmt::Debug for SharedBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedBuffer")
            .field("id", &self.slot.id)
            .field("len", &self.slot.len)
            .field("refs", &self.ref_count())
            .finish()
    }
}

/// 共享缓冲的只读守卫。
pub struct BufferRead<'a>(RwLockReadGuard<'a, Box<[u8]>>);

impl Deref for BufferRead<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

/// 共享缓冲的独占写守卫。
pub struct BufferWrite<'a>(RwLockWriteGuard<'a, Box<[u8]>>);

impl Deref for BufferWrite<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl DerefMut for BufferWrite<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.0
    }
}
