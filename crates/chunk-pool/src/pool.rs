use std::io::{self, Read};

use crate::{
    bounded::{BoundedPool, FixedBuffer},
    recycling::{RecyclingPool, SharedBuffer},
};

/// 缓冲池的用量快照。
///
/// # 契约说明（What）
/// - 各字段由独立的原子计数读取而来，并发下仅保证最终一致，只能用于诊断，不能作为正确性判断依据；
/// - `allocated`：池累计持有的缓冲数量（有界池含预分配与溢出铸造）；
/// - `in_use`：当前被调用方持有的缓冲数量；
/// - `idle`：当前位于空闲集合中的缓冲数量；
/// - `overflow_allocations` / `discarded`：有界池的降级计数，回收池恒为 0。
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolUsage {
    pub allocated: usize,
    pub in_use: usize,
    pub idle: usize,
    pub overflow_allocations: usize,
    pub discarded: usize,
}

/// 定长缓冲池的统一契约。
///
/// # 设计背景（Why）
/// - 回收池与有界池面对不同的内存压力模型，但对调用方暴露同一组操作，
///   宿主可以在不改动消费代码的前提下切换策略；
///
/// # 契约说明（What）
/// - `acquire`：永不失败，必要时以分配新内存为副作用；
/// - `release`：每持有一份所有权恰好调用一次；对已无持有者的缓冲再次归还属于编程错误，实现会 `panic`；
/// - `usage`：非阻塞读取用量快照；
/// - `buffer_len`：池内每块缓冲的固定长度。
pub trait BufferPool: Send + Sync {
    type Buffer;

    fn acquire(&self) -> Self::Buffer;

    fn release(&self, buffer: Self::Buffer);

    fn usage(&self) -> PoolUsage;

    fn buffer_len(&self) -> usize;
}

/// 按配置在两种策略之间分派的缓冲池。
///
/// # 设计取舍（Trade-offs）
/// - 用枚举而非 `dyn BufferPool`：两种策略的缓冲类型不同，关联类型无法擦除；
///   枚举分派同时保留了静态派发的零开销；
/// - 把缓冲归还到另一种策略的池属于编程错误，直接 `panic`。
#[derive(Clone)]
pub enum ChunkPool {
    Recycling(RecyclingPool),
    Bounded(BoundedPool),
}

impl BufferPool for ChunkPool {
    type Buffer = ChunkBuffer;

    fn acquire(&self) -> ChunkBuffer {
        match self {
            ChunkPool::Recycling(pool) => ChunkBuffer::Shared(pool.acquire()),
            ChunkPool::Bounded(pool) => ChunkBuffer::Fixed(pool.acquire()),
        }
    }

    fn release(&self, buffer: ChunkBuffer) {
        match (self, buffer) {
            (ChunkPool::Recycling(pool), ChunkBuffer::Shared(buffer)) => pool.release(buffer),
            (ChunkPool::Bounded(pool), ChunkBuffer::Fixed(buffer)) => pool.release(buffer),
            (ChunkPool::Recycling(_), ChunkBuffer::Fixed(buffer)) => panic!(
                "fixed buffer {} released into a recycling pool",
                buffer.id()
            ),
            (ChunkPool::Bounded(_), ChunkBuffer::Shared(buffer)) => panic!(
                "shared buffer {} released into a bounded pool",
                buffer.id()
            ),
        }
    }

    fn usage(&self) -> PoolUsage {
        match self {
            ChunkPool::Recycling(pool) => pool.usage(),
            ChunkPool::Bounded(pool) => pool.usage(),
        }
    }

    fn buffer_len(&self) -> usize {
        match self {
            ChunkPool::Recycling(pool) => pool.buffer_len(),
            ChunkPool::Bounded(pool) => pool.buffer_len(),
        }
    }
}

impl From<RecyclingPool> for ChunkPool {
    fn from(pool: RecyclingPool) -> Self {
        ChunkPool::Recycling(pool)
    }
}

impl From<BoundedPool> for ChunkPool {
    fn from(pool: BoundedPool) -> Self {
        ChunkPool::Bounded(pool)
    }
}

/// [`ChunkPool`] 租借出的缓冲。
#[derive(Debug)]
pub enum ChunkBuffer {
    Shared(SharedBuffer),
    Fixed(FixedBuffer),
}

impl ChunkBuffer {
    pub fn id(&self) -> u64 {
        match self {
            ChunkBuffer::Shared(buffer) => buffer.id(),
            ChunkBuffer::Fixed(buffer) => buffer.id(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            ChunkBuffer::Shared(buffer) => buffer.len(),
            ChunkBuffer::Fixed(buffer) => buffer.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 从字节源填充缓冲，语义见 [`fill_from`](crate::fill_from)。
    pub fn fill_from<R: Read + ?Sized>(&mut self, source: &mut R) -> io::Result<usize> {
        match self {
            ChunkBuffer::Shared(buffer) => buffer.fill_from(source),
            ChunkBuffer::Fixed(buffer) => buffer.fill_from(source),
        }
    }

    /// 以只读切片访问缓冲内容。
    pub fn with_bytes<T>(&self, f: impl FnOnce(&[u8]) -> T) -> T {
        match self {
            ChunkBuffer::Shared(buffer) => f(&buffer.read()[..]),
            ChunkBuffer::Fixed(buffer) => f(&buffer[..]),
        }
    }

    /// 为额外的下游读者派生一份共享持有。
    ///
    /// 只有回收池的缓冲支持共享；有界池缓冲始终独占，返回 `None`。
    pub fn try_share(&self) -> Option<ChunkBuffer> {
        match self {
            ChunkBuffer::Shared(buffer) => Some(ChunkBuffer::Shared(buffer.share())),
            ChunkBuffer::Fixed(_) => None,
        }
    }
}
