//! `chunk-pool` 为分块读取流水线提供可复用的定长字节缓冲。
//!
//! # 模块定位（Why）
//! - 流式下载/读取场景会反复申请同样大小的块缓冲，逐次分配会放大分配器抖动与内存峰值；
//! - 缓冲常由上游阶段填充、下游多个读者并发消费，需要确定性的回收时机而非依赖析构顺序。
//!
//! # 设计概要（How）
//! - [`BufferPool`] 统一“租借 / 归还 / 用量快照”契约；
//! - [`RecyclingPool`]：无上限、按需分配，缓冲携带原子引用计数，最后一个持有者释放时回到空闲链表；
//! - [`BoundedPool`]：构造时一次性预分配固定数量缓冲，空闲耗尽时铸造溢出缓冲而不阻塞，
//!   归还时若空闲集合已满则直接丢弃；
//! - [`ChunkPool`] 以枚举在两种策略之间分派，配合 [`PoolConfig`] 由宿主按配置选择；
//! - 用量事件通过可注入的 [`PoolObserver`] 发出，默认实现 [`TracingObserver`] 落到 `tracing`。
//!
//! # 故障与错误（What）
//! - 引用计数被减成负数、以非法容量直接构造有界池等属于调用方编程错误，一律 `panic`；
//! - 填充缓冲时的 I/O 错误以 [`std::io::Error`] 原样返回；
//! - 配置解析/校验失败以 [`ConfigError`] 返回，保证非法配置不会走到会 `panic` 的构造路径。

mod bounded;
mod config;
mod error;
mod fill;
mod observer;
mod pool;
mod recycling;
mod sync;

pub use bounded::{BoundedPool, FixedBuffer};
pub use config::PoolConfig;
pub use error::ConfigError;
pub use fill::fill_from;
pub use observer::{
    NoopObserver, PoolEvent, PoolEventKind, PoolObserver, Severity, TracingObserver,
};
pub use pool::{BufferPool, ChunkBuffer, ChunkPool, PoolUsage};
pub use recycling::{BufferRead, BufferWrite, RecyclingPool, SharedBuffer};
