use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::{
    bounded::BoundedPool,
    error::ConfigError,
    observer::{PoolObserver, TracingObserver},
    pool::ChunkPool,
    recycling::RecyclingPool,
};

/// 缓冲池配置，按 `strategy` 字段选择回收池或有界池。
///
/// # 配置示例
/// ```toml
/// strategy = "bounded"
/// buffer_len = 1048576
/// capacity = 8
/// ```
///
/// # 契约说明（What）
/// - 两种策略地位对等，宿主根据内存压力模型自行选择；
/// - `build*` 先执行 [`validate`](Self::validate)，非法参数以 [`ConfigError`] 返回而不会触发构造期 `panic`。
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum PoolConfig {
    /// 无上限、引用计数共享的回收池。
    Recycling { buffer_len: usize },
    /// 预分配 `capacity` 块缓冲、非阻塞溢出的有界池。
    Bounded { buffer_len: usize, capacity: usize },
}

impl PoolConfig {
    pub fn recycling(buffer_len: usize) -> Self {
        PoolConfig::Recycling { buffer_len }
    }

    pub fn bounded(capacity: usize, buffer_len: usize) -> Self {
        PoolConfig::Bounded {
            buffer_len,
            capacity,
        }
    }

    /// 解析并校验 TOML 文本。
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: PoolConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn buffer_len(&self) -> usize {
        match self {
            PoolConfig::Recycling { buffer_len } | PoolConfig::Bounded { buffer_len, .. } => {
                *buffer_len
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.buffer_len() == 0 {
            return Err(ConfigError::ZeroBufferLen);
        }
        match *self {
            PoolConfig::Bounded { capacity, .. } if capacity <= 1 => {
                Err(ConfigError::InvalidCapacity { capacity })
            }
            _ => Ok(()),
        }
    }

    /// 以默认的 `tracing` 观察者构建缓冲池。
    pub fn build(&self) -> Result<ChunkPool, ConfigError> {
        self.build_with_observer(Arc::new(TracingObserver))
    }

    pub fn build_with_observer(
        &self,
        observer: Arc<dyn PoolObserver>,
    ) -> Result<ChunkPool, ConfigError> {
        self.validate()?;
        let pool = match *self {
            PoolConfig::Recycling { buffer_len } => {
                ChunkPool::from(RecyclingPool::with_observer(buffer_len, observer))
            }
            PoolConfig::Bounded {
                buffer_len,
                capacity,
            } => ChunkPool::from(BoundedPool::with_observer(capacity, buffer_len, observer)),
        };
        Ok(pool)
    }
}
