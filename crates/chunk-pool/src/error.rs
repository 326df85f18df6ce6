//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 缓冲池自身的运行路径只有两类失败：调用方编程错误（直接 `panic`）与填充时的 I/O 错误
//!   （原样透传 [`std::io::Error`]），二者都不需要额外的错误枚举；
//! - 唯一需要可恢复错误的是配置层：宿主从文件或环境拼出的参数可能非法，应在构造前被拦下。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，兼容 `std::error::Error` 与 `?` 传播；
//! - 变体携带触发校验失败的原始值，便于运维直接定位配置项。

use thiserror::Error;

/// 缓冲池配置错误。
///
/// # 教案式说明
/// - **意图 (Why)**：把“容量 ≤ 1”“缓冲长度为 0”这类在构造器中属于故障的条件，
///   提前到配置阶段以可恢复错误的形式暴露；
/// - **契约 (What)**：`PoolConfig::build*` 只会在 [`PoolConfig::validate`](crate::PoolConfig::validate)
///   通过后才调用构造器，因此经由配置创建的池不会触发构造期 `panic`。
#[derive(Debug, Error)]
pub enum ConfigError {
    /// TOML 文本无法解码为 [`PoolConfig`](crate::PoolConfig)。
    #[error("failed to parse buffer pool configuration: {source}")]
    Parse {
        #[from]
        source: toml::de::Error,
    },

    /// 缓冲长度为 0，池无法提供任何可用空间。
    #[error("buffer pool buffer_len must be greater than zero")]
    ZeroBufferLen,

    /// 有界池容量必须至少为 2：一块在途，至少一块备用。
    #[error("bounded buffer pool capacity must be at least 2, got {capacity}")]
    InvalidCapacity { capacity: usize },
}
