//! 事件总线统一错误定义
//!
//! 只覆盖系统本身能够识别的少数情况：
//! - 参数形状与处理器期望不一致（`TypeMismatch`）；
//! - 向已停止的事件循环投递（`LoopStopped`）；
//! - 工作线程无法启动（`Spawn`）。
//!
//! 退订未知 ID、触发无人订阅的事件、清空空注册表都属于 no-op，不产生错误。
//!
use thiserror::Error;

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BusError {
    #[error("type mismatch: expected={expected}, found={found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("event loop stopped")]
    LoopStopped,

    #[error("spawn event loop worker: {0}")]
    Spawn(#[from] std::io::Error),
}

/// 统一 Result 类型别名
pub type BusResult<T> = Result<T, BusError>;
