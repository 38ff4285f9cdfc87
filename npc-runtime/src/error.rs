//! # Error 模块
//!
//! 宿主契约层面的错误类型。
//!
//! 脚本内容的问题（坏字符、未知指令、未知标签）**不是**错误：
//! 它们降级为诊断并继续执行（见 [`crate::diagnostic`]）。
//! 这里只定义宿主侧用法错误，例如对不匹配的等待状态回传输入。

use thiserror::Error;

/// 运行时错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// 无效的选择下标
    #[error("无效的选择下标 {index}，有效范围是 0..{max}")]
    InvalidChoiceIndex { index: usize, max: usize },

    /// 输入与当前等待状态不匹配
    #[error("当前等待状态不接受此输入：等待 {expected}，收到 {actual}")]
    StateMismatch { expected: String, actual: String },
}

/// Result 类型别名
pub type RuntimeResult<T> = Result<T, RuntimeError>;
