//! # Input 模块
//!
//! 定义 Host 向 Runtime 传递的输入事件。
//!
//! ## 设计说明
//!
//! - Runtime 不直接处理鼠标/键盘/计时器，只处理语义化输入
//! - 每种输入对应解除一种等待状态；状态不匹配的输入按
//!   [`crate::error::RuntimeError::StateMismatch`] 报告给宿主

use serde::{Deserialize, Serialize};

/// Host 向 Runtime 传递的输入
///
/// Runtime 通过 `tick(world, input)` 接收，并结合当前等待状态处理。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RuntimeInput {
    /// 玩家关闭了消息框（解除 `WaitForDismiss`）
    Dismissed,

    /// 玩家选择了某个选项（解除 `WaitForChoice`）
    ///
    /// `index` 从 0 开始
    ChoiceSelected { index: usize },

    /// 等待时长已到（解除 `WaitForTime`；计时由 Host 负责）
    WaitElapsed,

    /// 模态界面已关闭（解除同 `kind` 的 `WaitForModal`）
    ModalClosed { kind: String },
}

impl RuntimeInput {
    /// 创建关闭消息输入
    pub fn dismissed() -> Self {
        Self::Dismissed
    }

    /// 创建选择输入
    pub fn choice(index: usize) -> Self {
        Self::ChoiceSelected { index }
    }

    /// 创建计时结束输入
    pub fn elapsed() -> Self {
        Self::WaitElapsed
    }

    /// 创建模态关闭输入
    pub fn modal_closed(kind: impl Into<String>) -> Self {
        Self::ModalClosed { kind: kind.into() }
    }
}
