//! # State 模块
//!
//! 定义脚本值类型、等待模型和会话状态。
//!
//! ## 设计原则
//!
//! - 所有状态**显式建模**、可序列化，没有隐式全局量
//! - 一个解释器实例同一时刻只有一个会话；`run()` 整体替换会话状态
//! - 等待状态由 Runtime 声明、由 Host 解除，Runtime 不读真实时间

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 脚本值
///
/// 变量存储、表达式求值和指令参数共用的动态类型。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// 整数
    Int(i64),
    /// 浮点数
    Float(f64),
    /// 字符串
    String(String),
    /// 布尔值
    Bool(bool),
    /// 空值
    Null,
}

impl Value {
    /// 宽松真值判定
    ///
    /// `null`/`false`/`0`/`0.0`/空字符串为假，其余为真。
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0 && !f.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    /// 宽松数值视图
    ///
    /// `Bool` 按 0/1，`Null` 按 0，数字字符串解析后参与，
    /// 非数字字符串返回 `None`。
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Int(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Null => Some(0.0),
            Value::String(s) => s.trim().parse::<f64>().ok(),
        }
    }

    /// 宽松整数视图（截断小数部分）
    pub fn as_int(&self) -> Option<i64> {
        self.as_number().map(|f| f as i64)
    }

    /// 显示形式（用于 message 文本、物品名等）
    pub fn display_string(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(n) => n.to_string(),
            Value::Float(f) => f.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Null => "null".to_string(),
        }
    }

    /// 类型名（用于诊断消息）
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::String(_) => "String",
            Value::Bool(_) => "Bool",
            Value::Null => "Null",
        }
    }
}

/// 等待原因
///
/// Runtime 在执行过程中进入等待时，通过它告诉 Host 需要什么输入。
///
/// # 状态转换
///
/// ```text
/// None           -> 继续执行，不等待
/// WaitForDismiss -> 等待玩家关闭消息框，收到 Dismissed 后继续
/// WaitForChoice  -> 等待玩家选择，收到 ChoiceSelected 后继续
/// WaitForTime    -> Host 计时，时长到后发送 WaitElapsed
/// WaitForModal   -> 等待模态界面（如商店）关闭，收到 ModalClosed 后继续
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum WaitingReason {
    /// 不等待，继续执行
    None,

    /// 等待消息框被关闭
    WaitForDismiss,

    /// 等待玩家选择
    ///
    /// `choice_count` 记录选项数量，用于校验输入合法性
    WaitForChoice { choice_count: usize },

    /// 等待指定时长
    ///
    /// Host 计时；Runtime 不读真实时间。
    WaitForTime(Duration),

    /// 等待模态界面关闭
    ///
    /// `kind` 是模态类型标识（如 `"SHOP"`）。
    WaitForModal { kind: String },
}

impl WaitingReason {
    /// 是否处于等待状态
    pub fn is_waiting(&self) -> bool {
        !matches!(self, Self::None)
    }

    /// 创建等待消息关闭状态
    pub fn dismiss() -> Self {
        Self::WaitForDismiss
    }

    /// 创建等待选择状态
    pub fn choice(count: usize) -> Self {
        Self::WaitForChoice {
            choice_count: count,
        }
    }

    /// 创建等待时间状态
    pub fn time(duration: Duration) -> Self {
        Self::WaitForTime(duration)
    }

    /// 创建等待模态界面状态
    pub fn modal(kind: impl Into<String>) -> Self {
        Self::WaitForModal { kind: kind.into() }
    }
}

impl Default for WaitingReason {
    fn default() -> Self {
        Self::None
    }
}

/// 发起交互的 NPC/角色上下文（只读）
///
/// Runtime 只把它回传给 Host（消息的说话者等），不解释内容。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActorContext {
    /// 角色标识符
    pub id: String,
    /// 显示名称（None 时 Host 自行决定）
    pub name: Option<String>,
}

impl ActorContext {
    /// 创建角色上下文
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
        }
    }

    /// 设置显示名称
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// 对话时的说话者名称
    pub fn speaker(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.id)
    }
}

/// `last_choice` 寄存器的哨兵值：尚未做过任何选择
pub const NO_CHOICE: i64 = -1;

/// 会话状态
///
/// 一次脚本运行的**全部**可变状态。可序列化，支持快照/恢复。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    /// 脚本标识符
    pub script_id: String,

    /// 当前游标（Token 下标）
    pub cursor: usize,

    /// 是否仍在运行
    pub running: bool,

    /// 是否被外部暂停
    pub paused: bool,

    /// 结束通知是否已发出（保证恰好一次）
    pub completed: bool,

    /// 最近一次选择的下标（[`NO_CHOICE`] = 尚无）
    pub last_choice: i64,

    /// 当前等待状态
    pub waiting: WaitingReason,
}

impl SessionState {
    /// 创建新会话（游标归零，立即可运行）
    pub fn new(script_id: impl Into<String>) -> Self {
        Self {
            script_id: script_id.into(),
            cursor: 0,
            running: true,
            paused: false,
            completed: false,
            last_choice: NO_CHOICE,
            waiting: WaitingReason::None,
        }
    }

    /// 进入等待状态
    pub fn wait(&mut self, reason: WaitingReason) {
        self.waiting = reason;
    }

    /// 清除等待状态
    pub fn clear_wait(&mut self) {
        self.waiting = WaitingReason::None;
    }

    /// 游标跳转
    pub fn jump_to(&mut self, index: usize) {
        self.cursor = index;
    }
}
