//! # Runtime 模块
//!
//! 执行引擎：表达式求值、指令分发和可恢复的解释循环。
//!
//! ## 模块结构
//!
//! - [`eval`]：Token 流上的递归下降表达式求值器
//! - [`commands`]：指令分发表（指令名 -> 处理器）
//! - [`engine`]：[`NpcRuntime`]，可挂起/恢复的语句解释循环

pub mod commands;
pub mod engine;
pub mod eval;

pub use engine::NpcRuntime;

use crate::diagnostic::{Diagnostic, DiagnosticResult};
use crate::state::ActorContext;
use crate::world::WorldBridge;

/// 单条语句的执行上下文
///
/// 引擎在每条语句前组装一次，把世界桥、角色上下文和诊断出口
/// 借给求值器与指令处理器。
pub(crate) struct ExecCtx<'a> {
    /// 脚本标识符（诊断定位用）
    pub script_id: &'a str,
    /// 宿主世界桥
    pub world: &'a mut dyn WorldBridge,
    /// 发起交互的角色（只读）
    pub actor: Option<&'a ActorContext>,
    /// `choice` 寄存器的当前值
    pub last_choice: i64,
    /// 本条语句产生的非致命诊断
    pub warnings: &'a mut DiagnosticResult,
}

impl ExecCtx<'_> {
    /// 记录一条警告诊断并发出 tracing 事件
    pub fn warn(&mut self, line: Option<usize>, message: impl Into<String>) {
        let mut diag = Diagnostic::warn(self.script_id, message);
        if let Some(line) = line {
            diag = diag.with_line(line);
        }
        tracing::warn!(target: "npc_runtime::exec", "{}", diag);
        self.warnings.push(diag);
    }

    /// 构造一条（将中止当前语句的）警告诊断
    pub fn statement_error(&self, line: Option<usize>, message: impl Into<String>) -> Diagnostic {
        let mut diag = Diagnostic::warn(self.script_id, message);
        if let Some(line) = line {
            diag = diag.with_line(line);
        }
        diag
    }
}
