//! # NPC Runtime
//!
//! RPG 引擎的 NPC 对话与世界交互脚本运行时。
//!
//! ## 架构概述
//!
//! `npc-runtime` 是纯逻辑核心，不依赖任何 IO 或渲染引擎。
//! 它通过**命令驱动模式**与宿主层（Host）通信：
//!
//! ```text
//! Host                          Runtime
//!   │                              │
//!   │──── RuntimeInput ──────────►│
//!   │                              │ tick(world, input)
//!   │◄─── (Vec<Command>, WaitingReason) ──│
//!   │                              │
//! ```
//!
//! 脚本是嵌在 NPC 数据上的一小段 DSL 文本：语句以 `;` 结尾，
//! 块用 `{ }` 包裹，流程控制只有 `label`/`goto` 和 `if` 链。
//! 挂起型指令（消息、选择、计时、商店）让出控制权，宿主在
//! 异步结果就绪后用对应的输入恢复执行，帧循环永不被阻塞。
//!
//! ## 核心类型
//!
//! - [`NpcRuntime`]：可挂起/恢复的解释器
//! - [`Command`]：Runtime 向 Host 发出的指令
//! - [`RuntimeInput`]：Host 向 Runtime 传递的输入
//! - [`WaitingReason`]：Runtime 的等待状态
//! - [`WorldBridge`]：宿主侧世界状态（变量、背包、金币、随机源）
//!
//! ## 使用示例
//!
//! ```ignore
//! use npc_runtime::{NpcRuntime, RuntimeInput, Script, WaitingReason};
//!
//! let (script, diags) = Script::parse("elder", script_text);
//! let mut runtime = NpcRuntime::new(script);
//!
//! // 主循环（每帧一次）
//! loop {
//!     let (commands, waiting) = runtime.tick(&mut world, input)?;
//!
//!     // Host 执行 commands
//!     for cmd in commands {
//!         host.execute(cmd);
//!     }
//!
//!     // 根据 waiting 状态采集输入
//!     input = match waiting {
//!         WaitingReason::None => None,
//!         WaitingReason::WaitForDismiss => wait_for_dismiss(),
//!         WaitingReason::WaitForChoice { .. } => wait_for_choice(),
//!         // ...
//!     };
//! }
//! ```
//!
//! ## 容错
//!
//! 残缺或部分非法的脚本**不会**让进行中的交互崩溃：坏字符、
//! 未知指令/函数/标签一律降级为 [`Diagnostic`] 并继续执行。
//! `tick` 只在宿主违反输入契约时报 [`RuntimeError`]。
//!
//! ## 模块结构
//!
//! - [`script`]：Token、词法分析器、标签解析和游标
//! - [`runtime`]：表达式求值、指令分发和解释循环
//! - [`command`]：Command 定义
//! - [`input`]：RuntimeInput 定义
//! - [`state`]：值类型、等待模型和会话状态
//! - [`world`]：宿主世界桥 trait
//! - [`diagnostic`]：诊断收集
//! - [`error`]：错误类型定义

pub mod command;
pub mod diagnostic;
pub mod error;
pub mod input;
pub mod runtime;
pub mod script;
pub mod state;
pub mod world;

// 重导出核心类型
pub use command::{Command, SHOP_MODAL, ShopItem};
pub use diagnostic::{Diagnostic, DiagnosticLevel, DiagnosticResult};
pub use error::{RuntimeError, RuntimeResult};
pub use input::RuntimeInput;
pub use runtime::NpcRuntime;
pub use script::{Lexer, Script, Token, TokenCursor, TokenKind};
pub use state::{ActorContext, NO_CHOICE, SessionState, Value, WaitingReason};
pub use world::{MemoryWorld, WorldBridge};
