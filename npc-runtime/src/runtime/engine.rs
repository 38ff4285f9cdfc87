//! # Engine 模块
//!
//! 可挂起/恢复的语句解释循环。
//!
//! ## 执行模型
//!
//! ```text
//! tick(world, input) -> (Vec<Command>, WaitingReason)
//! ```
//!
//! 1. 处理输入，尝试解除等待
//! 2. 仍在等待（或被暂停）则直接返回
//! 3. 逐条执行游标处的语句，直到挂起或脚本结束
//! 4. 返回本次产生的 Command 和新的等待状态
//!
//! ## 容错
//!
//! 脚本内容的任何问题都降级为诊断并继续执行；`tick` 只在宿主
//! 违反输入契约时返回错误（见 [`RuntimeError`]）。

use crate::command::Command;
use crate::diagnostic::DiagnosticResult;
use crate::error::{RuntimeError, RuntimeResult};
use crate::input::RuntimeInput;
use crate::runtime::ExecCtx;
use crate::runtime::commands::dispatch;
use crate::runtime::eval::evaluate;
use crate::script::{Script, TokenCursor, TokenKind};
use crate::state::{ActorContext, SessionState, WaitingReason};
use crate::world::WorldBridge;

/// 单条语句的执行结果（引擎内部）
#[derive(Default)]
struct StatementOutcome {
    /// 产生的指令
    commands: Vec<Command>,
    /// 等待原因（语句挂起时）
    waiting: Option<WaitingReason>,
    /// 是否终止会话（`end` 或游标越界）
    terminate: bool,
}

/// NPC 脚本解释器
///
/// 一个实例同一时刻只驱动一个会话；`run()` 整体替换会话状态。
/// 多个 NPC 同时跑脚本时各建一个实例，共享 [`WorldBridge`]。
///
/// # 使用示例
///
/// ```ignore
/// let mut runtime = NpcRuntime::new(Script::parse("elder", text).0);
///
/// loop {
///     let (commands, waiting) = runtime.tick(&mut world, input)?;
///
///     // Host 执行 commands...
///
///     // 根据 waiting 采集输入...
/// }
/// ```
pub struct NpcRuntime {
    /// 当前脚本
    script: Script,
    /// 会话状态
    state: SessionState,
    /// 发起交互的角色（只读）
    actor: Option<ActorContext>,
    /// 本次会话收集的诊断
    diagnostics: DiagnosticResult,
}

impl NpcRuntime {
    /// 创建新的解释器实例（游标归零，立即可 tick）
    pub fn new(script: Script) -> Self {
        let state = SessionState::new(&script.id);
        Self {
            script,
            state,
            actor: None,
            diagnostics: DiagnosticResult::new(),
        }
    }

    /// 设置发起交互的角色
    pub fn with_actor(mut self, actor: ActorContext) -> Self {
        self.actor = Some(actor);
        self
    }

    /// 用新脚本开启新会话，替换当前会话的全部状态
    ///
    /// 调用方应先 `stop()` 或等当前会话自然结束，否则旧会话的
    /// 结束通知不会再发出。
    pub fn run(&mut self, script: Script, actor: Option<ActorContext>) {
        self.state = SessionState::new(&script.id);
        self.script = script;
        self.actor = actor;
        self.diagnostics = DiagnosticResult::new();
    }

    /// 从源文本开启新会话
    ///
    /// 词法分析和标签解析在这里一次完成；解析诊断并入会话诊断。
    pub fn run_source(&mut self, script_id: &str, text: &str, actor: Option<ActorContext>) {
        let (script, diagnostics) = Script::parse(script_id, text);
        self.state = SessionState::new(script_id);
        self.script = script;
        self.actor = actor;
        self.diagnostics = diagnostics;
    }

    /// 核心驱动函数
    ///
    /// 宿主每帧调用一次（约 16 ms）。等待中的 tick 是廉价的空转。
    ///
    /// # 参数
    ///
    /// - `world`: 宿主世界桥
    /// - `input`: 宿主采集的输入（可选）
    ///
    /// # 返回
    ///
    /// - `Vec<Command>`: 本次 tick 产生的所有指令
    /// - `WaitingReason`: 新的等待状态
    pub fn tick(
        &mut self,
        world: &mut dyn WorldBridge,
        input: Option<RuntimeInput>,
    ) -> RuntimeResult<(Vec<Command>, WaitingReason)> {
        let mut commands = Vec::new();

        // 1. 处理输入，尝试解除等待
        if let Some(input) = input {
            self.handle_input(input)?;
        }

        // 2. 已停止的会话：补发一次性的结束通知
        if !self.state.running {
            self.finish(&mut commands);
            return Ok((commands, WaitingReason::None));
        }

        // 3. 暂停或仍在等待：不推进游标
        if self.state.paused || self.state.waiting.is_waiting() {
            return Ok((commands, self.state.waiting.clone()));
        }

        // 4. 逐条执行，直到挂起或结束
        loop {
            if self.state.cursor >= self.script.len() {
                self.state.running = false;
                self.finish(&mut commands);
                return Ok((commands, WaitingReason::None));
            }

            let outcome = self.step(world);
            commands.extend(outcome.commands);

            if outcome.terminate {
                self.state.running = false;
                self.finish(&mut commands);
                return Ok((commands, WaitingReason::None));
            }

            if let Some(reason) = outcome.waiting {
                self.state.wait(reason.clone());
                return Ok((commands, reason));
            }
        }
    }

    /// 停止会话
    ///
    /// 下一次 tick 观察到停止并发出结束通知。脚本打开的宿主界面
    /// （消息框、商店）由宿主自行收尾。
    pub fn stop(&mut self) {
        self.state.running = false;
        self.state.clear_wait();
    }

    /// 暂停执行（可随时调用；等待状态保持不变）
    pub fn pause(&mut self) {
        self.state.paused = true;
    }

    /// 恢复执行
    pub fn resume(&mut self) {
        self.state.paused = false;
    }

    /// 会话是否已结束
    pub fn is_finished(&self) -> bool {
        !self.state.running
    }

    /// 当前等待状态
    pub fn waiting(&self) -> &WaitingReason {
        &self.state.waiting
    }

    /// 当前会话状态（用于快照）
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// 恢复会话状态（快照回放）
    ///
    /// 调用方需保证 state 来自同一脚本的会话。
    pub fn restore_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// 本次会话收集的诊断
    pub fn diagnostics(&self) -> &DiagnosticResult {
        &self.diagnostics
    }

    /// 发起交互的角色
    pub fn actor(&self) -> Option<&ActorContext> {
        self.actor.as_ref()
    }

    /// 结束通知，保证每个会话恰好一次
    fn finish(&mut self, commands: &mut Vec<Command>) {
        if !self.state.completed {
            self.state.completed = true;
            commands.push(Command::EndInteraction);
        }
    }

    /// 处理输入，解除等待状态
    fn handle_input(&mut self, input: RuntimeInput) -> RuntimeResult<()> {
        match (&self.state.waiting, input) {
            // 消息框关闭
            (WaitingReason::WaitForDismiss, RuntimeInput::Dismissed) => {
                self.state.clear_wait();
                Ok(())
            }

            // 选择完成：校验下标并写入寄存器
            (
                WaitingReason::WaitForChoice { choice_count },
                RuntimeInput::ChoiceSelected { index },
            ) => {
                if index >= *choice_count {
                    return Err(RuntimeError::InvalidChoiceIndex {
                        index,
                        max: *choice_count,
                    });
                }
                self.state.last_choice = index as i64;
                self.state.clear_wait();
                Ok(())
            }

            // 计时结束（计时由宿主负责）
            (WaitingReason::WaitForTime(_), RuntimeInput::WaitElapsed) => {
                self.state.clear_wait();
                Ok(())
            }

            // 模态关闭：类型匹配才解除，其他模态的关闭忽略
            (WaitingReason::WaitForModal { kind }, RuntimeInput::ModalClosed { kind: closed }) => {
                if *kind == closed {
                    self.state.clear_wait();
                }
                Ok(())
            }

            // 不等待时收到输入，忽略
            (WaitingReason::None, _) => Ok(()),

            // 状态不匹配：宿主用法错误
            (waiting, input) => Err(RuntimeError::StateMismatch {
                expected: format!("{:?}", waiting),
                actual: format!("{:?}", input),
            }),
        }
    }

    /// 执行游标处的一条语句并推进游标
    fn step(&mut self, world: &mut dyn WorldBridge) -> StatementOutcome {
        let mut warnings = DiagnosticResult::new();
        let (new_cursor, outcome) = run_statement(
            &self.script,
            self.state.cursor,
            self.state.last_choice,
            self.actor.as_ref(),
            world,
            &mut warnings,
        );
        self.state.cursor = new_cursor;
        self.diagnostics.merge(warnings);
        outcome
    }
}

/// 执行一条语句
///
/// 游标定位在语句首 Token；返回新的游标位置与执行结果。
/// 所有脚本内容问题都降级为 `warnings` 里的诊断。
fn run_statement(
    script: &Script,
    cursor_pos: usize,
    last_choice: i64,
    actor: Option<&ActorContext>,
    world: &mut dyn WorldBridge,
    warnings: &mut DiagnosticResult,
) -> (usize, StatementOutcome) {
    let mut cur = TokenCursor::new(&script.tokens, cursor_pos);
    let mut outcome = StatementOutcome::default();

    let Some(token) = cur.peek() else {
        outcome.terminate = true;
        return (cur.pos(), outcome);
    };

    let mut ctx = ExecCtx {
        script_id: &script.id,
        world,
        actor,
        last_choice,
        warnings,
    };

    match token.kind {
        TokenKind::Keyword => match token.folded.as_str() {
            // 标签声明是空操作，整组跳过
            "label" => {
                cur.bump();
                if cur.peek().is_some_and(|t| t.kind == TokenKind::Identifier)
                    && cur.peek_ahead(1).is_some_and(|t| t.is_punct(":"))
                {
                    cur.bump();
                    cur.bump();
                } else {
                    ctx.warn(Some(token.line), "残缺的 label 声明，已跳过");
                }
            }

            "goto" => {
                cur.bump();
                match cur.peek() {
                    Some(target) if target.kind == TokenKind::Identifier => {
                        let target = target.clone();
                        cur.bump();
                        cur.eat_punct(";");
                        if let Some(index) = script.find_label(&target.text) {
                            cur.jump_to(index);
                        } else {
                            ctx.warn(
                                Some(target.line),
                                format!("goto 的目标标签 '{}' 不存在，已忽略", target.text),
                            );
                        }
                    }
                    _ => {
                        ctx.warn(Some(token.line), "goto 缺少目标标签");
                        cur.resync_to_statement();
                    }
                }
            }

            "end" => {
                cur.bump();
                cur.eat_punct(";");
                outcome.terminate = true;
            }

            "if" => execute_if(&mut cur, &mut ctx),

            // 游离的 else：连同它的块一起容错跳过
            "else" => {
                ctx.warn(Some(token.line), "游离的 else，已跳过");
                cur.bump();
                if cur.peek().is_some_and(|t| t.is_keyword("if")) {
                    cur.bump();
                    skip_condition(&mut cur);
                }
                if cur.peek().is_some_and(|t| t.is_punct("{")) {
                    cur.skip_block();
                }
            }

            other => {
                ctx.warn(
                    Some(token.line),
                    format!("保留字 '{}' 不能作为语句，已跳过", other),
                );
                cur.bump();
            }
        },

        // 指令分发
        TokenKind::Identifier => {
            let name = token.clone();
            cur.bump();
            match dispatch(&name, &mut cur, &mut ctx) {
                Some(Ok(effect)) => {
                    cur.eat_punct(";");
                    outcome.commands = effect.commands;
                    outcome.waiting = effect.waiting;
                }
                Some(Err(diag)) => {
                    // 语句级失败：记录诊断，丢弃残余参数，继续执行
                    tracing::warn!(target: "npc_runtime::exec", "{}", diag);
                    ctx.warnings.push(diag);
                    cur.resync_to_statement();
                }
                None => {
                    ctx.warn(
                        Some(name.line),
                        format!("未知指令 '{}'，语句已跳过", name.text),
                    );
                    cur.resync_to_statement();
                }
            }
        }

        TokenKind::Punctuation => {
            if token.is_punct(";") || token.is_punct("{") {
                // 空语句 / 块入口
                cur.bump();
            } else if token.is_punct("}") {
                close_block(&mut cur, &mut ctx);
            } else {
                ctx.warn(
                    Some(token.line),
                    format!("意外的 Token '{}'，已跳过", token.text),
                );
                cur.bump();
            }
        }

        _ => {
            ctx.warn(
                Some(token.line),
                format!("意外的 Token '{}'，已跳过", token.text),
            );
            cur.bump();
        }
    }

    (cur.pos(), outcome)
}

/// 执行 `if`/`else if`/`else` 链（游标定位在 `if` 上）
///
/// 每个条件恰好求值一次，命中第一个真分支后进入其块；
/// 该块执行到收尾 `}` 时由 [`close_block`] 跳过链的剩余部分。
fn execute_if(cur: &mut TokenCursor, ctx: &mut ExecCtx) {
    cur.bump(); // 'if'

    loop {
        let line = cur.current_line();
        let condition = match evaluate(cur, ctx) {
            Ok(value) => value.is_truthy(),
            Err(diag) => {
                // 条件无法求值：按假处理，尽力对齐到块
                tracing::warn!(target: "npc_runtime::exec", "{}", diag);
                ctx.warnings.push(diag);
                skip_condition(cur);
                false
            }
        };

        if !cur.peek().is_some_and(|t| t.is_punct("{")) {
            ctx.warn(line, "if 条件后缺少 '{'，整条 if 已跳过");
            return;
        }

        if condition {
            // 进入块：后续语句照常执行，块的收尾 '}' 负责跳过 else 链
            cur.bump();
            return;
        }

        cur.skip_block();

        if !cur.eat_keyword("else") {
            return; // 没有 else：从链后继续
        }
        if cur.peek().is_some_and(|t| t.is_keyword("if")) {
            cur.bump();
            continue; // else if：求值下一个条件
        }
        // 裸 else
        if cur.peek().is_some_and(|t| t.is_punct("{")) {
            cur.bump();
        } else {
            ctx.warn(cur.current_line(), "else 后缺少 '{'");
        }
        return;
    }
}

/// 已执行块的收尾（游标定位在 `}` 上）
///
/// 块执行过意味着它的条件已命中，后续 `else if`/`else` 链
/// 只解析不执行地整体跳过。
fn close_block(cur: &mut TokenCursor, ctx: &mut ExecCtx) {
    cur.bump(); // '}'

    while cur.eat_keyword("else") {
        if cur.peek().is_some_and(|t| t.is_keyword("if")) {
            cur.bump();
            skip_condition(cur);
            if cur.peek().is_some_and(|t| t.is_punct("{")) {
                cur.skip_block();
                continue;
            }
            ctx.warn(cur.current_line(), "else if 后缺少 '{'");
            return;
        }
        // 裸 else 是链的最后一环
        if cur.peek().is_some_and(|t| t.is_punct("{")) {
            cur.skip_block();
        } else {
            ctx.warn(cur.current_line(), "else 后缺少 '{'");
        }
        return;
    }
}

/// 跳过一段条件表达式的 Token（不求值）
///
/// 在块边界（`{` `}` `;`）或序列末尾停下，圆括号按深度整组越过。
fn skip_condition(cur: &mut TokenCursor) {
    while let Some(token) = cur.peek() {
        if token.is_punct("(") {
            cur.skip_parens();
            continue;
        }
        if token.is_punct("{") || token.is_punct("}") || token.is_punct(";") {
            return;
        }
        cur.bump();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Value;
    use crate::world::MemoryWorld;

    fn runtime_for(text: &str) -> NpcRuntime {
        let mut runtime = NpcRuntime::new(Script::new("test", vec![]));
        runtime.run_source("test", text, None);
        runtime
    }

    /// 驱动到结束，按固定应答回放输入（测试辅助）
    fn drive_to_end(runtime: &mut NpcRuntime, world: &mut MemoryWorld, answers: &[usize]) -> Vec<Command> {
        let mut all = Vec::new();
        let mut input = None;
        let mut answer_iter = answers.iter();
        for _ in 0..256 {
            let (commands, waiting) = runtime.tick(world, input.take()).unwrap();
            all.extend(commands);
            input = match waiting {
                WaitingReason::None => {
                    if runtime.is_finished() {
                        return all;
                    }
                    None
                }
                WaitingReason::WaitForDismiss => Some(RuntimeInput::dismissed()),
                WaitingReason::WaitForChoice { .. } => {
                    Some(RuntimeInput::choice(*answer_iter.next().expect("应答不足")))
                }
                WaitingReason::WaitForTime(_) => Some(RuntimeInput::elapsed()),
                WaitingReason::WaitForModal { kind } => Some(RuntimeInput::modal_closed(kind)),
            };
        }
        panic!("脚本未在限定步数内结束");
    }

    fn messages(commands: &[Command]) -> Vec<&str> {
        commands
            .iter()
            .filter_map(|c| match c {
                Command::ShowMessage { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_message_then_dismiss_flow() {
        let mut runtime = runtime_for(r#"message "你好"; message "再见"; end;"#);
        let mut world = MemoryWorld::new();

        let (commands, waiting) = runtime.tick(&mut world, None).unwrap();
        assert_eq!(messages(&commands), vec!["你好"]);
        assert_eq!(waiting, WaitingReason::WaitForDismiss);

        // 等待中再 tick：空转
        let (commands, waiting) = runtime.tick(&mut world, None).unwrap();
        assert!(commands.is_empty());
        assert_eq!(waiting, WaitingReason::WaitForDismiss);

        let (commands, _) = runtime
            .tick(&mut world, Some(RuntimeInput::dismissed()))
            .unwrap();
        assert_eq!(messages(&commands), vec!["再见"]);
    }

    #[test]
    fn test_end_interaction_exactly_once() {
        let mut runtime = runtime_for(r#"setvar "x", 1;"#);
        let mut world = MemoryWorld::new();

        let (commands, waiting) = runtime.tick(&mut world, None).unwrap();
        assert_eq!(commands, vec![Command::EndInteraction]);
        assert_eq!(waiting, WaitingReason::None);
        assert!(runtime.is_finished());

        // 再 tick 不重复发
        let (commands, _) = runtime.tick(&mut world, None).unwrap();
        assert!(commands.is_empty());
    }

    #[test]
    fn test_stop_halts_and_completes_once() {
        let mut runtime = runtime_for(r#"message "a"; message "b"; end;"#);
        let mut world = MemoryWorld::new();

        runtime.tick(&mut world, None).unwrap();
        runtime.stop();

        let (commands, waiting) = runtime.tick(&mut world, None).unwrap();
        assert_eq!(commands, vec![Command::EndInteraction]);
        assert_eq!(waiting, WaitingReason::None);
        assert!(runtime.is_finished());
    }

    #[test]
    fn test_pause_blocks_without_advancing() {
        let mut runtime = runtime_for(r#"setvar "x", 1; end;"#);
        let mut world = MemoryWorld::new();

        runtime.pause();
        let (commands, _) = runtime.tick(&mut world, None).unwrap();
        assert!(commands.is_empty());
        assert_eq!(world.get_var("x"), None);

        runtime.resume();
        runtime.tick(&mut world, None).unwrap();
        assert_eq!(world.get_var("x"), Some(Value::Int(1)));
    }

    #[test]
    fn test_goto_forward_and_backward() {
        let text = r#"
            goto skip;
            message "不该出现";
            label skip:
                message "到了";
                end;
        "#;
        let mut runtime = runtime_for(text);
        let mut world = MemoryWorld::new();

        let all = drive_to_end(&mut runtime, &mut world, &[]);
        assert_eq!(messages(&all), vec!["到了"]);
    }

    #[test]
    fn test_goto_unknown_label_is_noop_with_warning() {
        let mut runtime = runtime_for(r#"goto nowhere; message "继续"; end;"#);
        let mut world = MemoryWorld::new();

        let (commands, _) = runtime.tick(&mut world, None).unwrap();
        assert_eq!(messages(&commands), vec!["继续"]);
        assert_eq!(runtime.diagnostics().warn_count(), 1);
    }

    #[test]
    fn test_if_false_takes_else_branch() {
        let text = r#"if (false) { message "A"; } else { message "B"; } end;"#;
        let mut runtime = runtime_for(text);
        let mut world = MemoryWorld::new();

        let all = drive_to_end(&mut runtime, &mut world, &[]);
        assert_eq!(messages(&all), vec!["B"]);
    }

    #[test]
    fn test_if_true_skips_else_chain() {
        let text = r#"
            if (true) { message "对"; }
            else if (true) { message "错1"; }
            else { message "错2"; }
            message "后续";
            end;
        "#;
        let mut runtime = runtime_for(text);
        let mut world = MemoryWorld::new();

        let all = drive_to_end(&mut runtime, &mut world, &[]);
        assert_eq!(messages(&all), vec!["对", "后续"]);
    }

    #[test]
    fn test_else_if_chain_first_true_wins() {
        let text = r#"
            setvar "n", 2;
            if (getvar("n") == 1) { message "一"; }
            else if (getvar("n") == 2) { message "二"; }
            else if (getvar("n") == 2) { message "也是二"; }
            else { message "其他"; }
            end;
        "#;
        let mut runtime = runtime_for(text);
        let mut world = MemoryWorld::new();

        let all = drive_to_end(&mut runtime, &mut world, &[]);
        assert_eq!(messages(&all), vec!["二"]);
    }

    #[test]
    fn test_suspension_inside_branch_then_chain_skipped() {
        // 真分支里挂起（message），恢复后链的剩余部分仍被跳过
        let text = r#"
            if (true) { message "分支里"; message "还在分支里"; }
            else { message "不该出现"; }
            message "链后";
            end;
        "#;
        let mut runtime = runtime_for(text);
        let mut world = MemoryWorld::new();

        let all = drive_to_end(&mut runtime, &mut world, &[]);
        assert_eq!(messages(&all), vec!["分支里", "还在分支里", "链后"]);
    }

    #[test]
    fn test_nested_if() {
        let text = r#"
            if (true) {
                if (false) { message "内假"; } else { message "内真"; }
                message "外层继续";
            }
            end;
        "#;
        let mut runtime = runtime_for(text);
        let mut world = MemoryWorld::new();

        let all = drive_to_end(&mut runtime, &mut world, &[]);
        assert_eq!(messages(&all), vec!["内真", "外层继续"]);
    }

    #[test]
    fn test_choice_register_drives_branch() {
        let text = r#"
            choice "是", "否";
            if (choice == 0) { message "yes"; }
            end;
        "#;
        let mut world = MemoryWorld::new();

        // 选 0：进入分支
        let mut runtime = runtime_for(text);
        let all = drive_to_end(&mut runtime, &mut world, &[0]);
        assert_eq!(messages(&all), vec!["yes"]);

        // 选 1：不进入
        let mut runtime = runtime_for(text);
        let all = drive_to_end(&mut runtime, &mut world, &[1]);
        assert!(messages(&all).is_empty());
    }

    #[test]
    fn test_invalid_choice_index_is_host_error() {
        let mut runtime = runtime_for(r#"choice "唯一"; end;"#);
        let mut world = MemoryWorld::new();

        runtime.tick(&mut world, None).unwrap();
        let result = runtime.tick(&mut world, Some(RuntimeInput::choice(5)));
        assert_eq!(
            result,
            Err(RuntimeError::InvalidChoiceIndex { index: 5, max: 1 })
        );
    }

    #[test]
    fn test_wait_suspends_until_elapsed() {
        let mut runtime = runtime_for(r#"wait 200; message "醒了"; end;"#);
        let mut world = MemoryWorld::new();

        let (_, waiting) = runtime.tick(&mut world, None).unwrap();
        assert_eq!(
            waiting,
            WaitingReason::WaitForTime(std::time::Duration::from_millis(200))
        );

        // 没到时间的 tick 维持等待
        let (_, waiting) = runtime.tick(&mut world, None).unwrap();
        assert!(waiting.is_waiting());

        let (commands, _) = runtime
            .tick(&mut world, Some(RuntimeInput::elapsed()))
            .unwrap();
        assert_eq!(messages(&commands), vec!["醒了"]);
    }

    #[test]
    fn test_shop_blocks_until_modal_closed() {
        let text = r#"shop "杂货铺", "potion", 50; message "谢惠顾"; end;"#;
        let mut runtime = runtime_for(text);
        let mut world = MemoryWorld::new();

        let (commands, waiting) = runtime.tick(&mut world, None).unwrap();
        assert!(matches!(commands[0], Command::OpenShop { .. }));
        assert_eq!(waiting, WaitingReason::modal("SHOP"));

        // 商店开着：任意多次 tick 都不前进
        for _ in 0..3 {
            let (commands, waiting) = runtime.tick(&mut world, None).unwrap();
            assert!(commands.is_empty());
            assert_eq!(waiting, WaitingReason::modal("SHOP"));
        }

        // 其他模态的关闭不解除
        let (commands, waiting) = runtime
            .tick(&mut world, Some(RuntimeInput::modal_closed("INVENTORY")))
            .unwrap();
        assert!(commands.is_empty());
        assert_eq!(waiting, WaitingReason::modal("SHOP"));

        // SHOP 关闭后才继续
        let (commands, _) = runtime
            .tick(&mut world, Some(RuntimeInput::modal_closed("SHOP")))
            .unwrap();
        assert_eq!(messages(&commands), vec!["谢惠顾"]);
    }

    #[test]
    fn test_unknown_command_skipped_and_execution_continues() {
        let mut runtime = runtime_for(r#"frobnicate "x", 1; message "没事"; end;"#);
        let mut world = MemoryWorld::new();

        let (commands, _) = runtime.tick(&mut world, None).unwrap();
        assert_eq!(messages(&commands), vec!["没事"]);
        assert_eq!(runtime.diagnostics().warn_count(), 1);
    }

    #[test]
    fn test_state_mismatch_is_host_error() {
        let mut runtime = runtime_for(r#"message "a"; end;"#);
        let mut world = MemoryWorld::new();

        runtime.tick(&mut world, None).unwrap();
        let result = runtime.tick(&mut world, Some(RuntimeInput::elapsed()));
        assert!(matches!(result, Err(RuntimeError::StateMismatch { .. })));
    }

    #[test]
    fn test_run_replaces_session() {
        let mut runtime = runtime_for(r#"message "旧"; end;"#);
        let mut world = MemoryWorld::new();
        runtime.tick(&mut world, None).unwrap();

        runtime.run_source("test2", r#"message "新"; end;"#, None);
        assert!(!runtime.is_finished());

        let (commands, _) = runtime.tick(&mut world, None).unwrap();
        assert_eq!(messages(&commands), vec!["新"]);
    }

    #[test]
    fn test_snapshot_restore() {
        let mut runtime = runtime_for(r#"message "一"; message "二"; end;"#);
        let mut world = MemoryWorld::new();

        runtime.tick(&mut world, None).unwrap();
        let snapshot = runtime.state().clone();

        runtime
            .tick(&mut world, Some(RuntimeInput::dismissed()))
            .unwrap();

        runtime.restore_state(snapshot);
        let (commands, _) = runtime
            .tick(&mut world, Some(RuntimeInput::dismissed()))
            .unwrap();
        assert_eq!(messages(&commands), vec!["二"]);
    }

    #[test]
    fn test_deterministic_replay() {
        let text = r#"
            choice "买", "不买";
            if (choice == 0) { additem "potion", 1; message "成交"; }
            else { message "下次再来"; }
            end;
        "#;

        let run = || {
            let mut runtime = runtime_for(text);
            let mut world = MemoryWorld::new();
            drive_to_end(&mut runtime, &mut world, &[0])
        };

        assert_eq!(run(), run());
    }
}
