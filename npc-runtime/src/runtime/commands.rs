//! # 指令分发
//!
//! 指令名（小写折叠后）到处理器的映射。
//!
//! ## 约定
//!
//! - 处理器从游标处消费自己的参数 Token；收尾的可选 `;` 由引擎消费
//! - 处理器**从不**惊慌也不抛致命错误：参数缺失/非法返回诊断，
//!   宿主侧失败（物品不存在、数量不足）记录警告后照常返回
//! - 挂起型指令（`message` `choice` `wait` `shop`）通过
//!   [`WaitingReason`] 声明自己需要的恢复条件

use std::time::Duration;

use crate::command::{Command, SHOP_MODAL, ShopItem};
use crate::diagnostic::Diagnostic;
use crate::runtime::ExecCtx;
use crate::runtime::eval::evaluate;
use crate::script::{Token, TokenCursor, TokenKind};
use crate::state::{Value, WaitingReason};

/// 单条语句的执行效果
pub(crate) struct StatementEffect {
    /// 产生的指令
    pub commands: Vec<Command>,
    /// 等待原因（如果语句挂起执行）
    pub waiting: Option<WaitingReason>,
}

impl StatementEffect {
    /// 无效果
    pub fn none() -> Self {
        Self {
            commands: Vec::new(),
            waiting: None,
        }
    }

    /// 只发指令，不挂起
    pub fn command(command: Command) -> Self {
        Self {
            commands: vec![command],
            waiting: None,
        }
    }

    /// 发指令并挂起
    pub fn suspend(command: Command, waiting: WaitingReason) -> Self {
        Self {
            commands: vec![command],
            waiting: Some(waiting),
        }
    }
}

/// 分发一条指令（指令名 Token 已被引擎消费）
///
/// 返回 `None` 表示名字不在指令表里；引擎据此按未知语句容错处理。
pub(crate) fn dispatch(
    name: &Token,
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
) -> Option<Result<StatementEffect, Diagnostic>> {
    let line = Some(name.line);
    let result = match name.folded.as_str() {
        "message" => message(cur, ctx),
        "additem" => add_item(cur, ctx, line),
        "delitem" => del_item(cur, ctx, line),
        "setvar" => set_var(cur, ctx, line),
        "incvar" => inc_var(cur, ctx, true),
        "decvar" => inc_var(cur, ctx, false),
        "setflag" => set_flag(cur, ctx, true),
        "clearflag" => set_flag(cur, ctx, false),
        "wait" => wait(cur, ctx, line),
        "choice" => choice(cur, ctx),
        "shop" => shop(cur, ctx, line),
        "teleport" => teleport(cur, ctx, line),
        "heal" => heal_or_damage(cur, ctx, true),
        "damage" => heal_or_damage(cur, ctx, false),
        "playsound" => play_sound(cur, ctx),
        "addgold" => add_gold(cur, ctx),
        "delgold" => del_gold(cur, ctx, line),
        _ => return None,
    };
    Some(result)
}

/// `message <文本>` —— 显示消息并等待关闭
fn message(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<StatementEffect, Diagnostic> {
    let text = evaluate(cur, ctx)?.display_string();
    let speaker = ctx.actor.map(|a| a.speaker().to_string());

    Ok(StatementEffect::suspend(
        Command::ShowMessage { speaker, text },
        WaitingReason::dismiss(),
    ))
}

/// `additem <ID>, <数量>` —— 数量缺省为 1
fn add_item(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    line: Option<usize>,
) -> Result<StatementEffect, Diagnostic> {
    let item_id = evaluate(cur, ctx)?.display_string();
    let quantity = optional_amount(cur, ctx)?;

    if !ctx.world.add_item(&item_id, quantity) {
        ctx.warn(line, format!("无法添加物品 '{}' x{}", item_id, quantity));
    }
    Ok(StatementEffect::none())
}

/// `delitem <ID>, <数量>` —— 数量不足时整条放弃
fn del_item(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    line: Option<usize>,
) -> Result<StatementEffect, Diagnostic> {
    let item_id = evaluate(cur, ctx)?.display_string();
    let quantity = optional_amount(cur, ctx)?;

    if !ctx.world.remove_item(&item_id, quantity) {
        ctx.warn(
            line,
            format!("移除物品 '{}' x{} 失败：数量不足或不存在", item_id, quantity),
        );
    }
    Ok(StatementEffect::none())
}

/// `setvar <名字>, <值>`
fn set_var(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    line: Option<usize>,
) -> Result<StatementEffect, Diagnostic> {
    let name = name_argument(cur, ctx)?;
    if !cur.eat_punct(",") {
        return Err(ctx.statement_error(line, "setvar 缺少值参数，期望 `setvar 名字, 值`"));
    }
    let value = evaluate(cur, ctx)?;

    ctx.world.set_var(&name, value);
    Ok(StatementEffect::none())
}

/// `incvar/decvar <名字>, <增量>` —— 增量缺省为 1
fn inc_var(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    increment: bool,
) -> Result<StatementEffect, Diagnostic> {
    let name = name_argument(cur, ctx)?;
    let amount = if cur.eat_punct(",") {
        evaluate(cur, ctx)?
    } else {
        Value::Int(1)
    };

    if increment {
        ctx.world.increment_var(&name, &amount);
    } else {
        ctx.world.decrement_var(&name, &amount);
    }
    Ok(StatementEffect::none())
}

/// `setflag/clearflag <名字>` —— `setvar 名字, true/false` 的糖
fn set_flag(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    value: bool,
) -> Result<StatementEffect, Diagnostic> {
    let name = name_argument(cur, ctx)?;
    ctx.world.set_var(&name, Value::Bool(value));
    Ok(StatementEffect::none())
}

/// `wait <毫秒>` —— 计时由宿主负责
fn wait(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    line: Option<usize>,
) -> Result<StatementEffect, Diagnostic> {
    let value = evaluate(cur, ctx)?;
    let ms = match value.as_number() {
        Some(ms) if ms >= 0.0 => ms,
        Some(_) => {
            ctx.warn(line, "wait 的时长为负，按 0 处理");
            0.0
        }
        None => {
            ctx.warn(
                line,
                format!("wait 的时长不是数字（{}），按 0 处理", value.type_name()),
            );
            0.0
        }
    };

    Ok(StatementEffect {
        commands: Vec::new(),
        waiting: Some(WaitingReason::time(Duration::from_millis(ms as u64))),
    })
}

/// `choice <文本>, <文本>, ...` —— 选择结果写入 choice 寄存器
fn choice(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<StatementEffect, Diagnostic> {
    let mut options = vec![evaluate(cur, ctx)?.display_string()];
    while cur.eat_punct(",") {
        options.push(evaluate(cur, ctx)?.display_string());
    }

    let choice_count = options.len();
    Ok(StatementEffect::suspend(
        Command::PresentChoices { options },
        WaitingReason::choice(choice_count),
    ))
}

/// `shop <店名>, <ID>, <价格>[, <库存>], ...`
///
/// 条目在 Token 级别无歧义：物品 ID 是字符串或标识符 Token，
/// 价格之后紧跟的数字 Token 一定是库存。写成 `"42"` 的纯数字
/// ID 词法上仍是字符串，不会被误读。
fn shop(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    line: Option<usize>,
) -> Result<StatementEffect, Diagnostic> {
    let name = evaluate(cur, ctx)?.display_string();

    let mut items = Vec::new();
    while cur.eat_punct(",") {
        let Some(id_token) = cur.peek() else {
            ctx.warn(line, "商店条目在物品 ID 处提前结束");
            break;
        };
        if !matches!(id_token.kind, TokenKind::String | TokenKind::Identifier) {
            ctx.warn(
                Some(id_token.line),
                format!("商店条目的物品 ID 应是字符串或标识符，收到 '{}'", id_token.text),
            );
            break;
        }
        let item_id = id_token.text.clone();
        cur.bump();

        if !cur.eat_punct(",") {
            ctx.warn(line, format!("物品 '{}' 缺少价格，条目已忽略", item_id));
            break;
        }
        let Some(price_token) = cur.peek() else {
            ctx.warn(line, format!("物品 '{}' 缺少价格，条目已忽略", item_id));
            break;
        };
        if price_token.kind != TokenKind::Number {
            ctx.warn(
                Some(price_token.line),
                format!("物品 '{}' 的价格应是数字，收到 '{}'", item_id, price_token.text),
            );
            break;
        }
        let price = price_token.text.parse::<f64>().unwrap_or(0.0) as i64;
        cur.bump();

        // 库存：只有 `, 数字` 紧跟价格时才属于本条目
        let stock = if cur.peek().is_some_and(|t| t.is_punct(","))
            && cur.peek_ahead(1).is_some_and(|t| t.kind == TokenKind::Number)
        {
            cur.bump(); // ','
            let stock_token = cur.next();
            stock_token.map(|t| t.text.parse::<f64>().unwrap_or(0.0) as i64)
        } else {
            None
        };

        items.push(ShopItem {
            item_id,
            price,
            stock,
        });
    }

    Ok(StatementEffect::suspend(
        Command::OpenShop { name, items },
        WaitingReason::modal(SHOP_MODAL),
    ))
}

/// `teleport <地图>, <x>, <y>`
fn teleport(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    line: Option<usize>,
) -> Result<StatementEffect, Diagnostic> {
    let map_id = evaluate(cur, ctx)?.display_string();
    if !cur.eat_punct(",") {
        return Err(ctx.statement_error(line, "teleport 缺少坐标，期望 `teleport 地图, x, y`"));
    }
    let x = int_argument(cur, ctx, line, "x 坐标")?;
    if !cur.eat_punct(",") {
        return Err(ctx.statement_error(line, "teleport 缺少 y 坐标"));
    }
    let y = int_argument(cur, ctx, line, "y 坐标")?;

    Ok(StatementEffect::command(Command::Teleport { map_id, x, y }))
}

/// `heal/damage <数值>`
fn heal_or_damage(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    heal: bool,
) -> Result<StatementEffect, Diagnostic> {
    let line = cur.current_line();
    let amount = int_argument(cur, ctx, line, "数值")?;

    let command = if heal {
        Command::Heal { amount }
    } else {
        Command::Damage { amount }
    };
    Ok(StatementEffect::command(command))
}

/// `playsound <音效 ID>`
fn play_sound(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<StatementEffect, Diagnostic> {
    let sound_id = evaluate(cur, ctx)?.display_string();
    Ok(StatementEffect::command(Command::PlaySound { sound_id }))
}

/// `addgold <数量>`
fn add_gold(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<StatementEffect, Diagnostic> {
    let line = cur.current_line();
    let amount = int_argument(cur, ctx, line, "金币数量")?;
    ctx.world.add_gold(amount);
    Ok(StatementEffect::none())
}

/// `delgold <数量>` —— 余额不足时不扣
fn del_gold(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    line: Option<usize>,
) -> Result<StatementEffect, Diagnostic> {
    let amount = int_argument(cur, ctx, line, "金币数量")?;
    if !ctx.world.remove_gold(amount) {
        ctx.warn(line, format!("扣除 {} 金币失败：余额不足", amount));
    }
    Ok(StatementEffect::none())
}

/// 变量名参数：裸标识符按名字字面取，其余按表达式求值后转字符串
fn name_argument(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<String, Diagnostic> {
    if let Some(token) = cur.peek() {
        let is_call = cur.peek_ahead(1).is_some_and(|t| t.is_punct("("));
        if token.kind == TokenKind::Identifier && !is_call {
            let name = token.text.clone();
            cur.bump();
            return Ok(name);
        }
    }
    Ok(evaluate(cur, ctx)?.display_string())
}

/// 整数参数（宽松折算，不可折算时报语句级诊断）
fn int_argument(
    cur: &mut TokenCursor,
    ctx: &mut ExecCtx,
    line: Option<usize>,
    what: &str,
) -> Result<i64, Diagnostic> {
    let value = evaluate(cur, ctx)?;
    value
        .as_int()
        .ok_or_else(|| ctx.statement_error(line, format!("{}应是数字，收到 {}", what, value.type_name())))
}

/// 可选的 `, 数量` 参数，缺省为 1
fn optional_amount(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<i64, Diagnostic> {
    if cur.eat_punct(",") {
        let line = cur.current_line();
        int_argument(cur, ctx, line, "数量")
    } else {
        Ok(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::DiagnosticResult;
    use crate::script::Lexer;
    use crate::state::{ActorContext, NO_CHOICE};
    use crate::world::{MemoryWorld, WorldBridge};

    /// 执行一条指令文本（测试辅助）：返回效果与诊断
    fn run_command(
        text: &str,
        world: &mut MemoryWorld,
        actor: Option<&ActorContext>,
    ) -> (Result<StatementEffect, Diagnostic>, DiagnosticResult) {
        let tokens = Lexer::new().tokenize("test", text);
        let mut cur = TokenCursor::new(&tokens, 1);
        let mut warnings = DiagnosticResult::new();
        let result = {
            let mut ctx = ExecCtx {
                script_id: "test",
                world,
                actor,
                last_choice: NO_CHOICE,
                warnings: &mut warnings,
            };
            dispatch(&tokens[0], &mut cur, &mut ctx).expect("指令应在分发表里")
        };
        (result, warnings)
    }

    #[test]
    fn test_message_suspends_with_speaker() {
        let actor = ActorContext::new("elder").with_name("村长");
        let mut world = MemoryWorld::new();
        let (result, _) = run_command(r#"message "欢迎";"#, &mut world, Some(&actor));

        let effect = result.unwrap();
        assert_eq!(
            effect.commands,
            vec![Command::ShowMessage {
                speaker: Some("村长".to_string()),
                text: "欢迎".to_string(),
            }]
        );
        assert_eq!(effect.waiting, Some(WaitingReason::dismiss()));
    }

    #[test]
    fn test_additem_and_default_quantity() {
        let mut world = MemoryWorld::new();

        let (result, diags) = run_command(r#"additem "potion", 3;"#, &mut world, None);
        assert!(result.is_ok());
        assert!(diags.is_empty());
        assert_eq!(world.item_quantity("potion"), 3);

        let (result, _) = run_command(r#"additem "potion";"#, &mut world, None);
        assert!(result.is_ok());
        assert_eq!(world.item_quantity("potion"), 4);
    }

    #[test]
    fn test_delitem_insufficient_is_warning_not_error() {
        let mut world = MemoryWorld::new().with_item("potion", 1);

        let (result, diags) = run_command(r#"delitem "potion", 5;"#, &mut world, None);
        assert!(result.is_ok());
        assert_eq!(diags.warn_count(), 1);
        // 不做部分移除
        assert_eq!(world.item_quantity("potion"), 1);
    }

    #[test]
    fn test_setvar_and_flags() {
        let mut world = MemoryWorld::new();

        run_command(r#"setvar "quest_stage", 2;"#, &mut world, None)
            .0
            .unwrap();
        assert_eq!(world.get_var("quest_stage"), Some(Value::Int(2)));

        // 裸标识符作为变量名
        run_command(r#"setvar mood, "happy";"#, &mut world, None)
            .0
            .unwrap();
        assert_eq!(
            world.get_var("mood"),
            Some(Value::String("happy".to_string()))
        );

        run_command(r#"setflag "met_elder";"#, &mut world, None)
            .0
            .unwrap();
        assert_eq!(world.get_var("met_elder"), Some(Value::Bool(true)));

        run_command(r#"clearflag "met_elder";"#, &mut world, None)
            .0
            .unwrap();
        assert_eq!(world.get_var("met_elder"), Some(Value::Bool(false)));
    }

    #[test]
    fn test_setvar_missing_value_is_statement_error() {
        let mut world = MemoryWorld::new();
        let (result, _) = run_command(r#"setvar "x";"#, &mut world, None);
        assert!(result.is_err());
        assert_eq!(world.get_var("x"), None);
    }

    #[test]
    fn test_incvar_decvar() {
        let mut world = MemoryWorld::new();

        run_command(r#"incvar "count", 5;"#, &mut world, None).0.unwrap();
        run_command(r#"incvar "count";"#, &mut world, None).0.unwrap();
        run_command(r#"decvar "count", 2;"#, &mut world, None).0.unwrap();

        assert_eq!(world.get_var("count"), Some(Value::Int(4)));
    }

    #[test]
    fn test_wait_yields_duration() {
        let mut world = MemoryWorld::new();
        let (result, _) = run_command("wait 500;", &mut world, None);

        let effect = result.unwrap();
        assert!(effect.commands.is_empty());
        assert_eq!(
            effect.waiting,
            Some(WaitingReason::time(Duration::from_millis(500)))
        );
    }

    #[test]
    fn test_wait_negative_clamped_with_warning() {
        let mut world = MemoryWorld::new();
        let (result, diags) = run_command("wait -100;", &mut world, None);

        assert_eq!(
            result.unwrap().waiting,
            Some(WaitingReason::time(Duration::ZERO))
        );
        assert_eq!(diags.warn_count(), 1);
    }

    #[test]
    fn test_choice_collects_options() {
        let mut world = MemoryWorld::new();
        let (result, _) = run_command(r#"choice "是", "否", "再想想";"#, &mut world, None);

        let effect = result.unwrap();
        assert_eq!(
            effect.commands,
            vec![Command::PresentChoices {
                options: vec!["是".to_string(), "否".to_string(), "再想想".to_string()],
            }]
        );
        assert_eq!(effect.waiting, Some(WaitingReason::choice(3)));
    }

    #[test]
    fn test_shop_with_and_without_stock() {
        let mut world = MemoryWorld::new();
        let (result, diags) = run_command(
            r#"shop "杂货铺", "potion", 50, 10, "sword", 200;"#,
            &mut world,
            None,
        );

        let effect = result.unwrap();
        assert!(diags.is_empty());
        assert_eq!(effect.waiting, Some(WaitingReason::modal(SHOP_MODAL)));
        assert_eq!(
            effect.commands,
            vec![Command::OpenShop {
                name: "杂货铺".to_string(),
                items: vec![
                    ShopItem {
                        item_id: "potion".to_string(),
                        price: 50,
                        stock: Some(10),
                    },
                    ShopItem {
                        item_id: "sword".to_string(),
                        price: 200,
                        stock: None,
                    },
                ],
            }]
        );
    }

    #[test]
    fn test_shop_numeric_looking_id_is_not_stock() {
        // `"42"` 词法上是字符串 Token，不会被当作库存
        let mut world = MemoryWorld::new();
        let (result, _) = run_command(r#"shop "店", "potion", 50, "42", 10;"#, &mut world, None);

        let effect = result.unwrap();
        let Command::OpenShop { items, .. } = &effect.commands[0] else {
            panic!("应是 OpenShop");
        };
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].item_id, "potion");
        assert_eq!(items[0].stock, None);
        assert_eq!(items[1].item_id, "42");
        assert_eq!(items[1].price, 10);
    }

    #[test]
    fn test_shop_malformed_entry_keeps_earlier_items() {
        let mut world = MemoryWorld::new();
        let (result, diags) =
            run_command(r#"shop "店", "potion", 50, "sword";"#, &mut world, None);

        let effect = result.unwrap();
        let Command::OpenShop { items, .. } = &effect.commands[0] else {
            panic!("应是 OpenShop");
        };
        // sword 缺价格被丢弃，potion 保留，商店照常打开
        assert_eq!(items.len(), 1);
        assert_eq!(diags.warn_count(), 1);
        assert_eq!(effect.waiting, Some(WaitingReason::modal(SHOP_MODAL)));
    }

    #[test]
    fn test_teleport() {
        let mut world = MemoryWorld::new();
        let (result, _) = run_command(r#"teleport "cave_01", 12, 4;"#, &mut world, None);

        assert_eq!(
            result.unwrap().commands,
            vec![Command::Teleport {
                map_id: "cave_01".to_string(),
                x: 12,
                y: 4,
            }]
        );
    }

    #[test]
    fn test_heal_damage_playsound() {
        let mut world = MemoryWorld::new();

        let (result, _) = run_command("heal 20;", &mut world, None);
        assert_eq!(result.unwrap().commands, vec![Command::Heal { amount: 20 }]);

        let (result, _) = run_command("damage 5;", &mut world, None);
        assert_eq!(result.unwrap().commands, vec![Command::Damage { amount: 5 }]);

        let (result, _) = run_command(r#"playsound "door_open";"#, &mut world, None);
        assert_eq!(
            result.unwrap().commands,
            vec![Command::PlaySound {
                sound_id: "door_open".to_string()
            }]
        );
    }

    #[test]
    fn test_gold_commands() {
        let mut world = MemoryWorld::new().with_gold(30);

        run_command("addgold 50;", &mut world, None).0.unwrap();
        assert_eq!(world.gold(), 80);

        let (result, diags) = run_command("delgold 100;", &mut world, None);
        assert!(result.is_ok());
        assert_eq!(diags.warn_count(), 1);
        assert_eq!(world.gold(), 80);

        run_command("delgold 80;", &mut world, None).0.unwrap();
        assert_eq!(world.gold(), 0);
    }

    #[test]
    fn test_unknown_command_is_none() {
        let tokens = Lexer::new().tokenize("test", "frobnicate;");
        let mut cur = TokenCursor::new(&tokens, 1);
        let mut warnings = DiagnosticResult::new();
        let mut world = MemoryWorld::new();
        let mut ctx = ExecCtx {
            script_id: "test",
            world: &mut world,
            actor: None,
            last_choice: NO_CHOICE,
            warnings: &mut warnings,
        };

        assert!(dispatch(&tokens[0], &mut cur, &mut ctx).is_none());
    }

    #[test]
    fn test_command_names_case_insensitive() {
        let mut world = MemoryWorld::new();
        let (result, _) = run_command(r#"AddItem "potion", 2;"#, &mut world, None);
        assert!(result.is_ok());
        assert_eq!(world.item_quantity("potion"), 2);
    }
}
