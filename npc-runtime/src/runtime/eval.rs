//! # 表达式求值器
//!
//! Token 流上的递归下降求值器，供条件判断和指令参数使用。
//!
//! ## 文法（优先级从低到高）
//!
//! ```text
//! expression  -> or
//! or          -> and (("or" | "||") and)*
//! and         -> comparison (("and" | "&&") comparison)*
//! comparison  -> primary (("==" | "!=" | ">=" | "<=" | ">" | "<") primary)?
//! primary     -> "(" expression ")"
//!              | ("not" | "!") primary
//!              | true | false | null | 数字 | 字符串
//!              | 标识符 "(" 参数... ")"      （内建函数，大小写不敏感）
//!              | 标识符                      （变量读取；choice 为选择寄存器）
//! ```
//!
//! ## 设计说明
//!
//! - 求值对宿主存储**只读**；内建函数全部委托给 [`WorldBridge`] 查询
//! - 比较采用宽松的类型折算（数字字符串可与数字比较）
//! - 未知函数求值为 `null` 并记录警告，不中断语句
//! - 逻辑运算两侧都会被求值：游标必须越过右操作数，
//!   求值无副作用，所以不做短路

use crate::diagnostic::Diagnostic;
use crate::runtime::ExecCtx;
use crate::script::{TokenCursor, TokenKind};
use crate::state::Value;

/// 对游标处的表达式求值
///
/// 成功时游标停在表达式之后；失败返回的诊断由引擎记录，
/// 当前语句被放弃（引擎随后重新同步到语句边界）。
pub(crate) fn evaluate(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<Value, Diagnostic> {
    or_expr(cur, ctx)
}

fn or_expr(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<Value, Diagnostic> {
    let mut value = and_expr(cur, ctx)?;

    loop {
        if cur.eat_keyword("or") || cur.eat_operator("||") {
            let rhs = and_expr(cur, ctx)?;
            value = Value::Bool(value.is_truthy() || rhs.is_truthy());
        } else {
            return Ok(value);
        }
    }
}

fn and_expr(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<Value, Diagnostic> {
    let mut value = comparison(cur, ctx)?;

    loop {
        if cur.eat_keyword("and") || cur.eat_operator("&&") {
            let rhs = comparison(cur, ctx)?;
            value = Value::Bool(value.is_truthy() && rhs.is_truthy());
        } else {
            return Ok(value);
        }
    }
}

fn comparison(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<Value, Diagnostic> {
    let left = primary(cur, ctx)?;

    let op = match cur.peek() {
        Some(t) if t.kind == TokenKind::Operator && t.text != "&&" && t.text != "||" => {
            t.text.clone()
        }
        Some(t) if t.is_punct(">") || t.is_punct("<") => t.text.clone(),
        _ => return Ok(left),
    };
    cur.bump();

    let right = primary(cur, ctx)?;
    let result = match op.as_str() {
        "==" => loose_eq(&left, &right),
        "!=" => !loose_eq(&left, &right),
        ">" => loose_cmp(&left, &right).is_some_and(std::cmp::Ordering::is_gt),
        "<" => loose_cmp(&left, &right).is_some_and(std::cmp::Ordering::is_lt),
        ">=" => loose_cmp(&left, &right).is_some_and(std::cmp::Ordering::is_ge),
        "<=" => loose_cmp(&left, &right).is_some_and(std::cmp::Ordering::is_le),
        _ => unreachable!("运算符集合已在词法层固定"),
    };
    Ok(Value::Bool(result))
}

fn primary(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<Value, Diagnostic> {
    let line = cur.current_line();
    let Some(token) = cur.peek() else {
        return Err(ctx.statement_error(line, "表达式意外结束"));
    };

    // 括号
    if token.is_punct("(") {
        cur.bump();
        let value = or_expr(cur, ctx)?;
        if !cur.eat_punct(")") {
            return Err(ctx.statement_error(cur.current_line(), "缺少右括号 ')'"));
        }
        return Ok(value);
    }

    // 一元取反
    if token.is_keyword("not") || token.is_punct("!") {
        cur.bump();
        let inner = primary(cur, ctx)?;
        return Ok(Value::Bool(!inner.is_truthy()));
    }

    match token.kind {
        TokenKind::Keyword => {
            let value = match token.folded.as_str() {
                "true" => Value::Bool(true),
                "false" => Value::Bool(false),
                "null" => Value::Null,
                other => {
                    return Err(ctx.statement_error(
                        Some(token.line),
                        format!("保留字 '{}' 不能出现在表达式里", other),
                    ));
                }
            };
            cur.bump();
            Ok(value)
        }

        TokenKind::Number => {
            let value = parse_number(&token.text);
            cur.bump();
            Ok(value)
        }

        TokenKind::String => {
            let value = Value::String(token.text.clone());
            cur.bump();
            Ok(value)
        }

        TokenKind::Identifier => {
            // 函数调用：标识符紧跟 '('
            if cur.peek_ahead(1).is_some_and(|t| t.is_punct("(")) {
                return call(cur, ctx);
            }

            let value = if token.folded == "choice" {
                // 零参伪变量：选择寄存器
                Value::Int(ctx.last_choice)
            } else {
                // 裸标识符：变量读取，缺省为 null
                ctx.world.get_var(&token.text).unwrap_or(Value::Null)
            };
            cur.bump();
            Ok(value)
        }

        _ => Err(ctx.statement_error(
            Some(token.line),
            format!("无法作为表达式解析的 Token: '{}'", token.text),
        )),
    }
}

/// 内建函数调用（游标定位在函数名上）
fn call(cur: &mut TokenCursor, ctx: &mut ExecCtx) -> Result<Value, Diagnostic> {
    let Some(name) = cur.next() else {
        return Err(ctx.statement_error(cur.current_line(), "表达式意外结束"));
    };
    let name = name.clone();
    cur.bump(); // '('

    let mut args = Vec::new();
    if !cur.eat_punct(")") {
        loop {
            args.push(or_expr(cur, ctx)?);
            if cur.eat_punct(",") {
                continue;
            }
            if cur.eat_punct(")") {
                break;
            }
            return Err(ctx.statement_error(
                cur.current_line(),
                format!("函数 '{}' 的参数列表未闭合", name.text),
            ));
        }
    }

    let line = Some(name.line);
    let value = match name.folded.as_str() {
        "hasitem" => {
            let id = arg_string(&args, 0);
            Value::Bool(ctx.world.has_item(&id))
        }
        "getitemqty" => {
            let id = arg_string(&args, 0);
            Value::Int(ctx.world.item_quantity(&id))
        }
        "getvar" => {
            let var = arg_string(&args, 0);
            let default = args.get(1).cloned().unwrap_or(Value::Null);
            ctx.world.get_var(&var).unwrap_or(default)
        }
        "getgold" => Value::Int(ctx.world.gold()),
        "choice" => Value::Int(ctx.last_choice),
        "random" => {
            let (min, max) = match args.len() {
                0 | 1 => (0, args.first().and_then(Value::as_int).unwrap_or(0)),
                _ => (
                    args[0].as_int().unwrap_or(0),
                    args[1].as_int().unwrap_or(0),
                ),
            };
            let (min, max) = if min <= max { (min, max) } else { (max, min) };
            Value::Int(ctx.world.random(min, max))
        }
        other => {
            ctx.warn(line, format!("未知函数 '{}'，求值为 null", other));
            Value::Null
        }
    };

    Ok(value)
}

/// 取第 `index` 个参数的字符串视图，缺参时为空串
fn arg_string(args: &[Value], index: usize) -> String {
    args.get(index).map(Value::display_string).unwrap_or_default()
}

/// 数字字面量解析：无小数点为整数，溢出或含小数点落到浮点
fn parse_number(text: &str) -> Value {
    if !text.contains('.') {
        if let Ok(n) = text.parse::<i64>() {
            return Value::Int(n);
        }
    }
    Value::Float(text.parse::<f64>().unwrap_or(0.0))
}

/// 宽松相等
///
/// 同为字符串按内容比较；`null` 只等于 `null`；
/// 其余组合折算到数字再比较（非数字字符串与任何数字不等）。
pub(crate) fn loose_eq(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Null, _) | (_, Value::Null) => false,
        (Value::String(a), Value::String(b)) => a == b,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => match (left.as_number(), right.as_number()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// 宽松排序
///
/// 同为字符串按字典序；其余折算到数字。无法折算时不可比
/// （所有排序比较返回假）。
pub(crate) fn loose_cmp(left: &Value, right: &Value) -> Option<std::cmp::Ordering> {
    match (left, right) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => {
            let a = left.as_number()?;
            let b = right.as_number()?;
            a.partial_cmp(&b)
        }
    }
}
