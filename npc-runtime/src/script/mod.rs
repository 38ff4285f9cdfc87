//! # Script 模块
//!
//! 脚本的词法层：Token 定义、词法分析器、标签解析和游标。
//!
//! ## 模块结构
//!
//! - [`token`]：Token 和类别定义
//! - [`lexer`]：词法分析器
//! - [`cursor`]：Token 序列上的游标
//!
//! 本引擎不构建语法树：解释器直接在 Token 序列上推进游标执行，
//! 标签表把 `goto` 的目标名映射到 Token 下标。

pub mod cursor;
pub mod lexer;
pub mod token;

pub use cursor::TokenCursor;
pub use lexer::Lexer;
pub use token::{Token, TokenKind};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::diagnostic::{Diagnostic, DiagnosticResult};

/// 解析后的脚本
///
/// 持有一次运行的 Token 序列和标签表。多个 NPC 复用同一段脚本文本时，
/// 可以共享同一个 `Script`（内容不可变），各自持有独立的会话状态。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// 脚本标识符
    pub id: String,
    /// Token 序列（不可变，顺序即源文本顺序）
    pub tokens: Vec<Token>,
    /// 标签名到 Token 下标的映射
    #[serde(skip)]
    labels: HashMap<String, usize>,
}

impl Script {
    /// 从 Token 序列创建脚本（构建标签表，丢弃标签诊断）
    pub fn new(id: impl Into<String>, tokens: Vec<Token>) -> Self {
        let id = id.into();
        let (labels, _) = resolve_labels(&id, &tokens);
        Self { id, tokens, labels }
    }

    /// 解析脚本文本
    ///
    /// 词法分析 + 标签解析，两步的诊断合并返回。
    /// 解析永不失败：无法识别的内容降级为诊断。
    pub fn parse(id: impl Into<String>, text: &str) -> (Self, DiagnosticResult) {
        let id = id.into();

        let mut lexer = Lexer::new();
        let tokens = lexer.tokenize(&id, text);
        let mut diagnostics = lexer.take_diagnostics();

        let (labels, label_diags) = resolve_labels(&id, &tokens);
        diagnostics.merge(label_diags);

        (Self { id, tokens, labels }, diagnostics)
    }

    /// 根据标签名查找跳转目标（冒号之后的 Token 下标）
    pub fn find_label(&self, name: &str) -> Option<usize> {
        self.labels.get(name).copied()
    }

    /// 获取指定下标的 Token
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    /// Token 数量
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// 是否为空
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// 已定义的标签名
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }
}

/// 标签解析：单次前向遍历
///
/// 识别 `label NAME :` 三连 Token，记录 `NAME -> 冒号之后的下标`。
/// 重名标签后者覆盖前者（记录警告但不拒绝）。残缺的 `label`
/// 声明记录警告后忽略，由解释器按普通 Token 容错处理。
pub fn resolve_labels(
    script_id: &str,
    tokens: &[Token],
) -> (HashMap<String, usize>, DiagnosticResult) {
    let mut labels = HashMap::new();
    let mut diagnostics = DiagnosticResult::new();

    for (index, token) in tokens.iter().enumerate() {
        if !token.is_keyword("label") {
            continue;
        }

        let name = tokens.get(index + 1);
        let colon = tokens.get(index + 2);
        match (name, colon) {
            (Some(name), Some(colon))
                if name.kind == TokenKind::Identifier && colon.is_punct(":") =>
            {
                if let Some(previous) = labels.insert(name.text.clone(), index + 3) {
                    let diag = Diagnostic::warn(
                        script_id,
                        format!("标签 '{}' 重复定义，后者生效", name.text),
                    )
                    .with_line(name.line)
                    .with_detail(format!("先前定义在 Token 下标 {}", previous - 3));
                    tracing::warn!(target: "npc_runtime::labels", "{}", diag);
                    diagnostics.push(diag);
                }
            }
            _ => {
                let diag = Diagnostic::warn(script_id, "残缺的 label 声明，期望 `label 名字 :`")
                    .with_line(token.line);
                tracing::warn!(target: "npc_runtime::labels", "{}", diag);
                diagnostics.push(diag);
            }
        }
    }

    (labels, diagnostics)
}
