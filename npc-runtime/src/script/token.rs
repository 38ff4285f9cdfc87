//! # Token 模块
//!
//! 定义脚本的最小词法单元。
//!
//! ## 设计说明
//!
//! Token 序列是一次脚本运行的**不可变**输入：词法分析器产生它，
//! 标签解析器和解释器只读它。Token 在词法阶段一次性计算好大小写
//! 折叠形式（`folded`），后续的指令名/函数名匹配不再重复折叠。

use serde::{Deserialize, Serialize};

/// 保留字集合
///
/// 命中该集合的标识符被归类为 [`TokenKind::Keyword`]。
pub const KEYWORDS: [&str; 11] = [
    "if", "else", "true", "false", "null", "and", "or", "not", "label", "goto", "end",
];

/// 判断一个（已折叠的）单词是否是保留字
pub fn is_reserved(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

/// Token 类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    /// 字符串字面量（`"..."` 或 `'...'`，已去除引号并处理转义）
    String,
    /// 数字字面量（`[0-9]+(\.[0-9]+)?`，可带负号前缀）
    Number,
    /// 标识符（指令名、变量名、标签名）
    Identifier,
    /// 保留字（见 [`KEYWORDS`]）
    Keyword,
    /// 双字符运算符（`==` `!=` `>=` `<=` `&&` `||`）
    Operator,
    /// 单字符标点（`(){};,:<>=+-*/%!`）
    Punctuation,
}

/// 词法单元
///
/// `text` 保留源文本原样（字符串为解码后的内容），`folded` 是词法阶段
/// 一次性计算的 ASCII 小写形式，供大小写不敏感的名字匹配使用。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Token {
    /// Token 类别
    pub kind: TokenKind,
    /// 原始文本
    pub text: String,
    /// 大小写折叠后的文本
    pub folded: String,
    /// 源代码行号（从 1 开始）
    pub line: usize,
}

impl Token {
    /// 创建新 Token，同时计算折叠形式
    pub fn new(kind: TokenKind, text: impl Into<String>, line: usize) -> Self {
        let text = text.into();
        let folded = text.to_ascii_lowercase();
        Self {
            kind,
            text,
            folded,
            line,
        }
    }

    /// 是否是指定的保留字（按折叠形式比较）
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Keyword && self.folded == word
    }

    /// 是否是指定的双字符运算符
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.text == op
    }

    /// 是否是指定的标点
    pub fn is_punct(&self, p: &str) -> bool {
        self.kind == TokenKind::Punctuation && self.text == p
    }
}
