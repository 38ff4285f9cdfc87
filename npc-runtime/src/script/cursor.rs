//! # Token 游标
//!
//! 表达式求值器和指令分发器共用的只读游标。
//!
//! 所有访问都做边界检查；跳过块/括号的方法在结构不配对时
//! 容错地走到序列末尾，而不是报错。

use crate::script::token::{Token, TokenKind};

/// Token 序列上的游标
///
/// 持有不可变 Token 切片和一个可变位置。执行引擎在每条语句前
/// 从会话状态创建游标，语句结束后把位置写回。
pub struct TokenCursor<'a> {
    tokens: &'a [Token],
    pos: usize,
}

impl<'a> TokenCursor<'a> {
    /// 在指定位置创建游标
    pub fn new(tokens: &'a [Token], pos: usize) -> Self {
        Self { tokens, pos }
    }

    /// 当前位置
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// 跳转到指定位置
    pub fn jump_to(&mut self, pos: usize) {
        self.pos = pos;
    }

    /// 是否已到序列末尾
    pub fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// 查看当前 Token
    pub fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    /// 查看当前位置之后第 `offset` 个 Token
    pub fn peek_ahead(&self, offset: usize) -> Option<&'a Token> {
        self.tokens.get(self.pos + offset)
    }

    /// 前一个 Token 的行号（用于诊断定位）
    pub fn current_line(&self) -> Option<usize> {
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .map(|t| t.line)
    }

    /// 消费并返回当前 Token
    pub fn next(&mut self) -> Option<&'a Token> {
        let token = self.tokens.get(self.pos)?;
        self.pos += 1;
        Some(token)
    }

    /// 前进一个 Token
    pub fn bump(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// 如果当前是指定标点则消费它
    pub fn eat_punct(&mut self, p: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_punct(p)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// 如果当前是指定运算符则消费它
    pub fn eat_operator(&mut self, op: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_operator(op)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// 如果当前是指定保留字则消费它
    pub fn eat_keyword(&mut self, word: &str) -> bool {
        if self.peek().is_some_and(|t| t.is_keyword(word)) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    /// 跳过一个花括号块（游标定位在 `{` 上）
    ///
    /// 按括号深度匹配到对应的 `}` 之后。块不配对时走到末尾。
    pub fn skip_block(&mut self) {
        self.skip_balanced("{", "}");
    }

    /// 跳过一个圆括号组（游标定位在 `(` 上）
    pub fn skip_parens(&mut self) {
        self.skip_balanced("(", ")");
    }

    fn skip_balanced(&mut self, open: &str, close: &str) {
        if !self.peek().is_some_and(|t| t.is_punct(open)) {
            return;
        }
        let mut depth = 0usize;
        while let Some(token) = self.next() {
            if token.is_punct(open) {
                depth += 1;
            } else if token.is_punct(close) {
                depth -= 1;
                if depth == 0 {
                    return;
                }
            }
        }
    }

    /// 重新同步到语句边界
    ///
    /// 跳过 Token 直到消费掉一个 `;`，或停在 `{`/`}` 之前、序列末尾。
    /// 指令参数解析失败后用它丢弃残余参数。
    pub fn resync_to_statement(&mut self) {
        while let Some(token) = self.peek() {
            if token.is_punct(";") {
                self.pos += 1;
                return;
            }
            if token.is_punct("{") || token.is_punct("}") {
                return;
            }
            self.pos += 1;
        }
    }

    /// 当前 Token 是否是指定类别
    pub fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|t| t.kind)
    }
}
