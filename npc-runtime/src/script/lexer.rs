//! # 词法分析器
//!
//! 将脚本原文转换为有序的 Token 序列。
//!
//! ## 规则
//!
//! - 跳过空白、`//` 行注释和 `/* */` 块注释
//! - 字符串字面量用 `"` 或 `'` 包裹，支持 `\n` `\t` `\"` `\\` 转义，
//!   其余转义按字面字符处理
//! - 数字为 `[0-9]+(\.[0-9]+)?`，`-` 紧跟数字时折入字面量
//!   （文法没有二元减法，负号不与其他用法冲突）
//! - 双字符运算符优先于单字符标点贪婪匹配
//! - 无法识别的字符记录警告后跳过，词法分析永不失败

use crate::diagnostic::{Diagnostic, DiagnosticResult};
use crate::script::token::{Token, TokenKind, is_reserved};

/// 双字符运算符，按出现顺序贪婪匹配
const OPERATORS: [&str; 6] = ["==", "!=", ">=", "<=", "&&", "||"];

/// 单字符标点集合
const PUNCTUATION: &str = "(){};,:<>=+-*/%!";

/// 词法分析器
///
/// 持有分析过程中产生的诊断，输出始终是完整的 Token 序列。
pub struct Lexer {
    /// 分析过程中的诊断（非致命）
    diagnostics: DiagnosticResult,
}

impl Lexer {
    /// 创建新的词法分析器
    pub fn new() -> Self {
        Self {
            diagnostics: DiagnosticResult::new(),
        }
    }

    /// 获取分析过程中的诊断
    pub fn diagnostics(&self) -> &DiagnosticResult {
        &self.diagnostics
    }

    /// 取走分析过程中的诊断
    pub fn take_diagnostics(&mut self) -> DiagnosticResult {
        std::mem::take(&mut self.diagnostics)
    }

    /// 对脚本文本做词法分析
    ///
    /// # 参数
    ///
    /// - `script_id`: 脚本标识符（用于诊断定位）
    /// - `text`: 脚本原文
    ///
    /// # 返回
    ///
    /// Token 序列。顺序与源文本一致，分析是确定性的、全量的。
    pub fn tokenize(&mut self, script_id: &str, text: &str) -> Vec<Token> {
        self.diagnostics = DiagnosticResult::new();

        let mut scanner = Scanner::new(text);
        let mut tokens: Vec<Token> = Vec::new();

        while let Some(c) = scanner.peek_char() {
            // 空白
            if c.is_whitespace() {
                scanner.consume_char();
                continue;
            }

            // 注释
            if c == '/' {
                if scanner.remaining().starts_with("//") {
                    scanner.skip_line_comment();
                    continue;
                }
                if scanner.remaining().starts_with("/*") {
                    if !scanner.skip_block_comment() {
                        self.warn(script_id, scanner.line, "块注释未闭合，已忽略到文件末尾");
                    }
                    continue;
                }
            }

            // 字符串字面量
            if c == '"' || c == '\'' {
                let line = scanner.line;
                match scanner.read_string_literal(c) {
                    Ok(s) => tokens.push(Token::new(TokenKind::String, s, line)),
                    Err(s) => {
                        self.warn(script_id, line, format!("字符串字面量未闭合，缺少 {}", c));
                        tokens.push(Token::new(TokenKind::String, s, line));
                    }
                }
                continue;
            }

            // 数字字面量：`-` 紧跟数字时作为负号前缀
            let negative_number =
                c == '-' && scanner.peek_second().is_some_and(|n| n.is_ascii_digit());
            if c.is_ascii_digit() || negative_number {
                let line = scanner.line;
                let text = scanner.read_number();
                tokens.push(Token::new(TokenKind::Number, text, line));
                continue;
            }

            // 标识符 / 保留字
            if c.is_ascii_alphabetic() || c == '_' {
                let line = scanner.line;
                let word = scanner.read_identifier();
                let kind = if is_reserved(&word.to_ascii_lowercase()) {
                    TokenKind::Keyword
                } else {
                    TokenKind::Identifier
                };
                tokens.push(Token::new(kind, word, line));
                continue;
            }

            // 双字符运算符（贪婪）
            if let Some(op) = OPERATORS
                .iter()
                .find(|op| scanner.remaining().starts_with(**op))
            {
                let line = scanner.line;
                scanner.consume_char();
                scanner.consume_char();
                tokens.push(Token::new(TokenKind::Operator, *op, line));
                continue;
            }

            // 单字符标点
            if PUNCTUATION.contains(c) {
                let line = scanner.line;
                scanner.consume_char();
                tokens.push(Token::new(TokenKind::Punctuation, c, line));
                continue;
            }

            // 无法识别的字符：跳过并警告
            self.warn(
                script_id,
                scanner.line,
                format!("无法识别的字符 '{}'，已跳过", c),
            );
            scanner.consume_char();
        }

        tokens
    }

    fn warn(&mut self, script_id: &str, line: usize, message: impl Into<String>) {
        let diag = Diagnostic::warn(script_id, message).with_line(line);
        tracing::warn!(target: "npc_runtime::lexer", "{}", diag);
        self.diagnostics.push(diag);
    }
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

/// 字符级扫描器
///
/// 维护字节偏移和行号，所有读取方法都保证 UTF-8 边界安全。
struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    line: usize,
}

impl<'a> Scanner<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            line: 1,
        }
    }

    fn remaining(&self) -> &str {
        &self.input[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.remaining().chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.remaining().chars();
        chars.next();
        chars.next()
    }

    fn consume_char(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    /// 跳过 `//` 行注释（不消费换行符本身）
    fn skip_line_comment(&mut self) {
        while let Some(c) = self.peek_char() {
            if c == '\n' {
                break;
            }
            self.consume_char();
        }
    }

    /// 跳过 `/* */` 块注释，返回是否正常闭合
    fn skip_block_comment(&mut self) -> bool {
        self.consume_char(); // '/'
        self.consume_char(); // '*'
        while !self.remaining().is_empty() {
            if self.remaining().starts_with("*/") {
                self.consume_char();
                self.consume_char();
                return true;
            }
            self.consume_char();
        }
        false
    }

    /// 读取字符串字面量（已定位在开始引号上）
    ///
    /// 返回 `Err` 表示到达文件末尾仍未闭合，内容为已累积的部分。
    fn read_string_literal(&mut self, quote: char) -> Result<String, String> {
        self.consume_char(); // 开始引号
        let mut value = String::new();

        while let Some(c) = self.consume_char() {
            if c == quote {
                return Ok(value);
            }
            if c == '\\' {
                match self.consume_char() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    // 其余转义按字面字符处理（覆盖 \" \' \\）
                    Some(other) => value.push(other),
                    None => break,
                }
                continue;
            }
            value.push(c);
        }

        Err(value)
    }

    /// 读取数字字面量（可带负号前缀）
    fn read_number(&mut self) -> String {
        let start = self.pos;

        if self.peek_char() == Some('-') {
            self.consume_char();
        }
        while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
        }
        // 小数部分：`.` 后必须紧跟数字
        if self.peek_char() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            self.consume_char();
            while self.peek_char().is_some_and(|c| c.is_ascii_digit()) {
                self.consume_char();
            }
        }

        self.input[start..self.pos].to_string()
    }

    /// 读取标识符
    fn read_identifier(&mut self) -> String {
        let start = self.pos;
        while self
            .peek_char()
            .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.consume_char();
        }
        self.input[start..self.pos].to_string()
    }
}
