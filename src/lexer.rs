//! This module provides the token source of the interpreter. It scans raw script text into
//! [`Token`]s on demand and supports arbitrary lookahead and backtracking through
//! [`Checkpoint`]s, so the parser can try one grammar alternative after another from the
//! same position.

use crate::types::InterpreterError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"^[^\S\r\n]+").unwrap();
    static ref PRINT: Regex = Regex::new(r"^print\(").unwrap();
    static ref AUTOMATON: Regex = Regex::new(r"^(DFA|NFA|DTM)\(").unwrap();
    static ref FUNCTION: Regex = Regex::new(r"^(open|save|test|definition)\(").unwrap();
    static ref BOOLEAN: Regex = Regex::new(r"^(True|False)\b").unwrap();
    static ref VARIABLE: Regex = Regex::new(r"^[a-zA-Z_]+").unwrap();
    static ref DOUBLE_QUOTED: Regex = Regex::new(r#"^"(?:\\.|[^"\\\n])*""#).unwrap();
    static ref SINGLE_QUOTED: Regex = Regex::new(r"^'(?:\\.|[^'\\\n])*'").unwrap();
    static ref INTEGER: Regex = Regex::new(r"^\d+").unwrap();
}

/// The category of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenKind {
    Eof,
    Eol,
    String,
    Variable,
    Integer,
    Boolean,
    Print,
    /// `DFA`, `NFA` or `DTM` directly followed by `(`.
    Automaton,
    /// One of the reserved function names directly followed by `(`.
    FunctionCall,
    /// Any other single character: punctuation and operators.
    Literal,
}

/// A scanned token. Two tokens are equal when their kind and text are; the position is
/// only carried along for error messages.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: usize,
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>) -> Self {
        Self {
            kind,
            text: text.into(),
            line: 0,
            column: 0,
        }
    }

    /// Shorthand for a single-character punctuation token.
    pub fn literal(c: char) -> Self {
        Self::new(TokenKind::Literal, c.to_string())
    }

    /// Returns true if this is the punctuation token `c`.
    pub fn is_literal(&self, c: char) -> bool {
        self.kind == TokenKind::Literal && self.text.chars().eq(std::iter::once(c))
    }

    /// Returns true if the token ends a statement.
    pub fn is_boundary(&self) -> bool {
        matches!(self.kind, TokenKind::Eol | TokenKind::Eof)
    }

    fn at(mut self, cursor: Cursor) -> Self {
        self.line = cursor.line;
        self.column = cursor.column;
        self
    }
}

impl PartialEq for Token {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.text == other.text
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => f.write_str("end of input"),
            TokenKind::Eol => f.write_str("end of line"),
            _ => write!(f, "'{}'", self.text),
        }
    }
}

/// A scan position. Lines and columns are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Cursor {
    offset: usize,
    line: usize,
    column: usize,
}

impl Default for Cursor {
    fn default() -> Self {
        Self {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

/// An opaque saved scan position, obtained from [`Lexer::checkpoint`] and handed back to
/// [`Lexer::rewind`] to undo everything scanned since.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Checkpoint(Cursor);

/// On-demand scanner over a script text.
#[derive(Debug, Default)]
pub struct Lexer {
    text: String,
    cursor: Cursor,
}

impl Lexer {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            cursor: Cursor::default(),
        }
    }

    /// Replaces the text being scanned and moves back to its start.
    pub fn load(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = Cursor::default();
    }

    /// The 1-based line the scanner is on.
    pub fn line(&self) -> usize {
        self.cursor.line
    }

    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint(self.cursor)
    }

    pub fn rewind(&mut self, checkpoint: Checkpoint) {
        self.cursor = checkpoint.0;
    }

    /// Scans and consumes the next token.
    ///
    /// Rules are tried in a fixed order and the first one that matches wins: end of input,
    /// end of line, whitespace (skipped), `print(`, automaton keywords, reserved function
    /// names, booleans, identifiers, quoted strings, integers and finally any single
    /// character. Keyword rules only consume the word, the `(` is scanned on its own.
    pub fn get_token(&mut self) -> Token {
        loop {
            let start = self.cursor;
            let tail = &self.text[start.offset..];

            let Some(current) = tail.chars().next() else {
                return Token::new(TokenKind::Eof, "").at(start);
            };

            if current == '\n' || tail.starts_with("\r\n") {
                let width = if current == '\n' { 1 } else { 2 };
                self.cursor = Cursor {
                    offset: start.offset + width,
                    line: start.line + 1,
                    column: 1,
                };
                return Token::new(TokenKind::Eol, "").at(start);
            }

            if let Some(m) = WHITESPACE.find(tail) {
                let skipped = m.as_str().to_string();
                self.advance(&skipped);
                continue;
            }

            let token = if let Some(m) = PRINT.find(tail) {
                Token::new(TokenKind::Print, keyword(m.as_str()))
            } else if let Some(m) = AUTOMATON.find(tail) {
                Token::new(TokenKind::Automaton, keyword(m.as_str()))
            } else if let Some(m) = FUNCTION.find(tail) {
                Token::new(TokenKind::FunctionCall, keyword(m.as_str()))
            } else if let Some(m) = BOOLEAN.find(tail) {
                Token::new(TokenKind::Boolean, m.as_str())
            } else if let Some(m) = VARIABLE.find(tail) {
                Token::new(TokenKind::Variable, m.as_str())
            } else if let Some(m) = DOUBLE_QUOTED.find(tail).or_else(|| SINGLE_QUOTED.find(tail)) {
                Token::new(TokenKind::String, m.as_str())
            } else if let Some(m) = INTEGER.find(tail) {
                Token::new(TokenKind::Integer, m.as_str())
            } else {
                Token::new(TokenKind::Literal, current.to_string())
            };

            let text = token.text.clone();
            self.advance(&text);
            return token.at(start);
        }
    }

    /// Returns the `n`-th upcoming token (1-based) without consuming anything.
    pub fn peek_token(&mut self, n: usize) -> Token {
        let checkpoint = self.checkpoint();
        let mut token = self.get_token();
        for _ in 1..n {
            token = self.get_token();
        }
        self.rewind(checkpoint);
        token
    }

    /// Consumes the next token, failing unless it equals `expected`.
    pub fn discard(&mut self, expected: &Token) -> Result<(), InterpreterError> {
        let token = self.get_token();
        if &token != expected {
            return Err(lexical_error(
                format!("Expected token {}, found {}", expected, token),
                &token,
            ));
        }
        Ok(())
    }

    /// Consumes the next token, failing unless it is of kind `expected`.
    pub fn discard_type(&mut self, expected: TokenKind) -> Result<(), InterpreterError> {
        let token = self.get_token();
        if token.kind != expected {
            return Err(lexical_error(
                format!("Expected token of type {:?}, found {:?}", expected, token.kind),
                &token,
            ));
        }
        Ok(())
    }

    /// Scans the whole remaining text. Mostly useful for debugging and tests.
    pub fn tokens(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.get_token();
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return tokens;
            }
        }
    }

    fn advance(&mut self, consumed: &str) {
        self.cursor.offset += consumed.len();
        self.cursor.column += consumed.chars().count();
    }
}

/// Strips the trailing `(` from a keyword match.
fn keyword(matched: &str) -> &str {
    matched.trim_end_matches('(')
}

fn lexical_error(message: String, token: &Token) -> InterpreterError {
    InterpreterError::Lexical {
        message,
        line: token.line,
        column: token.column,
    }
}
