//! This module provides the recursive-descent parser for Automython scripts.
//!
//! The parser pulls tokens from a [`Lexer`] and builds one [`Node`] per statement line.
//! Grammar alternatives are tried in order with [`Parser::attempt`]: the token source is
//! checkpointed before an alternative starts and rewound if it fails, so the next
//! alternative starts from the same token.

use crate::{
    ast::{Function, Node},
    lexer::{Lexer, Token, TokenKind},
    types::{AutomatonKind, InterpreterError},
};
use log::debug;

type ParseResult<T> = Result<T, InterpreterError>;

/// A grammar production, named for diagnostics.
type Rule = (&'static str, fn(&mut Parser) -> ParseResult<Node>);

/// Parses the given script into its statements, failing on the first syntax error.
///
/// Blank lines between statements are skipped. This is the non-interactive entry point;
/// the interpreter drives [`Parser::parse_line`] itself so it can recover after a failed line.
pub fn parse(input: &str) -> Result<Vec<Node>, InterpreterError> {
    let mut parser = Parser::new(input);
    let mut statements = Vec::new();

    parser.skip_blank_lines();
    while !parser.at_end() {
        statements.push(parser.parse_line()?);
        parser.skip_blank_lines();
    }

    Ok(statements)
}

#[derive(Debug, Default)]
pub struct Parser {
    lexer: Lexer,
}

impl Parser {
    pub fn new(input: &str) -> Self {
        Self {
            lexer: Lexer::new(input),
        }
    }

    /// Replaces the text being parsed.
    pub fn load(&mut self, input: &str) {
        self.lexer.load(input);
    }

    pub fn lexer(&mut self) -> &mut Lexer {
        &mut self.lexer
    }

    /// Returns true once only the end of input is left.
    pub fn at_end(&mut self) -> bool {
        self.lexer.peek_token(1).kind == TokenKind::Eof
    }

    /// Consumes any run of end-of-line tokens.
    pub fn skip_blank_lines(&mut self) {
        while self.lexer.peek_token(1).kind == TokenKind::Eol {
            self.lexer.get_token();
        }
    }

    /// Parses one statement.
    ///
    /// The alternatives are tried in order: a standalone function call, a `print(...)`
    /// statement, an assignment, a receiver-qualified function call and a bare expression.
    /// The first one that parses up to the end of the line wins. If none does, the error of
    /// the alternative that got furthest is returned and the rest of the statement is skipped,
    /// so the token source is left at the end of its last line.
    pub fn parse_line(&mut self) -> ParseResult<Node> {
        let alternatives: [Rule; 5] = [
            ("standalone call", |p| p.statement(Self::parse_standalone_call)),
            ("print", |p| p.statement(Self::parse_print)),
            ("assignment", |p| p.statement(Self::parse_assignment)),
            ("function call", |p| p.statement(Self::parse_function)),
            ("expression", |p| p.statement(Self::parse_expression)),
        ];

        let result = self.first_of(&alternatives);
        if result.is_err() {
            self.skip_line();
        }
        result
    }

    /// Runs `rule`, rewinding the token source if it fails.
    pub fn attempt<T>(&mut self, rule: impl FnOnce(&mut Self) -> ParseResult<T>) -> ParseResult<T> {
        let checkpoint = self.lexer.checkpoint();
        let result = rule(self);
        if result.is_err() {
            self.lexer.rewind(checkpoint);
        }
        result
    }

    /// Tries each rule in turn and returns the first success, or the furthest failure.
    fn first_of(&mut self, rules: &[Rule]) -> ParseResult<Node> {
        let mut furthest: Option<InterpreterError> = None;

        for (name, rule) in rules {
            match self.attempt(|p| rule(p)) {
                Ok(node) => {
                    debug!("parsed {name} at line {}", self.lexer.line());
                    return Ok(node);
                }
                Err(error) => {
                    debug!("{name} did not match: {error}");
                    furthest = Some(match furthest {
                        Some(previous) if position(&previous) >= position(&error) => previous,
                        _ => error,
                    });
                }
            }
        }

        match furthest {
            Some(error) => Err(error),
            None => {
                let token = self.lexer.peek_token(1);
                Err(syntax_error("No grammar alternative matched", &token))
            }
        }
    }

    fn statement(&mut self, rule: fn(&mut Self) -> ParseResult<Node>) -> ParseResult<Node> {
        let node = rule(self)?;
        let next = self.lexer.peek_token(1);
        if !next.is_boundary() {
            return Err(syntax_error("Expected end of statement", &next));
        }
        Ok(node)
    }

    /// Skips the rest of a failed statement. Line breaks inside open brackets belong to the
    /// statement, so a broken multi-line literal is skipped as a whole.
    fn skip_line(&mut self) {
        let mut depth = 0usize;
        loop {
            let token = self.lexer.peek_token(1);
            if token.kind == TokenKind::Eof || (depth == 0 && token.is_boundary()) {
                return;
            }
            if token.is_literal('(') || token.is_literal('{') {
                depth += 1;
            } else if token.is_literal(')') || token.is_literal('}') {
                depth = depth.saturating_sub(1);
            }
            self.lexer.get_token();
        }
    }

    /// `print(...)`; the argument may be a standalone call, a qualified call, a collection,
    /// an expression or nothing at all.
    fn parse_print(&mut self) -> ParseResult<Node> {
        self.expect_kind(TokenKind::Print)?;

        let arguments: [Rule; 5] = [
            ("print standalone call", |p| {
                p.parenthesized(Self::parse_standalone_call)
            }),
            ("print function call", |p| p.parenthesized(Self::parse_function)),
            ("print collection", |p| p.parenthesized(Self::parse_collection)),
            ("print expression", |p| p.parenthesized(Self::parse_expression)),
            ("print nothing", |p| {
                p.parenthesized(|_| Ok(Node::Parameters { elements: vec![] }))
            }),
        ];

        let value = self.first_of(&arguments)?;
        Ok(Node::Print {
            value: Box::new(value),
        })
    }

    /// `name = value`, where a two-token lookahead picks the kind of value.
    fn parse_assignment(&mut self) -> ParseResult<Node> {
        let name = self.parse_variable_name()?;
        self.expect_literal('=')?;

        let next = self.lexer.peek_token(1);
        if next.is_boundary() {
            return Err(syntax_error("Assignment has undefined value", &next));
        }

        let value = if self.lexer.peek_token(2).is_literal('.') {
            self.parse_function()?
        } else if next.kind == TokenKind::Automaton {
            self.parse_automaton()?
        } else if next.is_literal('{') {
            self.parse_collection()?
        } else {
            self.parse_expression()?
        };

        Ok(Node::Assignment {
            name,
            value: Box::new(value),
        })
    }

    /// `receiver.function(arguments)`
    fn parse_function(&mut self) -> ParseResult<Node> {
        let receiver = self.parse_variable_name()?;
        self.expect_literal('.')?;
        let function = self.parse_function_name()?;
        let args = self.parse_arguments()?;

        Ok(Node::FunctionCall {
            receiver: Some(receiver),
            function,
            args,
        })
    }

    /// `function(arguments)` without a receiver.
    fn parse_standalone_call(&mut self) -> ParseResult<Node> {
        let function = self.parse_function_name()?;
        let args = self.parse_arguments()?;

        Ok(Node::FunctionCall {
            receiver: None,
            function,
            args,
        })
    }

    fn parse_function_name(&mut self) -> ParseResult<Function> {
        let token = self.expect_kind(TokenKind::FunctionCall)?;
        token
            .text
            .parse()
            .map_err(|message: String| syntax_error(&message, &token))
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Node>> {
        self.expect_literal('(')?;
        self.skip_blank_lines();
        let args = if self.lexer.peek_token(1).is_literal(')') {
            Vec::new()
        } else {
            self.parse_parameter_list()?
        };
        self.skip_blank_lines();
        self.expect_literal(')')?;
        Ok(args)
    }

    /// A comma separated list of collections or expressions.
    fn parse_parameter_list(&mut self) -> ParseResult<Vec<Node>> {
        let mut parameters = Vec::new();

        loop {
            let parameter = if self.lexer.peek_token(1).is_literal('{') {
                self.parse_collection()?
            } else {
                self.parse_expression()?
            };
            parameters.push(parameter);

            if !self.lexer.peek_token(1).is_literal(',') {
                return Ok(parameters);
            }
            self.lexer.get_token();
            self.skip_blank_lines();
        }
    }

    /// `DFA(...)`, `NFA(...)` or `DTM(...)`
    fn parse_automaton(&mut self) -> ParseResult<Node> {
        let token = self.expect_kind(TokenKind::Automaton)?;
        let kind = AutomatonKind::from_keyword(&token.text)
            .ok_or_else(|| syntax_error("Not a supported automaton", &token))?;

        let elements = self.parse_arguments()?;
        Ok(Node::Automaton { kind, elements })
    }

    /// `{ element, ... }`
    fn parse_collection(&mut self) -> ParseResult<Node> {
        self.expect_literal('{')?;
        self.skip_blank_lines();

        let mut elements = Vec::new();
        if !self.lexer.peek_token(1).is_literal('}') {
            loop {
                elements.push(self.parse_element()?);
                self.skip_blank_lines();
                if !self.lexer.peek_token(1).is_literal(',') {
                    break;
                }
                self.lexer.get_token();
                self.skip_blank_lines();
            }
        }

        self.expect_literal('}')?;
        Ok(Node::Collection { elements })
    }

    /// An expression, optionally followed by `: value` to form a dictionary entry.
    fn parse_element(&mut self) -> ParseResult<Node> {
        let key = self.parse_expression()?;

        if !self.lexer.peek_token(1).is_literal(':') {
            return Ok(key);
        }
        self.lexer.get_token();
        self.skip_blank_lines();

        let value = if self.lexer.peek_token(1).is_literal('{') {
            self.parse_collection()?
        } else {
            self.parse_expression()?
        };

        Ok(Node::Dictionary {
            key: Box::new(key),
            value: Box::new(value),
        })
    }

    /// `factor ('+' expression)?`, so `+` associates to the right.
    fn parse_expression(&mut self) -> ParseResult<Node> {
        let left = self.parse_factor()?;

        if !self.lexer.peek_token(1).is_literal('+') {
            return Ok(left);
        }
        self.lexer.get_token();
        let right = self.parse_expression()?;

        Ok(Node::Binary {
            left: Box::new(left),
            operator: '+',
            right: Box::new(right),
        })
    }

    fn parse_factor(&mut self) -> ParseResult<Node> {
        let token = self.lexer.peek_token(1);

        match token.kind {
            TokenKind::Literal if token.is_literal('(') => self.parse_group(),
            TokenKind::Variable => Ok(Node::Variable {
                name: self.parse_variable_name()?,
            }),
            TokenKind::Integer => {
                self.lexer.get_token();
                let value = token
                    .text
                    .parse()
                    .map_err(|_| syntax_error("Integer literal out of range", &token))?;
                Ok(Node::Integer { value })
            }
            TokenKind::Boolean => {
                self.lexer.get_token();
                Ok(Node::Boolean {
                    value: token.text == "True",
                })
            }
            TokenKind::String => {
                self.lexer.get_token();
                Ok(Node::String {
                    value: unquote(&token.text),
                })
            }
            _ => Err(syntax_error("Expected a value", &token)),
        }
    }

    /// `( expression )` groups, `( expression, expression, ... )` builds a tuple.
    fn parse_group(&mut self) -> ParseResult<Node> {
        self.expect_literal('(')?;
        self.skip_blank_lines();

        let first = self.parse_expression()?;
        self.skip_blank_lines();
        if !self.lexer.peek_token(1).is_literal(',') {
            self.expect_literal(')')?;
            return Ok(first);
        }

        let mut elements = vec![first];
        while self.lexer.peek_token(1).is_literal(',') {
            self.lexer.get_token();
            self.skip_blank_lines();
            elements.push(self.parse_expression()?);
            self.skip_blank_lines();
        }

        self.expect_literal(')')?;
        Ok(Node::Tuple { elements })
    }

    fn parenthesized(
        &mut self,
        inner: impl FnOnce(&mut Self) -> ParseResult<Node>,
    ) -> ParseResult<Node> {
        self.expect_literal('(')?;
        let node = inner(self)?;
        self.expect_literal(')')?;
        Ok(node)
    }

    fn parse_variable_name(&mut self) -> ParseResult<String> {
        Ok(self.expect_kind(TokenKind::Variable)?.text)
    }

    /// Consumes a token of `kind`. A mismatch is reported as a syntax error at that token.
    fn expect_kind(&mut self, kind: TokenKind) -> ParseResult<Token> {
        let token = self.lexer.peek_token(1);
        self.lexer
            .discard_type(kind)
            .map_err(|_| syntax_error("Unexpected value", &token))?;
        Ok(token)
    }

    fn expect_literal(&mut self, c: char) -> ParseResult<()> {
        let token = self.lexer.peek_token(1);
        self.lexer
            .discard(&Token::literal(c))
            .map_err(|_| syntax_error(&format!("Expected '{c}'"), &token))
    }
}

fn syntax_error(message: &str, token: &Token) -> InterpreterError {
    InterpreterError::Syntax {
        message: message.to_string(),
        found: token.to_string(),
        line: token.line,
        column: token.column,
    }
}

fn position(error: &InterpreterError) -> (usize, usize) {
    match error {
        InterpreterError::Syntax { line, column, .. }
        | InterpreterError::Lexical { line, column, .. } => (*line, *column),
        _ => (0, 0),
    }
}

/// Removes the surrounding quotes of a string token and resolves backslash escapes.
fn unquote(text: &str) -> String {
    let inner = &text[1..text.len() - 1];
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some(escaped) => value.push(escaped),
            None => value.push('\\'),
        }
    }

    value
}
