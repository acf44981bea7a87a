use std::collections::HashMap;
use std::rc::Rc;
use std::str::FromStr;

use thiserror::Error;

use crate::ast::{
    BlockStatement, Expr, FunctionLiteral, Identifier, InfixOp, PrefixOp, Program, Stmt,
};
use crate::lexer::{Lexer, TokenSource};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("expected next token to be {expected}; got {actual} instead")]
    UnexpectedToken {
        expected: TokenKind,
        actual: TokenKind,
    },

    #[error("no prefix parse function for {kind} found")]
    NoPrefixParseFn { kind: TokenKind },

    #[error("could not parse {literal:?} as integer")]
    InvalidInteger { literal: String },
}

/// Every diagnostic produced while parsing one source text, in order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("parser errors:{}", render_errors(.0))]
pub struct ParseErrors(pub Vec<ParseError>);

fn render_errors(errors: &[ParseError]) -> String {
    errors.iter().map(|error| format!("\n\t{error}")).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Equals,
    LessGreater,
    Sum,
    Product,
    Prefix,
    Call,
}

impl Precedence {
    fn of(kind: TokenKind) -> Precedence {
        match kind {
            TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
            TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
            TokenKind::LParen | TokenKind::LBracket => Precedence::Call,
            _ => Precedence::Lowest,
        }
    }
}

/// Two-token window over a token source.
struct TokenCursor<S> {
    source: S,
    current: Token,
    peek: Token,
}

impl<S: TokenSource> TokenCursor<S> {
    fn new(mut source: S) -> Self {
        let current = source.next_token();
        let peek = source.next_token();
        TokenCursor {
            source,
            current,
            peek,
        }
    }

    fn advance(&mut self) {
        let next = self.source.next_token();
        self.current = std::mem::replace(&mut self.peek, next);
    }

    fn current(&self) -> &Token {
        &self.current
    }

    fn peek(&self) -> &Token {
        &self.peek
    }
}

type PrefixParseFn<S> = fn(&mut Parser<S>) -> Option<Expr>;
type InfixParseFn<S> = fn(&mut Parser<S>, Expr) -> Option<Expr>;

/// Pratt parser producing a [`Program`] plus the diagnostics collected along the way.
pub struct Parser<S> {
    cursor: TokenCursor<S>,
    errors: Vec<ParseError>,
    prefix_parse_fns: HashMap<TokenKind, PrefixParseFn<S>>,
    infix_parse_fns: HashMap<TokenKind, InfixParseFn<S>>,
}

impl<'a> Parser<Lexer<'a>> {
    pub fn from_source(source: &'a str) -> Self {
        Parser::new(Lexer::new(source))
    }
}

impl<S: TokenSource> Parser<S> {
    pub fn new(source: S) -> Self {
        let mut parser = Parser {
            cursor: TokenCursor::new(source),
            errors: Vec::new(),
            prefix_parse_fns: HashMap::new(),
            infix_parse_fns: HashMap::new(),
        };

        parser.register_prefix(TokenKind::Ident, Self::parse_identifier);
        parser.register_prefix(TokenKind::Int, Self::parse_integer_literal);
        parser.register_prefix(TokenKind::String, Self::parse_string_literal);
        parser.register_prefix(TokenKind::True, Self::parse_boolean);
        parser.register_prefix(TokenKind::False, Self::parse_boolean);
        parser.register_prefix(TokenKind::Bang, Self::parse_prefix_expression);
        parser.register_prefix(TokenKind::Minus, Self::parse_prefix_expression);
        parser.register_prefix(TokenKind::LParen, Self::parse_grouped_expression);
        parser.register_prefix(TokenKind::If, Self::parse_if_expression);
        parser.register_prefix(TokenKind::Function, Self::parse_function_literal);
        parser.register_prefix(TokenKind::LBracket, Self::parse_array_literal);
        parser.register_prefix(TokenKind::LBrace, Self::parse_hash_literal);

        for kind in [
            TokenKind::Plus,
            TokenKind::Minus,
            TokenKind::Asterisk,
            TokenKind::Slash,
            TokenKind::Eq,
            TokenKind::NotEq,
            TokenKind::Lt,
            TokenKind::Gt,
        ] {
            parser.register_infix(kind, Self::parse_infix_expression);
        }
        parser.register_infix(TokenKind::LParen, Self::parse_call_expression);
        parser.register_infix(TokenKind::LBracket, Self::parse_index_expression);

        parser
    }

    fn register_prefix(&mut self, kind: TokenKind, function: PrefixParseFn<S>) {
        self.prefix_parse_fns.insert(kind, function);
    }

    fn register_infix(&mut self, kind: TokenKind, function: InfixParseFn<S>) {
        self.infix_parse_fns.insert(kind, function);
    }

    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    pub fn into_errors(self) -> Vec<ParseError> {
        self.errors
    }

    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();
        while !self.cur_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                program.statements.push(stmt);
            }
            self.cursor.advance();
        }
        program
    }

    fn record(&mut self, error: ParseError) {
        tracing::debug!(%error, "syntax error");
        self.errors.push(error);
    }

    fn cur_is(&self, kind: TokenKind) -> bool {
        self.cursor.current().kind == kind
    }

    fn peek_is(&self, kind: TokenKind) -> bool {
        self.cursor.peek().kind == kind
    }

    fn expect_peek(&mut self, kind: TokenKind) -> bool {
        if self.peek_is(kind) {
            self.cursor.advance();
            return true;
        }
        self.record(ParseError::UnexpectedToken {
            expected: kind,
            actual: self.cursor.peek().kind,
        });
        false
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.cursor.peek().kind)
    }

    fn cur_precedence(&self) -> Precedence {
        Precedence::of(self.cursor.current().kind)
    }

    /// Skips the rest of a malformed statement, stopping on its terminator.
    fn synchronize(&mut self) {
        while !self.cur_is(TokenKind::Semicolon) && !self.cur_is(TokenKind::Eof) {
            self.cursor.advance();
        }
    }

    fn current_identifier(&self) -> Identifier {
        Identifier {
            name: self.cursor.current().literal.clone(),
        }
    }

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cursor.current().kind {
            TokenKind::Let => {
                let stmt = self.parse_let_statement();
                if stmt.is_none() {
                    self.synchronize();
                }
                stmt
            }
            TokenKind::Return => {
                let stmt = self.parse_return_statement();
                if stmt.is_none() {
                    self.synchronize();
                }
                stmt
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_let_statement(&mut self) -> Option<Stmt> {
        if !self.expect_peek(TokenKind::Ident) {
            return None;
        }
        let name = self.current_identifier();
        if !self.expect_peek(TokenKind::Assign) {
            return None;
        }
        self.cursor.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(TokenKind::Semicolon) {
            self.cursor.advance();
        }
        Some(Stmt::Let { name, value })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        self.cursor.advance();
        let value = self.parse_expression(Precedence::Lowest)?;
        if self.peek_is(TokenKind::Semicolon) {
            self.cursor.advance();
        }
        Some(Stmt::Return { value })
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let expr = self.parse_expression(Precedence::Lowest);
        if self.peek_is(TokenKind::Semicolon) {
            self.cursor.advance();
        }
        expr.map(|expr| Stmt::Expr { expr })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        ensure_sufficient_stack(|| {
            let kind = self.cursor.current().kind;
            let Some(prefix) = self.prefix_parse_fns.get(&kind).copied() else {
                self.record(ParseError::NoPrefixParseFn { kind });
                return None;
            };
            let mut left = prefix(self)?;

            while !self.peek_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
                let Some(infix) = self.infix_parse_fns.get(&self.cursor.peek().kind).copied()
                else {
                    return Some(left);
                };
                self.cursor.advance();
                left = infix(self, left)?;
            }
            Some(left)
        })
    }

    fn parse_identifier(&mut self) -> Option<Expr> {
        Some(Expr::Identifier(self.current_identifier()))
    }

    fn parse_integer_literal(&mut self) -> Option<Expr> {
        let literal = self.cursor.current().literal.clone();
        match literal.parse() {
            Ok(value) => Some(Expr::Integer { value, literal }),
            Err(_) => {
                self.record(ParseError::InvalidInteger { literal });
                None
            }
        }
    }

    fn parse_string_literal(&mut self) -> Option<Expr> {
        Some(Expr::String(self.cursor.current().literal.clone()))
    }

    fn parse_boolean(&mut self) -> Option<Expr> {
        Some(Expr::Boolean(self.cur_is(TokenKind::True)))
    }

    fn parse_prefix_expression(&mut self) -> Option<Expr> {
        let operator = match self.cursor.current().kind {
            TokenKind::Bang => PrefixOp::Bang,
            _ => PrefixOp::Minus,
        };
        self.cursor.advance();
        let right = self.parse_expression(Precedence::Prefix)?;
        Some(Expr::Prefix {
            operator,
            right: Box::new(right),
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.cursor.advance();
        let expr = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(expr)
    }

    fn parse_if_expression(&mut self) -> Option<Expr> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        self.cursor.advance();
        let condition = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RParen) || !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let consequence = self.parse_block_statement();

        let mut alternative = None;
        if self.peek_is(TokenKind::Else) {
            self.cursor.advance();
            if !self.expect_peek(TokenKind::LBrace) {
                return None;
            }
            alternative = Some(self.parse_block_statement());
        }

        Some(Expr::If {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    fn parse_block_statement(&mut self) -> BlockStatement {
        let mut block = BlockStatement::default();
        self.cursor.advance();
        while !self.cur_is(TokenKind::RBrace) && !self.cur_is(TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                block.statements.push(stmt);
            }
            self.cursor.advance();
        }
        block
    }

    fn parse_function_literal(&mut self) -> Option<Expr> {
        if !self.expect_peek(TokenKind::LParen) {
            return None;
        }
        let parameters = self.parse_function_parameters()?;
        if !self.expect_peek(TokenKind::LBrace) {
            return None;
        }
        let body = self.parse_block_statement();
        Some(Expr::Function(Rc::new(FunctionLiteral { parameters, body })))
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<Identifier>> {
        let mut parameters = Vec::new();
        if self.peek_is(TokenKind::RParen) {
            self.cursor.advance();
            return Some(parameters);
        }
        loop {
            if !self.expect_peek(TokenKind::Ident) {
                return None;
            }
            parameters.push(self.current_identifier());
            if !self.peek_is(TokenKind::Comma) {
                break;
            }
            self.cursor.advance();
        }
        if !self.expect_peek(TokenKind::RParen) {
            return None;
        }
        Some(parameters)
    }

    fn parse_array_literal(&mut self) -> Option<Expr> {
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Some(Expr::Array { elements })
    }

    fn parse_hash_literal(&mut self) -> Option<Expr> {
        let mut pairs = Vec::new();
        while !self.peek_is(TokenKind::RBrace) {
            self.cursor.advance();
            let key = self.parse_expression(Precedence::Lowest)?;
            if !self.expect_peek(TokenKind::Colon) {
                return None;
            }
            self.cursor.advance();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));
            if !self.peek_is(TokenKind::RBrace) && !self.expect_peek(TokenKind::Comma) {
                return None;
            }
        }
        if !self.expect_peek(TokenKind::RBrace) {
            return None;
        }
        Some(Expr::Hash { pairs })
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let operator = match self.cursor.current().kind {
            TokenKind::Plus => InfixOp::Add,
            TokenKind::Minus => InfixOp::Subtract,
            TokenKind::Asterisk => InfixOp::Multiply,
            TokenKind::Slash => InfixOp::Divide,
            TokenKind::Lt => InfixOp::Less,
            TokenKind::Gt => InfixOp::Greater,
            TokenKind::Eq => InfixOp::Equal,
            _ => InfixOp::NotEqual,
        };
        let precedence = self.cur_precedence();
        self.cursor.advance();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    fn parse_call_expression(&mut self, function: Expr) -> Option<Expr> {
        let arguments = self.parse_expression_list(TokenKind::RParen)?;
        Some(Expr::Call {
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expr) -> Option<Expr> {
        self.cursor.advance();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !self.expect_peek(TokenKind::RBracket) {
            return None;
        }
        Some(Expr::Index {
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    fn parse_expression_list(&mut self, end: TokenKind) -> Option<Vec<Expr>> {
        let mut list = Vec::new();
        if self.peek_is(end) {
            self.cursor.advance();
            return Some(list);
        }

        self.cursor.advance();
        list.push(self.parse_expression(Precedence::Lowest)?);
        while self.peek_is(TokenKind::Comma) {
            self.cursor.advance();
            self.cursor.advance();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if !self.expect_peek(end) {
            return None;
        }
        Some(list)
    }
}

/// Parses a whole token stream, returning the program together with every diagnostic.
pub fn parse<S: TokenSource>(tokens: S) -> (Program, Vec<ParseError>) {
    let mut parser = Parser::new(tokens);
    let program = parser.parse_program();
    (program, parser.into_errors())
}

impl FromStr for Program {
    type Err = ParseErrors;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        let (program, errors) = parse(Lexer::new(source));
        if !errors.is_empty() {
            return Err(ParseErrors(errors));
        }
        Ok(program)
    }
}
