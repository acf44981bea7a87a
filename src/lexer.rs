use pest::iterators::{Pair, Pairs};
use pest::Parser;
use pest_derive::Parser;

use crate::token::{lookup_ident, Token, TokenKind};

#[derive(Parser)]
#[grammar = "ember.pest"]
struct TokenGrammar;

/// Pull-based source of tokens for the parser.
///
/// Once the underlying input is exhausted a source keeps returning [`TokenKind::Eof`].
pub trait TokenSource {
    fn next_token(&mut self) -> Token;
}

impl<I: Iterator<Item = Token>> TokenSource for I {
    fn next_token(&mut self) -> Token {
        self.next().unwrap_or_else(Token::eof)
    }
}

/// Splits source text into tokens, yielding a single `Eof` token at the end.
pub struct Lexer<'a> {
    pairs: Option<Pairs<'a, Rule>>,
    done: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Lexer<'a> {
        let pairs = match TokenGrammar::parse(Rule::tokens, source) {
            Ok(mut pairs) => pairs.next().map(Pair::into_inner),
            Err(error) => {
                tracing::warn!(%error, "token grammar rejected input");
                None
            }
        };
        Lexer { pairs, done: false }
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.done {
            return None;
        }
        match self.pairs.as_mut().and_then(Iterator::next) {
            Some(pair) if pair.as_rule() != Rule::EOI => {
                let token = Token::from(pair);
                tracing::trace!(%token, "lexed");
                Some(token)
            }
            _ => {
                self.done = true;
                Some(Token::eof())
            }
        }
    }
}

impl From<Pair<'_, Rule>> for Token {
    fn from(pair: Pair<'_, Rule>) -> Self {
        let kind = match pair.as_rule() {
            Rule::ident => lookup_ident(pair.as_str()),
            Rule::int => TokenKind::Int,
            Rule::string => {
                let literal = pair
                    .into_inner()
                    .next()
                    .map_or("", |inner| inner.as_str());
                return Token::new(TokenKind::String, literal);
            }
            Rule::eq => TokenKind::Eq,
            Rule::not_eq => TokenKind::NotEq,
            Rule::assign => TokenKind::Assign,
            Rule::plus => TokenKind::Plus,
            Rule::minus => TokenKind::Minus,
            Rule::bang => TokenKind::Bang,
            Rule::asterisk => TokenKind::Asterisk,
            Rule::slash => TokenKind::Slash,
            Rule::lt => TokenKind::Lt,
            Rule::gt => TokenKind::Gt,
            Rule::comma => TokenKind::Comma,
            Rule::semicolon => TokenKind::Semicolon,
            Rule::colon => TokenKind::Colon,
            Rule::lparen => TokenKind::LParen,
            Rule::rparen => TokenKind::RParen,
            Rule::lbrace => TokenKind::LBrace,
            Rule::rbrace => TokenKind::RBrace,
            Rule::lbracket => TokenKind::LBracket,
            Rule::rbracket => TokenKind::RBracket,
            _ => TokenKind::Illegal,
        };
        Token::new(kind, pair.as_str())
    }
}
