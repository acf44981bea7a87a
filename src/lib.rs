//! Ember: a small expression-oriented scripting language.
//!
//! Source text flows through [`Lexer`] → [`Parser`] → [`ast::Program`] → [`Runtime`],
//! producing an [`Object`]. Syntax errors are collected by the parser; runtime
//! errors are ordinary [`Object::Error`] values.
//!
//! ```
//! let mut runtime = ember::Runtime::new();
//! runtime.eval_source("let add = fn(a, b) { a + b };").unwrap();
//! assert_eq!(runtime.eval_source("add(2, 3)").unwrap().to_string(), "5");
//! ```

pub mod ast;
pub mod config;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod repl;
mod stack;
pub mod token;

pub use config::Config;
pub use interpreter::{Environment, Object, Runtime, RuntimeError};
pub use lexer::{Lexer, TokenSource};
pub use parser::{parse, ParseError, ParseErrors, Parser};
