use thiserror::Error;

use crate::ast::{InfixOp, PrefixOp};
use crate::interpreter::{Object, ObjectKind};

#[derive(Error, Debug)]
pub enum RuntimeError {
    #[error("unknown operator: {operator}{right}")]
    UnknownPrefixOperator {
        operator: PrefixOp,
        right: ObjectKind,
    },

    #[error("unknown operator: {left} {operator} {right}")]
    UnknownInfixOperator {
        left: ObjectKind,
        operator: InfixOp,
        right: ObjectKind,
    },

    #[error("type mismatch: {left} {operator} {right}")]
    TypeMismatch {
        left: ObjectKind,
        operator: InfixOp,
        right: ObjectKind,
    },

    #[error("Dividend=0 illegal!")]
    DivideByZero,

    #[error("identifier not found: {name}")]
    UndefinedVariable { name: String },

    #[error("not a function: {kind}")]
    NotCallable { kind: ObjectKind },

    #[error("wrong number of arguments. got={actual}, want={expected}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("argument to `{function}` not support, got={kind}")]
    UnsupportedArgument {
        function: &'static str,
        kind: ObjectKind,
    },

    #[error("argument to `{function}` must be {expected}, got {actual}")]
    ArgumentMismatch {
        function: &'static str,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    #[error("unusable as hash key: {kind}")]
    UnusableHashKey { kind: ObjectKind },

    #[error("index operator not supported: {kind}")]
    IndexNotSupported { kind: ObjectKind },

    #[error("maximum call depth of {limit} exceeded")]
    CallDepthExceeded { limit: usize },

    #[error("failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T = Object, E = RuntimeError> = std::result::Result<T, E>;
