use std::fmt::{Debug, Display, Formatter};
use std::mem;
use std::ops::Deref;
use std::rc::Rc;

pub use environment::Environment;
pub use error::RuntimeError;
pub use hash::{HashKey, HashObject, HashPair};
pub use runtime::{eval_program, Evaluator, Runtime};

use crate::ast::FunctionLiteral;
use crate::stack::ensure_sufficient_stack;

mod environment;
mod error;
mod hash;
mod runtime;
mod stdlib;

/// A runtime value.
#[derive(Clone, Debug)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    String(String),
    Null,
    /// Carries a `return` value out of nested blocks; unwrapped by function
    /// application and at the top of a program.
    ReturnValue(Box<Object>),
    Error(String),
    Function(Rc<Function>),
    Builtin(Builtin),
    Array(Rc<ArrayObject>),
    Hash(Rc<HashObject>),
}

pub const TRUE: Object = Object::Boolean(true);
pub const FALSE: Object = Object::Boolean(false);
pub const NULL: Object = Object::Null;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Integer,
    Boolean,
    String,
    Null,
    ReturnValue,
    Error,
    Function,
    Builtin,
    Array,
    Hash,
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ObjectKind::Integer => "INTEGER",
            ObjectKind::Boolean => "BOOLEAN",
            ObjectKind::String => "STRING",
            ObjectKind::Null => "NULL",
            ObjectKind::ReturnValue => "RETURN_VALUE",
            ObjectKind::Error => "ERROR",
            ObjectKind::Function => "FUNCTION",
            ObjectKind::Builtin => "BUILTIN",
            ObjectKind::Array => "ARRAY",
            ObjectKind::Hash => "HASH",
        };
        write!(f, "{name}")
    }
}

/// A user-defined function closed over the environment it was defined in.
pub struct Function {
    pub literal: Rc<FunctionLiteral>,
    pub env: Rc<Environment>,
}

impl Debug for Function {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Function")
            .field("literal", &self.literal)
            .finish_non_exhaustive()
    }
}

/// Elements of an array value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArrayObject(Vec<Object>);

impl ArrayObject {
    pub fn as_slice(&self) -> &[Object] {
        &self.0
    }
}

impl Deref for ArrayObject {
    type Target = [Object];

    fn deref(&self) -> &[Object] {
        &self.0
    }
}

impl From<Vec<Object>> for ArrayObject {
    fn from(elements: Vec<Object>) -> Self {
        ArrayObject(elements)
    }
}

impl Drop for ArrayObject {
    fn drop(&mut self) {
        release_nested(mem::take(&mut self.0));
    }
}

/// Frees nested arrays and hashes one level at a time, so that dropping a
/// deeply nested value takes constant stack.
fn release_nested(mut pending: Vec<Object>) {
    while let Some(object) = pending.pop() {
        match object {
            Object::Array(elements) => {
                if let Ok(mut elements) = Rc::try_unwrap(elements) {
                    pending.append(&mut elements.0);
                }
            }
            Object::Hash(hash) => {
                if let Ok(mut hash) = Rc::try_unwrap(hash) {
                    pending.extend(hash.take_values());
                }
            }
            Object::ReturnValue(value) => pending.push(*value),
            _ => {}
        }
    }
}

pub type BuiltinFunction = fn(Vec<Object>) -> error::Result;

#[derive(Clone, Copy, Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub function: BuiltinFunction,
}

impl Object {
    pub fn array(elements: Vec<Object>) -> Object {
        Object::Array(Rc::new(ArrayObject::from(elements)))
    }

    pub fn kind(&self) -> ObjectKind {
        match self {
            Object::Integer(_) => ObjectKind::Integer,
            Object::Boolean(_) => ObjectKind::Boolean,
            Object::String(_) => ObjectKind::String,
            Object::Null => ObjectKind::Null,
            Object::ReturnValue(_) => ObjectKind::ReturnValue,
            Object::Error(_) => ObjectKind::Error,
            Object::Function(_) => ObjectKind::Function,
            Object::Builtin(_) => ObjectKind::Builtin,
            Object::Array(_) => ObjectKind::Array,
            Object::Hash(_) => ObjectKind::Hash,
        }
    }

    /// Only `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }

    /// Identity comparison backing `==` and `!=` for everything but integers and strings.
    ///
    /// Booleans and null behave as shared singletons, so they compare by value.
    /// Arrays, hashes and functions are only identical to the same allocation.
    pub fn is_identical(&self, other: &Object) -> bool {
        match (self, other) {
            (Object::Boolean(lhs), Object::Boolean(rhs)) => lhs == rhs,
            (Object::Null, Object::Null) => true,
            (Object::Array(lhs), Object::Array(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Object::Hash(lhs), Object::Hash(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Object::Function(lhs), Object::Function(rhs)) => Rc::ptr_eq(lhs, rhs),
            (Object::Builtin(lhs), Object::Builtin(rhs)) => lhs.name == rhs.name,
            _ => false,
        }
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        if value {
            TRUE
        } else {
            FALSE
        }
    }
}

impl PartialEq for Object {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Object::Integer(lhs), Object::Integer(rhs)) => lhs == rhs,
            (Object::String(lhs), Object::String(rhs)) => lhs == rhs,
            (Object::ReturnValue(lhs), Object::ReturnValue(rhs)) => lhs == rhs,
            (Object::Error(lhs), Object::Error(rhs)) => lhs == rhs,
            (Object::Array(lhs), Object::Array(rhs)) => lhs == rhs,
            (Object::Hash(lhs), Object::Hash(rhs)) => lhs == rhs,
            _ => self.is_identical(other),
        }
    }
}

impl Display for Object {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        ensure_sufficient_stack(|| self.render(f))
    }
}

impl Object {
    fn render(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Object::Integer(value) => write!(f, "{value}"),
            Object::Boolean(value) => write!(f, "{value}"),
            Object::String(value) => write!(f, "{value}"),
            Object::Null => write!(f, "null"),
            Object::ReturnValue(value) => write!(f, "{value}"),
            Object::Error(message) => write!(f, "ERROR: {message}"),
            Object::Function(function) => {
                write!(f, "fn(")?;
                for (i, param) in function.literal.parameters.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{param}")?;
                }
                write!(f, ") {{\n{}\n}}", function.literal.body)
            }
            Object::Builtin(_) => write!(f, "builtin function"),
            Object::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{element}")?;
                }
                write!(f, "]")
            }
            Object::Hash(hash) => {
                write!(f, "{{")?;
                for (i, HashPair { key, value }) in hash.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
