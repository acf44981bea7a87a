use std::fmt::{Display, Formatter};
use std::mem;
use std::rc::Rc;

use crate::stack::ensure_sufficient_stack;

/// Root of a parsed source text.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Let { name: Identifier, value: Expr },
    Return { value: Expr },
    Expr { expr: Expr },
}

/// A brace-delimited statement sequence, the body of `if` branches and functions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BlockStatement {
    pub statements: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Minus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Less,
    Greater,
    Equal,
    NotEqual,
}

/// Parameters and body of a `fn` literal.
///
/// Shared behind an `Rc` so function objects created from it can outlive the
/// `Program` that contained the literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    pub parameters: Vec<Identifier>,
    pub body: BlockStatement,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(Identifier),
    Integer {
        value: i64,
        literal: String,
    },
    Boolean(bool),
    String(String),
    Prefix {
        operator: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        left: Box<Expr>,
        operator: InfixOp,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    Function(Rc<FunctionLiteral>),
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    Array {
        elements: Vec<Expr>,
    },
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
    },
    Hash {
        pairs: Vec<(Expr, Expr)>,
    },
}

impl Program {
    pub fn token_literal(&self) -> String {
        self.statements
            .first()
            .map(Stmt::token_literal)
            .unwrap_or_default()
    }
}

impl Stmt {
    pub fn token_literal(&self) -> String {
        match self {
            Stmt::Let { .. } => "let".to_string(),
            Stmt::Return { .. } => "return".to_string(),
            Stmt::Expr { expr } => expr.token_literal(),
        }
    }
}

impl BlockStatement {
    pub fn token_literal(&self) -> String {
        "{".to_string()
    }
}

impl Expr {
    /// Text of the token that introduced this expression.
    pub fn token_literal(&self) -> String {
        match self {
            Expr::Identifier(ident) => ident.name.clone(),
            Expr::Integer { literal, .. } => literal.clone(),
            Expr::Boolean(value) => value.to_string(),
            Expr::String(value) => value.clone(),
            Expr::Prefix { operator, .. } => operator.to_string(),
            Expr::Infix { operator, .. } => operator.to_string(),
            Expr::If { .. } => "if".to_string(),
            Expr::Function(_) => "fn".to_string(),
            Expr::Call { .. } => "(".to_string(),
            Expr::Array { .. } | Expr::Index { .. } => "[".to_string(),
            Expr::Hash { .. } => "{".to_string(),
        }
    }

    pub fn identifier(name: impl Into<String>) -> Expr {
        Expr::Identifier(Identifier { name: name.into() })
    }

    pub fn integer(value: i64) -> Expr {
        Expr::Integer {
            value,
            literal: value.to_string(),
        }
    }

    /// Moves the directly nested expressions into `out`, leaving cheap leaves behind.
    fn take_children(&mut self, out: &mut Vec<Expr>) {
        match self {
            Expr::Identifier(_) | Expr::Integer { .. } | Expr::Boolean(_) | Expr::String(_) => {}
            Expr::Prefix { right, .. } => out.push(take_boxed(right)),
            Expr::Infix { left, right, .. } | Expr::Index { left, index: right } => {
                out.push(take_boxed(left));
                out.push(take_boxed(right));
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                out.push(take_boxed(condition));
                consequence.take_expressions(out);
                if let Some(alternative) = alternative {
                    alternative.take_expressions(out);
                }
            }
            Expr::Function(literal) => {
                if let Some(literal) = Rc::get_mut(literal) {
                    literal.body.take_expressions(out);
                }
            }
            Expr::Call {
                function,
                arguments,
            } => {
                out.push(take_boxed(function));
                out.append(arguments);
            }
            Expr::Array { elements } => out.append(elements),
            Expr::Hash { pairs } => {
                for (key, value) in pairs.drain(..) {
                    out.push(key);
                    out.push(value);
                }
            }
        }
    }
}

fn take_boxed(expr: &mut Box<Expr>) -> Expr {
    mem::replace(&mut **expr, Expr::Boolean(false))
}

impl BlockStatement {
    fn take_expressions(&mut self, out: &mut Vec<Expr>) {
        for stmt in self.statements.drain(..) {
            match stmt {
                Stmt::Let { value, .. } | Stmt::Return { value } => out.push(value),
                Stmt::Expr { expr } => out.push(expr),
            }
        }
    }
}

/// Nested expressions are freed from a work list so that dropping a deeply
/// nested tree takes constant stack.
impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_children(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.take_children(&mut pending);
        }
    }
}

struct Joined<'a, T>(&'a [T], &'a str);

impl<T: Display> Display for Joined<'_, T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let Joined(items, separator) = self;
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                write!(f, "{separator}")?;
            }
            write!(f, "{item}")?;
        }
        Ok(())
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Joined(&self.statements, ""))
    }
}

impl Display for BlockStatement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Joined(&self.statements, ""))
    }
}

impl Display for Stmt {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Stmt::Let { name, value } => write!(f, "let {name} = {value};"),
            Stmt::Return { value } => write!(f, "return {value};"),
            Stmt::Expr { expr } => write!(f, "{expr}"),
        }
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl Display for PrefixOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PrefixOp::Bang => write!(f, "!"),
            PrefixOp::Minus => write!(f, "-"),
        }
    }
}

impl Display for InfixOp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let symbol = match self {
            InfixOp::Add => "+",
            InfixOp::Subtract => "-",
            InfixOp::Multiply => "*",
            InfixOp::Divide => "/",
            InfixOp::Less => "<",
            InfixOp::Greater => ">",
            InfixOp::Equal => "==",
            InfixOp::NotEqual => "!=",
        };
        write!(f, "{symbol}")
    }
}

impl Display for FunctionLiteral {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "fn({}) {}", Joined(&self.parameters, ", "), self.body)
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        ensure_sufficient_stack(|| self.render(f))
    }
}

impl Expr {
    fn render(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Expr::Identifier(ident) => write!(f, "{ident}"),
            Expr::Integer { literal, .. } => write!(f, "{literal}"),
            Expr::Boolean(value) => write!(f, "{value}"),
            Expr::String(value) => write!(f, "{value}"),
            Expr::Prefix { operator, right } => write!(f, "({operator}{right})"),
            Expr::Infix {
                left,
                operator,
                right,
            } => write!(f, "({left} {operator} {right})"),
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if{condition} {consequence}")?;
                if let Some(alternative) = alternative {
                    write!(f, "else {alternative}")?;
                }
                Ok(())
            }
            Expr::Function(literal) => write!(f, "{literal}"),
            Expr::Call {
                function,
                arguments,
            } => write!(f, "{function}({})", Joined(arguments, ", ")),
            Expr::Array { elements } => write!(f, "[{}]", Joined(elements, ", ")),
            Expr::Index { left, index } => write!(f, "({left}[{index}])"),
            Expr::Hash { pairs } => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}:{value}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
