use std::rc::Rc;

use rustc_hash::FxHashSet;

use crate::ast::{BlockStatement, Expr, Identifier, InfixOp, PrefixOp, Program, Stmt};
use crate::config::{Config, DEFAULT_MAX_CALL_DEPTH};
use crate::interpreter::error::Result;
use crate::interpreter::error::RuntimeError::{
    ArityMismatch, CallDepthExceeded, DivideByZero, IndexNotSupported, NotCallable, TypeMismatch,
    UndefinedVariable, UnknownInfixOperator, UnknownPrefixOperator, UnusableHashKey,
};
use crate::interpreter::{
    stdlib, Environment, Function, HashObject, HashPair, Object, ObjectKind, NULL,
};
use crate::stack::ensure_sufficient_stack;

/// Evaluates `$result`, forwarding errors and `return` values to the caller.
macro_rules! handle_control_flow {
    ($result:expr) => {
        match $result? {
            retval @ Object::ReturnValue(_) => return Ok(retval),
            value => value,
        }
    };
}

/// Tree-walking evaluator. Holds only call-depth bookkeeping; all bindings live
/// in the [`Environment`] chain passed alongside each node.
#[derive(Debug)]
pub struct Evaluator {
    max_call_depth: usize,
    depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Evaluator::new(DEFAULT_MAX_CALL_DEPTH)
    }
}

impl Evaluator {
    pub fn new(max_call_depth: usize) -> Evaluator {
        Evaluator {
            max_call_depth,
            depth: 0,
        }
    }

    /// Evaluates a whole program. Runtime errors come back as [`Object::Error`].
    pub fn eval_program(&mut self, program: &Program, env: &Rc<Environment>) -> Object {
        self.run_program(program, env).unwrap_or(NULL)
    }

    /// Like [`Evaluator::eval_program`], but yields `None` when the program
    /// produced no value: it was empty or its last statement was a `let`.
    pub fn run_program(&mut self, program: &Program, env: &Rc<Environment>) -> Option<Object> {
        self.depth = 0;
        match self.eval_statements(&program.statements, env) {
            Ok(Some(Object::ReturnValue(retval))) => Some(*retval),
            Ok(value) => value,
            Err(error) => Some(Object::Error(error.to_string())),
        }
    }

    fn eval_statements(
        &mut self,
        statements: &[Stmt],
        env: &Rc<Environment>,
    ) -> Result<Option<Object>> {
        let mut result = None;
        for stmt in statements {
            result = self.exec(stmt, env)?;
            if let Some(Object::ReturnValue(_)) = result {
                break;
            }
        }
        Ok(result)
    }

    fn eval_block(&mut self, block: &BlockStatement, env: &Rc<Environment>) -> Result {
        Ok(self.eval_statements(&block.statements, env)?.unwrap_or(NULL))
    }

    /// `let` binds and yields no value; `return` wraps its value for the caller to unwrap.
    fn exec(&mut self, stmt: &Stmt, env: &Rc<Environment>) -> Result<Option<Object>> {
        match stmt {
            Stmt::Let { name, value } => match self.eval(value, env)? {
                retval @ Object::ReturnValue(_) => Ok(Some(retval)),
                value => {
                    env.set(name.name.clone(), value);
                    Ok(None)
                }
            },
            Stmt::Return { value } => match self.eval(value, env)? {
                retval @ Object::ReturnValue(_) => Ok(Some(retval)),
                value => Ok(Some(Object::ReturnValue(Box::new(value)))),
            },
            Stmt::Expr { expr } => self.eval(expr, env).map(Some),
        }
    }

    fn eval(&mut self, expr: &Expr, env: &Rc<Environment>) -> Result {
        ensure_sufficient_stack(|| self.eval_expr(expr, env))
    }

    fn eval_expr(&mut self, expr: &Expr, env: &Rc<Environment>) -> Result {
        match expr {
            Expr::Integer { value, .. } => Ok(Object::Integer(*value)),
            Expr::Boolean(value) => Ok(Object::from(*value)),
            Expr::String(value) => Ok(Object::String(value.clone())),
            Expr::Identifier(ident) => resolve_identifier(ident, env),
            Expr::Prefix { operator, right } => {
                let right = handle_control_flow!(self.eval(right, env));
                eval_prefix(*operator, right)
            }
            Expr::Infix {
                left,
                operator,
                right,
            } => {
                let left = handle_control_flow!(self.eval(left, env));
                let right = handle_control_flow!(self.eval(right, env));
                eval_infix(*operator, left, right)
            }
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                let condition = handle_control_flow!(self.eval(condition, env));
                if condition.is_truthy() {
                    self.eval_block(consequence, env)
                } else if let Some(alternative) = alternative {
                    self.eval_block(alternative, env)
                } else {
                    Ok(NULL)
                }
            }
            Expr::Function(literal) => Ok(Object::Function(Rc::new(Function {
                literal: Rc::clone(literal),
                env: Rc::clone(env),
            }))),
            Expr::Call {
                function,
                arguments,
            } => {
                let function = handle_control_flow!(self.eval(function, env));
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(handle_control_flow!(self.eval(argument, env)));
                }
                self.apply_function(function, args)
            }
            Expr::Array { elements } => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(handle_control_flow!(self.eval(element, env)));
                }
                Ok(Object::array(values))
            }
            Expr::Index { left, index } => {
                let left = handle_control_flow!(self.eval(left, env));
                let index = handle_control_flow!(self.eval(index, env));
                eval_index(left, index)
            }
            Expr::Hash { pairs } => {
                let mut hash = HashObject::default();
                for (key, value) in pairs {
                    let key = handle_control_flow!(self.eval(key, env));
                    let hash_key = key
                        .hash_key()
                        .ok_or_else(|| UnusableHashKey { kind: key.kind() })?;
                    let value = handle_control_flow!(self.eval(value, env));
                    hash.insert(hash_key, HashPair { key, value });
                }
                Ok(Object::Hash(Rc::new(hash)))
            }
        }
    }

    #[tracing::instrument(level = "trace", skip_all, fields(depth = self.depth))]
    fn apply_function(&mut self, function: Object, args: Vec<Object>) -> Result {
        match function {
            Object::Function(function) => {
                let params = &function.literal.parameters;
                if args.len() != params.len() {
                    return Err(ArityMismatch {
                        expected: params.len(),
                        actual: args.len(),
                    });
                }
                if self.depth >= self.max_call_depth {
                    return Err(CallDepthExceeded {
                        limit: self.max_call_depth,
                    });
                }
                let call_env = Environment::enclosed(&function.env);
                for (param, arg) in params.iter().zip(args) {
                    call_env.set(param.name.clone(), arg);
                }
                self.depth += 1;
                let result = match self.eval_block(&function.literal.body, &call_env) {
                    Ok(Object::ReturnValue(retval)) => Ok(*retval),
                    other => other,
                };
                self.depth -= 1;
                // Closures defined during the call that did not escape through
                // the result only keep the scope alive via its own bindings.
                if Rc::strong_count(&call_env) > 1
                    && !result.as_ref().is_ok_and(|value| reaches_scope(value, &call_env))
                {
                    call_env.clear();
                }
                result
            }
            Object::Builtin(builtin) => (builtin.function)(args),
            other => Err(NotCallable { kind: other.kind() }),
        }
    }
}

/// Reports whether `value` can reach `scope`: through a closure whose scope
/// chain includes it, or through the bindings of any scope such a closure sees.
fn reaches_scope(value: &Object, scope: &Rc<Environment>) -> bool {
    let mut pending = vec![value.clone()];
    let mut visited: FxHashSet<*const ()> = FxHashSet::default();
    while let Some(object) = pending.pop() {
        match object {
            Object::Array(elements) => {
                if visited.insert(Rc::as_ptr(&elements).cast()) {
                    pending.extend(elements.iter().cloned());
                }
            }
            Object::Hash(hash) => {
                if visited.insert(Rc::as_ptr(&hash).cast()) {
                    pending.extend(hash.iter().map(|pair| pair.value.clone()));
                }
            }
            Object::Function(function) => {
                let mut next = Some(Rc::clone(&function.env));
                while let Some(env) = next {
                    if Rc::ptr_eq(&env, scope) {
                        return true;
                    }
                    if !visited.insert(Rc::as_ptr(&env).cast()) {
                        break;
                    }
                    pending.extend(env.values());
                    next = env.outer().cloned();
                }
            }
            _ => {}
        }
    }
    false
}

fn resolve_identifier(ident: &Identifier, env: &Environment) -> Result {
    env.get(&ident.name)
        .or_else(|| stdlib::lookup(&ident.name))
        .ok_or_else(|| UndefinedVariable {
            name: ident.name.clone(),
        })
}

fn eval_prefix(operator: PrefixOp, right: Object) -> Result {
    match (operator, right) {
        (PrefixOp::Bang, right) => Ok(Object::from(!right.is_truthy())),
        (PrefixOp::Minus, Object::Integer(value)) => Ok(Object::Integer(value.wrapping_neg())),
        (PrefixOp::Minus, right) => Err(UnknownPrefixOperator {
            operator,
            right: right.kind(),
        }),
    }
}

fn eval_infix(operator: InfixOp, left: Object, right: Object) -> Result {
    match (&left, &right) {
        (Object::Integer(lhs), Object::Integer(rhs)) => eval_integer_infix(operator, *lhs, *rhs),
        (Object::String(lhs), Object::String(rhs)) if operator == InfixOp::Add => {
            Ok(Object::String(format!("{lhs}{rhs}")))
        }
        (Object::String(_), Object::String(_)) => Err(UnknownInfixOperator {
            left: ObjectKind::String,
            operator,
            right: ObjectKind::String,
        }),
        _ if operator == InfixOp::Equal => Ok(Object::from(left.is_identical(&right))),
        _ if operator == InfixOp::NotEqual => Ok(Object::from(!left.is_identical(&right))),
        _ if left.kind() != right.kind() => Err(TypeMismatch {
            left: left.kind(),
            operator,
            right: right.kind(),
        }),
        _ => Err(UnknownInfixOperator {
            left: left.kind(),
            operator,
            right: right.kind(),
        }),
    }
}

fn eval_integer_infix(operator: InfixOp, lhs: i64, rhs: i64) -> Result {
    Ok(match operator {
        InfixOp::Add => Object::Integer(lhs.wrapping_add(rhs)),
        InfixOp::Subtract => Object::Integer(lhs.wrapping_sub(rhs)),
        InfixOp::Multiply => Object::Integer(lhs.wrapping_mul(rhs)),
        InfixOp::Divide => {
            if rhs == 0 {
                return Err(DivideByZero);
            }
            Object::Integer(lhs.wrapping_div(rhs))
        }
        InfixOp::Less => Object::from(lhs < rhs),
        InfixOp::Greater => Object::from(lhs > rhs),
        InfixOp::Equal => Object::from(lhs == rhs),
        InfixOp::NotEqual => Object::from(lhs != rhs),
    })
}

fn eval_index(left: Object, index: Object) -> Result {
    match (&left, &index) {
        (Object::Array(elements), Object::Integer(i)) => Ok(usize::try_from(*i)
            .ok()
            .and_then(|i| elements.get(i))
            .cloned()
            .unwrap_or(NULL)),
        (Object::Hash(hash), _) => {
            let key = index
                .hash_key()
                .ok_or_else(|| UnusableHashKey { kind: index.kind() })?;
            Ok(hash.get(&key).map_or(NULL, |pair| pair.value.clone()))
        }
        _ => Err(IndexNotSupported { kind: left.kind() }),
    }
}

/// Evaluates `program` against `env` with the default call-depth limit.
pub fn eval_program(program: &Program, env: &Rc<Environment>) -> Object {
    Evaluator::default().eval_program(program, env)
}

/// An interpreter session: one global environment shared by every evaluated source text.
#[derive(Debug)]
pub struct Runtime {
    env: Rc<Environment>,
    evaluator: Evaluator,
}

impl Default for Runtime {
    fn default() -> Self {
        Runtime::new()
    }
}

impl Runtime {
    pub fn new() -> Runtime {
        Runtime::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Runtime {
        Runtime {
            env: Environment::new(),
            evaluator: Evaluator::new(config.max_call_depth),
        }
    }

    pub fn env(&self) -> &Rc<Environment> {
        &self.env
    }

    pub fn eval_program(&mut self, program: &Program) -> Object {
        self.evaluator.eval_program(program, &self.env)
    }

    /// Parses and evaluates `source`. Syntax errors are returned as `Err`;
    /// runtime errors are an `Ok(Object::Error(..))`.
    pub fn eval_source(&mut self, source: &str) -> Result<Object, anyhow::Error> {
        Ok(self.eval_line(source)?.unwrap_or(NULL))
    }

    /// Like [`Runtime::eval_source`], but `Ok(None)` when `source` produced no
    /// value, as for an empty line or one ending in `let`.
    pub fn eval_line(&mut self, source: &str) -> Result<Option<Object>, anyhow::Error> {
        let program: Program = source.parse()?;
        Ok(self.evaluator.run_program(&program, &self.env))
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        // Global functions capture the global scope they are bound in.
        self.env.clear();
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::interpreter::{FALSE, TRUE};

    fn run(input: &str) -> Object {
        match Runtime::new().eval_source(input) {
            Ok(result) => result,
            Err(error) => panic!("{input:?}: {error}"),
        }
    }

    fn int(value: i64) -> Object {
        Object::Integer(value)
    }

    fn error(message: &str) -> Object {
        Object::Error(message.to_string())
    }

    fn check(tests: &[(&str, Object)]) {
        for (input, expected) in tests {
            assert_eq!(&run(input), expected, "{input}");
        }
    }

    #[test]
    fn integer_expressions() {
        check(&[
            ("5", int(5)),
            ("10", int(10)),
            ("-5", int(-5)),
            ("-10", int(-10)),
            ("5 + 5 + 5 + 5 + 10 + 10", int(40)),
            ("2 * 2 * 2", int(8)),
            ("5 + 2 * 2", int(9)),
            ("20 + 2 * -10 + 5", int(5)),
            ("3 * (3 * 3) + 10", int(37)),
            ("10 / 2 + 3 * 10", int(35)),
            ("50 / 2 * 2", int(50)),
            ("-7 / 2", int(-3)),
            ("7 / -2", int(-3)),
            ("(5 + 10 * 2 + 15 / 3) * 2 + -10", int(50)),
        ]);
    }

    #[test]
    fn integer_overflow_wraps() {
        check(&[
            ("9223372036854775807 + 1", int(i64::MIN)),
            ("-9223372036854775807 - 1", int(i64::MIN)),
            ("let min = -9223372036854775807 - 1; min / -1", int(i64::MIN)),
            ("let min = -9223372036854775807 - 1; -min", int(i64::MIN)),
        ]);
    }

    #[test]
    fn boolean_expressions() {
        check(&[
            ("true", TRUE),
            ("false", FALSE),
            ("1 < 2", TRUE),
            ("1 > 2", FALSE),
            ("1 < 1", FALSE),
            (" 1 == 1", TRUE),
            ("1 != 1", FALSE),
            ("1 == 2", FALSE),
            ("1 != 2", TRUE),
            ("true == true", TRUE),
            ("true != false", TRUE),
            ("false == false", TRUE),
            ("false == true", FALSE),
            ("true != true", FALSE),
            ("(1 > 2) == true", FALSE),
            ("(1 < 2) == true", TRUE),
            ("(1 > 2) == false", TRUE),
            ("(1 < 2) == false", FALSE),
        ]);
    }

    #[test]
    fn bang_operator() {
        check(&[
            ("!true", FALSE),
            ("!false", TRUE),
            ("!5", FALSE),
            ("!0", FALSE),
            ("!!true", TRUE),
            ("!!false", FALSE),
            ("!!5", TRUE),
            ("!if (false) { 1 }", TRUE),
        ]);
    }

    #[test]
    fn if_else_expressions() {
        check(&[
            ("if (true) { 10 }", int(10)),
            ("if (false) { 10 }", NULL),
            ("if (1) { 10 }", int(10)),
            ("if (0) { 10 }", int(10)),
            ("if (1 < 2) { 10 }", int(10)),
            ("if (1 > 2) { 10 }", NULL),
            ("if (1 > 2) { 10 } else { 20 }", int(20)),
            ("if (1 < 2) { 10 } else { 20 }", int(10)),
            ("if (true) { }", NULL),
        ]);
    }

    #[test]
    fn return_statements() {
        check(&[
            ("return 10;", int(10)),
            ("return 10; 9;", int(10)),
            ("return 2 * 5; 9;", int(10)),
            ("9; return 2 * 5; 9;", int(10)),
            (
                "if (10 > 1) { if (10 > 1) { return 10; } return 1; }",
                int(10),
            ),
            (
                "let f = fn(x) { if (x > 1) { return x; } return 0; }; f(5)",
                int(5),
            ),
            (
                "let f = fn() { let x = if (true) { return 7; }; 99 }; f()",
                int(7),
            ),
            (
                "let f = fn() { 1 + if (true) { return 3; } }; f()",
                int(3),
            ),
            ("let f = fn() { return 1; 2 }; f() + f()", int(2)),
        ]);
    }

    #[test]
    fn error_handling() {
        check(&[
            ("5 + true;", error("type mismatch: INTEGER + BOOLEAN")),
            ("5 + true; 5;", error("type mismatch: INTEGER + BOOLEAN")),
            ("-true", error("unknown operator: -BOOLEAN")),
            ("-\"a\"", error("unknown operator: -STRING")),
            ("true + false;", error("unknown operator: BOOLEAN + BOOLEAN")),
            ("5; true + false; 5", error("unknown operator: BOOLEAN + BOOLEAN")),
            (
                "if (10 > 1) { true + false; }",
                error("unknown operator: BOOLEAN + BOOLEAN"),
            ),
            (
                "if (10 > 1) { if (10 > 1) { return true + false; } return 1; }",
                error("unknown operator: BOOLEAN + BOOLEAN"),
            ),
            ("foobar", error("identifier not found: foobar")),
            (
                r#""Hello" - "World""#,
                error("unknown operator: STRING - STRING"),
            ),
            (r#""a" == "a""#, error("unknown operator: STRING == STRING")),
            (
                r#"{"name": "Monkey"}[fn(x) { x }];"#,
                error("unusable as hash key: FUNCTION"),
            ),
            ("{[1]: 2}", error("unusable as hash key: ARRAY")),
            ("10 / 0", error("Dividend=0 illegal!")),
            ("let x = 1 / 0; x", error("Dividend=0 illegal!")),
            ("1(2)", error("not a function: INTEGER")),
            (
                "fn(x) { x }(1, 2)",
                error("wrong number of arguments. got=2, want=1"),
            ),
            ("5[0]", error("index operator not supported: INTEGER")),
            ("[1][true]", error("index operator not supported: ARRAY")),
            ("[1] + [2]", error("unknown operator: ARRAY + ARRAY")),
            ("[1] < {}", error("type mismatch: ARRAY < HASH")),
        ]);
    }

    #[test]
    fn errors_short_circuit_left_to_right() {
        check(&[
            ("missing(1 / 0)", error("identifier not found: missing")),
            ("[1 / 0, missing]", error("Dividend=0 illegal!")),
            ("len(missing, 1 / 0)", error("identifier not found: missing")),
            ("(1 / 0) + missing", error("Dividend=0 illegal!")),
            (r#"{missing: 1 / 0}"#, error("identifier not found: missing")),
            ("let x = 1; let y = x / 0; let x = 2; x", error("Dividend=0 illegal!")),
        ]);
    }

    #[test]
    fn let_statements() {
        check(&[
            ("let a = 5; a;", int(5)),
            ("let a = 5 * 5; a;", int(25)),
            ("let a = 5; let b = a; b;", int(5)),
            ("let a = 5; let b = a; let c = a + b + 5; c;", int(15)),
            ("let a = 5;", NULL),
            ("", NULL),
        ]);
    }

    #[test]
    fn function_object() {
        let Object::Function(function) = run("fn(x) { x + 2; };") else {
            panic!("expected a function");
        };
        let params: Vec<_> = function
            .literal
            .parameters
            .iter()
            .map(ToString::to_string)
            .collect();
        assert_eq!(params, ["x"]);
        assert_eq!(function.literal.body.to_string(), "(x + 2)");
        assert_eq!(
            Object::Function(function).to_string(),
            "fn(x) {\n(x + 2)\n}"
        );
    }

    #[test]
    fn function_application() {
        check(&[
            ("let identity = fn(x) { x; }; identity(5);", int(5)),
            ("let identity = fn(x) { return x; }; identity(5);", int(5)),
            ("let double = fn(x) { x * 2; }; double(5);", int(10)),
            ("let add = fn(x, y) { x + y; }; add(5, 5);", int(10)),
            ("let add = fn(x, y) { x + y; }; add(5 + 5, add(5, 5));", int(20)),
            ("fn(x) { x; }(5)", int(5)),
            ("fn() { }()", NULL),
        ]);
    }

    #[test]
    fn closures() {
        check(&[
            (
                "let newAdder = fn(x) { fn(y) { x + y } }; let addTwo = newAdder(2); addTwo(3)",
                int(5),
            ),
            (
                "let counter = fn(x) { fn() { x } }; let a = counter(1); let b = counter(2); a() + b() + a()",
                int(4),
            ),
            (
                "let x = 1; let f = fn() { let x = 2; x }; f() + x",
                int(3),
            ),
            (
                "let f = fn() { y }; let y = 10; f()",
                int(10),
            ),
        ]);
    }

    #[test]
    fn recursion() {
        check(&[(
            "let fib = fn(n) { if (n < 2) { n } else { fib(n - 1) + fib(n - 2) } }; fib(15)",
            int(610),
        )]);
        check(&[(
            "let down = fn(n) { if (n == 0) { 0 } else { 1 + down(n - 1) } }; down(1000)",
            int(1000),
        )]);
    }

    #[test]
    fn call_depth_is_bounded() {
        let config = Config {
            max_call_depth: 50,
            ..Config::default()
        };
        let mut runtime = Runtime::with_config(&config);
        let result = runtime.eval_source("let f = fn(n) { f(n + 1) }; f(0)").ok();
        assert_eq!(result, Some(error("maximum call depth of 50 exceeded")));

        let result = runtime
            .eval_source("let g = fn(n) { if (n == 0) { 0 } else { g(n - 1) } }; g(49)")
            .ok();
        assert_eq!(result, Some(int(0)));
    }

    #[test]
    fn strings() {
        check(&[
            (r#""Hello World!""#, Object::String("Hello World!".to_string())),
            (
                r#""Hello" + " " + "World!""#,
                Object::String("Hello World!".to_string()),
            ),
        ]);
    }

    #[test]
    fn builtin_functions() {
        check(&[
            (r#"len("")"#, int(0)),
            (r#"len("four")"#, int(4)),
            (r#"len("hello world")"#, int(11)),
            ("len(1)", error("argument to `len` not support, got=INTEGER")),
            (
                r#"len("one", "two")"#,
                error("wrong number of arguments. got=2, want=1"),
            ),
            ("len([1, 2, 3])", int(3)),
            ("len([])", int(0)),
            ("first([1, 2, 3])", int(1)),
            ("first([])", NULL),
            ("first(1)", error("argument to `first` must be ARRAY, got INTEGER")),
            ("last([1, 2, 3])", int(3)),
            ("last([])", NULL),
            ("last(1)", error("argument to `last` must be ARRAY, got INTEGER")),
            ("rest([1, 2, 3])", run("[2, 3]")),
            ("rest([])", NULL),
            ("push([], 1)", run("[1]")),
            ("push(1, 1)", error("argument to `push` must be ARRAY, got INTEGER")),
            ("let a = [1]; push(a, 2); a", run("[1]")),
            (r#"puts("hello")"#, NULL),
            ("let len = fn(x) { 42 }; len([1])", int(42)),
        ]);
    }

    #[test]
    fn array_literals_and_indexing() {
        assert_eq!(run("[1, 2 * 2, 3 + 3]").to_string(), "[1, 4, 6]");
        check(&[
            ("[1, 2, 3][0]", int(1)),
            ("[1, 2, 3][1]", int(2)),
            ("[1, 2, 3][2]", int(3)),
            ("let i = 0; [1][i];", int(1)),
            ("[1, 2, 3][1 + 1];", int(3)),
            ("let myArray = [1, 2, 3]; myArray[2];", int(3)),
            (
                "let myArray = [1, 2, 3]; myArray[0] + myArray[1] + myArray[2];",
                int(6),
            ),
            ("let myArray = [1, 2, 3]; let i = myArray[0]; myArray[i]", int(2)),
            ("[1, 2, 3][3]", NULL),
            ("[1, 2, 3][-1]", NULL),
        ]);
    }

    #[test]
    fn hash_literals() {
        let input = r#"let two = "two";
            {
                "one": 10 - 9,
                two: 1 + 1,
                "thr" + "ee": 6 / 2,
                4: 4,
                true: 5,
                false: 6
            }"#;
        let Object::Hash(hash) = run(input) else {
            panic!("expected a hash");
        };
        let expected = [
            (Object::String("one".to_string()), 1),
            (Object::String("two".to_string()), 2),
            (Object::String("three".to_string()), 3),
            (int(4), 4),
            (TRUE, 5),
            (FALSE, 6),
        ];
        assert_eq!(hash.len(), expected.len());
        for (key, value) in expected {
            let pair = key.hash_key().and_then(|hash_key| hash.get(&hash_key));
            assert_eq!(
                pair,
                Some(&HashPair {
                    key,
                    value: int(value)
                })
            );
        }
    }

    #[test]
    fn hash_index_expressions() {
        check(&[
            (r#"{"foo": 5}["foo"]"#, int(5)),
            (r#"{"foo": 5}["bar"]"#, NULL),
            (r#"let key = "foo"; {"foo": 5}[key]"#, int(5)),
            (r#"{}["foo"]"#, NULL),
            ("{5: 5}[5]", int(5)),
            ("{true: 5}[true]", int(5)),
            ("{false: 5}[false]", int(5)),
            ("{1: 5}[true]", NULL),
            (r#"{"a": 1, "a": 2}["a"]"#, int(2)),
        ]);
        assert_eq!(
            run(r#"{"b": 1, "a": [2]}"#).to_string(),
            "{b: 1, a: [2]}"
        );
    }

    #[test]
    fn equality_outside_integers_and_strings_is_identity() {
        check(&[
            ("let a = [1]; a == a", TRUE),
            ("[1] == [1]", FALSE),
            ("[1] != [1]", TRUE),
            ("let h = {}; h == h", TRUE),
            ("let f = fn() { 1 }; f != f", FALSE),
            ("fn() { 1 } == fn() { 1 }", FALSE),
            ("len == len", TRUE),
            ("1 == true", FALSE),
            ("1 != true", TRUE),
            ("if (false) { 1 } == if (false) { 2 }", TRUE),
        ]);
    }

    #[test]
    fn bindings_persist_across_sources() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.eval_source("let x = 5;").ok(), Some(NULL));
        assert_eq!(
            runtime.eval_source("let double = fn(n) { n * 2 };").ok(),
            Some(NULL)
        );
        assert_eq!(runtime.eval_source("double(x)").ok(), Some(int(10)));
        assert_eq!(runtime.env().get("x"), Some(int(5)));
    }

    #[test]
    fn let_and_empty_sources_have_no_value() {
        let mut runtime = Runtime::new();
        assert_eq!(runtime.eval_line("").ok(), Some(None));
        assert_eq!(runtime.eval_line("let x = 1;").ok(), Some(None));
        assert_eq!(runtime.eval_line("x; let y = 2;").ok(), Some(None));
        assert_eq!(runtime.eval_line("if (false) { 10 }").ok(), Some(Some(NULL)));
        assert_eq!(runtime.eval_line("first([])").ok(), Some(Some(NULL)));
        assert_eq!(
            runtime.eval_line("let z = 1 / 0;").ok(),
            Some(Some(error("Dividend=0 illegal!")))
        );
        assert_eq!(runtime.eval_line("fn() { let a = 1; }()").ok(), Some(Some(NULL)));
    }

    #[test]
    fn dropping_runtime_frees_global_scope() {
        let mut runtime = Runtime::new();
        let source = "let id = fn(x) { x }; \
            let fact = fn(n) { if (n < 1) { 1 } else { n * fact(n - 1) } }; fact(5)";
        assert_eq!(runtime.eval_source(source).ok(), Some(int(120)));
        let global = Rc::downgrade(runtime.env());
        drop(runtime);
        assert!(global.upgrade().is_none());
    }

    #[test]
    fn finished_calls_release_their_scope() {
        let mut runtime = Runtime::new();
        let source = "let f = fn() { \
            let countdown = fn(n) { if (n == 0) { 0 } else { countdown(n - 1) } }; \
            countdown(3) };";
        assert_eq!(runtime.eval_source(source).ok(), Some(NULL));
        let baseline = Rc::strong_count(runtime.env());
        assert_eq!(runtime.eval_source("f(); f(); f()").ok(), Some(int(0)));
        assert_eq!(Rc::strong_count(runtime.env()), baseline);
    }

    #[test]
    fn escaping_closures_keep_their_scope() {
        let tests = [
            ("let make = fn() { let x = 5; fn() { x } }; make()()", int(5)),
            (
                "let apply = fn(g) { fn() { g() } }; \
                 let make = fn() { let x = 5; apply(fn() { x }) }; make()()",
                int(5),
            ),
            (
                "let make = fn() { let x = 7; [1, {\"get\": fn() { x }}] }; make()[1][\"get\"]()",
                int(7),
            ),
            (
                "let make = fn() { let loop = fn(n) { if (n == 0) { 0 } else { loop(n - 1) } }; loop }; \
                 make()(4)",
                int(0),
            ),
        ];
        check(&tests);
    }

    #[test]
    fn parse_errors_skip_evaluation() {
        let mut runtime = Runtime::new();
        let Err(error) = runtime.eval_source("let x = 1; let = 2;") else {
            panic!("expected parse errors");
        };
        assert_eq!(
            error.to_string(),
            "parser errors:\n\texpected next token to be IDENT; got = instead"
        );
        assert_eq!(runtime.env().get("x"), None);
    }

    #[test]
    fn eval_program_against_caller_environment() {
        let env = Environment::new();
        env.set("seed", int(41));
        let program: Program = match "seed + 1".parse() {
            Ok(program) => program,
            Err(errors) => panic!("{errors}"),
        };
        assert_eq!(eval_program(&program, &env), int(42));
    }
}
