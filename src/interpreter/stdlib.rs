use std::io::{stdout, Write};

use crate::interpreter::error::Result;
use crate::interpreter::error::RuntimeError::{ArgumentMismatch, ArityMismatch, UnsupportedArgument};
use crate::interpreter::{Builtin, BuiltinFunction, Object, ObjectKind, NULL};

macro_rules! replace_expr {
    ($_t:tt $sub:expr) => {
        $sub
    };
}

macro_rules! count {
    ($($xs:tt)*) => {
        0usize $(+ replace_expr!($xs 1usize))*
    };
}

macro_rules! builtin_function_def {
    ($fn_name:ident (...$args:ident) $body:tt) => {
        fn $fn_name($args: Vec<Object>) -> Result $body
    };

    ($fn_name:ident ($($arg:ident),+) { $($body:tt)* }) => {
        fn $fn_name(args: Vec<Object>) -> Result {
            const ARITY: usize = count!($($arg)+);
            let actual = args.len();
            let Ok([$($arg),+]) = <[Object; ARITY]>::try_from(args) else {
                return Err(ArityMismatch { expected: ARITY, actual });
            };
            $($body)*
        }
    };
}

macro_rules! builtin_functions {
    (
        [$const_name:ident]
        $(
            fn $fn_name:ident $args:tt $body:tt
        )+
    ) => {
        $(
            builtin_function_def! { $fn_name $args $body }
        )+
        pub const $const_name: [(&str, BuiltinFunction); count!($($fn_name)+)] = [
            $(
                (
                    stringify!($fn_name),
                    $fn_name,
                ),
            )+
        ];
    };
}

builtin_functions![
    [BUILTINS]
    fn len(arg) {
        match arg {
            Object::String(string) => Ok(Object::Integer(string.len() as i64)),
            Object::Array(elements) => Ok(Object::Integer(elements.len() as i64)),
            other => Err(UnsupportedArgument { function: "len", kind: other.kind() }),
        }
    }
    fn first(array) {
        let elements = expect_array("first", &array)?;
        Ok(elements.first().cloned().unwrap_or(NULL))
    }
    fn last(array) {
        let elements = expect_array("last", &array)?;
        Ok(elements.last().cloned().unwrap_or(NULL))
    }
    fn rest(array) {
        let elements = expect_array("rest", &array)?;
        if elements.is_empty() {
            return Ok(NULL);
        }
        Ok(Object::array(elements[1..].to_vec()))
    }
    fn push(array, element) {
        let mut elements = expect_array("push", &array)?.to_vec();
        elements.push(element);
        Ok(Object::array(elements))
    }
    fn puts(...args) {
        let mut out = stdout().lock();
        for arg in args {
            writeln!(out, "{arg}")?;
        }
        out.flush()?;
        Ok(NULL)
    }
];

fn expect_array<'a>(function: &'static str, object: &'a Object) -> Result<&'a [Object]> {
    match object {
        Object::Array(elements) => Ok(elements.as_slice()),
        other => Err(ArgumentMismatch {
            function,
            expected: ObjectKind::Array,
            actual: other.kind(),
        }),
    }
}

/// Finds the built-in function bound to `name`, if any.
pub fn lookup(name: &str) -> Option<Object> {
    BUILTINS
        .iter()
        .find(|(builtin_name, _)| *builtin_name == name)
        .map(|&(name, function)| Object::Builtin(Builtin { name, function }))
}
