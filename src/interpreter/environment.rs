use std::cell::RefCell;
use std::fmt::{Debug, Formatter};
use std::mem;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use crate::interpreter::Object;

/// A lexical scope: its own bindings plus an optional enclosing scope.
///
/// Scopes are reference counted so closures can keep their defining scope
/// alive after the call that created it returns.
#[derive(Default)]
pub struct Environment {
    store: RefCell<FxHashMap<String, Object>>,
    outer: Option<Rc<Environment>>,
}

impl Environment {
    pub fn new() -> Rc<Environment> {
        Rc::new(Environment::default())
    }

    pub fn enclosed(outer: &Rc<Environment>) -> Rc<Environment> {
        Rc::new(Environment {
            store: RefCell::default(),
            outer: Some(Rc::clone(outer)),
        })
    }

    /// Looks `name` up in this scope, then in each enclosing scope in turn.
    pub fn get(&self, name: &str) -> Option<Object> {
        let mut scope = self;
        loop {
            if let Some(value) = scope.store.borrow().get(name) {
                return Some(value.clone());
            }
            scope = scope.outer.as_deref()?;
        }
    }

    /// Binds `name` in this scope only, shadowing any outer binding.
    pub fn set(&self, name: impl Into<String>, value: Object) -> Object {
        self.store.borrow_mut().insert(name.into(), value.clone());
        value
    }

    pub fn outer(&self) -> Option<&Rc<Environment>> {
        self.outer.as_ref()
    }

    /// Snapshot of the values bound directly in this scope.
    pub fn values(&self) -> Vec<Object> {
        self.store.borrow().values().cloned().collect()
    }

    /// Removes every binding from this scope.
    ///
    /// A closure stored in the scope it captured keeps that scope alive through
    /// a reference cycle; clearing the scope is what breaks it.
    pub fn clear(&self) {
        let bindings = mem::take(&mut *self.store.borrow_mut());
        drop(bindings);
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let store = self.store.borrow();
        let mut names: Vec<_> = store.keys().collect();
        names.sort();
        f.debug_struct("Environment")
            .field("names", &names)
            .field("outer", &self.outer)
            .finish()
    }
}
