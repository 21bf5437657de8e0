use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use log::debug;

use crate::error::LoxError;
use crate::value::Value;

/// A lexical scope: identifier slots plus an optional enclosing parent.
///
/// A slot of `None` is the declared-but-uninitialized sentinel; reading it
/// is a runtime error.  Definition always writes the innermost scope, while
/// lookup and assignment walk the parent chain.
#[derive(Debug, Clone)]
pub struct Environment {
    values: HashMap<String, Option<Value>>,
    enclosing: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
    pub fn new() -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: None,
        }
    }

    pub fn with_enclosing(enclosing: Rc<RefCell<Environment>>) -> Self {
        Environment {
            values: HashMap::new(),
            enclosing: Some(enclosing),
        }
    }

    pub fn define(&mut self, name: &str, value: Option<Value>) {
        debug!("Defining '{}' (initialized: {})", name, value.is_some());

        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str, line: usize) -> Result<Value, LoxError> {
        match self.values.get(name) {
            Some(Some(value)) => Ok(value.clone()),

            Some(None) => Err(LoxError::runtime(
                line,
                format!("Uninitialized variable '{}'.", name),
            )),

            None => match &self.enclosing {
                Some(enclosing) => enclosing.borrow().get(name, line),

                None => Err(LoxError::runtime(
                    line,
                    format!("Undefined variable '{}'.", name),
                )),
            },
        }
    }

    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<(), LoxError> {
        if self.values.contains_key(name) {
            self.values.insert(name.to_string(), Some(value));
            Ok(())
        } else if let Some(enclosing) = &self.enclosing {
            enclosing.borrow_mut().assign(name, value, line)
        } else {
            Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            ))
        }
    }

    /// The scope exactly `distance` parent hops away, if the chain is that
    /// deep.
    pub fn ancestor(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
    ) -> Option<Rc<RefCell<Environment>>> {
        let mut current = Rc::clone(env);

        for _ in 0..distance {
            let next = current.borrow().enclosing.clone()?;
            current = next;
        }

        Some(current)
    }

    /// Read `name` from the scope `distance` hops up the chain.  The
    /// resolver guarantees the slot exists; a missing slot surfaces as an
    /// undefined-variable error rather than a crash.
    pub fn get_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        line: usize,
    ) -> Result<Value, LoxError> {
        debug!("get_at depth={} name={}", distance, name);

        match Environment::ancestor(env, distance) {
            Some(scope) => {
                let scope = scope.borrow();
                match scope.values.get(name) {
                    Some(Some(value)) => Ok(value.clone()),

                    Some(None) => Err(LoxError::runtime(
                        line,
                        format!("Uninitialized variable '{}'.", name),
                    )),

                    None => Err(LoxError::runtime(
                        line,
                        format!("Undefined variable '{}'.", name),
                    )),
                }
            }

            None => Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            )),
        }
    }

    /// Write `name` in the scope `distance` hops up the chain.
    pub fn assign_at(
        env: &Rc<RefCell<Environment>>,
        distance: usize,
        name: &str,
        value: Value,
        line: usize,
    ) -> Result<(), LoxError> {
        debug!("assign_at depth={} name={}", distance, name);

        match Environment::ancestor(env, distance) {
            Some(scope) => {
                scope.borrow_mut().values.insert(name.to_string(), Some(value));
                Ok(())
            }

            None => Err(LoxError::runtime(
                line,
                format!("Undefined variable '{}'.", name),
            )),
        }
    }
}
