use std::cell::RefCell;
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::debug;

use crate::environment::Environment;
use crate::interpreter::{Interpreter, Signal};
use crate::stmt::FunctionDecl;
use crate::value::Value;

/// A user-defined function value: its declaration plus the environment
/// captured where the function value was created (the closure).
///
/// `is_initializer` makes the function return the bound `this` regardless of
/// its body; `is_getter` (declared without a parameter list) makes property
/// access invoke it immediately.
#[derive(Debug)]
pub struct LoxFunction {
    declaration: Rc<FunctionDecl>,
    closure: Rc<RefCell<Environment>>,
    is_initializer: bool,
    is_getter: bool,
}

impl LoxFunction {
    pub fn new(
        declaration: Rc<FunctionDecl>,
        closure: Rc<RefCell<Environment>>,
        is_initializer: bool,
    ) -> Self {
        let is_getter = declaration.params.is_none();

        LoxFunction {
            declaration,
            closure,
            is_initializer,
            is_getter,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.declaration
            .name
            .as_ref()
            .map(|token| token.lexeme.as_str())
    }

    pub fn arity(&self) -> usize {
        self.declaration
            .params
            .as_ref()
            .map_or(0, |params| params.len())
    }

    pub fn is_getter(&self) -> bool {
        self.is_getter
    }

    /// A copy of this function whose closure has a fresh scope defining
    /// `this` on top of the original closure.
    pub fn bind(&self, this_value: Value) -> LoxFunction {
        let mut scope = Environment::with_enclosing(Rc::clone(&self.closure));
        scope.define("this", Some(this_value));

        LoxFunction {
            declaration: Rc::clone(&self.declaration),
            closure: Rc::new(RefCell::new(scope)),
            is_initializer: self.is_initializer,
            is_getter: self.is_getter,
        }
    }

    pub fn call<W: Write>(
        &self,
        interpreter: &mut Interpreter<W>,
        arguments: Vec<Value>,
        line: usize,
    ) -> Result<Value, Signal> {
        debug!(
            "Calling function {} with {} argument(s)",
            self.name().unwrap_or("(anonymous)"),
            arguments.len()
        );

        let mut frame = Environment::with_enclosing(Rc::clone(&self.closure));

        if let Some(params) = &self.declaration.params {
            for (param, argument) in params.iter().zip(arguments) {
                frame.define(&param.lexeme, Some(argument));
            }
        }

        let frame = Rc::new(RefCell::new(frame));

        match interpreter.execute_block(&self.declaration.body, frame) {
            Ok(()) => {}

            Err(Signal::Return(value)) => {
                if !self.is_initializer {
                    return Ok(value);
                }
            }

            Err(other) => return Err(other),
        }

        if self.is_initializer {
            // The closure's innermost scope is the `this` frame bind() built.
            Ok(Environment::get_at(&self.closure, 0, "this", line)?)
        } else {
            Ok(Value::Nil)
        }
    }
}

impl fmt::Display for LoxFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "<fn {}>", name),

            None => write!(f, "<fn (anonymous)>"),
        }
    }
}

/// `clock()`: seconds since the Unix epoch as a double.
pub fn clock_native(_args: &[Value]) -> Result<Value, String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(timestamp))
}

/// The globals environment every interpreter starts from.
pub fn globals() -> Environment {
    let mut globals = Environment::new();

    globals.define(
        "clock",
        Some(Value::NativeFunction {
            name: "clock".to_string(),
            arity: 0,
            func: clock_native,
        }),
    );

    globals
}
