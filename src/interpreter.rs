//! Tree-walking evaluator.
//!
//! Walks the statement list against a chain of environments, using the
//! binding depths the resolver recorded (`note_local`) for O(1) variable
//! lookup.  Non-local control flow (`return`, `break`) unwinds through the
//! [`Signal`] type rather than through errors: `Return` is caught at the
//! function-call boundary, `Break` at the nearest `while` loop, and
//! `Error` propagates to the driver.

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use log::{debug, info};

use crate::class::LoxClass;
use crate::environment::Environment;
use crate::error::LoxError;
use crate::expr::{Expr, LiteralValue};
use crate::function::{self, LoxFunction};
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// Unwinding signals.  `Return` and `Break` are control flow, not errors;
/// they must only reach their designated catch sites.
#[derive(Debug)]
pub enum Signal {
    Return(Value),
    Break,
    Error(LoxError),
}

impl From<LoxError> for Signal {
    fn from(e: LoxError) -> Signal {
        Signal::Error(e)
    }
}

impl Signal {
    /// What the driver sees if a signal reaches the top of the program.
    /// Control-flow signals cannot get here once resolution has passed.
    fn into_error(self) -> LoxError {
        match self {
            Signal::Error(e) => e,

            Signal::Return(_) => LoxError::runtime(0, "Return escaped all function calls."),

            Signal::Break => LoxError::runtime(0, "Break escaped all loops."),
        }
    }
}

pub struct Interpreter<W: Write> {
    output: W,
    globals: Rc<RefCell<Environment>>,
    environment: Rc<RefCell<Environment>>,
    /// Depth map: expression id -> environment hops to the defining scope.
    locals: HashMap<usize, usize>,
}

impl<W: Write> Interpreter<W> {
    pub fn new(output: W) -> Self {
        let globals = Rc::new(RefCell::new(function::globals()));

        Interpreter {
            output,
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
        }
    }

    /// Resolver callback: this occurrence of an expression id lives
    /// `depth` scopes up from its evaluation site.
    pub fn note_local(&mut self, id: usize, depth: usize) {
        debug!("note_local id={} depth={}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Run a batch program.  Stops at the first runtime error.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        info!("Interpreting {} statement(s)", statements.len());

        for statement in statements {
            if let Err(signal) = self.execute(statement) {
                return Err(signal.into_error());
            }
        }

        Ok(())
    }

    /// REPL variant: when the line ends in a bare expression statement, the
    /// preceding statements run and the trailing expression is re-executed
    /// as `var _ = <expr>; print _;` — the value is echoed and stays bound
    /// to `_` for later lines.
    pub fn interpret_repl(&mut self, statements: &[Stmt]) -> Result<(), LoxError> {
        if let Some((Stmt::Expression(expr), rest)) = statements.split_last() {
            self.interpret(rest)?;

            match self.evaluate(expr) {
                Ok(value) => {
                    self.environment
                        .borrow_mut()
                        .define("_", Some(value.clone()));

                    writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                    Ok(())
                }

                Err(signal) => Err(signal.into_error()),
            }
        } else {
            self.interpret(statements)
        }
    }

    fn execute(&mut self, stmt: &Stmt) -> Result<(), Signal> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;

                Ok(())
            }

            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;

                writeln!(self.output, "{}", value).map_err(LoxError::from)?;

                Ok(())
            }

            Stmt::Var { name, initializer } => {
                // No initializer leaves the slot in the uninitialized state.
                let value: Option<Value> = match initializer {
                    Some(expr) => Some(self.evaluate(expr)?),

                    None => None,
                };

                self.environment.borrow_mut().define(&name.lexeme, value);

                Ok(())
            }

            Stmt::Block(statements) => {
                let scope = Environment::with_enclosing(Rc::clone(&self.environment));

                self.execute_block(statements, Rc::new(RefCell::new(scope)))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)?;
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)?;
                }

                Ok(())
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body) {
                        Ok(()) => {}

                        // `break` terminates the nearest enclosing loop only.
                        Err(Signal::Break) => break,

                        Err(other) => return Err(other),
                    }
                }

                Ok(())
            }

            Stmt::Break { .. } => Err(Signal::Break),

            Stmt::Function(declaration) => {
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                if let Some(name) = &declaration.name {
                    self.environment
                        .borrow_mut()
                        .define(&name.lexeme, Some(Value::Function(Rc::new(function))));
                }

                Ok(())
            }

            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.evaluate(expr)?,

                    None => Value::Nil,
                };

                Err(Signal::Return(value))
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                class_methods,
            } => self.execute_class(name, superclass.as_ref(), methods, class_methods),
        }
    }

    /// Run `statements` inside `scope`, restoring the previous environment
    /// on every exit path, unwinds included.
    pub fn execute_block(
        &mut self,
        statements: &[Stmt],
        scope: Rc<RefCell<Environment>>,
    ) -> Result<(), Signal> {
        let previous = std::mem::replace(&mut self.environment, scope);

        let mut result = Ok(());

        for statement in statements {
            result = self.execute(statement);

            if result.is_err() {
                break;
            }
        }

        self.environment = previous;

        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
        class_methods: &[Rc<FunctionDecl>],
    ) -> Result<(), Signal> {
        info!("Declaring class {}", name.lexeme);

        let superclass_value: Option<Rc<LoxClass>> = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),

                _ => {
                    return Err(LoxError::runtime(
                        name.line,
                        "Superclass must be a class.",
                    )
                    .into());
                }
            },

            None => None,
        };

        // Placeholder definition lets methods refer to the class by name.
        self.environment
            .borrow_mut()
            .define(&name.lexeme, Some(Value::Nil));

        // Methods of a subclass close over a scope holding `super`.
        let previous = Rc::clone(&self.environment);

        if let Some(superclass) = &superclass_value {
            let mut scope = Environment::with_enclosing(Rc::clone(&self.environment));
            scope.define("super", Some(Value::Class(Rc::clone(superclass))));

            self.environment = Rc::new(RefCell::new(scope));
        }

        let mut method_table: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for declaration in methods {
            if let Some(method_name) = &declaration.name {
                let is_initializer = method_name.lexeme == "init";

                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    is_initializer,
                );

                method_table.insert(method_name.lexeme.clone(), Rc::new(function));
            }
        }

        let mut static_table: HashMap<String, Rc<LoxFunction>> = HashMap::new();

        for declaration in class_methods {
            if let Some(method_name) = &declaration.name {
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                static_table.insert(method_name.lexeme.clone(), Rc::new(function));
            }
        }

        let metaclass = LoxClass::new(
            format!("{} metaclass", name.lexeme),
            None,
            static_table,
            None,
        );

        let class = LoxClass::new(
            name.lexeme.clone(),
            superclass_value,
            method_table,
            Some(Rc::new(metaclass)),
        );

        self.environment = previous;

        self.environment.borrow_mut().assign(
            &name.lexeme,
            Value::Class(Rc::new(class)),
            name.line,
        )?;

        Ok(())
    }

    pub fn evaluate(&mut self, expr: &Expr) -> Result<Value, Signal> {
        match expr {
            Expr::Literal(literal) => Ok(match literal {
                LiteralValue::Number(n) => Value::Number(*n),

                LiteralValue::Str(s) => Value::String(s.clone()),

                LiteralValue::True => Value::Bool(true),

                LiteralValue::False => Value::Bool(false),

                LiteralValue::Nil => Value::Nil,
            }),

            Expr::Grouping(inner) => self.evaluate(inner),

            Expr::Unary { operator, right } => self.evaluate_unary(operator, right),

            Expr::Binary {
                left,
                operator,
                right,
            } => self.evaluate_binary(left, operator, right),

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left_value = self.evaluate(left)?;

                // Short-circuit: the result is the chosen operand itself,
                // never a coerced boolean.
                match operator.token_type {
                    TokenType::OR if left_value.is_truthy() => Ok(left_value),

                    TokenType::AND if !left_value.is_truthy() => Ok(left_value),

                    _ => self.evaluate(right),
                }
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }

            Expr::Comma(items) => {
                let mut value = Value::Nil;

                for item in items {
                    value = self.evaluate(item)?;
                }

                Ok(value)
            }

            Expr::Variable { name, id } => Ok(self.look_up_variable(name, *id)?),

            Expr::Assign { name, value, id } => {
                let value = self.evaluate(value)?;

                match self.locals.get(id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,

                    None => self.globals.borrow_mut().assign(
                        &name.lexeme,
                        value.clone(),
                        name.line,
                    )?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => self.evaluate_call(callee, paren, arguments),

            Expr::Get { object, name } => self.evaluate_get(object, name),

            Expr::Set {
                object,
                name,
                value,
            } => {
                let object = self.evaluate(object)?;

                match object {
                    Value::Instance(instance) => {
                        let value = self.evaluate(value)?;

                        instance
                            .borrow_mut()
                            .set_field(&name.lexeme, value.clone());

                        Ok(value)
                    }

                    _ => Err(LoxError::runtime(
                        name.line,
                        "Only instances have fields.",
                    )
                    .into()),
                }
            }

            Expr::This { keyword, id } => Ok(self.look_up_variable(keyword, *id)?),

            Expr::Super {
                keyword, method, ..
            } => self.evaluate_super(keyword, method, expr),

            Expr::Function(declaration) => {
                let function = LoxFunction::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );

                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    fn look_up_variable(&self, name: &Token, id: usize) -> Result<Value, LoxError> {
        match self.locals.get(&id) {
            Some(&distance) => {
                Environment::get_at(&self.environment, distance, &name.lexeme, name.line)
            }

            None => self.globals.borrow().get(&name.lexeme, name.line),
        }
    }

    fn evaluate_unary(&mut self, operator: &Token, right: &Expr) -> Result<Value, Signal> {
        let value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::MINUS => match value {
                Value::Number(n) => Ok(Value::Number(-n)),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operand must be a number.",
                )
                .into()),
            },

            TokenType::BANG => Ok(Value::Bool(!value.is_truthy())),

            _ => Err(LoxError::runtime(operator.line, "Invalid unary operator.").into()),
        }
    }

    fn evaluate_binary(
        &mut self,
        left: &Expr,
        operator: &Token,
        right: &Expr,
    ) -> Result<Value, Signal> {
        let left_value = self.evaluate(left)?;
        let right_value = self.evaluate(right)?;

        match operator.token_type {
            TokenType::PLUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),

                // A string on either side stringifies the other operand.
                (Value::String(a), b) => Ok(Value::String(format!("{}{}", a, b))),

                (a, Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),

                _ => Err(LoxError::runtime(
                    operator.line,
                    "Operands must be two numbers or two strings.",
                )
                .into()),
            },

            TokenType::MINUS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a - b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::STAR => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a * b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::SLASH => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => {
                    if b == 0.0 {
                        Err(LoxError::runtime(operator.line, "Cannot divide by zero.").into())
                    } else {
                        Ok(Value::Number(a / b))
                    }
                }

                _ => Err(numbers_expected(operator)),
            },

            TokenType::EQUAL_EQUAL => Ok(Value::Bool(left_value == right_value)),

            TokenType::BANG_EQUAL => Ok(Value::Bool(left_value != right_value)),

            TokenType::GREATER => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a > b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::GREATER_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a >= b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::LESS => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a < b)),

                _ => Err(numbers_expected(operator)),
            },

            TokenType::LESS_EQUAL => match (left_value, right_value) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Bool(a <= b)),

                _ => Err(numbers_expected(operator)),
            },

            _ => Err(LoxError::runtime(operator.line, "Invalid binary operator.").into()),
        }
    }

    fn evaluate_call(
        &mut self,
        callee: &Expr,
        paren: &Token,
        arguments: &[Expr],
    ) -> Result<Value, Signal> {
        let callee_value = self.evaluate(callee)?;

        // Callability is checked before the arguments run.
        let arity = match &callee_value {
            Value::NativeFunction { arity, .. } => *arity,

            Value::Function(function) => function.arity(),

            Value::Class(class) => class.arity(),

            _ => {
                return Err(LoxError::runtime(
                    paren.line,
                    "Can only call functions and classes.",
                )
                .into());
            }
        };

        let mut argument_values = Vec::with_capacity(arguments.len());

        for argument in arguments {
            argument_values.push(self.evaluate(argument)?);
        }

        if argument_values.len() != arity {
            return Err(LoxError::runtime(
                paren.line,
                format!("Expected {} args but got {}.", arity, argument_values.len()),
            )
            .into());
        }

        match callee_value {
            Value::NativeFunction { func, .. } => func(&argument_values)
                .map_err(|message| LoxError::runtime(paren.line, message).into()),

            Value::Function(function) => function.call(self, argument_values, paren.line),

            Value::Class(class) => LoxClass::call(&class, self, argument_values, paren.line),

            _ => unreachable!("arity check rejects non-callables"),
        }
    }

    fn evaluate_get(&mut self, object: &Expr, name: &Token) -> Result<Value, Signal> {
        let object_value = self.evaluate(object)?;

        match &object_value {
            Value::Instance(instance) => {
                if let Some(field) = instance.borrow().field(&name.lexeme) {
                    return Ok(field);
                }

                let method = instance.borrow().class().find_method(&name.lexeme);

                match method {
                    Some(method) => {
                        self.finish_property(method, Value::Instance(Rc::clone(instance)), name)
                    }

                    None => Err(undefined_property(name)),
                }
            }

            // Property access on a class value goes through its metaclass;
            // static methods see the class itself as `this`.
            Value::Class(class) => {
                let static_method = class
                    .metaclass
                    .as_ref()
                    .and_then(|metaclass| metaclass.find_method(&name.lexeme));

                match static_method {
                    Some(method) => {
                        self.finish_property(method, Value::Class(Rc::clone(class)), name)
                    }

                    None => Err(undefined_property(name)),
                }
            }

            _ => Err(LoxError::runtime(
                name.line,
                "Only instances have properties.",
            )
            .into()),
        }
    }

    /// Bind a found method; getters are invoked on the spot.
    fn finish_property(
        &mut self,
        method: Rc<LoxFunction>,
        receiver: Value,
        name: &Token,
    ) -> Result<Value, Signal> {
        let bound = method.bind(receiver);

        if bound.is_getter() {
            debug!("Invoking getter {}", name.lexeme);

            bound.call(self, Vec::new(), name.line)
        } else {
            Ok(Value::Function(Rc::new(bound)))
        }
    }

    fn evaluate_super(
        &mut self,
        keyword: &Token,
        method: &Token,
        expr: &Expr,
    ) -> Result<Value, Signal> {
        let id = match expr {
            Expr::Super { id, .. } => *id,

            _ => unreachable!("evaluate_super is only reached from Expr::Super"),
        };

        let distance = match self.locals.get(&id) {
            Some(&distance) => distance,

            None => {
                return Err(LoxError::runtime(
                    keyword.line,
                    "Can't use 'super' outside of a class.",
                )
                .into());
            }
        };

        let superclass =
            Environment::get_at(&self.environment, distance, "super", keyword.line)?;

        // `this` lives one scope nearer than `super`.
        let this_value =
            Environment::get_at(&self.environment, distance - 1, "this", keyword.line)?;

        match superclass {
            Value::Class(superclass) => match superclass.find_method(&method.lexeme) {
                Some(found) => self.finish_property(found, this_value, method),

                None => Err(undefined_property(method)),
            },

            _ => Err(LoxError::runtime(keyword.line, "Superclass must be a class.").into()),
        }
    }
}

fn numbers_expected(operator: &Token) -> Signal {
    LoxError::runtime(operator.line, "Operands must be numbers.").into()
}

fn undefined_property(name: &Token) -> Signal {
    LoxError::runtime(
        name.line,
        format!("Undefined property '{}'.", name.lexeme),
    )
    .into()
}
