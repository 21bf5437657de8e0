//! Static resolution pass.
//!
//! A single AST walk that:
//! 1. **Builds lexical scopes**: a stack of maps tracking each local's state
//!    (`Declared` during its initializer, `Defined` once usable, `Read` once
//!    actually used).
//! 2. **Enforces static rules**: redeclaration in the same scope, reading a
//!    variable in its own initializer, `return` outside functions or with a
//!    value inside `init`, `this`/`super` outside their classes, `break`
//!    outside loops, self-inheritance, and locals that are never read.
//! 3. **Records binding distances**: every `Variable`/`Assign`/`This`/`Super`
//!    occurrence is reported to the interpreter as a local at some depth, or
//!    left for the globals environment.
//!
//! Errors are collected, not thrown: the whole program is resolved in one
//! pass so the user sees every static diagnostic in a single run.

use std::collections::HashMap;
use std::io::Write;

use log::{debug, info};

use crate::error::LoxError;
use crate::expr::Expr;
use crate::interpreter::Interpreter;
use crate::stmt::{FunctionDecl, Stmt};
use crate::token::Token;

/// Are we inside a user function?  Used to validate `return`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum FunctionType {
    None,
    Function,
    Method,
    Initializer,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum ClassType {
    /// Not inside any class
    None,

    /// Inside a class declaration _without_ a superclass
    Class,

    /// Inside a class declaration _with_ a superclass
    Subclass,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum VarState {
    Declared,
    Defined,
    Read,
}

#[derive(Debug)]
struct Local {
    token: Token,
    state: VarState,
}

/// Resolver: tracks scopes, enforces static rules, and *records* binding
/// distances (locals vs. globals) by calling back into the interpreter.
pub struct Resolver<'interp, W: Write> {
    interpreter: &'interp mut Interpreter<W>,
    scopes: Vec<HashMap<String, Local>>,
    current_function: FunctionType,
    current_class: ClassType,
    loop_depth: usize,
    errors: Vec<LoxError>,
}

impl<'interp, W: Write> Resolver<'interp, W> {
    /// Create a new resolver bound to the given interpreter.
    pub fn new(interpreter: &'interp mut Interpreter<W>) -> Self {
        Resolver {
            interpreter,
            scopes: Vec::new(),
            current_function: FunctionType::None,
            current_class: ClassType::None,
            loop_depth: 0,
            errors: Vec::new(),
        }
    }

    /// Walk all top-level statements, returning every diagnostic found.
    pub fn resolve(mut self, statements: &[Stmt]) -> Vec<LoxError> {
        info!(
            "Beginning resolve pass over {} statement(s)",
            statements.len()
        );

        for stmt in statements {
            self.resolve_stmt(stmt);
        }

        self.errors
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Statement resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Block(statements) => {
                self.begin_scope();

                for s in statements {
                    self.resolve_stmt(s);
                }

                self.end_scope();
            }

            Stmt::Var { name, initializer } => {
                // 1. Declare the name (visible but unreadable while its own
                //    initializer resolves).
                self.declare(name);

                // 2. Resolve the initializer expression, if any.
                if let Some(expr) = initializer {
                    self.resolve_expr(expr);
                }

                // 3. Define the variable so it's available in this scope.
                self.define(name);
            }

            Stmt::Function(declaration) => {
                // Declaration names are considered read by convention; only
                // plain `var` locals feed the unused-variable diagnostic.
                if let Some(name) = &declaration.name {
                    self.declare(name);
                    self.define(name);
                    self.mark_used(name);
                }

                self.resolve_function(declaration, FunctionType::Function);
            }

            Stmt::Expression(expr) | Stmt::Print(expr) => {
                self.resolve_expr(expr);
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);

                if let Some(eb) = else_branch.as_deref() {
                    self.resolve_stmt(eb);
                }
            }

            Stmt::While { condition, body } => {
                self.resolve_expr(condition);

                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
            }

            Stmt::Break { keyword } => {
                if self.loop_depth == 0 {
                    self.error(keyword, "Must be inside a loop to use 'break'.");
                }
            }

            Stmt::Return { keyword, value } => {
                if self.current_function == FunctionType::None {
                    self.error(keyword, "Can't return from top-level code.");
                }

                if let Some(expr) = value {
                    if self.current_function == FunctionType::Initializer {
                        self.error(keyword, "Can't return a value from an initializer.");
                    }

                    self.resolve_expr(expr);
                }
            }

            Stmt::Class {
                name,
                superclass,
                methods,
                class_methods,
            } => {
                self.resolve_class(name, superclass.as_ref(), methods, class_methods);
            }
        }
    }

    fn resolve_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[std::rc::Rc<FunctionDecl>],
        class_methods: &[std::rc::Rc<FunctionDecl>],
    ) {
        // 1. Declare the class name; it is defined after the body resolves.
        self.declare(name);

        // 2. Save and enter the class context.
        let enclosing_class = self.current_class;

        self.current_class = if superclass.is_some() {
            ClassType::Subclass
        } else {
            ClassType::Class
        };

        // 3. Self-inheritance guard, then resolve the superclass reference
        //    and bind `super` for the method bodies.
        if let Some(superclass_expr) = superclass {
            if let Expr::Variable {
                name: super_name, ..
            } = superclass_expr
            {
                if super_name.lexeme == name.lexeme {
                    self.error(super_name, "A class can't inherit from itself.");
                }
            }

            self.resolve_expr(superclass_expr);

            self.begin_scope();
            self.insert_synthetic("super", name);
        }

        // 4. Open the implicit `this` scope for instance methods.
        self.begin_scope();
        self.insert_synthetic("this", name);

        // 5. Resolve each method; `init` gets the initializer context.
        for method in methods {
            let kind = match &method.name {
                Some(method_name) if method_name.lexeme == "init" => FunctionType::Initializer,

                _ => FunctionType::Method,
            };

            self.resolve_function(method, kind);
        }

        // 6. Close the `this` scope.
        self.end_scope();

        // 7. Static methods resolve in their own `this`-bearing scope;
        //    `this` is the class value there.
        for class_method in class_methods {
            self.begin_scope();
            self.insert_synthetic("this", name);

            self.resolve_function(class_method, FunctionType::Method);

            self.end_scope();
        }

        // 8. If we opened a `super` scope, close it now.
        if superclass.is_some() {
            self.end_scope();
        }

        // 9. Define the class name and restore the outer class context.
        self.define(name);
        self.mark_used(name);

        self.current_class = enclosing_class;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Expression resolution
    // ─────────────────────────────────────────────────────────────────────────

    fn resolve_expr(&mut self, expr: &Expr) {
        match expr {
            Expr::Literal(_) => {}

            Expr::Grouping(inner) => {
                self.resolve_expr(inner);
            }

            Expr::Unary { right, .. } => {
                self.resolve_expr(right);
            }

            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }

            Expr::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }

            Expr::Comma(items) => {
                for item in items {
                    self.resolve_expr(item);
                }
            }

            Expr::Variable { name, id } => {
                // Reading a variable while its initializer resolves is the
                // classic `var a = a;` error.
                if let Some(scope) = self.scopes.last() {
                    if scope.get(&name.lexeme).map(|local| local.state)
                        == Some(VarState::Declared)
                    {
                        self.error(name, "Can't read local variable in its own initializer.");
                    }
                }

                self.resolve_local(*id, name, true);
            }

            Expr::Assign { name, value, id } => {
                // Writing alone does not count as a read.
                self.resolve_expr(value);
                self.resolve_local(*id, name, false);
            }

            Expr::Call {
                callee, arguments, ..
            } => {
                self.resolve_expr(callee);

                for argument in arguments {
                    self.resolve_expr(argument);
                }
            }

            Expr::Get { object, .. } => {
                self.resolve_expr(object);
            }

            Expr::Set { object, value, .. } => {
                self.resolve_expr(object);
                self.resolve_expr(value);
            }

            Expr::This { keyword, id } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'this' outside of a class.");
                    return;
                }

                self.resolve_local(*id, keyword, true);
            }

            Expr::Super { keyword, id, .. } => {
                if self.current_class == ClassType::None {
                    self.error(keyword, "Can't use 'super' outside of a class.");
                    return;
                }

                if self.current_class != ClassType::Subclass {
                    self.error(keyword, "Can't use 'super' in a class with no superclass.");
                    return;
                }

                self.resolve_local(*id, keyword, true);
            }

            Expr::Function(declaration) => {
                // Function expression names bind only inside the function
                // value itself, never in the enclosing scope.
                self.resolve_function(declaration, FunctionType::Function);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Function helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Enter a fresh scope for a function's parameters + body.
    ///
    /// `kind` indicates whether this is a normal function, a method, or an
    /// initializer.  Loop context does not cross function boundaries, so a
    /// `break` inside a nested function needs its own loop.
    fn resolve_function(&mut self, declaration: &FunctionDecl, kind: FunctionType) {
        let enclosing_function = self.current_function;
        let enclosing_loop_depth = self.loop_depth;

        self.current_function = kind;
        self.loop_depth = 0;

        self.begin_scope();

        if let Some(params) = &declaration.params {
            for param in params {
                // Parameters are read by convention.
                self.declare(param);
                self.define(param);
                self.mark_used(param);
            }
        }

        for stmt in &declaration.body {
            self.resolve_stmt(stmt);
        }

        self.end_scope();

        self.current_function = enclosing_function;
        self.loop_depth = enclosing_loop_depth;
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Scope management
    // ─────────────────────────────────────────────────────────────────────────

    #[inline]
    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    /// Pop the innermost scope, flagging locals that were never read.
    fn end_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for local in scope.into_values() {
                if local.state == VarState::Defined {
                    self.errors
                        .push(LoxError::resolve(&local.token, "Unused local variable."));
                }
            }
        }
    }

    fn declare(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if scope.contains_key(&name.lexeme) {
                self.error(name, "Already variable with this name in this scope.");
                return;
            }

            scope.insert(
                name.lexeme.clone(),
                Local {
                    token: name.clone(),
                    state: VarState::Declared,
                },
            );
        }
    }

    fn define(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(local) = scope.get_mut(&name.lexeme) {
                // Initializers may already have read the name through a
                // closure; don't downgrade Read.
                if local.state == VarState::Declared {
                    local.state = VarState::Defined;
                }
            }
        }
    }

    fn mark_used(&mut self, name: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            if let Some(local) = scope.get_mut(&name.lexeme) {
                local.state = VarState::Read;
            }
        }
    }

    /// `this` and `super` are injected by the class machinery, not user
    /// declarations; they never feed the unused diagnostic.
    fn insert_synthetic(&mut self, name: &str, token: &Token) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                Local {
                    token: token.clone(),
                    state: VarState::Read,
                },
            );
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Binding-distance helper
    // ─────────────────────────────────────────────────────────────────────────

    /// Record this occurrence as either a local at some depth or a global.
    fn resolve_local(&mut self, id: usize, name: &Token, is_read: bool) {
        for (depth, scope) in self.scopes.iter_mut().rev().enumerate() {
            if let Some(local) = scope.get_mut(&name.lexeme) {
                if is_read {
                    local.state = VarState::Read;
                }

                debug!("Resolved '{}' at depth {}", name.lexeme, depth);

                self.interpreter.note_local(id, depth);
                return;
            }
        }

        // Not found in any scope: the interpreter will look in globals.
        debug!("Resolved '{}' as global", name.lexeme);
    }

    fn error(&mut self, token: &Token, message: &str) {
        self.errors.push(LoxError::resolve(token, message));
    }
}
