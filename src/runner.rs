//! Pipeline driver.
//!
//! Wires Scanner → Parser → Resolver → Interpreter over two injected sinks:
//! one for program output (`print`), one for diagnostics.  Compile errors
//! from any stage suppress interpretation; a runtime error is reported once
//! and stops execution.
//!
//! # Example
//!
//! ```
//! use lox::runner::Lox;
//!
//! let mut out: Vec<u8> = Vec::new();
//! let mut err: Vec<u8> = Vec::new();
//!
//! let mut lox = Lox::new(&mut out, &mut err);
//! lox.run("print 1 + 2;");
//!
//! assert_eq!(lox.exit_code(), 0);
//! drop(lox);
//! assert_eq!(out, b"3\n");
//! ```

use std::io::Write;

use log::{debug, info};

use crate::error::LoxError;
use crate::interpreter::Interpreter;
use crate::parser::Parser;
use crate::resolver::Resolver;
use crate::scanner::Scanner;
use crate::stmt::Stmt;
use crate::token::Token;

pub struct Lox<Out: Write, Err: Write> {
    interpreter: Interpreter<Out>,
    diagnostics: Err,
    had_error: bool,
    had_runtime_error: bool,
}

impl<Out: Write, Err: Write> Lox<Out, Err> {
    pub fn new(output: Out, diagnostics: Err) -> Self {
        Lox {
            interpreter: Interpreter::new(output),
            diagnostics,
            had_error: false,
            had_runtime_error: false,
        }
    }

    /// Run a batch program.
    pub fn run(&mut self, source: &str) {
        if let Some(statements) = self.compile(source) {
            if let Err(e) = self.interpreter.interpret(&statements) {
                self.report(e);
            }
        }
    }

    /// Run one REPL line: a trailing bare expression statement gets its
    /// value echoed and bound to `_`.  Interpreter state (globals,
    /// bindings) persists across lines.
    pub fn run_repl_line(&mut self, source: &str) {
        if let Some(statements) = self.compile(source) {
            if let Err(e) = self.interpreter.interpret_repl(&statements) {
                self.report(e);
            }
        }
    }

    /// Front half of the pipeline.  The scanner and parser both always run
    /// so one pass surfaces as many diagnostics as possible; the resolver
    /// needs a well-formed AST and is skipped once anything failed.
    fn compile(&mut self, source: &str) -> Option<Vec<Stmt>> {
        info!("Compiling {} byte(s) of source", source.len());

        let mut tokens: Vec<Token> = Vec::new();

        for result in Scanner::new(source) {
            match result {
                Ok(token) => tokens.push(token),

                Err(e) => self.report(e),
            }
        }

        debug!("Scanned {} token(s)", tokens.len());

        let (statements, parse_errors) = Parser::new(tokens).parse();

        for e in parse_errors {
            self.report(e);
        }

        if self.had_error {
            return None;
        }

        let resolve_errors = Resolver::new(&mut self.interpreter).resolve(&statements);

        for e in resolve_errors {
            self.report(e);
        }

        if self.had_error {
            return None;
        }

        Some(statements)
    }

    fn report(&mut self, error: LoxError) {
        if error.is_compile_error() {
            self.had_error = true;
        } else {
            self.had_runtime_error = true;
        }

        // A broken diagnostics sink leaves nothing sensible to do.
        let _ = writeln!(self.diagnostics, "{}", error);
    }

    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn had_runtime_error(&self) -> bool {
        self.had_runtime_error
    }

    /// Clear the per-run error flags (between REPL lines).
    pub fn reset(&mut self) {
        self.had_error = false;
        self.had_runtime_error = false;
    }

    /// Highest-severity exit status encountered: 70 runtime, 65 compile,
    /// 0 success.
    pub fn exit_code(&self) -> i32 {
        if self.had_runtime_error {
            70
        } else if self.had_error {
            65
        } else {
            0
        }
    }
}
