//! Centralised error hierarchy for the interpreter.
//!
//! All subsystems (scanner, parser, resolver, runtime, CLI) convert their
//! internal failure modes into one of the variants defined here.  This enables
//! a uniform `Result<T>` alias throughout the crate and ergonomic
//! inter-operation with `anyhow`, while still preserving rich diagnostic
//! detail.
//!
//! The module **does not** print diagnostics itself; the `Display` impls
//! produce the exact wire format the driver writes to its diagnostic sink:
//!
//! - compile stages: `[line N] Error<where>: <message>`, where `<where>` is
//!   empty for the scanner, ` at end` at EOF and ` at '<lexeme>'` otherwise
//! - runtime: `<message>` followed by `[line N]` on its own line

use std::io;
use thiserror::Error;

use log::info;

use crate::token::{Token, TokenType};

/// Canonical error type used throughout the interpreter.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LoxError {
    /// Lexical (scanner) error with source line information.
    #[error("[line {line}] Error: {message}")]
    Lex {
        /// Human-readable description.
        message: String,

        /// 1-based line where the error occurred.
        line: usize,
    },

    /// Syntactic (parser) error.
    #[error("[line {line}] Error{location}: {message}")]
    Parse {
        message: String,
        location: String,
        line: usize,
    },

    /// Static-analysis or resolution failure (e.g. early-binding errors).
    #[error("[line {line}] Error{location}: {message}")]
    Resolve {
        message: String,
        location: String,
        line: usize,
    },

    /// Runtime evaluation error.
    #[error("{message}\n[line {line}]")]
    Runtime { message: String, line: usize },

    /// Wrapper around `std::io::Error` (transparent).  Enables `?` on I/O ops.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl LoxError {
    /// Helper constructor for the **scanner**.
    pub fn lex<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Lex error: line={}, msg={}", line, message);

        LoxError::Lex { message, line }
    }

    /// Helper constructor for the **parser**.  The offending token supplies
    /// both the line and the `at …` location part.
    pub fn parse<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Parse error: line={}, at={}, msg={}",
            token.line, token.lexeme, message
        );

        LoxError::Parse {
            message,
            location: locate(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **resolver**.
    pub fn resolve<S: Into<String>>(token: &Token, msg: S) -> Self {
        let message: String = msg.into();

        info!(
            "Creating Resolve error: line={}, at={}, msg={}",
            token.line, token.lexeme, message
        );

        LoxError::Resolve {
            message,
            location: locate(token),
            line: token.line,
        }
    }

    /// Helper constructor for the **runtime**.
    pub fn runtime<S: Into<String>>(line: usize, msg: S) -> Self {
        let message: String = msg.into();

        info!("Creating Runtime error: line={}, msg={}", line, message);

        LoxError::Runtime { message, line }
    }

    /// True for scanner/parser/resolver errors, which gate interpretation.
    pub fn is_compile_error(&self) -> bool {
        matches!(
            self,
            LoxError::Lex { .. } | LoxError::Parse { .. } | LoxError::Resolve { .. }
        )
    }
}

fn locate(token: &Token) -> String {
    if token.token_type == TokenType::EOF {
        " at end".to_string()
    } else {
        format!(" at '{}'", token.lexeme)
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, LoxError>;
