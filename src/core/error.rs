// This module defines the error taxonomy of the polykernel build pipeline using the thiserror
// crate for idiomatic Rust error handling. ParseError reports malformed module text with the
// 1-based line and column of the offending token. ValidationError reports semantic rule
// violations (undeclared export targets, operand type mismatches, bad memory limits) and
// carries the source position when one is known. CompileError joins the two for in-memory
// compilation, and BuildError wraps every way a build cycle can abort: unreadable source,
// parse failure, validation failure, and an output that cannot be created or written.
// Runtime traps live with the interpreter in the runtime module.

//! Error types for the polykernel compiler and build pipeline.
//!
//! Using thiserror for more idiomatic error handling.

use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// A 1-based line/column position in module text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Malformed module syntax.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{line}:{column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(at: Position, message: impl Into<String>) -> Self {
        Self {
            line: at.line,
            column: at.column,
            message: message.into(),
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.line, self.column)
    }
}

/// A semantic rule violated by an otherwise well-formed module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub position: Option<Position>,
    pub message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            position: None,
            message: message.into(),
        }
    }

    pub fn at(position: Position, message: impl Into<String>) -> Self {
        Self {
            position: Some(position),
            message: message.into(),
        }
    }

    /// Attach a position unless one is already recorded.
    pub fn or_at(mut self, position: Option<Position>) -> Self {
        if self.position.is_none() {
            self.position = position;
        }
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position {
            Some(pos) => write!(f, "{}: {}", pos, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Errors produced while turning module text into a binary.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CompileError {
    #[error("parse error at {0}")]
    Parse(#[from] ParseError),

    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Main error type for a build cycle. Every variant aborts the build.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("failed to read module source {}: {source}", .path.display())]
    SourceRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{}:{error}", .path.display())]
    Parse { path: PathBuf, error: ParseError },

    #[error("{}: invalid module: {error}", .path.display())]
    Validation {
        path: PathBuf,
        error: ValidationError,
    },

    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl BuildError {
    pub(crate) fn from_compile(path: PathBuf, error: CompileError) -> Self {
        match error {
            CompileError::Parse(error) => BuildError::Parse { path, error },
            CompileError::Validation(error) => BuildError::Validation { path, error },
        }
    }
}

/// Result type alias for compile operations.
pub type CompileResult<T> = Result<T, CompileError>;
