// This module serves as the hub for the infrastructure shared by every stage of the
// polykernel toolchain. It groups the error taxonomy (thiserror enums for parse, validation,
// compile and build failures), the build configuration resolved once per build and passed
// explicitly to the pipeline, and the arena-based compilation session that owns assembled
// binaries and hands out scoped module handles.

//! Core infrastructure
//!
//! # Key Components
//!
//! ## Errors (`error`)
//! - Positioned parse and validation errors
//! - Build errors that name the path involved
//!
//! ## Configuration (`config`)
//! - Source and output paths, debug-name emission
//!
//! ## Session Management (`session`)
//! - Arena-based allocation using `bumpalo`
//! - Scoped parsed-module handles released on drop
//! - Compilation statistics

pub mod config;
pub mod error;
pub mod session;

pub use config::{BuildConfig, EncodeOptions};

pub use error::{
    BuildError,
    CompileError,
    CompileResult,
    ParseError,
    Position,
    ValidationError,
};

pub use session::{
    CompilationSession,
    ParsedModule,
    SessionStats,
};
