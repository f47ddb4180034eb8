//! polykernel - a sandboxed polynomial kernel and its build pipeline.
//!
//! The kernel is a hand-written WebAssembly text module
//! (`kernel/polynomial.wat`) exporting
//! `evaluate(count: i32, offset: i32, x: f64) -> f64`. This crate assembles it
//! into a reproducible binary, and runs binaries in a small interpreter so the
//! kernel contract can be checked from Rust.
//!
//! # Primary Usage
//!
//! ```no_run
//! use polykernel::bridge::PolynomialHost;
//! use polykernel::core::BuildConfig;
//! use polykernel::pipeline;
//!
//! // One build cycle: kernel/polynomial.wat -> static/wasm/polynomial.wasm
//! let report = pipeline::build(&BuildConfig::default())?;
//!
//! let bytes = std::fs::read(&report.output)?;
//! let mut host = PolynomialHost::from_binary(&bytes)?;
//! assert_eq!(host.evaluate(&[2.0, 0.0, -1.0], 3.0)?, 17.0);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! - [`text`] - text front end on `wast`, with a source map for diagnostics
//! - [`validate`] - binary validation on `wasmparser`, errors mapped to text
//! - [`binary`] - decoding into [`ir`] (`wasmparser`) and encoding (`wasm-encoder`)
//! - [`ir`] - the module form the interpreter runs
//! - [`runtime`] - interpreter, linear memory, traps
//! - [`kernel`] - the kernel source and its reference model
//! - [`bridge`] - reference host for the kernel
//! - [`pipeline`] - the build cycle
//! - [`core`] - errors, configuration, compilation session

pub mod binary;
pub mod bridge;
pub mod core;
pub mod ir;
pub mod kernel;
pub mod pipeline;
pub mod runtime;
pub mod text;
pub mod validate;

pub use crate::core::{
    BuildConfig, BuildError, CompilationSession, CompileError, EncodeOptions, ParseError,
    ValidationError,
};
pub use bridge::{BridgeError, PolynomialHost};
pub use pipeline::{build, compile, BuildReport};
