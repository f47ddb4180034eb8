// This module provides arena-based compilation session management using the bumpalo crate.
// CompilationSession borrows the arena that holds every module it assembles and tracks
// statistics across the modules compiled with it. Parsing hands out a ParsedModule, the
// scoped compiler handle: it borrows the session, holds the arena-allocated binary along with
// the source map of the text, and releases itself in Drop, so the handle is given back on
// success, on a validation failure, and on an early return alike. The session counts live
// handles, which lets a build assert that nothing outlived the compile step before it touches
// the output file. SessionStats records parse, validation and encode counts and byte totals.

//! Arena-based compilation session management.

use super::config::EncodeOptions;
use super::error::{CompileError, CompileResult, ValidationError};
use crate::binary;
use crate::text::{assemble, SourceMap};
use crate::validate::{self, Summary};
use bumpalo::Bump;
use std::cell::{Cell, RefCell};
use std::fmt;

/// Arena-based compilation session.
///
/// Every binary assembled in this session is allocated in `arena` and lives
/// as long as it does.
pub struct CompilationSession<'arena> {
    arena: &'arena Bump,
    stats: RefCell<SessionStats>,
    live_handles: Cell<usize>,
}

impl<'arena> CompilationSession<'arena> {
    pub fn new(arena: &'arena Bump) -> Self {
        Self {
            arena,
            stats: RefCell::new(SessionStats::default()),
            live_handles: Cell::new(0),
        }
    }

    pub fn arena(&self) -> &'arena Bump {
        self.arena
    }

    /// Parse module text, returning a handle that is released when dropped.
    pub fn parse<'s>(&'s self, text: &str) -> CompileResult<ParsedModule<'s, 'arena>> {
        let result = assemble(text);
        let mut stats = self.stats.borrow_mut();
        stats.source_bytes += text.len();
        let assembly = match result {
            Ok(assembly) => assembly,
            Err(err) => {
                if matches!(err, CompileError::Parse(_)) {
                    stats.parse_failures += 1;
                }
                return Err(err);
            }
        };
        stats.modules_parsed += 1;
        drop(stats);

        let bytes = self.arena.alloc_slice_copy(&assembly.bytes);
        self.live_handles.set(self.live_handles.get() + 1);
        log::debug!(
            "parsed module: {} functions, arena holds {} bytes",
            assembly.source_map.funcs.len(),
            self.arena.allocated_bytes()
        );
        Ok(ParsedModule {
            session: self,
            bytes,
            source_map: assembly.source_map,
        })
    }

    /// Handles handed out by [`parse`](Self::parse) that are still alive.
    pub fn live_handles(&self) -> usize {
        self.live_handles.get()
    }

    pub fn stats(&self) -> SessionStats {
        self.stats.borrow().clone()
    }

    fn record_validated(&self, summary: &Summary) {
        let mut stats = self.stats.borrow_mut();
        stats.functions_validated += summary.functions;
        stats.instructions_validated += summary.instructions;
    }

    fn record_encoded(&self, size: usize) {
        let mut stats = self.stats.borrow_mut();
        stats.modules_encoded += 1;
        stats.bytes_emitted += size;
    }
}

/// A parsed module, borrowed from its session.
///
/// This is the scoped compiler handle: it is released exactly once, when it
/// goes out of scope, whatever path the caller leaves by.
pub struct ParsedModule<'s, 'arena> {
    session: &'s CompilationSession<'arena>,
    bytes: &'arena [u8],
    source_map: SourceMap,
}

impl<'s, 'arena> ParsedModule<'s, 'arena> {
    /// The assembled binary, debug names included.
    pub fn bytes(&self) -> &'arena [u8] {
        self.bytes
    }

    pub fn source_map(&self) -> &SourceMap {
        &self.source_map
    }

    /// Validate the module, locating errors in the source text.
    pub fn validate(&self) -> CompileResult<Summary> {
        let summary = validate::validate(self.bytes, Some(&self.source_map))?;
        self.session.record_validated(&summary);
        Ok(summary)
    }

    /// Validate and encode to the binary format.
    pub fn to_binary(&self, options: &EncodeOptions) -> CompileResult<Vec<u8>> {
        self.validate()?;
        let bytes = binary::emit(self.bytes, options)
            .map_err(|err| ValidationError::new(err.to_string()))?;
        self.session.record_encoded(bytes.len());
        Ok(bytes)
    }
}

impl Drop for ParsedModule<'_, '_> {
    fn drop(&mut self) {
        let live = self.session.live_handles.get();
        self.session.live_handles.set(live.saturating_sub(1));
        self.session.stats.borrow_mut().handles_released += 1;
        log::debug!("released parsed module handle");
    }
}

/// Compilation session statistics.
#[derive(Debug, Default, Clone)]
pub struct SessionStats {
    /// Modules parsed successfully.
    pub modules_parsed: usize,

    /// Parse attempts that failed.
    pub parse_failures: usize,

    /// Bytes of module text read.
    pub source_bytes: usize,

    /// Functions that passed validation.
    pub functions_validated: usize,

    /// Instructions in those functions.
    pub instructions_validated: usize,

    /// Modules encoded to binary.
    pub modules_encoded: usize,

    /// Total binary size produced (bytes).
    pub bytes_emitted: usize,

    /// Parsed-module handles released.
    pub handles_released: usize,
}

impl fmt::Display for SessionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Compilation Session Statistics:")?;
        writeln!(f, "  Modules parsed: {}", self.modules_parsed)?;
        writeln!(f, "  Parse failures: {}", self.parse_failures)?;
        writeln!(f, "  Source size: {} bytes", self.source_bytes)?;
        writeln!(f, "  Functions validated: {}", self.functions_validated)?;
        writeln!(f, "  Modules encoded: {}", self.modules_encoded)?;
        writeln!(f, "  Binary size: {} bytes", self.bytes_emitted)?;
        writeln!(f, "  Handles released: {}", self.handles_released)?;
        writeln!(f, "  Instructions validated: {}", self.instructions_validated)?;
        Ok(())
    }
}

/// Parse, validate and encode in one session-scoped step.
pub(crate) fn compile_in(
    session: &CompilationSession<'_>,
    text: &str,
    options: &EncodeOptions,
) -> Result<Vec<u8>, CompileError> {
    let parsed = session.parse(text)?;
    parsed.to_binary(options)
}
