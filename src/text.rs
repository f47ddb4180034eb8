// Module text is parsed and assembled by the wast crate. Syntax errors from the lexer and parser become ParseErrors; errors the
// assembler raises while resolving `$names` (an export of an undeclared function, a branch to
// a missing label) become ValidationErrors. Both carry the 1-based line and column of the
// offending token. Before assembling, the positions of every defined function and memory are
// recorded in a SourceMap so that later validation of the binary can point back at the text.
// The folded-expression parser in wast keeps its own explicit stack, so nesting depth is
// bounded by memory rather than by the thread's stack.

//! Text front end: module text to an unvalidated binary.

use crate::core::error::{CompileError, ParseError, Position, ValidationError};
use wast::core::{FuncKind, ModuleField, ModuleKind};
use wast::parser::{self, ParseBuffer};
use wast::token::Span;
use wast::Wat;

/// Where the items of an assembled module were written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMap {
    /// `func` keyword of each defined function, in index order.
    pub funcs: Vec<Position>,
    /// `memory` keyword of each memory.
    pub memories: Vec<Position>,
}

/// An assembled, not yet validated module.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Binary with every name the text declared.
    pub bytes: Vec<u8>,
    pub source_map: SourceMap,
}

/// Parse module text and assemble it into binary form.
pub fn assemble(text: &str) -> Result<Assembly, CompileError> {
    let buffer = ParseBuffer::new(text).map_err(|err| syntax_error(text, &err))?;
    let mut wat = parser::parse::<Wat>(&buffer).map_err(|err| syntax_error(text, &err))?;

    let source_map = match &wat {
        Wat::Module(module) => source_map(text, &module.kind),
        Wat::Component(_) => {
            return Err(ParseError::new(Position::new(1, 1), "expected a module").into());
        }
    };

    let bytes = wat.encode().map_err(|err| {
        ValidationError::at(position(text, err.span()), err.message())
    })?;
    log::debug!(
        "assembled {} functions into {} bytes",
        source_map.funcs.len(),
        bytes.len()
    );
    Ok(Assembly { bytes, source_map })
}

fn source_map(text: &str, kind: &ModuleKind<'_>) -> SourceMap {
    let mut map = SourceMap::default();
    if let ModuleKind::Text(fields) = kind {
        for field in fields {
            match field {
                ModuleField::Func(func) if matches!(func.kind, FuncKind::Inline { .. }) => {
                    map.funcs.push(position(text, func.span));
                }
                ModuleField::Memory(memory) => map.memories.push(position(text, memory.span)),
                _ => {}
            }
        }
    }
    map
}

fn syntax_error(text: &str, err: &wast::Error) -> CompileError {
    ParseError::new(position(text, err.span()), err.message()).into()
}

fn position(text: &str, span: Span) -> Position {
    let (line, column) = span.linecol_in(text);
    Position::new(line + 1, column + 1)
}
