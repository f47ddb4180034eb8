// Validation runs the wasmparser validator over an assembled binary: section order, index
// spaces, export targets, memory limits, and the operand-stack typing of every function body.
// The validator reports byte offsets; when a SourceMap from the text front end is at hand, a
// failure inside a function body is located at that function's `func` keyword and a failure
// in the memory section at the `memory` keyword. Function bodies are checked one at a time
// with a single set of validator allocations reused across them.

//! Binary validation with positions mapped back to module text.

use crate::core::error::{Position, ValidationError};
use crate::text::SourceMap;
use std::mem;
use wasmparser::{
    BinaryReaderError, FuncValidatorAllocations, FunctionBody, Parser, Payload, ValidPayload,
    Validator,
};

/// What a successful validation covered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    /// Function bodies checked.
    pub functions: usize,
    /// Operators in those bodies, each closing `end` included.
    pub instructions: usize,
}

/// Validate a binary module.
pub fn validate(bytes: &[u8], source: Option<&SourceMap>) -> Result<Summary, ValidationError> {
    let mut validator = Validator::new();
    let mut allocations = FuncValidatorAllocations::default();
    let mut summary = Summary::default();

    for payload in Parser::new(0).parse_all(bytes) {
        let payload = payload.map_err(|err| located(&err, None))?;
        let position = match &payload {
            Payload::MemorySection(_) => source.and_then(|s| s.memories.first().copied()),
            _ => None,
        };

        match validator
            .payload(&payload)
            .map_err(|err| located(&err, position))?
        {
            ValidPayload::Func(func, body) => {
                let position = source.and_then(|s| s.funcs.get(summary.functions).copied());
                let mut checker = func.into_validator(mem::take(&mut allocations));
                checker
                    .validate(&body)
                    .map_err(|err| located(&err, position))?;
                allocations = checker.into_allocations();

                summary.instructions += count_operators(&body).map_err(|err| located(&err, position))?;
                summary.functions += 1;
            }
            ValidPayload::End(_) => break,
            _ => {}
        }
    }

    log::debug!(
        "validated {} functions, {} instructions",
        summary.functions,
        summary.instructions
    );
    Ok(summary)
}

fn count_operators(body: &FunctionBody<'_>) -> Result<usize, BinaryReaderError> {
    let mut reader = body.get_operators_reader()?;
    let mut count = 0;
    while !reader.eof() {
        reader.read()?;
        count += 1;
    }
    Ok(count)
}

fn located(err: &BinaryReaderError, position: Option<Position>) -> ValidationError {
    match position {
        Some(position) => ValidationError::at(position, err.message()),
        None => ValidationError::new(format!(
            "{} (at byte {:#x})",
            err.message(),
            err.offset()
        )),
    }
}
