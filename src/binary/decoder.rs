//! Binary decoder.
//!
//! Validates a binary with wasmparser and lowers it to [`Module`]. Only the
//! instruction subset the interpreter executes is accepted; anything else is
//! reported at the byte offset of the offending opcode. The `name` custom
//! section is read when present and ignored with a warning when malformed.
//! Other custom sections are skipped.

use crate::ir::{
    BlockType, Export, ExportKind, Func, FuncType, Instr, Limits, MemArg, Module, NameSection,
    NumericOp, ValType,
};
use std::mem;
use thiserror::Error;
use wasmparser::{
    BinaryReaderError, Encoding, ExternalKind, FuncValidatorAllocations, FunctionBody,
    KnownCustom, Name, NameSectionReader, Operator, Parser, Payload, ValidPayload, Validator,
};

/// A malformed or unsupported binary. `offset` is the byte position where
/// decoding stopped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed module at byte {offset:#x}: {message}")]
pub struct DecodeError {
    pub offset: usize,
    pub message: String,
}

impl DecodeError {
    fn new(offset: usize, message: impl Into<String>) -> Self {
        Self {
            offset,
            message: message.into(),
        }
    }
}

impl From<BinaryReaderError> for DecodeError {
    fn from(err: BinaryReaderError) -> Self {
        Self::new(err.offset(), err.message())
    }
}

type Result<T> = std::result::Result<T, DecodeError>;

/// Decode and validate a binary module.
pub fn decode(bytes: &[u8]) -> Result<Module> {
    let mut validator = Validator::new();
    let mut allocations = FuncValidatorAllocations::default();
    let mut module = Module::default();
    let mut func_types: Vec<u32> = Vec::new();

    for payload in Parser::new(0).parse_all(bytes) {
        let payload = payload?;
        if let ValidPayload::Func(func, body) = validator.payload(&payload)? {
            let mut checker = func.into_validator(mem::take(&mut allocations));
            checker.validate(&body)?;
            allocations = checker.into_allocations();
        }

        match payload {
            Payload::Version { encoding, range, .. } => {
                if encoding != Encoding::Module {
                    return Err(DecodeError::new(range.start, "expected a core module"));
                }
            }
            Payload::TypeSection(reader) => {
                let at = reader.range().start;
                for ty in reader.into_iter_err_on_gc_types() {
                    let ty = ty?;
                    module.types.push(FuncType::new(
                        valtypes(ty.params(), at)?,
                        valtypes(ty.results(), at)?,
                    ));
                }
            }
            Payload::FunctionSection(reader) => {
                for type_idx in reader {
                    func_types.push(type_idx?);
                }
            }
            Payload::MemorySection(reader) => {
                let at = reader.range().start;
                for memory in reader {
                    let memory = memory?;
                    if module.memory.is_some() {
                        return Err(DecodeError::new(at, "multiple memories"));
                    }
                    if memory.memory64 || memory.shared || memory.page_size_log2.is_some() {
                        return Err(DecodeError::new(at, "unsupported memory type"));
                    }
                    module.memory = Some(Limits {
                        min: pages(memory.initial, at)?,
                        max: memory.maximum.map(|max| pages(max, at)).transpose()?,
                    });
                }
            }
            Payload::ExportSection(reader) => {
                let at = reader.range().start;
                for export in reader {
                    let export = export?;
                    let kind = match export.kind {
                        ExternalKind::Func => ExportKind::Func(export.index),
                        ExternalKind::Memory => ExportKind::Memory(export.index),
                        other => {
                            return Err(DecodeError::new(
                                at,
                                format!("unsupported export kind {other:?}"),
                            ))
                        }
                    };
                    module.exports.push(Export {
                        name: export.name.to_string(),
                        kind,
                    });
                }
            }
            Payload::CodeSectionStart { .. } => {}
            Payload::CodeSectionEntry(body) => {
                let index = module.funcs.len();
                let type_idx = func_types.get(index).copied().ok_or_else(|| {
                    DecodeError::new(
                        body.range().start,
                        "function and code section have inconsistent lengths",
                    )
                })?;
                module.funcs.push(read_func(bytes, &body, type_idx)?);
            }
            Payload::CustomSection(reader) => match reader.as_known() {
                KnownCustom::Name(names) => match read_names(names) {
                    Ok(names) => module.names = names,
                    Err(err) => log::warn!("ignoring malformed name section: {err}"),
                },
                _ => log::debug!("skipping custom section '{}'", reader.name()),
            },
            Payload::End(_) => break,
            other => {
                let (id, range) = other
                    .as_section()
                    .unwrap_or((0, 0..bytes.len()));
                return Err(DecodeError::new(
                    range.start,
                    format!("unsupported section id {id}"),
                ));
            }
        }
    }

    if module.funcs.len() != func_types.len() {
        return Err(DecodeError::new(
            bytes.len(),
            "function and code section have inconsistent lengths",
        ));
    }
    Ok(module)
}

fn valtype(ty: wasmparser::ValType, at: usize) -> Result<ValType> {
    match ty {
        wasmparser::ValType::I32 => Ok(ValType::I32),
        wasmparser::ValType::I64 => Ok(ValType::I64),
        wasmparser::ValType::F64 => Ok(ValType::F64),
        other => Err(DecodeError::new(at, format!("unsupported value type {other:?}"))),
    }
}

fn valtypes(types: &[wasmparser::ValType], at: usize) -> Result<Vec<ValType>> {
    types.iter().map(|&ty| valtype(ty, at)).collect()
}

fn pages(count: u64, at: usize) -> Result<u32> {
    u32::try_from(count).map_err(|_| DecodeError::new(at, "memory size out of range"))
}

fn read_func(bytes: &[u8], body: &FunctionBody<'_>, type_idx: u32) -> Result<Func> {
    let mut locals = Vec::new();
    let mut reader = body.get_locals_reader()?;
    for _ in 0..reader.get_count() {
        let at = reader.original_position();
        let (count, ty) = reader.read()?;
        let ty = valtype(ty, at)?;
        locals.extend(std::iter::repeat(ty).take(count as usize));
    }

    let mut code = Vec::new();
    let mut reader = body.get_operators_reader()?;
    while !reader.eof() {
        let at = reader.original_position();
        let op = reader.read()?;
        code.push(lower(bytes, at, op)?);
    }
    // The validator guarantees the body closes with `end`.
    code.pop();

    Ok(Func {
        type_idx,
        locals,
        body: code,
    })
}

fn block_type(ty: wasmparser::BlockType, at: usize) -> Result<BlockType> {
    match ty {
        wasmparser::BlockType::Empty => Ok(BlockType::EMPTY),
        wasmparser::BlockType::Type(ty) => Ok(BlockType(Some(valtype(ty, at)?))),
        wasmparser::BlockType::FuncType(_) => {
            Err(DecodeError::new(at, "unsupported multi-value block type"))
        }
    }
}

fn memarg(arg: wasmparser::MemArg, at: usize) -> Result<MemArg> {
    if arg.memory != 0 {
        return Err(DecodeError::new(at, "memory index must be zero"));
    }
    let offset = u32::try_from(arg.offset)
        .map_err(|_| DecodeError::new(at, "memory offset out of range"))?;
    Ok(MemArg {
        align: u32::from(arg.align),
        offset,
    })
}

fn memory_zero(mem: u32, at: usize) -> Result<()> {
    match mem {
        0 => Ok(()),
        _ => Err(DecodeError::new(at, "memory index must be zero")),
    }
}

/// Lower one validated operator. `at` is its offset in `bytes`.
fn lower(bytes: &[u8], at: usize, op: Operator<'_>) -> Result<Instr> {
    let instr = match op {
        Operator::Unreachable => Instr::Unreachable,
        Operator::Nop => Instr::Nop,
        Operator::Block { blockty } => Instr::Block(block_type(blockty, at)?),
        Operator::Loop { blockty } => Instr::Loop(block_type(blockty, at)?),
        Operator::If { blockty } => Instr::If(block_type(blockty, at)?),
        Operator::Else => Instr::Else,
        Operator::End => Instr::End,
        Operator::Br { relative_depth } => Instr::Br(relative_depth),
        Operator::BrIf { relative_depth } => Instr::BrIf(relative_depth),
        Operator::Return => Instr::Return,
        Operator::Call { function_index } => Instr::Call(function_index),
        Operator::Drop => Instr::Drop,
        Operator::Select => Instr::Select,
        Operator::LocalGet { local_index } => Instr::LocalGet(local_index),
        Operator::LocalSet { local_index } => Instr::LocalSet(local_index),
        Operator::LocalTee { local_index } => Instr::LocalTee(local_index),
        Operator::I32Load { memarg: arg } => Instr::I32Load(memarg(arg, at)?),
        Operator::I64Load { memarg: arg } => Instr::I64Load(memarg(arg, at)?),
        Operator::F64Load { memarg: arg } => Instr::F64Load(memarg(arg, at)?),
        Operator::I32Store { memarg: arg } => Instr::I32Store(memarg(arg, at)?),
        Operator::I64Store { memarg: arg } => Instr::I64Store(memarg(arg, at)?),
        Operator::F64Store { memarg: arg } => Instr::F64Store(memarg(arg, at)?),
        Operator::MemorySize { mem } => {
            memory_zero(mem, at)?;
            Instr::MemorySize
        }
        Operator::MemoryGrow { mem } => {
            memory_zero(mem, at)?;
            Instr::MemoryGrow
        }
        Operator::I32Const { value } => Instr::I32Const(value),
        Operator::I64Const { value } => Instr::I64Const(value),
        Operator::F64Const { value } => Instr::F64Const(value.bits()),
        // Numeric operators are single-byte and carry no immediates.
        _ => {
            let code = bytes.get(at).copied().unwrap_or_default();
            match NumericOp::from_code(code) {
                Some(numeric) => Instr::Numeric(numeric),
                None => {
                    return Err(DecodeError::new(
                        at,
                        format!("unsupported opcode 0x{code:02x}"),
                    ))
                }
            }
        }
    };
    Ok(instr)
}

fn read_names(reader: NameSectionReader<'_>) -> Result<NameSection> {
    let mut names = NameSection::default();
    for subsection in reader {
        match subsection? {
            Name::Module { name, .. } => names.module = Some(name.to_string()),
            Name::Function(map) => {
                for naming in map {
                    let naming = naming?;
                    names.functions.push((naming.index, naming.name.to_string()));
                }
            }
            Name::Local(map) => {
                for indirect in map {
                    let indirect = indirect?;
                    let mut locals = Vec::new();
                    for naming in indirect.names {
                        let naming = naming?;
                        locals.push((naming.index, naming.name.to_string()));
                    }
                    names.locals.push((indirect.index, locals));
                }
            }
            // Labels, types and the rest are not needed here.
            _ => {}
        }
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::encode;
    use crate::core::config::EncodeOptions;

    const HEADER: [u8; 8] = [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00];

    fn sample() -> Module {
        Module {
            types: vec![FuncType::new(vec![ValType::I32], vec![ValType::F64])],
            funcs: vec![Func {
                type_idx: 0,
                locals: vec![ValType::F64, ValType::F64, ValType::I32],
                body: vec![
                    Instr::Block(BlockType(Some(ValType::F64))),
                    Instr::F64Const((-0.5f64).to_bits()),
                    Instr::End,
                    Instr::LocalGet(0),
                    Instr::F64Load(MemArg { align: 3, offset: 16 }),
                    Instr::Numeric(NumericOp::F64Add),
                    Instr::I64Const(-1),
                    Instr::Drop,
                ],
            }],
            memory: Some(Limits { min: 1, max: Some(256) }),
            exports: vec![
                Export { name: "f".into(), kind: ExportKind::Func(0) },
                Export { name: "memory".into(), kind: ExportKind::Memory(0) },
            ],
            names: NameSection {
                module: Some("m".into()),
                functions: vec![(0, "f".into())],
                locals: vec![(0, vec![(0, "p".into()), (1, "acc".into())])],
            },
        }
    }

    #[test]
    fn test_decode_encoded_module() {
        let module = sample();
        let bytes = encode(&module, &EncodeOptions { write_debug_names: true });
        assert_eq!(decode(&bytes), Ok(module.clone()));

        let bare = encode(&module, &EncodeOptions::default());
        let decoded = decode(&bare).unwrap();
        assert!(decoded.names.is_empty());
        assert_eq!(decoded.funcs, module.funcs);
    }

    #[test]
    fn test_bad_header() {
        let err = decode(b"\0asx\x01\0\0\0").unwrap_err();
        assert_eq!(err.offset, 0);
        assert!(err.message.contains("magic"), "{err}");

        let err = decode(b"\0asm\x02\0\0\0").unwrap_err();
        assert!(err.offset <= 8, "{err}");
    }

    #[test]
    fn test_truncated_section() {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(&[0x01, 0x05, 0x01, 0x60]);
        assert!(decode(&bytes).is_err());
    }

    #[test]
    fn test_sections_out_of_order() {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(&[0x03, 0x01, 0x00]);
        bytes.extend_from_slice(&[0x01, 0x01, 0x00]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.message.contains("out of order"), "{err}");
    }

    #[test]
    fn test_unknown_custom_section_is_skipped() {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(&[0x00, 0x04, 0x02, b'x', b'y', 0xFF]);
        assert_eq!(decode(&bytes), Ok(Module::default()));
    }

    #[test]
    fn test_missing_code_section() {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.message.contains("inconsistent lengths"), "{err}");
    }

    #[test]
    fn test_ill_typed_body() {
        let mut bytes = HEADER.to_vec();
        // () -> i32 returning nothing
        bytes.extend_from_slice(&[0x01, 0x05, 0x01, 0x60, 0x00, 0x01, 0x7F]);
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        bytes.extend_from_slice(&[0x0A, 0x04, 0x01, 0x02, 0x00, 0x0B]);
        let err = decode(&bytes).unwrap_err();
        assert!(err.message.contains("type mismatch"), "{err}");
    }

    #[test]
    fn test_unsupported_opcode() {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(&[0x01, 0x04, 0x01, 0x60, 0x00, 0x00]);
        bytes.extend_from_slice(&[0x03, 0x02, 0x01, 0x00]);
        // f32.const 0; drop. Valid, but outside what the interpreter runs.
        bytes.extend_from_slice(&[0x0A, 0x0A, 0x01, 0x08, 0x00]);
        bytes.extend_from_slice(&[0x43, 0x00, 0x00, 0x00, 0x00, 0x1A, 0x0B]);
        let err = decode(&bytes).unwrap_err();
        assert_eq!(err.offset, 23);
        assert!(err.message.contains("0x43"), "{err}");
    }
}
