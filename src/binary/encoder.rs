// The encoder writes an ir::Module in the WebAssembly binary format through wasm-encoder.
// Sections come out in the fixed order type, function, memory, export, code, and a section is
// left out entirely when it would be empty. wasm-encoder compresses runs of equal local types.
// Numeric operators are written as their single opcode byte straight from the operator table.
// The `name` custom section is appended only when debug names are requested; without it, the
// output depends on nothing but the module, so identical input always produces identical bytes.
//
// `emit` re-encodes an already assembled binary section by section, dropping the `name`
// section unless debug names are requested.

//! Binary encoder.

use super::decoder::DecodeError;
use crate::core::config::EncodeOptions;
use crate::ir::{BlockType, ExportKind, Func, Instr, Limits, MemArg, Module, ValType};
use wasm_encoder::{
    CodeSection, ExportSection, Function, FunctionSection, IndirectNameMap, Instruction,
    MemorySection, MemoryType, NameMap, NameSection, RawSection, TypeSection,
};
use wasmparser::{Parser, Payload};

const NAME_SECTION: &str = "name";

/// Encode `module` to its binary form.
pub fn encode(module: &Module, options: &EncodeOptions) -> Vec<u8> {
    let mut out = wasm_encoder::Module::new();

    if !module.types.is_empty() {
        let mut types = TypeSection::new();
        for ty in &module.types {
            types.ty().function(
                ty.params.iter().map(|&p| valtype(p)),
                ty.results.iter().map(|&r| valtype(r)),
            );
        }
        out.section(&types);
    }
    if !module.funcs.is_empty() {
        let mut functions = FunctionSection::new();
        for func in &module.funcs {
            functions.function(func.type_idx);
        }
        out.section(&functions);
    }
    if let Some(limits) = &module.memory {
        let mut memories = MemorySection::new();
        memories.memory(memory_type(limits));
        out.section(&memories);
    }
    if !module.exports.is_empty() {
        let mut exports = ExportSection::new();
        for export in &module.exports {
            match export.kind {
                ExportKind::Func(idx) => {
                    exports.export(&export.name, wasm_encoder::ExportKind::Func, idx)
                }
                ExportKind::Memory(idx) => {
                    exports.export(&export.name, wasm_encoder::ExportKind::Memory, idx)
                }
            };
        }
        out.section(&exports);
    }
    if !module.funcs.is_empty() {
        let mut code = CodeSection::new();
        for func in &module.funcs {
            code.function(&function(func));
        }
        out.section(&code);
    }

    if options.write_debug_names && !module.names.is_empty() {
        out.section(&name_section(module));
    }
    out.finish()
}

/// Copy an assembled binary, keeping the `name` section only when debug
/// names are requested.
pub fn emit(bytes: &[u8], options: &EncodeOptions) -> Result<Vec<u8>, DecodeError> {
    let mut out = wasm_encoder::Module::new();
    for payload in Parser::new(0).parse_all(bytes) {
        let payload = payload?;
        if let Payload::CustomSection(reader) = &payload {
            if reader.name() == NAME_SECTION && !options.write_debug_names {
                continue;
            }
        }
        if let Some((id, range)) = payload.as_section() {
            out.section(&RawSection {
                id,
                data: &bytes[range],
            });
        }
    }
    Ok(out.finish())
}

fn valtype(ty: ValType) -> wasm_encoder::ValType {
    match ty {
        ValType::I32 => wasm_encoder::ValType::I32,
        ValType::I64 => wasm_encoder::ValType::I64,
        ValType::F64 => wasm_encoder::ValType::F64,
    }
}

fn memory_type(limits: &Limits) -> MemoryType {
    MemoryType {
        minimum: u64::from(limits.min),
        maximum: limits.max.map(u64::from),
        memory64: false,
        shared: false,
        page_size_log2: None,
    }
}

fn block_type(ty: BlockType) -> wasm_encoder::BlockType {
    match ty.0 {
        Some(ty) => wasm_encoder::BlockType::Result(valtype(ty)),
        None => wasm_encoder::BlockType::Empty,
    }
}

fn memarg(arg: MemArg) -> wasm_encoder::MemArg {
    wasm_encoder::MemArg {
        offset: u64::from(arg.offset),
        align: arg.align,
        memory_index: 0,
    }
}

fn function(func: &Func) -> Function {
    let mut f = Function::new_with_locals_types(func.locals.iter().map(|&l| valtype(l)));
    for instr in &func.body {
        let encoded = match *instr {
            Instr::Unreachable => Instruction::Unreachable,
            Instr::Nop => Instruction::Nop,
            Instr::Block(ty) => Instruction::Block(block_type(ty)),
            Instr::Loop(ty) => Instruction::Loop(block_type(ty)),
            Instr::If(ty) => Instruction::If(block_type(ty)),
            Instr::Else => Instruction::Else,
            Instr::End => Instruction::End,
            Instr::Br(depth) => Instruction::Br(depth),
            Instr::BrIf(depth) => Instruction::BrIf(depth),
            Instr::Return => Instruction::Return,
            Instr::Call(idx) => Instruction::Call(idx),
            Instr::Drop => Instruction::Drop,
            Instr::Select => Instruction::Select,
            Instr::LocalGet(idx) => Instruction::LocalGet(idx),
            Instr::LocalSet(idx) => Instruction::LocalSet(idx),
            Instr::LocalTee(idx) => Instruction::LocalTee(idx),
            Instr::I32Load(arg) => Instruction::I32Load(memarg(arg)),
            Instr::I64Load(arg) => Instruction::I64Load(memarg(arg)),
            Instr::F64Load(arg) => Instruction::F64Load(memarg(arg)),
            Instr::I32Store(arg) => Instruction::I32Store(memarg(arg)),
            Instr::I64Store(arg) => Instruction::I64Store(memarg(arg)),
            Instr::F64Store(arg) => Instruction::F64Store(memarg(arg)),
            Instr::MemorySize => Instruction::MemorySize(0),
            Instr::MemoryGrow => Instruction::MemoryGrow(0),
            Instr::I32Const(v) => Instruction::I32Const(v),
            Instr::I64Const(v) => Instruction::I64Const(v),
            Instr::F64Const(bits) => Instruction::F64Const(f64::from_bits(bits)),
            Instr::Numeric(op) => {
                f.raw([op.info().code]);
                continue;
            }
        };
        f.instruction(&encoded);
    }
    f.instruction(&Instruction::End);
    f
}

fn name_section(module: &Module) -> NameSection {
    let mut names = NameSection::new();
    if let Some(name) = &module.names.module {
        names.module(name);
    }
    if !module.names.functions.is_empty() {
        let mut functions = NameMap::new();
        for (idx, name) in &module.names.functions {
            functions.append(*idx, name);
        }
        names.functions(&functions);
    }
    if !module.names.locals.is_empty() {
        let mut locals = IndirectNameMap::new();
        for (func, entries) in &module.names.locals {
            let mut map = NameMap::new();
            for (idx, name) in entries {
                map.append(*idx, name);
            }
            locals.append(*func, &map);
        }
        names.locals(&locals);
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::decode;
    use crate::ir::{Export, FuncType, NameSection, NumericOp};

    fn add_module() -> Module {
        Module {
            types: vec![FuncType::new(vec![ValType::I32, ValType::I32], vec![ValType::I32])],
            funcs: vec![Func {
                type_idx: 0,
                locals: vec![],
                body: vec![
                    Instr::LocalGet(0),
                    Instr::LocalGet(1),
                    Instr::Numeric(NumericOp::I32Add),
                ],
            }],
            memory: None,
            exports: vec![Export { name: "add".into(), kind: ExportKind::Func(0) }],
            names: NameSection {
                module: None,
                functions: vec![(0, "add".into())],
                locals: vec![],
            },
        }
    }

    #[test]
    fn test_empty_module_is_header_only() {
        let bytes = encode(&Module::default(), &EncodeOptions::default());
        assert_eq!(bytes, [0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn test_add_function_bytes() {
        let bytes = encode(&add_module(), &EncodeOptions::default());
        #[rustfmt::skip]
        let expected: &[u8] = &[
            0x00, 0x61, 0x73, 0x6D, 0x01, 0x00, 0x00, 0x00,
            // type: (i32, i32) -> i32
            0x01, 0x07, 0x01, 0x60, 0x02, 0x7F, 0x7F, 0x01, 0x7F,
            // function: type 0
            0x03, 0x02, 0x01, 0x00,
            // export "add" func 0
            0x07, 0x07, 0x01, 0x03, b'a', b'd', b'd', 0x00, 0x00,
            // code: no locals, local.get 0, local.get 1, i32.add, end
            0x0A, 0x09, 0x01, 0x07, 0x00, 0x20, 0x00, 0x20, 0x01, 0x6A, 0x0B,
        ];
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_debug_names_are_optional() {
        let module = add_module();
        let plain = encode(&module, &EncodeOptions::default());
        let named = encode(&module, &EncodeOptions { write_debug_names: true });
        assert!(named.len() > plain.len());
        assert_eq!(&named[..plain.len()], plain.as_slice());
        // custom section id followed by the "name" string
        let tail = &named[plain.len()..];
        assert_eq!(tail[0], 0x00);
        assert_eq!(&tail[2..7], b"\x04name");
    }

    #[test]
    fn test_memory_limits() {
        let module = Module {
            memory: Some(Limits { min: 1, max: Some(256) }),
            ..Module::default()
        };
        let bytes = encode(&module, &EncodeOptions::default());
        assert_eq!(&bytes[8..], [0x05, 0x04, 0x01, 0x01, 0x01, 0x80, 0x02]);
    }

    #[test]
    fn test_local_runs_survive() {
        let mut module = add_module();
        module.funcs[0].locals = vec![ValType::F64, ValType::I32, ValType::I32];
        let bytes = encode(&module, &EncodeOptions::default());
        assert_eq!(decode(&bytes).unwrap().funcs[0].locals, module.funcs[0].locals);
    }

    #[test]
    fn test_emit_strips_names() {
        let module = add_module();
        let named = encode(&module, &EncodeOptions { write_debug_names: true });

        let stripped = emit(&named, &EncodeOptions::default()).unwrap();
        assert_eq!(stripped, encode(&module, &EncodeOptions::default()));

        let kept = emit(&named, &EncodeOptions { write_debug_names: true }).unwrap();
        assert_eq!(kept, named);
    }
}
