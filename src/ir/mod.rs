//! Resolved module representation.
//!
//! This is the form shared by the binary encoder, the decoder and the
//! interpreter. All names have been resolved to indices; instructions
//! are stored flat in binary order, so `block`, `loop`, `if`, `else` and `end`
//! appear inline and nesting is implied by the markers.
//!
//! ```text
//! (func (param i32) (result i32)        Func { type_idx, locals: [], body: [
//!   (block (result i32)                   Block(BlockType(Some(I32))),
//!     (local.get 0)))                     LocalGet(0),
//!                                         End ] }
//! ```
//!
//! The implicit `end` that closes a function body is not stored.

pub mod ops;
pub mod types;

pub use ops::{NumericOp, OpInfo};
pub use types::{BlockType, FuncType, Limits, MemArg, ValType, MAX_PAGES, PAGE_SIZE};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Instr {
    Unreachable,
    Nop,
    Block(BlockType),
    Loop(BlockType),
    If(BlockType),
    Else,
    End,
    Br(u32),
    BrIf(u32),
    Return,
    Call(u32),
    Drop,
    Select,
    LocalGet(u32),
    LocalSet(u32),
    LocalTee(u32),
    I32Load(MemArg),
    I64Load(MemArg),
    F64Load(MemArg),
    I32Store(MemArg),
    I64Store(MemArg),
    F64Store(MemArg),
    MemorySize,
    MemoryGrow,
    I32Const(i32),
    I64Const(i64),
    /// Stored as raw bits so NaN payloads survive unchanged.
    F64Const(u64),
    Numeric(NumericOp),
}

impl Instr {
    pub fn name(&self) -> &'static str {
        match self {
            Instr::Unreachable => "unreachable",
            Instr::Nop => "nop",
            Instr::Block(_) => "block",
            Instr::Loop(_) => "loop",
            Instr::If(_) => "if",
            Instr::Else => "else",
            Instr::End => "end",
            Instr::Br(_) => "br",
            Instr::BrIf(_) => "br_if",
            Instr::Return => "return",
            Instr::Call(_) => "call",
            Instr::Drop => "drop",
            Instr::Select => "select",
            Instr::LocalGet(_) => "local.get",
            Instr::LocalSet(_) => "local.set",
            Instr::LocalTee(_) => "local.tee",
            Instr::I32Load(_) => "i32.load",
            Instr::I64Load(_) => "i64.load",
            Instr::F64Load(_) => "f64.load",
            Instr::I32Store(_) => "i32.store",
            Instr::I64Store(_) => "i64.store",
            Instr::F64Store(_) => "f64.store",
            Instr::MemorySize => "memory.size",
            Instr::MemoryGrow => "memory.grow",
            Instr::I32Const(_) => "i32.const",
            Instr::I64Const(_) => "i64.const",
            Instr::F64Const(_) => "f64.const",
            Instr::Numeric(op) => op.info().name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Func {
    pub type_idx: u32,
    /// Declared locals, not including parameters.
    pub locals: Vec<ValType>,
    pub body: Vec<Instr>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Func(u32),
    Memory(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Export {
    pub name: String,
    pub kind: ExportKind,
}

/// Debug names recovered from `$identifiers`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameSection {
    pub module: Option<String>,
    pub functions: Vec<(u32, String)>,
    pub locals: Vec<(u32, Vec<(u32, String)>)>,
}

impl NameSection {
    pub fn is_empty(&self) -> bool {
        self.module.is_none() && self.functions.is_empty() && self.locals.is_empty()
    }

    pub fn function(&self, idx: u32) -> Option<&str> {
        self.functions
            .iter()
            .find(|(i, _)| *i == idx)
            .map(|(_, n)| n.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Module {
    pub types: Vec<FuncType>,
    pub funcs: Vec<Func>,
    pub memory: Option<Limits>,
    pub exports: Vec<Export>,
    pub names: NameSection,
}

impl Module {
    pub fn func_type(&self, func_idx: u32) -> Option<&FuncType> {
        let func = self.funcs.get(func_idx as usize)?;
        self.types.get(func.type_idx as usize)
    }

    pub fn export(&self, name: &str) -> Option<&Export> {
        self.exports.iter().find(|e| e.name == name)
    }

    /// Index of the function exported under `name`.
    pub fn exported_func(&self, name: &str) -> Option<u32> {
        match self.export(name)?.kind {
            ExportKind::Func(idx) => Some(idx),
            ExportKind::Memory(_) => None,
        }
    }

    /// Number of instructions across all function bodies.
    pub fn instruction_count(&self) -> usize {
        self.funcs.iter().map(|f| f.body.len()).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exported_func_lookup() {
        let module = Module {
            types: vec![FuncType::new(vec![], vec![ValType::I32])],
            funcs: vec![Func {
                type_idx: 0,
                locals: vec![],
                body: vec![Instr::I32Const(7)],
            }],
            memory: Some(Limits { min: 1, max: None }),
            exports: vec![
                Export { name: "seven".into(), kind: ExportKind::Func(0) },
                Export { name: "memory".into(), kind: ExportKind::Memory(0) },
            ],
            names: NameSection::default(),
        };

        assert_eq!(module.exported_func("seven"), Some(0));
        assert_eq!(module.exported_func("memory"), None);
        assert_eq!(module.exported_func("missing"), None);
        assert_eq!(module.func_type(0).and_then(|t| t.result()), Some(ValType::I32));
        assert_eq!(module.instruction_count(), 1);
    }

    #[test]
    fn test_instr_names_match_table() {
        assert_eq!(Instr::Numeric(NumericOp::F64Add).name(), "f64.add");
        assert_eq!(Instr::BrIf(0).name(), "br_if");
    }
}
