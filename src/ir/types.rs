//! Value, function and memory types.

use std::fmt;

/// Size of one linear-memory page in bytes.
pub const PAGE_SIZE: usize = 65536;

/// Largest page count a 32-bit linear memory can address.
pub const MAX_PAGES: u32 = 65536;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValType {
    I32,
    I64,
    F64,
}

impl ValType {
    pub const fn name(self) -> &'static str {
        match self {
            ValType::I32 => "i32",
            ValType::I64 => "i64",
            ValType::F64 => "f64",
        }
    }
}

impl fmt::Display for ValType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A function signature. Multi-value results are not supported.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct FuncType {
    pub params: Vec<ValType>,
    pub results: Vec<ValType>,
}

impl FuncType {
    pub fn new(params: Vec<ValType>, results: Vec<ValType>) -> Self {
        Self { params, results }
    }

    pub fn result(&self) -> Option<ValType> {
        self.results.first().copied()
    }
}

impl fmt::Display for FuncType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{p}")?;
        }
        write!(f, ") -> ")?;
        match self.results.as_slice() {
            [] => write!(f, "()"),
            [r] => write!(f, "{r}"),
            rs => {
                write!(f, "(")?;
                for (i, r) in rs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{r}")?;
                }
                write!(f, ")")
            }
        }
    }
}

/// Result type of a `block`, `loop` or `if`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockType(pub Option<ValType>);

impl BlockType {
    pub const EMPTY: BlockType = BlockType(None);

    pub fn arity(self) -> usize {
        usize::from(self.0.is_some())
    }
}

/// Page limits of a linear memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub min: u32,
    pub max: Option<u32>,
}

impl Limits {
    pub fn min_bytes(&self) -> usize {
        self.min as usize * PAGE_SIZE
    }

    /// Effective upper bound in pages.
    pub fn max_pages(&self) -> u32 {
        self.max.unwrap_or(MAX_PAGES)
    }
}

impl fmt::Display for Limits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{} pages (max {})", self.min, max),
            None => write!(f, "{} pages (no max)", self.min),
        }
    }
}

/// Static offset and alignment hint of a load or store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemArg {
    /// log2 of the alignment.
    pub align: u32,
    pub offset: u32,
}
