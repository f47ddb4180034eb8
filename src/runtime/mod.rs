//! Sandboxed execution of compiled modules.
//!
//! A [`Module`] is decoded and validated once and can be shared between
//! threads. Each [`Instance`] owns its own [`LinearMemory`]; nothing is shared
//! between instances, so independent instances need no locking.
//!
//! ```text
//!   bytes ──validate+decode──▶ Module ──Arc──▶ Instance ──invoke──▶ Value | Trap
//! ```

mod instance;
mod interpreter;
pub mod memory;
mod module;
mod numeric;
mod trap;
mod value;

pub use instance::Instance;
pub use interpreter::MAX_CALL_DEPTH;
pub use memory::LinearMemory;
pub use module::{Module, Summary};
pub use trap::Trap;
pub use value::Value;

use crate::binary::DecodeError;
use crate::ir::ValType;
use thiserror::Error;

/// Why a binary could not be loaded.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    /// Malformed, invalid, or outside the executable subset.
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

/// Why an invocation did not produce a result.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("no exported function named '{0}'")]
    UnknownExport(String),

    #[error("'{name}' expects {expected} arguments, {found} given")]
    ArgumentCount {
        name: String,
        expected: usize,
        found: usize,
    },

    #[error("argument {index} of '{name}' must be {expected}, found {found}")]
    ArgumentType {
        name: String,
        index: usize,
        expected: ValType,
        found: ValType,
    },

    #[error("cannot allocate {pages} pages of linear memory")]
    MemoryAllocation { pages: u32 },

    #[error("instance is unusable after an earlier trap ({0})")]
    Poisoned(Trap),

    #[error("trap: {0}")]
    Trap(#[from] Trap),
}
