use thiserror::Error;

/// A fatal fault raised while executing module code.
///
/// A trap ends the running invocation and poisons the instance that raised it.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trap {
    #[error("out of bounds memory access")]
    MemoryOutOfBounds,

    #[error("unreachable executed")]
    Unreachable,

    #[error("integer divide by zero")]
    IntegerDivideByZero,

    #[error("integer overflow")]
    IntegerOverflow,

    #[error("invalid conversion to integer")]
    InvalidConversion,

    #[error("call stack exhausted")]
    CallStackExhausted,
}
