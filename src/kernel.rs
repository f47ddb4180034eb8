//! The polynomial evaluation kernel.
//!
//! [`SOURCE`] is the hand-written module text compiled by the build pipeline.
//! It exports one function,
//!
//! ```text
//! evaluate(count: i32, offset: i32, x: f64) -> f64
//! ```
//!
//! which reads `count` little-endian f64 coefficients, highest degree first,
//! starting at byte `offset` of its linear memory and returns their value at
//! `x` by Horner's method. A request that does not fit in memory traps.
//!
//! [`evaluate`] is the same computation over an explicit byte buffer. It
//! performs the operations in the same order, so its result is bit-identical
//! to the kernel's.

use crate::ir::{FuncType, ValType, PAGE_SIZE};
use crate::runtime::Trap;

/// Module text of the kernel.
pub const SOURCE: &str = include_str!("../kernel/polynomial.wat");

pub const EVALUATE_EXPORT: &str = "evaluate";
pub const MEMORY_EXPORT: &str = "memory";

/// Bytes per coefficient.
pub const COEFFICIENT_SIZE: usize = 8;

/// Pages the kernel's memory may grow to.
pub const MAX_MEMORY_PAGES: u32 = 256;

/// Coefficients that fit in the kernel's largest memory at offset 0.
pub const MAX_COEFFICIENTS: usize = MAX_MEMORY_PAGES as usize * PAGE_SIZE / COEFFICIENT_SIZE;

/// Signature of [`EVALUATE_EXPORT`].
pub fn evaluate_signature() -> FuncType {
    FuncType::new(
        vec![ValType::I32, ValType::I32, ValType::F64],
        vec![ValType::F64],
    )
}

/// Bytes needed to hold `count` coefficients starting at `offset`, or `None`
/// if that exceeds the address space.
pub fn required_bytes(count: u32, offset: u32) -> Option<u64> {
    let end = u64::from(offset) + u64::from(count) * COEFFICIENT_SIZE as u64;
    (end <= 1 << 32).then_some(end)
}

/// Serialize coefficients in the layout the kernel reads.
pub fn encode_coefficients(coefficients: &[f64]) -> Vec<u8> {
    coefficients.iter().flat_map(|c| c.to_le_bytes()).collect()
}

/// Evaluate the polynomial stored in `memory`.
///
/// Traps with [`Trap::MemoryOutOfBounds`] when `offset + count * 8` exceeds
/// `memory.len()`, including when `count` is zero.
pub fn evaluate(memory: &[u8], count: u32, offset: u32, x: f64) -> Result<f64, Trap> {
    let end = u64::from(offset) + u64::from(count) * COEFFICIENT_SIZE as u64;
    if end > memory.len() as u64 {
        return Err(Trap::MemoryOutOfBounds);
    }
    if count == 0 {
        return Ok(0.0);
    }

    let region = &memory[offset as usize..end as usize];
    let mut coefficients = region.chunks_exact(COEFFICIENT_SIZE).map(|chunk| {
        let mut raw = [0u8; COEFFICIENT_SIZE];
        raw.copy_from_slice(chunk);
        f64::from_le_bytes(raw)
    });

    let first = coefficients.next().unwrap_or_default();
    Ok(coefficients.fold(first, |acc, c| acc * x + c))
}
