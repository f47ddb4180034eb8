//! WebAssembly binary format.
//!
//! [`encode`] turns a [`Module`](crate::ir::Module) into the binary form with
//! wasm-encoder, and [`decode`] validates such a binary with wasmparser and
//! reads it back. [`emit`] copies an assembled binary, dropping the `name`
//! section unless debug names are requested.

pub mod decoder;
pub mod encoder;

pub use decoder::{decode, DecodeError};
pub use encoder::{emit, encode};
