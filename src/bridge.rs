//! Reference host bridge for the polynomial kernel.
//!
//! [`PolynomialHost`] owns one kernel instance at a time. It checks the
//! coefficient count before every call, grows memory on demand, writes the
//! coefficients at offset 0 and invokes `evaluate`. A trap discards the
//! instance; the next call instantiates a fresh one from the shared module.

use crate::ir::{FuncType, PAGE_SIZE};
use crate::kernel::{self, COEFFICIENT_SIZE, EVALUATE_EXPORT, MEMORY_EXPORT};
use crate::runtime::{Instance, LoadError, Module, RuntimeError, Trap, Value};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BridgeError {
    #[error("cannot load kernel: {0}")]
    Load(#[from] LoadError),

    #[error("kernel does not export '{0}'")]
    MissingExport(&'static str),

    #[error("kernel export 'evaluate' has signature {found}, expected {expected}")]
    SignatureMismatch { expected: FuncType, found: FuncType },

    #[error("{count} coefficients do not fit in kernel memory (at most {max})")]
    TooManyCoefficients { count: usize, max: usize },

    #[error("kernel trapped: {0}")]
    Trap(Trap),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

/// Evaluates polynomials through a sandboxed kernel instance.
#[derive(Debug)]
pub struct PolynomialHost {
    module: Arc<Module>,
    instance: Option<Instance>,
    instantiations: usize,
}

impl PolynomialHost {
    /// Load a compiled kernel and check that it honors the contract.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, BridgeError> {
        let module = Module::from_binary(bytes)?;
        Self::new(Arc::new(module))
    }

    /// Create a host over an already loaded module. Several hosts may share
    /// one module; each gets its own instance and memory.
    pub fn new(module: Arc<Module>) -> Result<Self, BridgeError> {
        let expected = kernel::evaluate_signature();
        let found = module
            .export_type(EVALUATE_EXPORT)
            .ok_or(BridgeError::MissingExport(EVALUATE_EXPORT))?;
        if *found != expected {
            return Err(BridgeError::SignatureMismatch {
                expected,
                found: found.clone(),
            });
        }
        if !module.exports_memory(MEMORY_EXPORT) {
            return Err(BridgeError::MissingExport(MEMORY_EXPORT));
        }
        Ok(Self {
            module,
            instance: None,
            instantiations: 0,
        })
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    /// Instances created so far, counting replacements after traps.
    pub fn instantiations(&self) -> usize {
        self.instantiations
    }

    /// Largest coefficient count the kernel memory can hold.
    pub fn max_coefficients(&self) -> usize {
        self.module
            .ir()
            .memory
            .map_or(0, |limits| limits.max_pages() as usize * PAGE_SIZE / COEFFICIENT_SIZE)
    }

    fn instance(&mut self) -> Result<&mut Instance, BridgeError> {
        let instance = match self.instance.take() {
            Some(instance) => instance,
            None => {
                let instance = Instance::new(Arc::clone(&self.module))?;
                self.instantiations += 1;
                log::debug!("instantiated kernel (#{})", self.instantiations);
                instance
            }
        };
        Ok(self.instance.insert(instance))
    }

    /// Evaluate the polynomial with `coefficients` (highest degree first) at `x`.
    pub fn evaluate(&mut self, coefficients: &[f64], x: f64) -> Result<f64, BridgeError> {
        let count = coefficients.len();
        let max = self.max_coefficients();
        if count > max {
            return Err(BridgeError::TooManyCoefficients { count, max });
        }

        let instance = self.instance()?;
        let memory = instance
            .memory_mut()
            .ok_or(BridgeError::MissingExport(MEMORY_EXPORT))?;
        let needed = count * COEFFICIENT_SIZE;
        if needed > memory.size() {
            let pages = (needed - memory.size()).div_ceil(PAGE_SIZE) as u32;
            memory.grow(pages).ok_or(RuntimeError::MemoryAllocation {
                pages: memory.pages() + pages,
            })?;
        }
        memory
            .write(0, &kernel::encode_coefficients(coefficients))
            .map_err(BridgeError::Trap)?;

        self.call(count as u32, 0, x)
    }

    /// Invoke `evaluate` on whatever the instance memory currently holds,
    /// without checking that the request fits.
    pub fn evaluate_raw(&mut self, count: u32, offset: u32, x: f64) -> Result<f64, BridgeError> {
        self.call(count, offset, x)
    }

    fn call(&mut self, count: u32, offset: u32, x: f64) -> Result<f64, BridgeError> {
        let instance = self.instance()?;
        let args = [
            Value::I32(count as i32),
            Value::I32(offset as i32),
            Value::F64(x),
        ];
        match instance.invoke(EVALUATE_EXPORT, &args) {
            Ok(Some(Value::F64(result))) => Ok(result),
            Ok(_) => Err(BridgeError::SignatureMismatch {
                expected: kernel::evaluate_signature(),
                found: instance
                    .module()
                    .export_type(EVALUATE_EXPORT)
                    .cloned()
                    .unwrap_or_default(),
            }),
            Err(RuntimeError::Trap(trap)) => {
                log::warn!("discarding kernel instance after trap: {trap}");
                self.instance = None;
                Err(BridgeError::Trap(trap))
            }
            Err(other) => Err(other.into()),
        }
    }
}
