use super::interpreter::Executor;
use super::memory::LinearMemory;
use super::module::Module;
use super::{RuntimeError, Trap, Value};
use std::sync::Arc;

/// One sandboxed instantiation of a [`Module`].
///
/// The instance exclusively owns its linear memory; the compiled module is
/// shared. After a trap the instance is poisoned and refuses further calls,
/// since its memory may be half-updated.
#[derive(Debug)]
pub struct Instance {
    module: Arc<Module>,
    memory: Option<LinearMemory>,
    poisoned: Option<Trap>,
}

impl Instance {
    pub fn new(module: Arc<Module>) -> Result<Self, RuntimeError> {
        let memory = match module.ir().memory {
            Some(limits) => Some(
                LinearMemory::new(limits)
                    .ok_or(RuntimeError::MemoryAllocation { pages: limits.min })?,
            ),
            None => None,
        };
        Ok(Self {
            module,
            memory,
            poisoned: None,
        })
    }

    pub fn module(&self) -> &Arc<Module> {
        &self.module
    }

    pub fn memory(&self) -> Option<&LinearMemory> {
        self.memory.as_ref()
    }

    pub fn memory_mut(&mut self) -> Option<&mut LinearMemory> {
        self.memory.as_mut()
    }

    /// The trap that poisoned this instance, if any.
    pub fn trap(&self) -> Option<Trap> {
        self.poisoned
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned.is_some()
    }

    /// Call the function exported as `name`.
    pub fn invoke(&mut self, name: &str, args: &[Value]) -> Result<Option<Value>, RuntimeError> {
        if let Some(trap) = self.poisoned {
            return Err(RuntimeError::Poisoned(trap));
        }

        let module = Arc::clone(&self.module);
        let ir = module.ir();
        let func_idx = ir
            .exported_func(name)
            .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))?;
        let ty = ir
            .func_type(func_idx)
            .ok_or_else(|| RuntimeError::UnknownExport(name.to_string()))?;

        if args.len() != ty.params.len() {
            return Err(RuntimeError::ArgumentCount {
                name: name.to_string(),
                expected: ty.params.len(),
                found: args.len(),
            });
        }
        for (index, (arg, &expected)) in args.iter().zip(&ty.params).enumerate() {
            if arg.ty() != expected {
                return Err(RuntimeError::ArgumentType {
                    name: name.to_string(),
                    index,
                    expected,
                    found: arg.ty(),
                });
            }
        }

        let mut stack: Vec<u64> = args.iter().map(|a| a.to_cell()).collect();
        let mut executor = Executor::new(&module, self.memory.as_mut());
        if let Err(trap) = executor.call(func_idx, &mut stack, 0) {
            log::warn!("'{name}' trapped: {trap}");
            self.poisoned = Some(trap);
            return Err(RuntimeError::Trap(trap));
        }

        Ok(ty
            .result()
            .map(|result| Value::from_cell(result, stack.pop().unwrap_or_default())))
    }
}
