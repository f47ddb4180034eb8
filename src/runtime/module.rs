use super::interpreter::ControlMap;
use super::LoadError;
use crate::binary;
use crate::core::config::EncodeOptions;
use crate::ir::{self, ExportKind, FuncType};
use std::fmt;

/// A validated module ready to instantiate.
///
/// Holds the resolved code plus the jump targets of every structured
/// instruction. Immutable once built; share it between instances with an
/// `Arc`.
#[derive(Debug, Clone)]
pub struct Module {
    ir: ir::Module,
    pub(crate) control: Vec<ControlMap>,
}

impl Module {
    /// Decode and validate a binary.
    pub fn from_binary(bytes: &[u8]) -> Result<Self, LoadError> {
        let module = binary::decode(bytes)?;
        let control = module
            .funcs
            .iter()
            .map(|func| ControlMap::build(&func.body))
            .collect();
        log::debug!(
            "loaded module with {} functions, {} exports",
            module.funcs.len(),
            module.exports.len()
        );
        Ok(Self {
            ir: module,
            control,
        })
    }

    /// Validate an in-memory module by way of its binary form.
    pub fn from_ir(module: &ir::Module) -> Result<Self, LoadError> {
        let options = EncodeOptions {
            write_debug_names: true,
        };
        Self::from_binary(&binary::encode(module, &options))
    }

    pub fn ir(&self) -> &ir::Module {
        &self.ir
    }

    /// Signature of the function exported as `name`.
    pub fn export_type(&self, name: &str) -> Option<&FuncType> {
        self.ir.func_type(self.ir.exported_func(name)?)
    }

    /// Whether the module's memory is exported.
    pub fn exports_memory(&self, name: &str) -> bool {
        matches!(
            self.ir.export(name).map(|e| e.kind),
            Some(ExportKind::Memory(0))
        )
    }

    /// Human-readable description of types, functions, memory and exports.
    pub fn summary(&self) -> Summary<'_> {
        Summary(&self.ir)
    }
}

pub struct Summary<'m>(&'m ir::Module);

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = self.0;
        if let Some(name) = &module.names.module {
            writeln!(f, "module ${name}")?;
        }

        writeln!(f, "types:")?;
        for (idx, ty) in module.types.iter().enumerate() {
            writeln!(f, "  {idx}: {ty}")?;
        }

        writeln!(f, "functions:")?;
        for (idx, func) in module.funcs.iter().enumerate() {
            write!(f, "  {idx}:")?;
            if let Some(name) = module.names.function(idx as u32) {
                write!(f, " ${name}")?;
            }
            writeln!(
                f,
                " type {}, {} locals, {} instructions",
                func.type_idx,
                func.locals.len(),
                func.body.len()
            )?;
        }

        match &module.memory {
            Some(limits) => writeln!(f, "memory: {limits}")?,
            None => writeln!(f, "memory: none")?,
        }

        writeln!(f, "exports:")?;
        for export in &module.exports {
            match export.kind {
                ExportKind::Func(idx) => writeln!(f, "  \"{}\" -> func {idx}", export.name)?,
                ExportKind::Memory(idx) => writeln!(f, "  \"{}\" -> memory {idx}", export.name)?,
            }
        }
        Ok(())
    }
}
