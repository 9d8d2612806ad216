use std::collections::HashMap;

use cranelift_codegen::ir::{AbiParam, types};
use cranelift_module::{FuncId, Linkage, Module};

use crate::diagnostics::CompileError;

/// Runtime functions backing the native classes, declared as imports.
pub struct RuntimeRegistry {
    ids: HashMap<&'static str, FuncId>,
}

impl RuntimeRegistry {
    /// Declare every runtime function. Handles and pointers are `I64`, `Boolean` results `I8`.
    pub fn new(module: &mut dyn Module) -> Result<Self, CompileError> {
        let mut reg = RuntimeRegistry { ids: HashMap::new() };

        // Path
        reg.declare(module, "eql_path_events", &[types::I64], &[types::I64])?;
        reg.declare(module, "eql_path_object_id", &[types::I64], &[types::I64])?;

        // Cursor
        reg.declare(module, "eql_cursor_eof", &[types::I64], &[types::I8])?;
        reg.declare(module, "eql_cursor_next", &[types::I64, types::I64], &[])?;

        // Map: (map, key, entry layout) -> entry
        reg.declare(module, "eql_map_get", &[types::I64, types::I64, types::I64], &[types::I64])?;
        reg.declare(module, "eql_map_count", &[types::I64], &[types::I64])?;

        Ok(reg)
    }

    /// Look up a runtime function by symbol name.
    pub fn get(&self, name: &str) -> Option<FuncId> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    fn declare(
        &mut self,
        module: &mut dyn Module,
        name: &'static str,
        params: &[types::Type],
        returns: &[types::Type],
    ) -> Result<(), CompileError> {
        let mut sig = module.make_signature();
        for &p in params {
            sig.params.push(AbiParam::new(p));
        }
        for &r in returns {
            sig.returns.push(AbiParam::new(r));
        }
        let id = module
            .declare_function(name, Linkage::Import, &sig)
            .map_err(|e| CompileError::internal(format!("declare {name} error: {e}")))?;
        self.ids.insert(name, id);
        Ok(())
    }
}
