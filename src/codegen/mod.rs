//! Backend state shared by every node's code generation: the JIT module, the
//! declared functions, class layouts and `Map` instantiations.

pub mod frame;
pub mod layout;
pub mod runtime;

use std::collections::HashMap;

use cranelift_codegen::Context;
use cranelift_codegen::ir::{InstBuilder, Signature, Value, types};
use cranelift_jit::{JITBuilder, JITModule};
use cranelift_module::{DataDescription, DataId, FuncId, Linkage, Module as ClifModule};
use indexmap::IndexMap;

use crate::ast::{Ast, ClassDecl, NodeId};
use crate::config::CompilerConfig;
use crate::diagnostics::{CompileError, CompileResult};
use crate::span::Span;
use crate::types::Type;

pub use frame::Frame;
pub use layout::{ClassLayout, FieldSlot};
pub use runtime::RuntimeRegistry;

/// A `Map<K, V>` instantiation and the data object holding its entry layout.
#[derive(Debug, Clone, PartialEq)]
pub struct MapInstantiation {
    pub ty: Type,
    pub data: DataId,
    pub slots: i64,
    pub key_slot: i64,
}

pub struct CodegenContext {
    /// Taken by [`CodegenContext::finish`].
    jit: Option<JITModule>,
    runtime: RuntimeRegistry,
    functions: HashMap<NodeId, FuncId>,
    main: Option<FuncId>,
    layouts: IndexMap<String, ClassLayout>,
    instantiations: IndexMap<String, MapInstantiation>,
}

impl CodegenContext {
    pub fn new(config: &CompilerConfig) -> CompileResult<Self> {
        let mut builder = JITBuilder::with_flags(&config.flags(), cranelift_module::default_libcall_names())
            .map_err(|e| CompileError::internal(format!("failed to create JIT for host: {e}")))?;
        for (name, ptr) in crate::runtime::symbols() {
            builder.symbol(name, ptr);
        }
        let mut jit = JITModule::new(builder);
        let runtime = RuntimeRegistry::new(&mut jit)?;
        Ok(Self {
            jit: Some(jit),
            runtime,
            functions: HashMap::new(),
            main: None,
            layouts: IndexMap::new(),
            instantiations: IndexMap::new(),
        })
    }

    fn jit(&mut self) -> CompileResult<&mut JITModule> {
        self.jit.as_mut().ok_or_else(|| CompileError::internal("code generation already finished"))
    }

    pub fn make_signature(&mut self) -> CompileResult<Signature> {
        Ok(self.jit()?.make_signature())
    }

    pub fn make_context(&mut self) -> CompileResult<Context> {
        Ok(self.jit()?.make_context())
    }

    /// Backend id of the function node `id`, once declared.
    pub fn function(&self, id: NodeId) -> Option<FuncId> {
        self.functions.get(&id).copied()
    }

    pub fn declare_function(
        &mut self,
        id: NodeId,
        symbol: &str,
        linkage: Linkage,
        sig: &Signature,
        span: Span,
    ) -> CompileResult<FuncId> {
        let func_id = self
            .jit()?
            .declare_function(symbol, linkage, sig)
            .map_err(|e| CompileError::codegen(format!("failed to declare '{symbol}': {e}"), span))?;
        self.functions.insert(id, func_id);
        Ok(func_id)
    }

    pub fn define_function(&mut self, func_id: FuncId, ctx: &mut Context, span: Span) -> CompileResult<()> {
        let jit = self.jit()?;
        jit.define_function(func_id, ctx)
            .map_err(|e| CompileError::codegen(format!("failed to compile function: {e:?}"), span))?;
        jit.clear_context(ctx);
        Ok(())
    }

    pub fn set_main(&mut self, func_id: FuncId) {
        self.main = Some(func_id);
    }

    pub fn main(&self) -> Option<FuncId> {
        self.main
    }

    pub fn runtime_function(&self, name: &str, span: Span) -> CompileResult<FuncId> {
        self.runtime
            .get(name)
            .ok_or_else(|| CompileError::codegen(format!("no runtime function '{name}'"), span))
    }

    /// Emit a call to `func` in the current block. Returns its first result.
    pub fn call(&mut self, frame: &mut Frame<'_>, func: FuncId, args: &[Value]) -> CompileResult<Option<Value>> {
        let callee = self.jit()?.declare_func_in_func(func, frame.builder.func);
        let inst = frame.builder.ins().call(callee, args);
        Ok(frame.builder.inst_results(inst).first().copied())
    }

    /// Address of the data object `data` in the current function.
    pub fn data_address(&mut self, frame: &mut Frame<'_>, data: DataId) -> CompileResult<Value> {
        let global = self.jit()?.declare_data_in_func(data, frame.builder.func);
        Ok(frame.builder.ins().symbol_value(types::I64, global))
    }

    /// Layout of the class declared at `class`, computed once per class name.
    pub fn layout(&mut self, ast: &Ast, class: NodeId) -> CompileResult<&ClassLayout> {
        let name = ast.get::<ClassDecl>(class)?.name.clone();
        if !self.layouts.contains_key(&name) {
            let layout = ClassLayout::compute(ast, class)?;
            tracing::trace!(class = %name, size = layout.size(), "computed class layout");
            self.layouts.insert(name.clone(), layout);
        }
        self.layouts
            .get(&name)
            .ok_or_else(|| CompileError::internal(format!("layout of '{name}' vanished")))
    }

    /// Emit the entry layout of the instantiation `ty` (`Map<K, V>`, where `value_class` declares `V`).
    /// Each distinct instantiation is emitted once.
    pub fn instantiate_map(&mut self, ast: &Ast, ty: &Type, value_class: NodeId, span: Span) -> CompileResult<DataId> {
        let key = ty.to_string();
        if let Some(inst) = self.instantiations.get(&key) {
            return Ok(inst.data);
        }

        let layout = self.layout(ast, value_class)?;
        let key_slot = layout
            .key_slot
            .ok_or_else(|| CompileError::codegen(format!("'{}' declares no Hashable key", layout.name), span))?
            as i64;
        let slots = layout.slot_count() as i64;

        let mut bytes = Vec::with_capacity(16);
        bytes.extend_from_slice(&slots.to_ne_bytes());
        bytes.extend_from_slice(&key_slot.to_ne_bytes());
        let mut desc = DataDescription::new();
        desc.define(bytes.into_boxed_slice());
        desc.set_align(8);

        let symbol = format!("eql_map_layout_{}", self.instantiations.len());
        let jit = self.jit()?;
        let data = jit
            .declare_data(&symbol, Linkage::Local, false, false)
            .map_err(|e| CompileError::codegen(format!("failed to declare layout of '{key}': {e}"), span))?;
        jit.define_data(data, &desc)
            .map_err(|e| CompileError::codegen(format!("failed to define layout of '{key}': {e}"), span))?;

        tracing::debug!(instantiation = %key, slots, key_slot, "instantiated map");
        self.instantiations
            .insert(key, MapInstantiation { ty: ty.clone(), data, slots, key_slot });
        Ok(data)
    }

    pub fn layouts(&self) -> impl Iterator<Item = &ClassLayout> {
        self.layouts.values()
    }

    pub fn instantiations(&self) -> impl Iterator<Item = &MapInstantiation> {
        self.instantiations.values()
    }

    /// Finalize every definition and hand over the JIT module with the address of `main`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn finish(&mut self) -> CompileResult<(JITModule, *const u8)> {
        let main = self.main.ok_or_else(|| CompileError::internal("no main function was declared"))?;
        let mut jit = self
            .jit
            .take()
            .ok_or_else(|| CompileError::internal("code generation already finished"))?;
        if let Err(e) = jit.finalize_definitions() {
            // SAFETY: nothing from this module has been handed out yet.
            unsafe { jit.free_memory() };
            return Err(CompileError::internal(format!("failed to finalize code: {e}")));
        }
        let ptr = jit.get_finalized_function(main);
        tracing::debug!(functions = self.functions.len(), "finalized JIT module");
        Ok((jit, ptr))
    }
}

impl Drop for CodegenContext {
    fn drop(&mut self) {
        if let Some(jit) = self.jit.take() {
            // SAFETY: an unfinished module never exposed function pointers.
            unsafe { jit.free_memory() };
        }
    }
}
