//! The compilation unit threaded through every phase.

pub mod resolve;

use cranelift_module::DataId;
use indexmap::IndexMap;

use crate::ast::{Ast, ClassDecl, NodeId};
use crate::codegen::CodegenContext;
use crate::config::CompilerConfig;
use crate::diagnostics::{CompileError, CompileResult};
use crate::span::Span;
use crate::types::Type;

pub use resolve::resolve;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Registered, dependencies still being resolved.
    Loading,
    Resolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassEntry {
    pub decl: NodeId,
    pub state: LoadState,
}

/// Class symbol table, load states and the backend build context of one compilation.
pub struct Module {
    classes: IndexMap<String, ClassEntry>,
    pub codegen: CodegenContext,
    config: CompilerConfig,
}

impl Module {
    pub fn new(config: &CompilerConfig) -> CompileResult<Self> {
        Ok(Self {
            classes: IndexMap::new(),
            codegen: CodegenContext::new(config)?,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Declaration registered under `name`, in either load state.
    pub fn class(&self, name: &str) -> Option<NodeId> {
        self.classes.get(name).map(|entry| entry.decl)
    }

    pub fn class_decl<'a>(&self, ast: &'a Ast, name: &str) -> Option<&'a ClassDecl> {
        ast.get::<ClassDecl>(self.class(name)?).ok()
    }

    pub fn state(&self, name: &str) -> Option<LoadState> {
        self.classes.get(name).map(|entry| entry.state)
    }

    /// Registered classes in load order.
    pub fn classes(&self) -> impl Iterator<Item = (&str, &ClassEntry)> {
        self.classes.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn class_count(&self) -> usize {
        self.classes.len()
    }

    /// Register `name` before its dependencies are scanned.
    pub fn begin_loading(&mut self, name: &str, decl: NodeId) {
        self.classes.insert(name.to_string(), ClassEntry { decl, state: LoadState::Loading });
    }

    pub fn finish_loading(&mut self, name: &str) {
        if let Some(entry) = self.classes.get_mut(name) {
            entry.state = LoadState::Resolved;
        }
    }

    /// Whether values of class `name` are opaque runtime handles.
    pub fn is_handle(&self, ast: &Ast, name: &str) -> bool {
        self.class_decl(ast, name).is_some_and(|class| class.is_handle(ast))
    }

    /// Materialize the entry layout of a `Map<K, V>` instantiation, once per distinct type.
    pub fn instantiate_map(&mut self, ast: &Ast, ty: &Type, span: Span) -> CompileResult<DataId> {
        let value = ty
            .subtypes
            .get(1)
            .ok_or_else(|| CompileError::codegen(format!("'{ty}' has no value type"), span))?;
        let decl = self
            .class(&value.name)
            .ok_or_else(|| CompileError::resolution(value.name.clone(), span))?;
        self.codegen.instantiate_map(ast, ty, decl, span)
    }
}
