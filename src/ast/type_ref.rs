use cranelift_codegen::ir::Value;

use super::{Ast, NodeId, Syntax, detach_list, map_list, type_refs as collect_type_refs};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::span::{Span, Spanned};
use crate::types::{self, Type};

/// Names a value type: a primitive, a class, or a generic instantiation.
#[derive(Debug, Clone, PartialEq)]
pub struct TypeRef {
    pub name: String,
    pub subtypes: Vec<NodeId>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self { name: name.into(), subtypes: Vec::new() }
    }

    pub fn generic(name: impl Into<String>, subtypes: Vec<NodeId>) -> Self {
        Self { name: name.into(), subtypes }
    }

    /// Semantic type described by the reference at `id`.
    pub fn resolve(ast: &Ast, id: NodeId) -> CompileResult<Type> {
        let tr = ast.get::<TypeRef>(id)?;
        let subtypes = tr
            .subtypes
            .iter()
            .map(|&sub| TypeRef::resolve(ast, sub))
            .collect::<CompileResult<Vec<_>>>()?;
        Ok(Type::generic(tr.name.clone(), subtypes))
    }

    /// Build a generated reference tree for `ty`.
    pub fn synthesize_from(ast: &mut Ast, ty: &Type, span: Span) -> CompileResult<NodeId> {
        let mut subtypes = Vec::with_capacity(ty.subtypes.len());
        for sub in &ty.subtypes {
            subtypes.push(TypeRef::synthesize_from(ast, sub, span)?);
        }
        ast.synthesize(TypeRef::generic(ty.name.clone(), subtypes), span)
    }
}

impl Syntax for TypeRef {
    const TAG: &'static str = "type-ref";

    fn children(&self) -> Vec<NodeId> {
        self.subtypes.clone()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_list(&mut self.subtypes, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_list(&mut self.subtypes, child)
    }

    fn dump_attrs(&self) -> String {
        format!("name='{}'", self.name)
    }

    fn type_refs(&self, ast: &Ast, id: NodeId, out: &mut Vec<NodeId>) {
        out.push(id);
        for &sub in &self.subtypes {
            collect_type_refs(ast, sub, out);
        }
    }

    fn dependencies(&self, ast: &Ast, id: NodeId, out: &mut Vec<Spanned<String>>) {
        if !types::is_primitive(&self.name) {
            out.push(Spanned::new(self.name.clone(), ast.diagnostic_span(id)));
        }
        for &sub in &self.subtypes {
            super::dependencies(ast, sub, out);
        }
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        let span = ast.diagnostic_span(id);
        for &sub in &self.subtypes {
            super::validate(ast, sub, module)?;
        }
        if types::is_primitive(&self.name) {
            if !self.subtypes.is_empty() {
                return Err(CompileError::semantic(format!("'{}' takes no type parameters", self.name), span));
            }
            return Ok(());
        }
        if module.class(&self.name).is_none() {
            return Err(CompileError::resolution(self.name.clone(), span));
        }
        if self.name != "Map" {
            if !self.subtypes.is_empty() {
                return Err(CompileError::semantic(format!("class '{}' is not generic", self.name), span));
            }
            return Ok(());
        }

        let ty = TypeRef::resolve(ast, id)?;
        let [key, value] = ty.subtypes.as_slice() else {
            return Err(CompileError::semantic(
                format!("Map takes a key and a value type, found '{ty}'"),
                span,
            ));
        };
        if *key != Type::int() {
            return Err(CompileError::semantic(format!("Map keys must be Int, found '{key}'"), span));
        }
        let hashable = module
            .class_decl(ast, &value.name)
            .is_some_and(|class| class.hashable_key(ast).is_some());
        if !hashable {
            return Err(CompileError::semantic(
                format!("Map values must be a Hashable class, found '{value}'"),
                span,
            ));
        }
        Ok(())
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        _frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        if self.name == "Map" {
            let ty = TypeRef::resolve(ast, id)?;
            module.instantiate_map(ast, &ty, ast.diagnostic_span(id))?;
        }
        Ok(None)
    }
}
