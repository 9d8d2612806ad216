use cranelift_codegen::ir::Value;

use super::infer::infer;
use super::{
    Ast, NodeId, NodeKind, Syntax, TypeRef, codegen, detach_slot, map_slot, preprocess, require_frame,
    required, scope, type_of, validate,
};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::span::Span;
use crate::types::Type;

/// Binds a name to a type reference, with an optional initializer.
///
/// A `var` declaration starts without a type reference; preprocessing infers
/// one from the initializer and attaches it as a generated node.
#[derive(Debug, Clone, PartialEq)]
pub struct VarDecl {
    pub type_ref: Option<NodeId>,
    pub name: String,
    pub initial_value: Option<NodeId>,
}

impl VarDecl {
    pub fn new(type_ref: Option<NodeId>, name: impl Into<String>, initial_value: Option<NodeId>) -> Self {
        Self { type_ref, name: name.into(), initial_value }
    }

    /// Type of the declaration at `id`. Requires preprocessing for `var` declarations.
    pub fn declared_type(ast: &Ast, id: NodeId) -> CompileResult<Type> {
        let decl = ast.get::<VarDecl>(id)?;
        let type_ref = decl.type_ref.ok_or_else(|| {
            CompileError::semantic(
                format!("the type of '{}' is not known yet", decl.name),
                ast.diagnostic_span(id),
            )
        })?;
        TypeRef::resolve(ast, type_ref)
    }

    /// Declarations wrapped by arguments and properties are bound from outside, not initialized.
    fn is_bound_externally(ast: &Ast, id: NodeId) -> bool {
        ast.parent(id)
            .and_then(|p| ast.kind(p).ok())
            .is_some_and(|kind| matches!(kind, NodeKind::FArg | NodeKind::Property))
    }
}

impl Syntax for VarDecl {
    const TAG: &'static str = "var-decl";

    fn children(&self) -> Vec<NodeId> {
        self.type_ref.into_iter().chain(self.initial_value).collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.type_ref, f);
        map_slot(&mut self.initial_value, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.type_ref, child) || detach_slot(&mut self.initial_value, child)
    }

    fn dump_attrs(&self) -> String {
        format!("name='{}'", self.name)
    }

    fn preprocess(ast: &mut Ast, id: NodeId, module: &mut Module) -> CompileResult<()> {
        let (type_ref, init, name) = {
            let decl = ast.get::<VarDecl>(id)?;
            (decl.type_ref, decl.initial_value, decl.name.clone())
        };
        if let Some(type_ref) = type_ref {
            preprocess(ast, type_ref, module)?;
        }
        if let Some(init) = init {
            preprocess(ast, init, module)?;
        }
        if type_ref.is_some() {
            return Ok(());
        }

        let span = ast.diagnostic_span(id);
        let init = init.ok_or_else(|| {
            CompileError::semantic(format!("'var {name}' needs an initializer to infer its type"), span)
        })?;
        let ty = infer(ast, init).ok_or_else(|| {
            CompileError::semantic(
                format!("cannot infer the type of '{name}'; declare it with an explicit type"),
                span,
            )
        })?;
        tracing::trace!(%name, %ty, "inferred variable type");
        let type_ref = TypeRef::synthesize_from(ast, &ty, Span::dummy())?;
        ast.adopt::<VarDecl>(id, type_ref, |decl, t| decl.type_ref = Some(t))
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        let span = ast.diagnostic_span(id);
        let type_ref = required(ast, id, self.type_ref, "type reference")?;
        validate(ast, type_ref, module)?;
        let ty = TypeRef::resolve(ast, type_ref)?;
        if ty.is_void() {
            return Err(CompileError::semantic(format!("variable '{}' cannot have type Void", self.name), span));
        }
        if scope::lookup(ast, id, &self.name).is_some() {
            return Err(CompileError::semantic(format!("'{}' is already declared", self.name), span));
        }

        match self.initial_value {
            Some(init) => {
                validate(ast, init, module)?;
                let init_ty = type_of(ast, init, module)?;
                if init_ty != ty {
                    return Err(CompileError::semantic(
                        format!("cannot initialize '{}' of type {ty} with a value of type {init_ty}", self.name),
                        ast.diagnostic_span(init),
                    ));
                }
            }
            None if !VarDecl::is_bound_externally(ast, id) && module.is_handle(ast, &ty.name) => {
                return Err(CompileError::semantic(
                    format!("'{}' of type {ty} must be initialized", self.name),
                    span,
                ));
            }
            None => {}
        }
        Ok(())
    }

    fn type_of(&self, ast: &Ast, id: NodeId, _module: &Module) -> CompileResult<Type> {
        VarDecl::declared_type(ast, id)
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let frame = require_frame(ast, id, frame)?;
        let span = ast.diagnostic_span(id);
        let type_ref = required(ast, id, self.type_ref, "type reference")?;
        codegen(ast, type_ref, module, Some(&mut *frame))?;
        let ty = TypeRef::resolve(ast, type_ref)?;
        let abi = ty
            .abi()
            .ok_or_else(|| CompileError::codegen(format!("variable '{}' has no storage", self.name), span))?;

        let value = if let Some(param) = frame.take_param(id) {
            param
        } else if let Some(init) = self.initial_value {
            codegen(ast, init, module, Some(&mut *frame))?.ok_or_else(|| {
                CompileError::codegen(format!("initializer of '{}' produced no value", self.name), span)
            })?
        } else if ty.is_primitive() {
            frame.zero(abi)
        } else {
            let class = module
                .class(&ty.name)
                .ok_or_else(|| CompileError::resolution(ty.name.clone(), span))?;
            let size = module.codegen.layout(ast, class)?.size();
            frame.zeroed_slot(size)
        };

        frame.declare(id, abi, value);
        Ok(Some(value))
    }
}
