use cranelift_codegen::ir::{InstBuilder, MemFlags, Value};

use super::binary_expr::expect_value;
use super::{Ast, NodeId, Syntax, VarDecl, codegen, detach_slot, map_slot, require_frame, required, type_of, validate_children};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldAccess {
    pub target: Option<NodeId>,
    pub field: String,
}

impl FieldAccess {
    pub fn new(target: NodeId, field: impl Into<String>) -> Self {
        Self { target: Some(target), field: field.into() }
    }

    /// Class type of the target expression.
    pub(crate) fn target_type(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<Type> {
        type_of(ast, required(ast, id, self.target, "target")?, module)
    }

    /// Address of the target instance and the byte offset of the field within it.
    pub(crate) fn address(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: &mut Frame<'_>,
    ) -> CompileResult<(Value, i32, Type)> {
        let span = ast.diagnostic_span(id);
        let target_ty = self.target_type(ast, id, module)?;
        let target = required(ast, id, self.target, "target")?;
        let base = expect_value(ast, target, codegen(ast, target, module, Some(&mut *frame))?)?;
        let class = module
            .class(&target_ty.name)
            .ok_or_else(|| CompileError::resolution(target_ty.name.clone(), span))?;
        let layout = module.codegen.layout(ast, class)?;
        let slot = layout.field(&self.field).ok_or_else(|| {
            CompileError::codegen(format!("class '{}' has no field '{}'", target_ty.name, self.field), span)
        })?;
        Ok((base, slot.offset, slot.ty.clone()))
    }
}

impl Syntax for FieldAccess {
    const TAG: &'static str = "field-access";

    fn children(&self) -> Vec<NodeId> {
        self.target.into_iter().collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.target, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.target, child)
    }

    fn dump_attrs(&self) -> String {
        format!("field='{}'", self.field)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        self.type_of(ast, id, module).map(|_| ())
    }

    fn type_of(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<Type> {
        let span = ast.diagnostic_span(id);
        let target_ty = self.target_type(ast, id, module)?;
        let class = module.class_decl(ast, &target_ty.name).ok_or_else(|| {
            CompileError::semantic(format!("{target_ty} has no field '{}'", self.field), span)
        })?;
        let (_, decl) = class.property(ast, &self.field).ok_or_else(|| {
            CompileError::semantic(format!("class '{}' has no field '{}'", target_ty.name, self.field), span)
        })?;
        VarDecl::declared_type(ast, decl)
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let frame = require_frame(ast, id, frame)?;
        let (base, offset, ty) = self.address(ast, id, module, frame)?;
        let abi = ty.abi().ok_or_else(|| {
            CompileError::codegen(format!("field '{}' has no storage", self.field), ast.diagnostic_span(id))
        })?;
        Ok(Some(frame.builder.ins().load(abi, MemFlags::trusted(), base, offset)))
    }
}
