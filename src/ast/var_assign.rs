use cranelift_codegen::ir::{InstBuilder, MemFlags, Value};

use super::binary_expr::expect_value;
use super::{
    Ast, FieldAccess, NodeId, Payload, Syntax, VarRef, codegen, detach_slot, map_slot, require_frame, required,
    type_of, validate_children,
};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::types::Type;

/// `target = value;` where the target is a variable or a field.
#[derive(Debug, Clone, PartialEq)]
pub struct VarAssign {
    pub target: Option<NodeId>,
    pub value: Option<NodeId>,
}

impl VarAssign {
    pub fn new(target: NodeId, value: NodeId) -> Self {
        Self { target: Some(target), value: Some(value) }
    }
}

impl Syntax for VarAssign {
    const TAG: &'static str = "var-assign";

    fn children(&self) -> Vec<NodeId> {
        self.target.into_iter().chain(self.value).collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.target, f);
        map_slot(&mut self.value, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.target, child) || detach_slot(&mut self.value, child)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        let target = required(ast, id, self.target, "target")?;
        let value = required(ast, id, self.value, "value")?;
        let assignable = match &ast.node(target)?.payload {
            Payload::VarRef(var) => !var.is_this(),
            Payload::FieldAccess(_) => true,
            _ => false,
        };
        if !assignable {
            return Err(CompileError::semantic("invalid assignment target", ast.diagnostic_span(target)));
        }
        let target_ty = type_of(ast, target, module)?;
        let value_ty = type_of(ast, value, module)?;
        if target_ty != value_ty {
            return Err(CompileError::semantic(
                format!("cannot assign a value of type {value_ty} to {target_ty}"),
                ast.diagnostic_span(value),
            ));
        }
        Ok(())
    }

    fn type_of(&self, _ast: &Ast, _id: NodeId, _module: &Module) -> CompileResult<Type> {
        Ok(Type::void())
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let frame = require_frame(ast, id, frame)?;
        let target = required(ast, id, self.target, "target")?;
        let value_node = required(ast, id, self.value, "value")?;
        let value = expect_value(ast, value_node, codegen(ast, value_node, module, Some(&mut *frame))?)?;

        if let Ok(var) = ast.get::<VarRef>(target) {
            let decl = var.declaration(ast, target)?;
            let slot = frame.variable(decl).ok_or_else(|| {
                CompileError::codegen(format!("variable '{}' has no storage yet", var.name), ast.diagnostic_span(target))
            })?;
            frame.builder.def_var(slot, value);
        } else {
            let field = ast.get::<FieldAccess>(target)?;
            let (base, offset, _) = field.address(ast, target, module, frame)?;
            frame.builder.ins().store(MemFlags::trusted(), value, base, offset);
        }
        Ok(None)
    }
}
