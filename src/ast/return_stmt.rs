use cranelift_codegen::ir::{InstBuilder, Value};

use super::binary_expr::expect_value;
use super::{Ast, Function, NodeId, NodeKind, Syntax, codegen, detach_slot, map_slot, require_frame, scope, type_of, validate_children};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ReturnStmt {
    pub value: Option<NodeId>,
}

impl ReturnStmt {
    pub fn new(value: Option<NodeId>) -> Self {
        Self { value }
    }
}

impl Syntax for ReturnStmt {
    const TAG: &'static str = "return";

    fn children(&self) -> Vec<NodeId> {
        self.value.into_iter().collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.value, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.value, child)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        let span = ast.diagnostic_span(id);
        let function = scope::enclosing(ast, id, NodeKind::Function)
            .ok_or_else(|| CompileError::semantic("return outside of a function", span))?;
        let expected = Function::return_type(ast, function)?;
        match self.value {
            Some(value) => {
                let found = type_of(ast, value, module)?;
                if expected.is_void() {
                    return Err(CompileError::semantic("cannot return a value from a Void function", span));
                }
                if found != expected {
                    return Err(CompileError::semantic(
                        format!("expected a return value of type {expected}, found {found}"),
                        ast.diagnostic_span(value),
                    ));
                }
            }
            None if !expected.is_void() => {
                return Err(CompileError::semantic(
                    format!("missing return value of type {expected}"),
                    span,
                ));
            }
            None => {}
        }
        Ok(())
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let frame = require_frame(ast, id, frame)?;
        match self.value {
            Some(value) => {
                let v = expect_value(ast, value, codegen(ast, value, module, Some(&mut *frame))?)?;
                frame.builder.ins().return_(&[v]);
            }
            None => {
                frame.builder.ins().return_(&[]);
            }
        }
        frame.terminated = true;
        Ok(None)
    }
}
