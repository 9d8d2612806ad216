use cranelift_codegen::ir::{InstBuilder, Value};

use super::binary_expr::expect_value;
use super::{Ast, NodeId, Syntax, codegen, detach_slot, map_slot, require_frame, required, type_of, validate_children};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::types::Type;

/// `if (condition) { ... } else ...`. The else branch is a block or another `if`.
#[derive(Debug, Clone, PartialEq)]
pub struct IfStmt {
    pub condition: Option<NodeId>,
    pub then_block: Option<NodeId>,
    pub else_branch: Option<NodeId>,
}

impl IfStmt {
    pub fn new(condition: NodeId, then_block: NodeId, else_branch: Option<NodeId>) -> Self {
        Self { condition: Some(condition), then_block: Some(then_block), else_branch }
    }
}

impl Syntax for IfStmt {
    const TAG: &'static str = "if";

    fn children(&self) -> Vec<NodeId> {
        self.condition.into_iter().chain(self.then_block).chain(self.else_branch).collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.condition, f);
        map_slot(&mut self.then_block, f);
        map_slot(&mut self.else_branch, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.condition, child)
            || detach_slot(&mut self.then_block, child)
            || detach_slot(&mut self.else_branch, child)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        let condition = required(ast, id, self.condition, "condition")?;
        required(ast, id, self.then_block, "then block")?;
        let ty = type_of(ast, condition, module)?;
        if ty != Type::boolean() {
            return Err(CompileError::semantic(
                format!("if condition must be Boolean, found {ty}"),
                ast.diagnostic_span(condition),
            ));
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
        let condition = required(ast, id, self.condition, "condition")?;
        let then_node = required(ast, id, self.then_block, "then block")?;
        let cond = expect_value(ast, condition, codegen(ast, condition, module, Some(&mut *frame))?)?;

        let then_bb = frame.builder.create_block();
        let merge_bb = frame.builder.create_block();
        let else_bb = match self.else_branch {
            Some(_) => frame.builder.create_block(),
            None => merge_bb,
        };
        frame.builder.ins().brif(cond, then_bb, &[], else_bb, &[]);

        frame.builder.switch_to_block(then_bb);
        frame.builder.seal_block(then_bb);
        frame.terminated = false;
        codegen(ast, then_node, module, Some(&mut *frame))?;
        let then_terminated = frame.terminated;
        if !then_terminated {
            frame.builder.ins().jump(merge_bb, &[]);
        }

        let mut else_terminated = false;
        if let Some(else_node) = self.else_branch {
            frame.builder.switch_to_block(else_bb);
            frame.builder.seal_block(else_bb);
            frame.terminated = false;
            codegen(ast, else_node, module, Some(&mut *frame))?;
            else_terminated = frame.terminated;
            if !else_terminated {
                frame.builder.ins().jump(merge_bb, &[]);
            }
        }

        frame.terminated = then_terminated && else_terminated;
        if !frame.terminated {
            frame.builder.switch_to_block(merge_bb);
            frame.builder.seal_block(merge_bb);
        }
        Ok(None)
    }
}
