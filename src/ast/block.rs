use cranelift_codegen::ir::Value;

use super::{Ast, NodeId, Syntax, codegen, detach_list, map_list, require_frame};
use crate::codegen::Frame;
use crate::diagnostics::CompileResult;
use crate::module::Module;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    pub stmts: Vec<NodeId>,
}

impl Block {
    pub fn new(stmts: Vec<NodeId>) -> Self {
        Self { stmts }
    }
}

impl Syntax for Block {
    const TAG: &'static str = "block";

    fn children(&self) -> Vec<NodeId> {
        self.stmts.clone()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_list(&mut self.stmts, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_list(&mut self.stmts, child)
    }

    /// Statements in order; the block's value is that of its last statement.
    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let frame = require_frame(ast, id, frame)?;
        let mut last = None;
        for &stmt in &self.stmts {
            if frame.terminated {
                break;
            }
            last = codegen(ast, stmt, module, Some(&mut *frame))?;
        }
        Ok(last)
    }
}
