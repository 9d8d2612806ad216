use cranelift_codegen::ir::Value;

use super::{Ast, NodeId, Syntax, codegen, detach_slot, map_slot, preprocess, required, validate};
use crate::codegen::Frame;
use crate::diagnostics::CompileResult;
use crate::module::Module;

/// A formal parameter. Every operation is forwarded to the wrapped declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FArg {
    pub var_decl: Option<NodeId>,
}

impl FArg {
    pub fn new(var_decl: Option<NodeId>) -> Self {
        Self { var_decl }
    }
}

impl Syntax for FArg {
    const TAG: &'static str = "farg";

    fn children(&self) -> Vec<NodeId> {
        self.var_decl.into_iter().collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.var_decl, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.var_decl, child)
    }

    fn preprocess(ast: &mut Ast, id: NodeId, module: &mut Module) -> CompileResult<()> {
        let decl = required(ast, id, ast.get::<FArg>(id)?.var_decl, "variable declaration")?;
        preprocess(ast, decl, module)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate(ast, required(ast, id, self.var_decl, "variable declaration")?, module)
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        codegen(ast, required(ast, id, self.var_decl, "variable declaration")?, module, frame)
    }
}
