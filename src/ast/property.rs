use cranelift_codegen::ir::Value;

use super::{Access, Ast, NodeId, Syntax, VarDecl, detach_slot, map_slot, required, validate_children};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;

/// A data member of a class. Storage comes from the class layout, not from codegen of the node.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub access: Access,
    pub var_decl: Option<NodeId>,
}

impl Property {
    pub fn new(access: Access, var_decl: NodeId) -> Self {
        Self { access, var_decl: Some(var_decl) }
    }

    pub fn name<'a>(&self, ast: &'a Ast) -> Option<&'a str> {
        let decl = ast.get::<VarDecl>(self.var_decl?).ok()?;
        Some(decl.name.as_str())
    }
}

impl Syntax for Property {
    const TAG: &'static str = "property";

    fn children(&self) -> Vec<NodeId> {
        self.var_decl.into_iter().collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.var_decl, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.var_decl, child)
    }

    fn dump_attrs(&self) -> String {
        format!("access='{}'", self.access)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        let decl = required(ast, id, self.var_decl, "variable declaration")?;
        validate_children(ast, id, module)?;
        if ast.get::<VarDecl>(decl)?.initial_value.is_some() {
            return Err(CompileError::semantic(
                "properties cannot have initializers",
                ast.diagnostic_span(decl),
            ));
        }
        Ok(())
    }

    fn codegen(
        &self,
        _ast: &Ast,
        _id: NodeId,
        _module: &mut Module,
        _frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        Ok(None)
    }
}
