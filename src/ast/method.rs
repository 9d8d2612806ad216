use std::fmt;

use cranelift_codegen::ir::Value;

use super::{Ast, Function, NodeId, Syntax, codegen, detach_slot, map_slot, required};
use crate::codegen::Frame;
use crate::diagnostics::CompileResult;
use crate::module::Module;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Private,
}

impl fmt::Display for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Access::Public => f.write_str("public"),
            Access::Private => f.write_str("private"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub access: Access,
    pub function: Option<NodeId>,
}

impl Method {
    pub fn new(access: Access, function: NodeId) -> Self {
        Self { access, function: Some(function) }
    }

    pub fn name<'a>(&self, ast: &'a Ast) -> Option<&'a str> {
        let function = ast.get::<Function>(self.function?).ok()?;
        Some(function.name.as_str())
    }
}

impl Syntax for Method {
    const TAG: &'static str = "method";

    fn children(&self) -> Vec<NodeId> {
        self.function.into_iter().collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.function, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.function, child)
    }

    fn dump_attrs(&self) -> String {
        format!("access='{}'", self.access)
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        codegen(ast, required(ast, id, self.function, "function")?, module, frame)
    }
}
