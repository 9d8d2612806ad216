use super::{Ast, NodeId, Syntax};
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;

pub const HASHABLE: &str = "Hashable";
pub const NATIVE: &str = "Native";

/// A class annotation such as `[Hashable("id")]` or `[Native("path")]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    pub name: String,
    pub args: Vec<String>,
}

impl Metadata {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> Self {
        Self { name: name.into(), args }
    }

    pub fn arg(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }
}

impl Syntax for Metadata {
    const TAG: &'static str = "metadata";

    fn children(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn map_children(&mut self, _f: &mut dyn FnMut(NodeId) -> NodeId) {}

    fn detach(&mut self, _child: NodeId) -> bool {
        false
    }

    fn dump_attrs(&self) -> String {
        if self.args.is_empty() {
            format!("name='{}'", self.name)
        } else {
            format!("name='{}' args='{}'", self.name, self.args.join(","))
        }
    }

    fn validate(&self, ast: &Ast, id: NodeId, _module: &Module) -> CompileResult<()> {
        let span = ast.diagnostic_span(id);
        match self.name.as_str() {
            HASHABLE | NATIVE if self.args.len() == 1 => Ok(()),
            HASHABLE | NATIVE => Err(CompileError::semantic(
                format!("[{}] takes exactly one argument", self.name),
                span,
            )),
            other => Err(CompileError::semantic(format!("unknown metadata '{other}'"), span)),
        }
    }
}
