use cranelift_codegen::ir::Value;

use super::{Ast, NodeId, Syntax, VarDecl, require_frame, scope};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::types::Type;

pub const THIS: &str = "this";

/// Use of a variable by name. `this` names the receiver inside a method.
#[derive(Debug, Clone, PartialEq)]
pub struct VarRef {
    pub name: String,
}

impl VarRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn is_this(&self) -> bool {
        self.name == THIS
    }

    /// Declaration this reference resolves to.
    pub fn declaration(&self, ast: &Ast, id: NodeId) -> CompileResult<NodeId> {
        scope::lookup(ast, id, &self.name).ok_or_else(|| {
            CompileError::semantic(format!("undeclared variable '{}'", self.name), ast.diagnostic_span(id))
        })
    }
}

impl Syntax for VarRef {
    const TAG: &'static str = "var-ref";

    fn children(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn map_children(&mut self, _f: &mut dyn FnMut(NodeId) -> NodeId) {}

    fn detach(&mut self, _child: NodeId) -> bool {
        false
    }

    fn dump_attrs(&self) -> String {
        format!("name='{}'", self.name)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        self.type_of(ast, id, module).map(|_| ())
    }

    fn type_of(&self, ast: &Ast, id: NodeId, _module: &Module) -> CompileResult<Type> {
        if self.is_this() {
            return scope::enclosing_class(ast, id).map(Type::named).ok_or_else(|| {
                CompileError::semantic("'this' used outside of a method", ast.diagnostic_span(id))
            });
        }
        VarDecl::declared_type(ast, self.declaration(ast, id)?)
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        _module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let frame = require_frame(ast, id, frame)?;
        let span = ast.diagnostic_span(id);
        if self.is_this() {
            return frame
                .this
                .map(Some)
                .ok_or_else(|| CompileError::codegen("'this' used outside of a method", span));
        }
        let decl = self.declaration(ast, id)?;
        let var = frame
            .variable(decl)
            .ok_or_else(|| CompileError::codegen(format!("variable '{}' has no storage yet", self.name), span))?;
        Ok(Some(frame.builder.use_var(var)))
    }
}
