use cranelift_codegen::ir::{InstBuilder, Value, types};

use super::{Ast, NodeId, Syntax, require_frame};
use crate::codegen::Frame;
use crate::diagnostics::CompileResult;
use crate::module::Module;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LiteralValue {
    Int(i64),
    Float(f64),
    Boolean(bool),
}

impl LiteralValue {
    pub fn ty(&self) -> Type {
        match self {
            LiteralValue::Int(_) => Type::int(),
            LiteralValue::Float(_) => Type::float(),
            LiteralValue::Boolean(_) => Type::boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Literal {
    pub value: LiteralValue,
}

impl Literal {
    pub fn int(value: i64) -> Self {
        Self { value: LiteralValue::Int(value) }
    }

    pub fn float(value: f64) -> Self {
        Self { value: LiteralValue::Float(value) }
    }

    pub fn boolean(value: bool) -> Self {
        Self { value: LiteralValue::Boolean(value) }
    }
}

impl Syntax for Literal {
    const TAG: &'static str = "literal";

    fn children(&self) -> Vec<NodeId> {
        Vec::new()
    }

    fn map_children(&mut self, _f: &mut dyn FnMut(NodeId) -> NodeId) {}

    fn detach(&mut self, _child: NodeId) -> bool {
        false
    }

    fn dump_attrs(&self) -> String {
        let value = match self.value {
            LiteralValue::Int(n) => n.to_string(),
            LiteralValue::Float(n) => format!("{n:?}"),
            LiteralValue::Boolean(b) => b.to_string(),
        };
        format!("type='{}' value='{value}'", self.value.ty())
    }

    fn type_of(&self, _ast: &Ast, _id: NodeId, _module: &Module) -> CompileResult<Type> {
        Ok(self.value.ty())
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        _module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let frame = require_frame(ast, id, frame)?;
        let ins = frame.builder.ins();
        let value = match self.value {
            LiteralValue::Int(n) => ins.iconst(types::I64, n),
            LiteralValue::Float(n) => ins.f64const(n),
            LiteralValue::Boolean(b) => ins.iconst(types::I8, i64::from(b)),
        };
        Ok(Some(value))
    }
}
