use std::fmt;

use cranelift_codegen::ir::condcodes::{FloatCC, IntCC};
use cranelift_codegen::ir::{InstBuilder, Value, types};

use super::{Ast, NodeId, Syntax, codegen, detach_slot, map_slot, require_frame, required, type_of, validate_children};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::types::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    And,
    Or,
}

impl BinaryOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(self, BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinaryOp::And | BinaryOp::Or)
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BinaryExpr {
    pub op: BinaryOp,
    pub lhs: Option<NodeId>,
    pub rhs: Option<NodeId>,
}

impl BinaryExpr {
    pub fn new(op: BinaryOp, lhs: NodeId, rhs: NodeId) -> Self {
        Self { op, lhs: Some(lhs), rhs: Some(rhs) }
    }

    /// Operand types after checking them against the operator.
    fn operand_type(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<Type> {
        let lhs = type_of(ast, required(ast, id, self.lhs, "left operand")?, module)?;
        let rhs = type_of(ast, required(ast, id, self.rhs, "right operand")?, module)?;
        let span = ast.diagnostic_span(id);
        if lhs != rhs {
            return Err(CompileError::semantic(
                format!("operator '{}' cannot combine {lhs} and {rhs}", self.op),
                span,
            ));
        }
        let ok = match self.op {
            BinaryOp::Mod => lhs == Type::int(),
            op if op.is_arithmetic() => lhs.is_numeric(),
            BinaryOp::Lt | BinaryOp::LtEq | BinaryOp::Gt | BinaryOp::GtEq => lhs.is_numeric(),
            BinaryOp::Eq | BinaryOp::NotEq => lhs.is_primitive() && !lhs.is_void(),
            _ => lhs == Type::boolean(),
        };
        if !ok {
            return Err(CompileError::semantic(
                format!("operator '{}' is not defined for {lhs}", self.op),
                span,
            ));
        }
        Ok(lhs)
    }

    fn short_circuit(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: &mut Frame<'_>,
        lhs: Value,
    ) -> CompileResult<Value> {
        let rhs_node = required(ast, id, self.rhs, "right operand")?;
        let rhs_bb = frame.builder.create_block();
        let merge_bb = frame.builder.create_block();
        frame.builder.append_block_param(merge_bb, types::I8);
        match self.op {
            BinaryOp::And => frame.builder.ins().brif(lhs, rhs_bb, &[], merge_bb, &[lhs]),
            _ => frame.builder.ins().brif(lhs, merge_bb, &[lhs], rhs_bb, &[]),
        };

        frame.builder.switch_to_block(rhs_bb);
        frame.builder.seal_block(rhs_bb);
        let rhs = expect_value(ast, rhs_node, codegen(ast, rhs_node, module, Some(&mut *frame))?)?;
        frame.builder.ins().jump(merge_bb, &[rhs]);

        frame.builder.switch_to_block(merge_bb);
        frame.builder.seal_block(merge_bb);
        Ok(frame.builder.block_params(merge_bb)[0])
    }
}

pub(crate) fn expect_value(ast: &Ast, id: NodeId, value: Option<Value>) -> CompileResult<Value> {
    value.ok_or_else(|| CompileError::codegen("expression produced no value", ast.diagnostic_span(id)))
}

impl Syntax for BinaryExpr {
    const TAG: &'static str = "binary-expr";

    fn children(&self) -> Vec<NodeId> {
        self.lhs.into_iter().chain(self.rhs).collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.lhs, f);
        map_slot(&mut self.rhs, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.lhs, child) || detach_slot(&mut self.rhs, child)
    }

    fn dump_attrs(&self) -> String {
        format!("op='{}'", self.op)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        self.operand_type(ast, id, module).map(|_| ())
    }

    fn type_of(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<Type> {
        let operand = self.operand_type(ast, id, module)?;
        Ok(if self.op.is_arithmetic() { operand } else { Type::boolean() })
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let frame = require_frame(ast, id, frame)?;
        let operand = self.operand_type(ast, id, module)?;
        let lhs_node = required(ast, id, self.lhs, "left operand")?;
        let l = expect_value(ast, lhs_node, codegen(ast, lhs_node, module, Some(&mut *frame))?)?;
        if self.op.is_logical() {
            return self.short_circuit(ast, id, module, frame, l).map(Some);
        }
        let rhs_node = required(ast, id, self.rhs, "right operand")?;
        let r = expect_value(ast, rhs_node, codegen(ast, rhs_node, module, Some(&mut *frame))?)?;

        let is_float = operand == Type::float();
        let b = &mut frame.builder;
        let value = match self.op {
            BinaryOp::Add if is_float => b.ins().fadd(l, r),
            BinaryOp::Add => b.ins().iadd(l, r),
            BinaryOp::Sub if is_float => b.ins().fsub(l, r),
            BinaryOp::Sub => b.ins().isub(l, r),
            BinaryOp::Mul if is_float => b.ins().fmul(l, r),
            BinaryOp::Mul => b.ins().imul(l, r),
            BinaryOp::Div if is_float => b.ins().fdiv(l, r),
            BinaryOp::Div | BinaryOp::Mod => {
                // Divisors 0 and -1 never reach sdiv/srem: x / 0 and x % 0 are 0,
                // x / -1 is a wrapping negation and x % -1 is 0.
                let zero = b.ins().iconst(types::I64, 0);
                let one = b.ins().iconst(types::I64, 1);
                let minus_one = b.ins().iconst(types::I64, -1);
                let is_zero = b.ins().icmp(IntCC::Equal, r, zero);
                let is_minus_one = b.ins().icmp(IntCC::Equal, r, minus_one);
                let special = b.ins().bor(is_zero, is_minus_one);
                let divisor = b.ins().select(special, one, r);
                if self.op == BinaryOp::Div {
                    let quotient = b.ins().sdiv(l, divisor);
                    let negated = b.ins().ineg(l);
                    let quotient = b.ins().select(is_minus_one, negated, quotient);
                    b.ins().select(is_zero, zero, quotient)
                } else {
                    let remainder = b.ins().srem(l, divisor);
                    b.ins().select(special, zero, remainder)
                }
            }
            BinaryOp::Eq if is_float => b.ins().fcmp(FloatCC::Equal, l, r),
            BinaryOp::Eq => b.ins().icmp(IntCC::Equal, l, r),
            BinaryOp::NotEq if is_float => b.ins().fcmp(FloatCC::NotEqual, l, r),
            BinaryOp::NotEq => b.ins().icmp(IntCC::NotEqual, l, r),
            BinaryOp::Lt if is_float => b.ins().fcmp(FloatCC::LessThan, l, r),
            BinaryOp::Lt => b.ins().icmp(IntCC::SignedLessThan, l, r),
            BinaryOp::LtEq if is_float => b.ins().fcmp(FloatCC::LessThanOrEqual, l, r),
            BinaryOp::LtEq => b.ins().icmp(IntCC::SignedLessThanOrEqual, l, r),
            BinaryOp::Gt if is_float => b.ins().fcmp(FloatCC::GreaterThan, l, r),
            BinaryOp::Gt => b.ins().icmp(IntCC::SignedGreaterThan, l, r),
            BinaryOp::GtEq if is_float => b.ins().fcmp(FloatCC::GreaterThanOrEqual, l, r),
            BinaryOp::GtEq => b.ins().icmp(IntCC::SignedGreaterThanOrEqual, l, r),
            BinaryOp::And | BinaryOp::Or => {
                return Err(CompileError::internal_at(
                    format!("operator '{}' reached arithmetic lowering", self.op),
                    ast.diagnostic_span(id),
                ));
            }
        };
        Ok(Some(value))
    }
}
