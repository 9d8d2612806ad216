use std::collections::HashMap;

use cranelift_codegen::ir::{InstBuilder, StackSlotData, StackSlotKind, Value, types};
use cranelift_frontend::{FunctionBuilder, Variable};

use crate::ast::NodeId;
use crate::types::Type;

/// Per-function code generation state: the IR builder plus the variables
/// bound to declarations in scope.
pub struct Frame<'a> {
    pub builder: FunctionBuilder<'a>,
    variables: HashMap<NodeId, Variable>,
    params: HashMap<NodeId, Value>,
    next_var: u32,
    pub return_type: Type,
    /// Receiver pointer when compiling a method body.
    pub this: Option<Value>,
    /// Set once the current block ends in a return or trap.
    pub terminated: bool,
}

impl<'a> Frame<'a> {
    pub fn new(builder: FunctionBuilder<'a>, return_type: Type) -> Self {
        Self {
            builder,
            variables: HashMap::new(),
            params: HashMap::new(),
            next_var: 0,
            return_type,
            this: None,
            terminated: false,
        }
    }

    /// Bind declaration `decl` to a fresh variable holding `value`.
    pub fn declare(&mut self, decl: NodeId, abi: types::Type, value: Value) -> Variable {
        let var = Variable::from_u32(self.next_var);
        self.next_var += 1;
        self.builder.declare_var(var, abi);
        self.builder.def_var(var, value);
        self.variables.insert(decl, var);
        var
    }

    pub fn variable(&self, decl: NodeId) -> Option<Variable> {
        self.variables.get(&decl).copied()
    }

    /// Record the incoming block parameter for an argument declaration.
    pub fn bind_param(&mut self, decl: NodeId, value: Value) {
        self.params.insert(decl, value);
    }

    pub fn take_param(&mut self, decl: NodeId) -> Option<Value> {
        self.params.remove(&decl)
    }

    pub fn zero(&mut self, abi: types::Type) -> Value {
        if abi.is_float() {
            self.builder.ins().f64const(0.0)
        } else {
            self.builder.ins().iconst(abi, 0)
        }
    }

    /// Address of a zero-filled stack slot of at least `size` bytes, 8-byte aligned.
    pub fn zeroed_slot(&mut self, size: u32) -> Value {
        let size = size.max(8).next_multiple_of(8);
        let slot = self
            .builder
            .create_sized_stack_slot(StackSlotData::new(StackSlotKind::ExplicitSlot, size, 3));
        let zero = self.builder.ins().iconst(types::I64, 0);
        for offset in (0..size as i32).step_by(8) {
            self.builder.ins().stack_store(zero, slot, offset);
        }
        self.builder.ins().stack_addr(types::I64, slot, 0)
    }

    pub fn finish(mut self) {
        self.builder.seal_all_blocks();
        self.builder.finalize();
    }
}
