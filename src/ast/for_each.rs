use cranelift_codegen::ir::{InstBuilder, Value};

use super::binary_expr::expect_value;
use super::{
    Ast, NodeId, Syntax, VarDecl, codegen, detach_slot, map_slot, require_frame, required, type_of,
    validate_children,
};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::runtime;

/// `for each (Event e in cursor) { ... }`: runs the block once per event left in the cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ForEach {
    pub var_decl: Option<NodeId>,
    pub iterator: Option<NodeId>,
    pub block: Option<NodeId>,
}

impl ForEach {
    pub fn new(var_decl: NodeId, iterator: NodeId, block: NodeId) -> Self {
        Self { var_decl: Some(var_decl), iterator: Some(iterator), block: Some(block) }
    }
}

impl Syntax for ForEach {
    const TAG: &'static str = "for-each";

    fn children(&self) -> Vec<NodeId> {
        self.var_decl.into_iter().chain(self.iterator).chain(self.block).collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.var_decl, f);
        map_slot(&mut self.iterator, f);
        map_slot(&mut self.block, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.var_decl, child)
            || detach_slot(&mut self.iterator, child)
            || detach_slot(&mut self.block, child)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        let decl = required(ast, id, self.var_decl, "loop variable")?;
        let iterator = required(ast, id, self.iterator, "iterator")?;
        required(ast, id, self.block, "body")?;

        let iter_ty = type_of(ast, iterator, module)?;
        if iter_ty.name != "Cursor" {
            return Err(CompileError::semantic(
                format!("for each iterates over a Cursor, found {iter_ty}"),
                ast.diagnostic_span(iterator),
            ));
        }
        let var_ty = VarDecl::declared_type(ast, decl)?;
        if var_ty.name != "Event" {
            return Err(CompileError::semantic(
                format!("loop variable must be an Event, found {var_ty}"),
                ast.diagnostic_span(decl),
            ));
        }
        if ast.get::<VarDecl>(decl)?.initial_value.is_some() {
            return Err(CompileError::semantic(
                "loop variable cannot have an initializer",
                ast.diagnostic_span(decl),
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
        let span = ast.diagnostic_span(id);
        let decl = required(ast, id, self.var_decl, "loop variable")?;
        let iterator = required(ast, id, self.iterator, "iterator")?;
        let body = required(ast, id, self.block, "body")?;

        let event = expect_value(ast, decl, codegen(ast, decl, module, Some(&mut *frame))?)?;
        let cursor = expect_value(ast, iterator, codegen(ast, iterator, module, Some(&mut *frame))?)?;
        let eof_fn = module.codegen.runtime_function(&runtime::native_symbol("cursor", "eof"), span)?;
        let next_fn = module.codegen.runtime_function(&runtime::native_symbol("cursor", "next"), span)?;

        let header_bb = frame.builder.create_block();
        let body_bb = frame.builder.create_block();
        let exit_bb = frame.builder.create_block();

        frame.builder.ins().jump(header_bb, &[]);

        frame.builder.switch_to_block(header_bb);
        let eof = module
            .codegen
            .call(frame, eof_fn, &[cursor])?
            .ok_or_else(|| CompileError::codegen("cursor eof check returned nothing", span))?;
        frame.builder.ins().brif(eof, exit_bb, &[], body_bb, &[]);

        frame.builder.switch_to_block(body_bb);
        frame.builder.seal_block(body_bb);
        module.codegen.call(frame, next_fn, &[cursor, event])?;
        codegen(ast, body, module, Some(&mut *frame))?;
        if !frame.terminated {
            frame.builder.ins().jump(header_bb, &[]);
        }
        frame.terminated = false;

        frame.builder.seal_block(header_bb);
        frame.builder.switch_to_block(exit_bb);
        frame.builder.seal_block(exit_bb);
        Ok(None)
    }
}
