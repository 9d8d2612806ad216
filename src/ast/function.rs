use cranelift_codegen::ir::{AbiParam, InstBuilder, Signature, TrapCode, Value, types};
use cranelift_frontend::{FunctionBuilder, FunctionBuilderContext};
use cranelift_module::{FuncId, Linkage};

use super::infer::infer;
use super::{
    Ast, Block, ClassDecl, FArg, IfStmt, NodeId, NodeKind, Payload, ReturnStmt, Syntax, TypeRef, VarDecl, codegen, detach_list,
    detach_slot, map_list, map_slot, preprocess_children, required, scope, validate_children,
};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::span::Span;
use crate::types::Type;

pub const MAIN: &str = "main";

/// A function: the implicit `main` of a query, or the body of a method.
///
/// Methods without a body belong to native classes and are bound to runtime
/// functions instead of being compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub name: String,
    pub args: Vec<NodeId>,
    pub return_type: Option<NodeId>,
    pub body: Option<NodeId>,
}

impl Function {
    pub fn new(name: impl Into<String>, args: Vec<NodeId>, return_type: Option<NodeId>, body: Option<NodeId>) -> Self {
        Self { name: name.into(), args, return_type, body }
    }

    pub fn arg_type(ast: &Ast, arg: NodeId) -> CompileResult<Type> {
        let decl = required(ast, arg, ast.get::<FArg>(arg)?.var_decl, "variable declaration")?;
        VarDecl::declared_type(ast, decl)
    }

    pub fn return_type(ast: &Ast, id: NodeId) -> CompileResult<Type> {
        let function = ast.get::<Function>(id)?;
        match function.return_type {
            Some(type_ref) => TypeRef::resolve(ast, type_ref),
            None => Err(CompileError::semantic(
                format!("return type of '{}' is not known yet", function.name),
                ast.diagnostic_span(id),
            )),
        }
    }

    /// Class owning this function when it is a method body.
    pub fn owner(ast: &Ast, id: NodeId) -> Option<String> {
        let parent = ast.parent(id)?;
        if ast.kind(parent).ok()? != NodeKind::Method {
            return None;
        }
        scope::enclosing_class(ast, id)
    }

    /// Symbol the function is compiled under: `main`, or `Class.method`.
    pub fn symbol(ast: &Ast, id: NodeId) -> CompileResult<String> {
        let name = &ast.get::<Function>(id)?.name;
        Ok(match Function::owner(ast, id) {
            Some(class) => format!("{class}.{name}"),
            None => name.clone(),
        })
    }

    /// Machine signature: the receiver pointer for methods, then the declared arguments.
    pub fn signature(ast: &Ast, id: NodeId, module: &mut Module) -> CompileResult<Signature> {
        let span = ast.diagnostic_span(id);
        let mut sig = module.codegen.make_signature()?;
        if Function::owner(ast, id).is_some() {
            sig.params.push(AbiParam::new(types::I64));
        }
        for &arg in &ast.get::<Function>(id)?.args {
            let ty = Function::arg_type(ast, arg)?;
            let abi = ty
                .abi()
                .ok_or_else(|| CompileError::codegen(format!("argument of type {ty} has no storage"), span))?;
            sig.params.push(AbiParam::new(abi));
        }
        if let Some(abi) = Function::return_type(ast, id)?.abi() {
            sig.returns.push(AbiParam::new(abi));
        }
        Ok(sig)
    }

    /// Declare the function with the backend, once.
    pub fn declare(ast: &Ast, id: NodeId, module: &mut Module) -> CompileResult<FuncId> {
        if let Some(func_id) = module.codegen.function(id) {
            return Ok(func_id);
        }
        let symbol = Function::symbol(ast, id)?;
        let sig = Function::signature(ast, id, module)?;
        let linkage = if Function::owner(ast, id).is_some() { Linkage::Local } else { Linkage::Export };
        module.codegen.declare_function(id, &symbol, linkage, &sig, ast.diagnostic_span(id))
    }

    /// Whether control cannot fall off the end of `stmt`.
    pub fn ends_in_return(ast: &Ast, stmt: NodeId) -> bool {
        match ast.node(stmt).map(|n| &n.payload) {
            Ok(Payload::Return(_)) => true,
            Ok(Payload::Block(Block { stmts })) => {
                stmts.last().is_some_and(|&last| Function::ends_in_return(ast, last))
            }
            Ok(Payload::If(IfStmt { then_block: Some(then_block), else_branch: Some(else_branch), .. })) => {
                Function::ends_in_return(ast, *then_block) && Function::ends_in_return(ast, *else_branch)
            }
            _ => false,
        }
    }

    fn first_return_value(ast: &Ast, body: NodeId) -> Option<NodeId> {
        ast.descendants(body)
            .into_iter()
            .find_map(|id| ast.get::<ReturnStmt>(id).ok().and_then(|ret| ret.value))
    }
}

impl Syntax for Function {
    const TAG: &'static str = "function";

    fn children(&self) -> Vec<NodeId> {
        self.args.iter().copied().chain(self.return_type).chain(self.body).collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_list(&mut self.args, f);
        map_slot(&mut self.return_type, f);
        map_slot(&mut self.body, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_list(&mut self.args, child)
            || detach_slot(&mut self.return_type, child)
            || detach_slot(&mut self.body, child)
    }

    fn dump_attrs(&self) -> String {
        format!("name='{}'", self.name)
    }

    /// Infers a missing return type and closes Void bodies with a generated `return;`.
    fn preprocess(ast: &mut Ast, id: NodeId, module: &mut Module) -> CompileResult<()> {
        preprocess_children(ast, id, module)?;
        let (return_type, body) = {
            let function = ast.get::<Function>(id)?;
            (function.return_type, function.body)
        };
        let Some(body) = body else {
            return Ok(());
        };

        let ret = match return_type {
            Some(type_ref) => TypeRef::resolve(ast, type_ref)?,
            None => {
                let ty = match Function::first_return_value(ast, body) {
                    Some(value) => infer(ast, value).ok_or_else(|| {
                        CompileError::semantic(
                            "cannot infer the return type from this expression",
                            ast.diagnostic_span(value),
                        )
                    })?,
                    None => Type::void(),
                };
                let type_ref = TypeRef::synthesize_from(ast, &ty, Span::dummy())?;
                ast.adopt::<Function>(id, type_ref, |f, t| f.return_type = Some(t))?;
                ty
            }
        };

        if ret.is_void() && !Function::ends_in_return(ast, body) {
            let implicit = ast.synthesize(ReturnStmt::new(None), Span::dummy())?;
            ast.adopt::<Block>(body, implicit, |block, r| block.stmts.push(r))?;
        }
        Ok(())
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        let span = ast.diagnostic_span(id);
        let ret = Function::return_type(ast, id)?;
        match self.body {
            Some(body) if !ret.is_void() && !Function::ends_in_return(ast, body) => Err(CompileError::semantic(
                format!("'{}' must end with a return of type {ret}", self.name),
                span,
            )),
            Some(_) => Ok(()),
            None => {
                let native = scope::enclosing(ast, id, NodeKind::ClassDecl)
                    .and_then(|class| ast.get::<ClassDecl>(class).ok())
                    .is_some_and(|class| class.native_name(ast).is_some());
                if native {
                    Ok(())
                } else {
                    Err(CompileError::semantic(
                        format!("'{}' needs a body; only native classes declare bodiless methods", self.name),
                        span,
                    ))
                }
            }
        }
    }

    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let span = ast.diagnostic_span(id);
        if frame.is_some() {
            return Err(CompileError::internal_at("nested function definition", span));
        }
        let Some(body) = self.body else {
            return Ok(None);
        };
        let func_id = Function::declare(ast, id, module)?;
        let ret = Function::return_type(ast, id)?;
        let is_method = Function::owner(ast, id).is_some();

        let mut ctx = module.codegen.make_context()?;
        ctx.func.signature = Function::signature(ast, id, module)?;
        let mut fn_ctx = FunctionBuilderContext::new();
        let mut builder = FunctionBuilder::new(&mut ctx.func, &mut fn_ctx);
        let entry = builder.create_block();
        builder.append_block_params_for_function_params(entry);
        builder.switch_to_block(entry);
        builder.seal_block(entry);
        let params = builder.block_params(entry).to_vec();

        let mut frame = Frame::new(builder, ret.clone());
        let mut params = params.into_iter();
        if is_method {
            frame.this = params.next();
        }
        for (&arg, value) in self.args.iter().zip(params) {
            let decl = required(ast, arg, ast.get::<FArg>(arg)?.var_decl, "variable declaration")?;
            frame.bind_param(decl, value);
        }
        for &arg in &self.args {
            codegen(ast, arg, module, Some(&mut frame))?;
        }
        codegen(ast, body, module, Some(&mut frame))?;
        if !frame.terminated {
            if ret.is_void() {
                frame.builder.ins().return_(&[]);
            } else {
                frame.builder.ins().trap(TrapCode::unwrap_user(1));
            }
        }
        frame.finish();

        module.codegen.define_function(func_id, &mut ctx, span)?;
        tracing::debug!(function = %self.name, "defined function");
        Ok(None)
    }
}
