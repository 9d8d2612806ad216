use cranelift_codegen::ir::Value;

use super::binary_expr::expect_value;
use super::{
    Ast, Function, NodeId, Syntax, codegen, detach_list, detach_slot, map_list, map_slot, require_frame, required,
    type_of, validate_children,
};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::runtime;
use crate::types::Type;

#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    pub target: Option<NodeId>,
    pub name: String,
    pub args: Vec<NodeId>,
}

/// What a call resolves to.
#[derive(Debug, Clone, PartialEq)]
enum Callee {
    /// `Map.get`: needs the materialized entry layout as an extra argument.
    MapGet(Type),
    /// Runtime function bound by a class's `Native` metadata.
    Native(String),
    /// Compiled method body, by its function node.
    Method(NodeId),
}

struct Signature {
    params: Vec<Type>,
    ret: Type,
    callee: Callee,
}

impl MethodCall {
    pub fn new(target: NodeId, name: impl Into<String>, args: Vec<NodeId>) -> Self {
        Self { target: Some(target), name: name.into(), args }
    }

    fn signature(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<Signature> {
        let span = ast.diagnostic_span(id);
        let target_ty = type_of(ast, required(ast, id, self.target, "target")?, module)?;
        let no_method = || CompileError::semantic(format!("{target_ty} has no method '{}'", self.name), span);

        if target_ty.name == "Map" {
            let [key, value] = target_ty.subtypes.as_slice() else {
                return Err(no_method());
            };
            return match self.name.as_str() {
                "get" => Ok(Signature {
                    params: vec![key.clone()],
                    ret: value.clone(),
                    callee: Callee::MapGet(target_ty.clone()),
                }),
                "count" => Ok(Signature {
                    params: Vec::new(),
                    ret: Type::int(),
                    callee: Callee::Native(runtime::native_symbol("map", "count")),
                }),
                _ => Err(no_method()),
            };
        }

        let class = module.class_decl(ast, &target_ty.name).ok_or_else(no_method)?;
        let function = class.method(ast, &self.name).ok_or_else(no_method)?;
        let params = ast
            .get::<Function>(function)?
            .args
            .iter()
            .map(|&arg| Function::arg_type(ast, arg))
            .collect::<CompileResult<Vec<_>>>()?;
        let ret = Function::return_type(ast, function)?;
        let callee = match class.native_name(ast) {
            Some(native) => Callee::Native(runtime::native_symbol(native, &self.name)),
            None => Callee::Method(function),
        };
        Ok(Signature { params, ret, callee })
    }
}

impl Syntax for MethodCall {
    const TAG: &'static str = "method-call";

    fn children(&self) -> Vec<NodeId> {
        self.target.into_iter().chain(self.args.iter().copied()).collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_slot(&mut self.target, f);
        map_list(&mut self.args, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_slot(&mut self.target, child) || detach_list(&mut self.args, child)
    }

    fn dump_attrs(&self) -> String {
        format!("name='{}'", self.name)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        let sig = self.signature(ast, id, module)?;
        if sig.params.len() != self.args.len() {
            return Err(CompileError::semantic(
                format!(
                    "method '{}' takes {} argument(s) but {} were given",
                    self.name,
                    sig.params.len(),
                    self.args.len()
                ),
                ast.diagnostic_span(id),
            ));
        }
        for (&arg, expected) in self.args.iter().zip(&sig.params) {
            let found = type_of(ast, arg, module)?;
            if found != *expected {
                return Err(CompileError::semantic(
                    format!("argument of '{}' must be {expected}, found {found}", self.name),
                    ast.diagnostic_span(arg),
                ));
            }
        }
        Ok(())
    }

    fn type_of(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<Type> {
        Ok(self.signature(ast, id, module)?.ret)
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
        let sig = self.signature(ast, id, module)?;
        let target = required(ast, id, self.target, "target")?;

        let mut args = Vec::with_capacity(self.args.len() + 2);
        args.push(expect_value(ast, target, codegen(ast, target, module, Some(&mut *frame))?)?);
        for &arg in &self.args {
            args.push(expect_value(ast, arg, codegen(ast, arg, module, Some(&mut *frame))?)?);
        }

        let func = match &sig.callee {
            Callee::MapGet(map_ty) => {
                let data = module.instantiate_map(ast, map_ty, span)?;
                let layout = module.codegen.data_address(frame, data)?;
                args.push(layout);
                module.codegen.runtime_function(&runtime::native_symbol("map", "get"), span)?
            }
            Callee::Native(symbol) => module.codegen.runtime_function(symbol, span)?,
            Callee::Method(function) => Function::declare(ast, *function, module)?,
        };
        let result = module.codegen.call(frame, func, &args)?;
        if sig.ret.is_void() {
            return Ok(None);
        }
        result
            .map(Some)
            .ok_or_else(|| CompileError::codegen(format!("call to '{}' returned nothing", self.name), span))
    }
}
