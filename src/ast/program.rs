use cranelift_codegen::ir::Value;

use super::{
    Ast, ClassDecl, Function, Method, NodeId, Syntax, codegen, detach_list, detach_slot, map_list, map_slot,
    preprocess_children, required,
};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::prelude;

/// Root of a query: its class declarations and the implicit `main` holding the top-level statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub classes: Vec<NodeId>,
    pub main: Option<NodeId>,
}

impl Program {
    pub fn new(classes: Vec<NodeId>, main: NodeId) -> Self {
        Self { classes, main: Some(main) }
    }

    /// Class declared in this program under `name`.
    pub fn class(&self, ast: &Ast, name: &str) -> Option<NodeId> {
        self.classes
            .iter()
            .copied()
            .find(|&c| ast.get::<ClassDecl>(c).is_ok_and(|class| class.name == name))
    }

    /// Function nodes of every method with a body, across all classes.
    fn method_bodies(&self, ast: &Ast) -> Vec<NodeId> {
        self.classes
            .iter()
            .filter_map(|&c| ast.get::<ClassDecl>(c).ok())
            .flat_map(|class| class.members.iter().copied())
            .filter_map(|m| ast.get::<Method>(m).ok().and_then(|m| m.function))
            .filter(|&f| ast.get::<Function>(f).is_ok_and(|f| f.body.is_some()))
            .collect()
    }
}

impl Syntax for Program {
    const TAG: &'static str = "program";

    fn children(&self) -> Vec<NodeId> {
        self.classes.iter().copied().chain(self.main).collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_list(&mut self.classes, f);
        map_slot(&mut self.main, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_list(&mut self.classes, child) || detach_slot(&mut self.main, child)
    }

    fn preprocess(ast: &mut Ast, id: NodeId, module: &mut Module) -> CompileResult<()> {
        let library = prelude::library()?;
        for &class in &ast.get::<Program>(id)?.classes {
            let decl = ast.get::<ClassDecl>(class)?;
            if library.contains(&decl.name) {
                return Err(CompileError::semantic(
                    format!("class '{}' redefines a built-in class", decl.name),
                    ast.diagnostic_span(class),
                ));
            }
        }
        preprocess_children(ast, id, module)
    }

    /// Lays out every class, declares all function symbols, then defines the bodies.
    fn codegen(
        &self,
        ast: &Ast,
        id: NodeId,
        module: &mut Module,
        frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        if frame.is_some() {
            return Err(CompileError::internal_at("program inside a function body", ast.diagnostic_span(id)));
        }
        let main = required(ast, id, self.main, "main function")?;

        for &class in &self.classes {
            module.codegen.layout(ast, class)?;
        }
        for function in self.method_bodies(ast) {
            Function::declare(ast, function, module)?;
        }
        let main_id = Function::declare(ast, main, module)?;
        module.codegen.set_main(main_id);

        for &class in &self.classes {
            codegen(ast, class, module, None)?;
        }
        codegen(ast, main, module, None)?;
        Ok(None)
    }
}
