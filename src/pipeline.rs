//! The compilation pipeline: parse, preprocess, resolve, validate, codegen.
//!
//! Each phase is one walk over the tree rooted at the program. A failure in any
//! phase aborts the ones after it; dropping the [`Compilation`] releases the
//! tree and every backend resource allocated so far.

use indexmap::IndexMap;

use crate::artifact::CompiledQuery;
use crate::ast::{self, Ast, FArg, Function, NodeId, Program, VarDecl};
use crate::config::CompilerConfig;
use crate::diagnostics::CompileResult;
use crate::module::{self, Module};
use crate::parser;

pub struct Compilation {
    pub ast: Ast,
    pub root: NodeId,
    pub module: Module,
}

impl Compilation {
    /// Parse `source` and attach the caller-supplied `params` as arguments of `main`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn parse(source: &str, params: &str, config: &CompilerConfig) -> CompileResult<Self> {
        let (mut ast, root) = parser::parse_program(source)?;
        let main = main_of(&ast, root)?;
        for arg in parser::parse_params(&mut ast, params)? {
            ast.adopt::<Function>(main, arg, |f, a| f.args.push(a))?;
        }
        let module = Module::new(config)?;
        tracing::debug!(nodes = ast.len(), "parsed query");
        Ok(Self { ast, root, module })
    }

    pub fn main(&self) -> CompileResult<NodeId> {
        main_of(&self.ast, self.root)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn preprocess(&mut self) -> CompileResult<()> {
        ast::preprocess(&mut self.ast, self.root, &mut self.module)
    }

    /// Load every class the program depends on. Returns how many were loaded.
    pub fn resolve(&mut self) -> CompileResult<usize> {
        module::resolve(&mut self.ast, self.root, &mut self.module)
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn validate(&self) -> CompileResult<()> {
        ast::validate(&self.ast, self.root, &self.module)
    }

    /// Run every phase before code generation.
    pub fn analyze(&mut self) -> CompileResult<()> {
        self.preprocess()?;
        self.resolve()?;
        self.validate()
    }

    /// Generate native code for the whole program and finalize it.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn codegen(mut self) -> CompileResult<CompiledQuery> {
        ast::codegen(&self.ast, self.root, &mut self.module, None)?;

        let main = self.main()?;
        let mut params = Vec::new();
        for &arg in &self.ast.get::<Function>(main)?.args {
            let decl = ast::required(&self.ast, arg, self.ast.get::<FArg>(arg)?.var_decl, "variable declaration")?;
            let name = self.ast.get::<VarDecl>(decl)?.name.clone();
            params.push((name, Function::arg_type(&self.ast, arg)?));
        }
        let return_type = Function::return_type(&self.ast, main)?;

        let codegen = &mut self.module.codegen;
        let layouts: IndexMap<_, _> = codegen.layouts().map(|l| (l.name.clone(), l.clone())).collect();
        let instantiations = codegen.instantiations().map(|i| i.ty.clone()).collect();
        let (jit, entry) = codegen.finish()?;
        Ok(CompiledQuery::new(jit, entry, params, return_type, layouts, instantiations))
    }
}

fn main_of(ast: &Ast, root: NodeId) -> CompileResult<NodeId> {
    ast::required(ast, root, ast.get::<Program>(root)?.main, "main function")
}
