//! Dependency resolution and class loading.
//!
//! Classes the program declares are registered first, referenced or not.
//! Every other class name referenced by a type reference is located, first among
//! the program's own declarations and then in the class library, and
//! registered in the module. A class is marked `Loading` before its own
//! references are followed, so cycles and repeated names terminate.

use super::Module;
use crate::ast::{self, Ast, ClassDecl, NodeId, Program};
use crate::diagnostics::{CompileError, CompileResult};
use crate::prelude;
use crate::span::Spanned;

/// Load every class the program depends on. Returns how many classes were newly loaded.
#[tracing::instrument(level = "debug", skip_all)]
pub fn resolve(ast: &mut Ast, program: NodeId, module: &mut Module) -> CompileResult<usize> {
    let declared: Vec<_> = ast
        .get::<Program>(program)?
        .classes
        .iter()
        .filter_map(|&c| {
            let class = ast.get::<ClassDecl>(c).ok()?;
            Some(Spanned::new(class.name.clone(), ast.diagnostic_span(c)))
        })
        .collect();
    let mut loaded = 0;
    for class in &declared {
        loaded += load_class(ast, program, module, class)?;
    }

    let mut deps = Vec::new();
    ast::dependencies(ast, program, &mut deps);
    for dep in &deps {
        loaded += load_class(ast, program, module, dep)?;
    }
    tracing::debug!(loaded, total = module.class_count(), "resolved dependencies");
    Ok(loaded)
}

fn load_class(ast: &mut Ast, program: NodeId, module: &mut Module, name: &Spanned<String>) -> CompileResult<usize> {
    if module.state(&name.node).is_some() {
        return Ok(0);
    }

    let decl = match ast.get::<Program>(program)?.class(ast, &name.node) {
        Some(decl) => decl,
        None => import_library_class(ast, program, module, name)?,
    };
    module.begin_loading(&name.node, decl);
    tracing::trace!(class = %name.node, "loading class");

    let mut deps = Vec::new();
    ast::dependencies(ast, decl, &mut deps);
    let mut loaded = 1;
    for dep in &deps {
        loaded += load_class(ast, program, module, dep)?;
    }
    module.finish_loading(&name.node);
    Ok(loaded)
}

/// Copy a class out of the library into this tree, attach it to the program and preprocess it.
fn import_library_class(
    ast: &mut Ast,
    program: NodeId,
    module: &mut Module,
    name: &Spanned<String>,
) -> CompileResult<NodeId> {
    let library = prelude::library()?;
    let source = library
        .class(&name.node)
        .ok_or_else(|| CompileError::resolution(name.node.clone(), name.span))?;
    let decl = ast.import(library.ast(), source)?;
    ast.adopt::<Program>(program, decl, |p, c| p.classes.push(c))?;
    ast::preprocess(ast, decl, module)?;
    Ok(decl)
}
