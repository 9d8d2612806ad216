use std::sync::OnceLock;

use indexmap::IndexMap;

use crate::ast::{Ast, ClassDecl, NodeId, Program};
use crate::diagnostics::{CompileError, CompileResult};

const PRELUDE_SOURCE: &str = include_str!("../stdlib/prelude.eql");

/// Previously compiled native class definitions, parsed once per process.
///
/// Classes are copied into a compilation's own tree on first reference.
#[derive(Debug)]
pub struct ClassLibrary {
    ast: Ast,
    classes: IndexMap<String, NodeId>,
}

impl ClassLibrary {
    pub fn parse(source: &str) -> CompileResult<Self> {
        let (ast, root) = crate::parser::parse_program(source)?;
        let mut classes = IndexMap::new();
        for &class in &ast.get::<Program>(root)?.classes {
            classes.insert(ast.get::<ClassDecl>(class)?.name.clone(), class);
        }
        Ok(Self { ast, classes })
    }

    pub fn ast(&self) -> &Ast {
        &self.ast
    }

    pub fn class(&self, name: &str) -> Option<NodeId> {
        self.classes.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.classes.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }
}

static LIBRARY: OnceLock<Result<ClassLibrary, CompileError>> = OnceLock::new();

/// The built-in class library. Cached.
pub fn library() -> CompileResult<&'static ClassLibrary> {
    LIBRARY
        .get_or_init(|| ClassLibrary::parse(PRELUDE_SOURCE))
        .as_ref()
        .map_err(|e| CompileError::internal(format!("built-in class library failed to parse: {e}")))
}
