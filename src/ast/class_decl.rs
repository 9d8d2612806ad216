use std::collections::HashSet;

use cranelift_codegen::ir::Value;

use super::metadata::{HASHABLE, NATIVE};
use super::{
    Ast, Metadata, Method, NodeId, Payload, Property, Syntax, VarDecl, codegen, detach_list, map_list,
    validate_children,
};
use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::types::Type;

/// A named aggregate of properties and methods.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub name: String,
    pub metadatas: Vec<NodeId>,
    pub members: Vec<NodeId>,
}

impl ClassDecl {
    pub fn new(name: impl Into<String>, metadatas: Vec<NodeId>, members: Vec<NodeId>) -> Self {
        Self { name: name.into(), metadatas, members }
    }

    pub fn metadata<'a>(&self, ast: &'a Ast, name: &str) -> Option<&'a Metadata> {
        self.metadatas
            .iter()
            .filter_map(|&m| ast.get::<Metadata>(m).ok())
            .find(|m| m.name == name)
    }

    /// Runtime prefix from `[Native("...")]`, when the class is implemented by the runtime.
    pub fn native_name<'a>(&self, ast: &'a Ast) -> Option<&'a str> {
        self.metadata(ast, NATIVE).and_then(Metadata::arg)
    }

    /// Key property named by `[Hashable("...")]`.
    pub fn hashable_key<'a>(&self, ast: &'a Ast) -> Option<&'a str> {
        self.metadata(ast, HASHABLE).and_then(Metadata::arg)
    }

    /// Property declarations in member order, with their names.
    pub fn properties<'a>(&self, ast: &'a Ast) -> Vec<(&'a str, NodeId)> {
        self.members
            .iter()
            .filter_map(|&m| ast.get::<Property>(m).ok())
            .filter_map(|p| {
                let decl = p.var_decl?;
                Some((ast.get::<VarDecl>(decl).ok()?.name.as_str(), decl))
            })
            .collect()
    }

    /// Index and declaration of property `name`.
    pub fn property(&self, ast: &Ast, name: &str) -> Option<(usize, NodeId)> {
        self.properties(ast)
            .into_iter()
            .enumerate()
            .find(|(_, (prop, _))| *prop == name)
            .map(|(index, (_, decl))| (index, decl))
    }

    /// Function node of method `name`.
    pub fn method(&self, ast: &Ast, name: &str) -> Option<NodeId> {
        self.members
            .iter()
            .filter_map(|&m| ast.get::<Method>(m).ok())
            .find(|m| m.name(ast) == Some(name))
            .and_then(|m| m.function)
    }

    /// Native classes without properties are opaque runtime handles (`Path`, `Cursor`, `Map`).
    pub fn is_handle(&self, ast: &Ast) -> bool {
        self.native_name(ast).is_some() && self.properties(ast).is_empty()
    }

    fn member_name<'a>(ast: &'a Ast, member: NodeId) -> Option<&'a str> {
        match &ast.node(member).ok()?.payload {
            Payload::Property(p) => p.name(ast),
            Payload::Method(m) => m.name(ast),
            _ => None,
        }
    }
}

impl Syntax for ClassDecl {
    const TAG: &'static str = "class";

    fn children(&self) -> Vec<NodeId> {
        self.metadatas.iter().chain(&self.members).copied().collect()
    }

    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
        map_list(&mut self.metadatas, f);
        map_list(&mut self.members, f);
    }

    fn detach(&mut self, child: NodeId) -> bool {
        detach_list(&mut self.metadatas, child) || detach_list(&mut self.members, child)
    }

    fn dump_attrs(&self) -> String {
        format!("name='{}'", self.name)
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)?;
        let span = ast.diagnostic_span(id);

        let mut seen = HashSet::new();
        for &member in &self.members {
            if let Some(name) = ClassDecl::member_name(ast, member) {
                if !seen.insert(name) {
                    return Err(CompileError::semantic(
                        format!("class '{}' declares '{name}' more than once", self.name),
                        ast.diagnostic_span(member),
                    ));
                }
            }
        }

        if let Some(key) = self.hashable_key(ast) {
            let (_, decl) = self.property(ast, key).ok_or_else(|| {
                CompileError::semantic(format!("Hashable key '{key}' is not a property of '{}'", self.name), span)
            })?;
            let ty = VarDecl::declared_type(ast, decl)?;
            if ty != Type::int() {
                return Err(CompileError::semantic(
                    format!("Hashable key '{key}' must be Int, found {ty}"),
                    ast.diagnostic_span(decl),
                ));
            }
        }
        Ok(())
    }

    fn codegen(
        &self,
        ast: &Ast,
        _id: NodeId,
        module: &mut Module,
        _frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        for &member in &self.members {
            codegen(ast, member, module, None)?;
        }
        Ok(None)
    }
}
