//! Arena-backed syntax tree and the protocol every node kind implements.
//!
//! Nodes live in an [`Ast`] and refer to their children by [`NodeId`]. Each
//! kind is a plain struct implementing [`Syntax`]; the `node_kinds!` table at
//! the bottom of this file generates the [`Payload`] sum type and the
//! dispatcher functions (`preprocess`, `validate`, `codegen`, ...) that route a
//! node id to its kind's implementation.

pub mod binary_expr;
pub mod block;
pub mod class_decl;
pub mod farg;
pub mod field_access;
pub mod for_each;
pub mod function;
pub mod if_stmt;
pub mod infer;
pub mod literal;
pub mod metadata;
pub mod method;
pub mod method_call;
pub mod program;
pub mod property;
pub mod return_stmt;
pub mod scope;
pub mod type_ref;
pub mod var_assign;
pub mod var_decl;
pub mod var_ref;

use std::collections::{HashMap, HashSet};
use std::fmt;

use cranelift_codegen::ir::Value;

use crate::codegen::Frame;
use crate::diagnostics::{CompileError, CompileResult};
use crate::module::Module;
use crate::span::{Span, Spanned};
use crate::types::Type;

pub use binary_expr::{BinaryExpr, BinaryOp};
pub use block::Block;
pub use class_decl::ClassDecl;
pub use farg::FArg;
pub use field_access::FieldAccess;
pub use for_each::ForEach;
pub use function::Function;
pub use if_stmt::IfStmt;
pub use literal::{Literal, LiteralValue};
pub use metadata::Metadata;
pub use method::{Access, Method};
pub use method_call::MethodCall;
pub use program::Program;
pub use property::Property;
pub use return_stmt::ReturnStmt;
pub use type_ref::TypeRef;
pub use var_assign::VarAssign;
pub use var_decl::VarDecl;
pub use var_ref::VarRef;

/// Handle to a node inside one [`Ast`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub span: Span,
    /// Set on nodes the compiler synthesized rather than parsed.
    pub generated: bool,
    pub payload: Payload,
}

/// Owns every node of one compilation. Slots of freed nodes are never reused.
#[derive(Debug, Clone, Default)]
pub struct Ast {
    nodes: Vec<Option<Node>>,
    live: usize,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn contains(&self, id: NodeId) -> bool {
        matches!(self.nodes.get(id.index()), Some(Some(_)))
    }

    pub fn node(&self, id: NodeId) -> CompileResult<&Node> {
        self.nodes
            .get(id.index())
            .and_then(Option::as_ref)
            .ok_or_else(|| CompileError::internal(format!("dangling node handle {id}")))
    }

    fn node_mut(&mut self, id: NodeId) -> CompileResult<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or_else(|| CompileError::internal(format!("dangling node handle {id}")))
    }

    pub fn kind(&self, id: NodeId) -> CompileResult<NodeKind> {
        Ok(self.node(id)?.payload.kind())
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).ok().and_then(|n| n.parent)
    }

    pub fn span(&self, id: NodeId) -> Span {
        self.node(id).map(|n| n.span).unwrap_or_default()
    }

    pub fn is_generated(&self, id: NodeId) -> bool {
        self.node(id).map(|n| n.generated).unwrap_or(false)
    }

    /// Span to report for `id`: its own, or that of the nearest parsed ancestor when it was synthesized.
    pub fn diagnostic_span(&self, id: NodeId) -> Span {
        let mut cur = Some(id);
        while let Some(c) = cur {
            match self.node(c) {
                Ok(node) if !node.generated && !node.span.is_dummy() => return node.span,
                Ok(node) => cur = node.parent,
                Err(_) => break,
            }
        }
        self.span(id)
    }

    pub fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.node(id).map(|n| n.payload.children()).unwrap_or_default()
    }

    pub fn get<T: Syntax>(&self, id: NodeId) -> CompileResult<&T> {
        let node = self.node(id)?;
        T::from_payload(&node.payload).ok_or_else(|| {
            CompileError::internal_at(
                format!("expected {} node, found {}", T::TAG, node.payload.tag()),
                node.span,
            )
        })
    }

    pub fn get_mut<T: Syntax>(&mut self, id: NodeId) -> CompileResult<&mut T> {
        let node = self.node_mut(id)?;
        let found = node.payload.tag();
        let span = node.span;
        T::from_payload_mut(&mut node.payload).ok_or_else(|| {
            CompileError::internal_at(format!("expected {} node, found {found}", T::TAG), span)
        })
    }

    /// Add a parsed node. Every child handle must be live and not yet owned.
    pub fn create<T: Syntax>(&mut self, payload: T, span: Span) -> CompileResult<NodeId> {
        self.insert(payload.into(), span, false)
    }

    /// Add a compiler-synthesized node.
    pub fn synthesize<T: Syntax>(&mut self, payload: T, span: Span) -> CompileResult<NodeId> {
        self.insert(payload.into(), span, true)
    }

    fn insert(&mut self, payload: Payload, span: Span, generated: bool) -> CompileResult<NodeId> {
        let children = payload.children();
        let mut seen = HashSet::with_capacity(children.len());
        for &child in &children {
            let node = self.node(child)?;
            if node.parent.is_some() || !seen.insert(child) {
                return Err(CompileError::internal_at(
                    format!("{} child {child} already has an owner", payload.tag()),
                    span,
                ));
            }
        }
        let index = u32::try_from(self.nodes.len())
            .map_err(|_| CompileError::internal_at("syntax tree is full", span))?;
        let id = NodeId(index);
        self.nodes.push(Some(Node { parent: None, span, generated, payload }));
        self.live += 1;
        for child in children {
            self.node_mut(child)?.parent = Some(id);
        }
        Ok(id)
    }

    /// Attach an unowned `child` to `parent` through `attach`, which stores the handle in the payload.
    pub fn adopt<T: Syntax>(
        &mut self,
        parent: NodeId,
        child: NodeId,
        attach: impl FnOnce(&mut T, NodeId),
    ) -> CompileResult<()> {
        if self.node(child)?.parent.is_some() {
            return Err(CompileError::internal_at(
                format!("node {child} already has an owner"),
                self.span(child),
            ));
        }
        attach(self.get_mut::<T>(parent)?, child);
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Free `id` and everything it owns. Detaches it from its parent first; absent slots are skipped.
    pub fn free(&mut self, id: NodeId) {
        if let Some(parent) = self.parent(id) {
            if let Ok(owner) = self.node_mut(parent) {
                owner.payload.detach(id);
            }
        }
        self.free_subtree(id);
    }

    fn free_subtree(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
            return;
        };
        self.live -= 1;
        for child in node.payload.children() {
            self.free_subtree(child);
        }
    }

    /// Clone the subtree at `id` within this arena. The copy is unowned.
    pub fn deep_copy(&mut self, id: NodeId) -> CompileResult<NodeId> {
        self.copy_subtree(None, id)
    }

    /// Clone the subtree at `id` of another arena into this one.
    pub fn import(&mut self, other: &Ast, id: NodeId) -> CompileResult<NodeId> {
        self.copy_subtree(Some(other), id)
    }

    fn copy_subtree(&mut self, source: Option<&Ast>, id: NodeId) -> CompileResult<NodeId> {
        let (mut payload, span, generated) = {
            let node = match source {
                Some(src) => src.node(id)?,
                None => self.node(id)?,
            };
            (node.payload.clone(), node.span, node.generated)
        };

        let mut copies: Vec<NodeId> = Vec::new();
        let mut mapping = HashMap::new();
        for child in payload.children() {
            match self.copy_subtree(source, child) {
                Ok(copy) => {
                    mapping.insert(child, copy);
                    copies.push(copy);
                }
                Err(err) => {
                    for copy in copies {
                        self.free(copy);
                    }
                    return Err(err);
                }
            }
        }
        payload.map_children(&mut |old| mapping.get(&old).copied().unwrap_or(old));

        match self.insert(payload, span, generated) {
            Ok(id) => Ok(id),
            Err(err) => {
                for copy in copies {
                    self.free_subtree(copy);
                }
                Err(err)
            }
        }
    }

    /// Check the ownership invariants of the subtree rooted at `root`.
    pub fn verify(&self, root: NodeId) -> CompileResult<()> {
        let mut seen = HashSet::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                return Err(CompileError::internal(format!("node {id} is owned twice")));
            }
            let node = self.node(id)?;
            for child in node.payload.children() {
                let child_node = self.node(child)?;
                if child_node.parent != Some(id) {
                    return Err(CompileError::internal(format!(
                        "node {child} is a child of {id} but its parent link is {:?}",
                        child_node.parent
                    )));
                }
                stack.push(child);
            }
        }
        Ok(())
    }

    /// Textual debug rendering of the subtree at `id`.
    pub fn dump(&self, id: NodeId) -> String {
        let mut out = String::new();
        dump(self, id, &mut out, 0);
        out
    }

    /// Every node id in the subtree rooted at `root`, parents before children.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !self.contains(id) {
                continue;
            }
            out.push(id);
            let mut children = self.children(id);
            children.reverse();
            stack.extend(children);
        }
        out
    }
}

/// Access to one variant of [`Payload`]. Implemented by `node_kinds!`.
pub trait Variant: Sized {
    const KIND: NodeKind;
    fn from_payload(payload: &Payload) -> Option<&Self>;
    fn from_payload_mut(payload: &mut Payload) -> Option<&mut Self>;
}

/// The contract every node kind satisfies.
///
/// Child-visiting defaults walk `children()` in its fixed order, so a kind
/// only overrides the operations where it contributes something itself.
pub trait Syntax: Variant + Clone + Into<Payload> {
    /// Tag used by `dump` and in diagnostics.
    const TAG: &'static str;

    /// Owned children in their fixed order.
    fn children(&self) -> Vec<NodeId>;

    /// Rewrite every child handle in place, in `children()` order.
    fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId);

    /// Drop the slot holding `child`. Returns false if it is not a child.
    fn detach(&mut self, child: NodeId) -> bool;

    fn dump_attrs(&self) -> String {
        String::new()
    }

    fn preprocess(ast: &mut Ast, id: NodeId, module: &mut Module) -> CompileResult<()> {
        preprocess_children(ast, id, module)
    }

    fn type_refs(&self, ast: &Ast, _id: NodeId, out: &mut Vec<NodeId>) {
        for child in self.children() {
            type_refs(ast, child, out);
        }
    }

    fn dependencies(&self, ast: &Ast, _id: NodeId, out: &mut Vec<Spanned<String>>) {
        for child in self.children() {
            dependencies(ast, child, out);
        }
    }

    fn validate(&self, ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
        validate_children(ast, id, module)
    }

    fn type_of(&self, ast: &Ast, id: NodeId, _module: &Module) -> CompileResult<Type> {
        Err(CompileError::internal_at(
            format!("{} is not an expression", Self::TAG),
            ast.diagnostic_span(id),
        ))
    }

    fn codegen(
        &self,
        ast: &Ast,
        _id: NodeId,
        module: &mut Module,
        mut frame: Option<&mut Frame<'_>>,
    ) -> CompileResult<Option<Value>> {
        let mut last = None;
        for child in self.children() {
            last = codegen(ast, child, module, frame.as_deref_mut())?;
        }
        Ok(last)
    }
}

pub fn preprocess_children(ast: &mut Ast, id: NodeId, module: &mut Module) -> CompileResult<()> {
    for child in ast.children(id) {
        preprocess(ast, child, module)?;
    }
    Ok(())
}

pub fn validate_children(ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
    for child in ast.children(id) {
        validate(ast, child, module)?;
    }
    Ok(())
}

/// Child that must be present once parsing is done.
pub(crate) fn required(ast: &Ast, owner: NodeId, slot: Option<NodeId>, what: &str) -> CompileResult<NodeId> {
    slot.ok_or_else(|| {
        let tag = ast.node(owner).map(|n| n.payload.tag()).unwrap_or("node");
        CompileError::internal_at(format!("{tag} has no {what}"), ast.diagnostic_span(owner))
    })
}

/// Frame of the function being compiled, or an internal error for statements outside one.
pub(crate) fn require_frame<'f, 'a>(
    ast: &Ast,
    id: NodeId,
    frame: Option<&'f mut Frame<'a>>,
) -> CompileResult<&'f mut Frame<'a>> {
    frame.ok_or_else(|| {
        CompileError::internal_at("statement outside of a function body", ast.diagnostic_span(id))
    })
}

pub(crate) fn detach_slot(slot: &mut Option<NodeId>, child: NodeId) -> bool {
    if *slot == Some(child) {
        *slot = None;
        true
    } else {
        false
    }
}

pub(crate) fn detach_list(list: &mut Vec<NodeId>, child: NodeId) -> bool {
    let before = list.len();
    list.retain(|&c| c != child);
    list.len() != before
}

pub(crate) fn map_slot(slot: &mut Option<NodeId>, f: &mut dyn FnMut(NodeId) -> NodeId) {
    if let Some(c) = slot {
        *c = f(*c);
    }
}

pub(crate) fn map_list(list: &mut [NodeId], f: &mut dyn FnMut(NodeId) -> NodeId) {
    for c in list {
        *c = f(*c);
    }
}

pub fn dump(ast: &Ast, id: NodeId, out: &mut String, depth: usize) {
    let Ok(node) = ast.node(id) else {
        return;
    };
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push('<');
    out.push_str(node.payload.tag());
    let attrs = node.payload.dump_attrs();
    if !attrs.is_empty() {
        out.push(' ');
        out.push_str(&attrs);
    }
    out.push_str(">\n");
    for child in node.payload.children() {
        dump(ast, child, out, depth + 1);
    }
}

macro_rules! node_kinds {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        #[derive(Debug, Clone, PartialEq)]
        pub enum Payload {
            $($variant($ty)),*
        }

        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum NodeKind {
            $($variant),*
        }

        $(
            impl From<$ty> for Payload {
                fn from(node: $ty) -> Self {
                    Payload::$variant(node)
                }
            }

            impl Variant for $ty {
                const KIND: NodeKind = NodeKind::$variant;

                fn from_payload(payload: &Payload) -> Option<&Self> {
                    match payload {
                        Payload::$variant(node) => Some(node),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }

                fn from_payload_mut(payload: &mut Payload) -> Option<&mut Self> {
                    match payload {
                        Payload::$variant(node) => Some(node),
                        #[allow(unreachable_patterns)]
                        _ => None,
                    }
                }
            }
        )*

        impl Payload {
            pub fn kind(&self) -> NodeKind {
                match self {
                    $(Payload::$variant(_) => NodeKind::$variant),*
                }
            }

            pub fn tag(&self) -> &'static str {
                match self {
                    $(Payload::$variant(_) => <$ty as Syntax>::TAG),*
                }
            }

            pub fn children(&self) -> Vec<NodeId> {
                match self {
                    $(Payload::$variant(node) => node.children()),*
                }
            }

            fn map_children(&mut self, f: &mut dyn FnMut(NodeId) -> NodeId) {
                match self {
                    $(Payload::$variant(node) => node.map_children(f)),*
                }
            }

            fn detach(&mut self, child: NodeId) -> bool {
                match self {
                    $(Payload::$variant(node) => node.detach(child)),*
                }
            }

            fn dump_attrs(&self) -> String {
                match self {
                    $(Payload::$variant(node) => node.dump_attrs()),*
                }
            }
        }

        pub fn preprocess(ast: &mut Ast, id: NodeId, module: &mut Module) -> CompileResult<()> {
            match ast.kind(id)? {
                $(NodeKind::$variant => <$ty as Syntax>::preprocess(ast, id, module)),*
            }
        }

        /// Collect every type reference in the subtree, outermost first.
        pub fn type_refs(ast: &Ast, id: NodeId, out: &mut Vec<NodeId>) {
            let Ok(node) = ast.node(id) else { return };
            match &node.payload {
                $(Payload::$variant(n) => n.type_refs(ast, id, out)),*
            }
        }

        /// Collect the class names the subtree depends on, with the position that names them.
        pub fn dependencies(ast: &Ast, id: NodeId, out: &mut Vec<Spanned<String>>) {
            let Ok(node) = ast.node(id) else { return };
            match &node.payload {
                $(Payload::$variant(n) => n.dependencies(ast, id, out)),*
            }
        }

        pub fn validate(ast: &Ast, id: NodeId, module: &Module) -> CompileResult<()> {
            match &ast.node(id)?.payload {
                $(Payload::$variant(n) => n.validate(ast, id, module)),*
            }
        }

        pub fn type_of(ast: &Ast, id: NodeId, module: &Module) -> CompileResult<Type> {
            match &ast.node(id)?.payload {
                $(Payload::$variant(n) => n.type_of(ast, id, module)),*
            }
        }

        pub fn codegen(
            ast: &Ast,
            id: NodeId,
            module: &mut Module,
            frame: Option<&mut Frame<'_>>,
        ) -> CompileResult<Option<Value>> {
            match &ast.node(id)?.payload {
                $(Payload::$variant(n) => n.codegen(ast, id, module, frame)),*
            }
        }
    };
}

node_kinds! {
    TypeRef(TypeRef),
    VarDecl(VarDecl),
    FArg(FArg),
    Literal(Literal),
    BinaryExpr(BinaryExpr),
    VarRef(VarRef),
    FieldAccess(FieldAccess),
    MethodCall(MethodCall),
    VarAssign(VarAssign),
    Block(Block),
    If(IfStmt),
    ForEach(ForEach),
    Return(ReturnStmt),
    Function(Function),
    Method(Method),
    Property(Property),
    Metadata(Metadata),
    ClassDecl(ClassDecl),
    Program(Program),
}
