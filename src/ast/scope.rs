//! Name lookup by walking parent links.

use super::{Ast, Block, ClassDecl, FArg, ForEach, Function, NodeId, NodeKind, Payload, VarDecl};

/// Find the declaration `name` refers to when used at `from`.
///
/// Visible declarations are the statements preceding `from` in each enclosing
/// block, the loop variable of an enclosing `for each`, and the arguments of
/// the enclosing function. Lookup stops at the function boundary.
pub fn lookup(ast: &Ast, from: NodeId, name: &str) -> Option<NodeId> {
    let mut cur = from;
    while let Some(parent) = ast.parent(cur) {
        let node = ast.node(parent).ok()?;
        match &node.payload {
            Payload::Block(Block { stmts }) => {
                let pos = stmts.iter().position(|&s| s == cur).unwrap_or(stmts.len());
                for &stmt in stmts[..pos].iter().rev() {
                    if declares(ast, stmt, name) {
                        return Some(stmt);
                    }
                }
            }
            Payload::ForEach(ForEach { var_decl: Some(decl), .. }) if *decl != cur => {
                if declares(ast, *decl, name) {
                    return Some(*decl);
                }
            }
            Payload::Function(Function { args, .. }) => {
                for &arg in args {
                    if arg == cur {
                        break;
                    }
                    if let Some(decl) = arg_decl(ast, arg) {
                        if declares(ast, decl, name) {
                            return Some(decl);
                        }
                    }
                }
                return None;
            }
            _ => {}
        }
        cur = parent;
    }
    None
}

fn declares(ast: &Ast, id: NodeId, name: &str) -> bool {
    ast.get::<VarDecl>(id).map(|d| d.name == name).unwrap_or(false)
}

fn arg_decl(ast: &Ast, arg: NodeId) -> Option<NodeId> {
    ast.get::<FArg>(arg).ok().and_then(|f| f.var_decl)
}

/// Nearest ancestor of `id` (excluding `id`) with the given kind.
pub fn enclosing(ast: &Ast, id: NodeId, kind: NodeKind) -> Option<NodeId> {
    let mut cur = ast.parent(id);
    while let Some(c) = cur {
        if ast.kind(c).ok()? == kind {
            return Some(c);
        }
        cur = ast.parent(c);
    }
    None
}

/// Name of the class whose method contains `id`.
pub fn enclosing_class(ast: &Ast, id: NodeId) -> Option<String> {
    let class = enclosing(ast, id, NodeKind::ClassDecl)?;
    ast.get::<ClassDecl>(class).ok().map(|c| c.name.clone())
}
