//! Type inference available before any class is loaded.
//!
//! Used for `var` declarations and the implicit return type of `main`. Only
//! literals, arithmetic, comparisons, already typed variables and the `Map`
//! intrinsics are understood; anything that needs a class body returns `None`.

use super::{Ast, NodeId, Payload, TypeRef, VarDecl, scope};
use crate::types::Type;

pub fn infer(ast: &Ast, expr: NodeId) -> Option<Type> {
    match &ast.node(expr).ok()?.payload {
        Payload::Literal(lit) => Some(lit.value.ty()),
        Payload::BinaryExpr(bin) if bin.op.is_arithmetic() => {
            infer(ast, bin.lhs?).or_else(|| infer(ast, bin.rhs?))
        }
        Payload::BinaryExpr(_) => Some(Type::boolean()),
        Payload::VarRef(var) => {
            let decl = scope::lookup(ast, expr, &var.name)?;
            let type_ref = ast.get::<VarDecl>(decl).ok()?.type_ref?;
            TypeRef::resolve(ast, type_ref).ok()
        }
        Payload::MethodCall(call) => {
            let target = infer(ast, call.target?)?;
            match (target.name.as_str(), target.subtypes.as_slice(), call.name.as_str()) {
                ("Map", [_, value], "get") => Some(value.clone()),
                ("Map", [_, _], "count") => Some(Type::int()),
                _ => None,
            }
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{Block, Function, Program};
    use crate::parser::{parse_params, parse_program};

    fn initializers(ast: &Ast, root: NodeId) -> Vec<NodeId> {
        let program = ast.get::<Program>(root).unwrap();
        let main = ast.get::<Function>(program.main.unwrap()).unwrap();
        ast.get::<Block>(main.body.unwrap())
            .unwrap()
            .stmts
            .iter()
            .filter_map(|&s| ast.get::<VarDecl>(s).ok().and_then(|d| d.initial_value))
            .collect()
    }

    #[test]
    fn literals_and_arithmetic() {
        let (ast, root) = parse_program("var a = 1;\nvar b = 2.5 * 2.0;\nvar c = 1 < 2;").unwrap();
        let inits = initializers(&ast, root);
        assert_eq!(infer(&ast, inits[0]), Some(Type::int()));
        assert_eq!(infer(&ast, inits[1]), Some(Type::float()));
        assert_eq!(infer(&ast, inits[2]), Some(Type::boolean()));
    }

    #[test]
    fn map_get_yields_value_type() {
        let (mut ast, root) = parse_program("var item = data.get(3);").unwrap();
        let params = parse_params(&mut ast, "Map<Int, Result> data").unwrap();
        let main = ast.get::<Program>(root).unwrap().main.unwrap();
        ast.adopt::<Function>(main, params[0], |f, a| f.args.push(a)).unwrap();
        let inits = initializers(&ast, root);
        assert_eq!(infer(&ast, inits[0]), Some(Type::named("Result")));
    }

    #[test]
    fn field_access_is_not_inferable() {
        let (ast, root) = parse_program("var x = event.actionId;").unwrap();
        let inits = initializers(&ast, root);
        assert_eq!(infer(&ast, inits[0]), None);
    }
}
