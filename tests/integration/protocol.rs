use eql::ast::{
    Ast, BinaryExpr, BinaryOp, Block, FArg, Function, Literal, NodeKind, Program, ReturnStmt, TypeRef, VarDecl,
    VarRef,
};
use eql::parser;
use eql::span::Span;
use eql::{CompileError, CompilerConfig, Compilation};

fn sum_of(ast: &mut Ast, lhs: i64, rhs: i64) -> eql::ast::NodeId {
    let l = ast.create(Literal::int(lhs), Span::dummy()).unwrap();
    let r = ast.create(Literal::int(rhs), Span::dummy()).unwrap();
    ast.create(BinaryExpr::new(BinaryOp::Add, l, r), Span::dummy()).unwrap()
}

#[test]
fn free_releases_whole_subtree() {
    let mut ast = Ast::new();
    let sum = sum_of(&mut ast, 1, 2);
    let ret = ast.create(ReturnStmt::new(Some(sum)), Span::dummy()).unwrap();
    let block = ast.create(Block::new(vec![ret]), Span::dummy()).unwrap();
    assert_eq!(ast.len(), 5);
    ast.verify(block).unwrap();

    ast.free(block);
    assert!(ast.is_empty());
    assert!(!ast.contains(sum));
}

#[test]
fn freeing_a_child_leaves_parent_consistent() {
    let mut ast = Ast::new();
    let sum = sum_of(&mut ast, 1, 2);
    let ret = ast.create(ReturnStmt::new(Some(sum)), Span::dummy()).unwrap();
    ast.free(sum);
    assert_eq!(ast.get::<ReturnStmt>(ret).unwrap().value, None);
    assert_eq!(ast.len(), 1);
    ast.verify(ret).unwrap();
}

#[test]
fn deep_copy_is_independent() {
    let mut ast = Ast::new();
    let sum = sum_of(&mut ast, 4, 5);
    let copy = ast.deep_copy(sum).unwrap();
    assert_ne!(copy, sum);
    assert_eq!(ast.len(), 6);
    assert_eq!(ast.parent(copy), None);
    assert_eq!(ast.dump(copy), ast.dump(sum));

    ast.free(sum);
    assert_eq!(ast.len(), 3);
    ast.verify(copy).unwrap();
    let copied = ast.get::<BinaryExpr>(copy).unwrap();
    assert!(ast.contains(copied.lhs.unwrap()));
}

#[test]
fn copy_keeps_generated_flag() {
    let mut ast = Ast::new();
    let ty = ast.synthesize(TypeRef::named("Int"), Span::dummy()).unwrap();
    let copy = ast.deep_copy(ty).unwrap();
    assert!(ast.is_generated(copy));
}

#[test]
fn import_moves_nodes_between_trees() {
    let mut source = Ast::new();
    let sum = sum_of(&mut source, 7, 8);
    let mut target = Ast::new();
    let imported = target.import(&source, sum).unwrap();
    assert_eq!(target.len(), 3);
    assert_eq!(source.len(), 3);
    assert_eq!(target.kind(imported).unwrap(), NodeKind::BinaryExpr);
    target.verify(imported).unwrap();
}

#[test]
fn adopt_refuses_owned_nodes() {
    let mut ast = Ast::new();
    let lit = ast.create(Literal::int(1), Span::dummy()).unwrap();
    let ret = ast.create(ReturnStmt::new(Some(lit)), Span::dummy()).unwrap();
    let block = ast.create(Block::new(Vec::new()), Span::dummy()).unwrap();
    ast.adopt::<Block>(block, ret, |b, s| b.stmts.push(s)).unwrap();
    let err = ast.adopt::<Block>(block, lit, |b, s| b.stmts.push(s)).unwrap_err();
    assert!(matches!(err, CompileError::Internal { .. }));
    assert_eq!(ast.get::<Block>(block).unwrap().stmts, vec![ret]);
}

#[test]
fn typed_access_checks_kind() {
    let mut ast = Ast::new();
    let lit = ast.create(Literal::int(1), Span::dummy()).unwrap();
    let err = ast.get::<VarRef>(lit).unwrap_err();
    assert!(err.to_string().contains("expected var-ref node, found literal"));
}

#[test]
fn dangling_handles_are_errors() {
    let mut ast = Ast::new();
    let lit = ast.create(Literal::int(1), Span::dummy()).unwrap();
    ast.free(lit);
    assert!(ast.get::<Literal>(lit).is_err());
    assert!(ast.create(ReturnStmt::new(Some(lit)), Span::dummy()).is_err());
}

#[test]
fn var_inference_synthesizes_type_ref() {
    let mut c = Compilation::parse("var ratio = 0.5;", "", &CompilerConfig::default()).unwrap();
    c.preprocess().unwrap();
    let main = c.main().unwrap();
    let body = c.ast.get::<Function>(main).unwrap().body.unwrap();
    let decl = c.ast.get::<Block>(body).unwrap().stmts[0];
    let type_ref = c.ast.get::<VarDecl>(decl).unwrap().type_ref.unwrap();
    assert!(c.ast.is_generated(type_ref));
    assert_eq!(c.ast.parent(type_ref), Some(decl));
    assert_eq!(c.ast.get::<TypeRef>(type_ref).unwrap().name, "Float");
    c.ast.verify(c.root).unwrap();
}

#[test]
fn void_main_gets_a_generated_return() {
    let mut c = Compilation::parse("Int x = 1;", "", &CompilerConfig::default()).unwrap();
    c.preprocess().unwrap();
    let main = c.main().unwrap();
    let body = c.ast.get::<Function>(main).unwrap().body.unwrap();
    let stmts = &c.ast.get::<Block>(body).unwrap().stmts;
    assert_eq!(stmts.len(), 2);
    let ret = stmts[1];
    assert!(c.ast.is_generated(ret));
    assert_eq!(c.ast.get::<ReturnStmt>(ret).unwrap().value, None);
    assert_eq!(Function::return_type(&c.ast, main).unwrap().name, "Void");
}

#[test]
fn explicit_return_is_not_duplicated() {
    let mut c = Compilation::parse("return;", "", &CompilerConfig::default()).unwrap();
    c.preprocess().unwrap();
    let body = c.ast.get::<Function>(c.main().unwrap()).unwrap().body.unwrap();
    assert_eq!(c.ast.get::<Block>(body).unwrap().stmts.len(), 1);
}

#[test]
fn generated_nodes_report_parent_position() {
    let mut c = Compilation::parse("Int a = 1;\n  var b = a;", "", &CompilerConfig::default()).unwrap();
    c.preprocess().unwrap();
    let body = c.ast.get::<Function>(c.main().unwrap()).unwrap().body.unwrap();
    let decl = c.ast.get::<Block>(body).unwrap().stmts[1];
    let type_ref = c.ast.get::<VarDecl>(decl).unwrap().type_ref.unwrap();
    let span = c.ast.diagnostic_span(type_ref);
    assert_eq!((span.line, span.column), (2, 3));
}

#[test]
fn params_become_main_arguments() {
    let c = Compilation::parse("return;", "Int limit, Path path", &CompilerConfig::default()).unwrap();
    let main = c.main().unwrap();
    let args = c.ast.get::<Function>(main).unwrap().args.clone();
    assert_eq!(args.len(), 2);
    for &arg in &args {
        assert_eq!(c.ast.parent(arg), Some(main));
        assert!(c.ast.get::<FArg>(arg).is_ok());
    }
    assert_eq!(Function::arg_type(&c.ast, args[1]).unwrap().name, "Path");
}

#[test]
fn dropping_a_compilation_after_failure() {
    let mut c = Compilation::parse("Int x = 1.0;", "", &CompilerConfig::default()).unwrap();
    assert!(c.analyze().is_err());
    let program = c.ast.get::<Program>(c.root).unwrap();
    assert!(program.main.is_some());
    drop(c);
}

#[test]
fn type_refs_walk_generic_arguments_outermost_first() {
    let mut ast = Ast::new();
    let args = parser::parse_params(&mut ast, "Map<Int, Result> data").unwrap();
    let mut refs = Vec::new();
    eql::ast::type_refs(&ast, args[0], &mut refs);
    let names: Vec<_> = refs.iter().map(|&id| ast.get::<TypeRef>(id).unwrap().name.clone()).collect();
    assert_eq!(names, ["Map", "Int", "Result"]);
    assert_eq!(ast.parent(refs[1]), Some(refs[0]));
    assert_eq!(ast.parent(refs[2]), Some(refs[0]));
}

#[test]
fn dependencies_skip_primitives() {
    let mut ast = Ast::new();
    let args = parser::parse_params(&mut ast, "Map<Int, Result> data").unwrap();
    let mut deps = Vec::new();
    eql::ast::dependencies(&ast, args[0], &mut deps);
    let names: Vec<_> = deps.iter().map(|d| d.node.as_str()).collect();
    assert_eq!(names, ["Map", "Result"]);
}

#[test]
fn empty_argument_lifecycle() {
    let mut ast = Ast::new();
    let arg = ast.create(FArg::new(None), Span::dummy()).unwrap();
    assert_eq!(ast.len(), 1);
    ast.verify(arg).unwrap();

    let copy = ast.deep_copy(arg).unwrap();
    assert_ne!(copy, arg);
    assert_eq!(ast.get::<FArg>(copy).unwrap().var_decl, None);
    assert_eq!(ast.len(), 2);

    ast.free(arg);
    assert_eq!(ast.len(), 1);
    assert!(ast.contains(copy));
    ast.free(copy);
    assert!(ast.is_empty());
}
