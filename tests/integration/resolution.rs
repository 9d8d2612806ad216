mod common;
use common::{COUNT_PARAMS, COUNT_QUERY, SUM_QUERY, check_should_fail_with};

use eql::ast::{ClassDecl, Program};
use eql::module::LoadState;
use eql::{CompileError, CompilerConfig, Compilation, check};

fn class_names(compilation: &Compilation) -> Vec<String> {
    compilation.module.classes().map(|(name, _)| name.to_string()).collect()
}

#[test]
fn loads_prelude_classes_on_demand() {
    let compilation = check(SUM_QUERY, "Path path").unwrap();
    assert_eq!(class_names(&compilation), vec!["Path", "Cursor", "Event"]);
    for (_, entry) in compilation.module.classes() {
        assert_eq!(entry.state, LoadState::Resolved);
    }
}

#[test]
fn program_classes_resolve_before_library() {
    let compilation = check(COUNT_QUERY, COUNT_PARAMS).unwrap();
    let names = class_names(&compilation);
    assert!(names.contains(&"Result".to_string()));
    assert!(names.contains(&"Map".to_string()));
    let program = compilation.ast.get::<Program>(compilation.root).unwrap();
    let result = compilation.module.class("Result").unwrap();
    assert!(program.classes.contains(&result));
}

#[test]
fn imported_classes_join_the_program() {
    let compilation = check(SUM_QUERY, "Path path").unwrap();
    let program = compilation.ast.get::<Program>(compilation.root).unwrap();
    let names: Vec<_> = program
        .classes
        .iter()
        .map(|&c| compilation.ast.get::<ClassDecl>(c).unwrap().name.clone())
        .collect();
    assert_eq!(names, vec!["Path", "Cursor", "Event"]);
    compilation.ast.verify(compilation.root).unwrap();
}

#[test]
fn resolving_twice_is_a_no_op() {
    let mut compilation = Compilation::parse(SUM_QUERY, "Path path", &CompilerConfig::default()).unwrap();
    compilation.preprocess().unwrap();
    assert_eq!(compilation.resolve().unwrap(), 3);
    let nodes = compilation.ast.len();
    assert_eq!(compilation.resolve().unwrap(), 0);
    assert_eq!(compilation.ast.len(), nodes);
}

#[test]
fn unknown_class_reports_position() {
    let err = check_should_fail_with("Int x = 0;\n  Widget w;", "", "unable to resolve class 'Widget'");
    match err {
        CompileError::Resolution { class, span } => {
            assert_eq!(class, "Widget");
            assert_eq!((span.line, span.column), (2, 3));
        }
        other => panic!("expected a resolution error, got {other:?}"),
    }
}

#[test]
fn unknown_class_in_params() {
    check_should_fail_with("return;", "Gadget g", "unable to resolve class 'Gadget'");
}

#[test]
fn unknown_map_value_class() {
    check_should_fail_with("return;", "Map<Int, Missing> m", "unable to resolve class 'Missing'");
}

#[test]
fn redefining_a_builtin_is_rejected() {
    check_should_fail_with("class Cursor {\n}\nreturn;", "", "redefines a built-in class");
}

#[test]
fn mutually_referencing_classes() {
    let src = "\
[Hashable(\"id\")]
class Left {
  public Int id;
  public Right other;
}
[Hashable(\"id\")]
class Right {
  public Int id;
  public Left other;
}
return;";
    let compilation = check(src, "Map<Int, Left> lefts").unwrap();
    let names = class_names(&compilation);
    assert_eq!(names.iter().filter(|n| *n == "Left").count(), 1);
    assert_eq!(names.iter().filter(|n| *n == "Right").count(), 1);
}
