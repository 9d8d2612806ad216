mod common;
use common::{COUNT_PARAMS, COUNT_QUERY, SUM_QUERY, check_should_fail_with};

use eql::{CompileError, check};

const RESULT_CLASS: &str = "\
[Hashable(\"id\")]
class Result {
  public Int id;
  public Int count;
}
";

#[test]
fn well_formed_queries_pass() {
    check(SUM_QUERY, "Path path").unwrap();
    check(COUNT_QUERY, COUNT_PARAMS).unwrap();
}

#[test]
fn initializer_type_mismatch() {
    let err = check_should_fail_with(
        "Int x = 1.5;",
        "",
        "cannot initialize 'x' of type Int with a value of type Float",
    );
    assert!(matches!(err, CompileError::Semantic { .. }));
}

#[test]
fn assignment_type_mismatch() {
    check_should_fail_with("Int x = 1;\nx = true;", "", "cannot assign a value of type Boolean to Int");
}

#[test]
fn undeclared_variable() {
    let err = check_should_fail_with("y = 1;", "", "undeclared variable 'y'");
    let span = err.span().unwrap();
    assert_eq!((span.line, span.column), (1, 1));
}

#[test]
fn use_before_declaration() {
    check_should_fail_with("Int a = b;\nInt b = 1;", "", "undeclared variable 'b'");
}

#[test]
fn initializer_cannot_see_itself() {
    check_should_fail_with("Int x = x + 1;", "", "undeclared variable 'x'");
}

#[test]
fn duplicate_declaration() {
    check_should_fail_with("Int x = 1;\nInt x = 2;", "", "'x' is already declared");
}

#[test]
fn shadowing_a_parameter_is_a_duplicate() {
    check_should_fail_with("Int limit = 1;", "Int limit", "'limit' is already declared");
}

#[test]
fn void_variable() {
    check_should_fail_with("Void v;", "", "variable 'v' cannot have type Void");
}

#[test]
fn handles_must_be_initialized() {
    check_should_fail_with("Cursor c;", "", "'c' of type Cursor must be initialized");
}

#[test]
fn plain_classes_need_no_initializer() {
    let src = format!("{RESULT_CLASS}Result r;\nr.count = 2;\nInt n = r.count;\nreturn n;");
    check(&src, "").unwrap();
}

#[test]
fn if_condition_must_be_boolean() {
    check_should_fail_with("if (1) {\n  return;\n}", "", "if condition must be Boolean, found Int");
}

#[test]
fn for_each_needs_a_cursor() {
    check_should_fail_with(
        "for each (Event e in path) {\n}",
        "Path path",
        "for each iterates over a Cursor, found Path",
    );
}

#[test]
fn loop_variable_must_be_an_event() {
    check_should_fail_with(
        "Cursor c = path.events();\nfor each (Int e in c) {\n}",
        "Path path",
        "loop variable must be an Event, found Int",
    );
}

#[test]
fn wrong_argument_count() {
    check_should_fail_with(
        "Int id = path.objectId(1);",
        "Path path",
        "method 'objectId' takes 0 argument(s) but 1 were given",
    );
}

#[test]
fn wrong_argument_type() {
    let src = format!("{RESULT_CLASS}Result r = data.get(1.5);");
    check_should_fail_with(&src, "Map<Int, Result> data", "argument of 'get' must be Int, found Float");
}

#[test]
fn unknown_method() {
    check_should_fail_with("path.rewind();", "Path path", "Path has no method 'rewind'");
}

#[test]
fn unknown_field() {
    check_should_fail_with(
        "Cursor c = path.events();\nfor each (Event e in c) {\n  Int x = e.payload;\n}",
        "Path path",
        "class 'Event' has no field 'payload'",
    );
}

#[test]
fn map_values_must_be_hashable() {
    let src = "class Plain {\n  public Int id;\n}";
    check_should_fail_with(src, "Map<Int, Plain> m", "Map values must be a Hashable class, found 'Plain'");
}

#[test]
fn map_keys_must_be_int() {
    check_should_fail_with(RESULT_CLASS, "Map<Float, Result> m", "Map keys must be Int, found 'Float'");
}

#[test]
fn map_needs_two_parameters() {
    check_should_fail_with(RESULT_CLASS, "Map<Result> m", "Map takes a key and a value type");
}

#[test]
fn primitives_are_not_generic() {
    check_should_fail_with("Int<Float> x = 1;", "", "'Int' takes no type parameters");
}

#[test]
fn hashable_key_must_be_a_property() {
    let src = "[Hashable(\"key\")]\nclass R {\n  public Int id;\n}";
    check_should_fail_with(src, "", "Hashable key 'key' is not a property of 'R'");
}

#[test]
fn hashable_key_must_be_int() {
    let src = "[Hashable(\"id\")]\nclass R {\n  public Float id;\n}";
    check_should_fail_with(src, "", "Hashable key 'id' must be Int, found Float");
}

#[test]
fn unknown_metadata() {
    check_should_fail_with("[Sorted(\"id\")]\nclass R {\n  public Int id;\n}", "", "unknown metadata 'Sorted'");
}

#[test]
fn duplicate_members() {
    let src = "class R {\n  public Int id;\n  public Float id;\n}";
    check_should_fail_with(src, "", "class 'R' declares 'id' more than once");
}

#[test]
fn properties_have_no_initializers() {
    let err = check_should_fail_with("class R {\n  public Int id = 3;\n}", "", "expected ;");
    assert!(matches!(err, CompileError::Syntax { .. }));
}

#[test]
fn bodiless_methods_are_native_only() {
    let src = "class R {\n  public Int size();\n}";
    check_should_fail_with(src, "", "'size' needs a body; only native classes declare bodiless methods");
}

#[test]
fn typed_methods_must_return() {
    let src = "class R {\n  public Int size() {\n    Int x = 1;\n  }\n}";
    check_should_fail_with(src, "", "'size' must end with a return of type Int");
}

#[test]
fn return_type_mismatch() {
    check_should_fail_with(
        "if (true) {\n  return 1;\n}\nreturn 2.5;",
        "",
        "expected a return value of type Int, found Float",
    );
}

#[test]
fn missing_return_value() {
    check_should_fail_with("if (true) {\n  return 1;\n}\nreturn;", "", "missing return value of type Int");
}

#[test]
fn void_methods_return_nothing() {
    let src = "class R {\n  public Void reset() {\n    return 1;\n  }\n}";
    check_should_fail_with(src, "", "cannot return a value from a Void function");
}

#[test]
fn mixed_operands() {
    check_should_fail_with("Int x = 1 + 2.0;", "", "operator '+' cannot combine Int and Float");
}

#[test]
fn arithmetic_on_booleans() {
    check_should_fail_with("Boolean b = true + false;", "", "operator '+' is not defined for Boolean");
}

#[test]
fn modulo_needs_integers() {
    check_should_fail_with("Float f = 1.0 % 2.0;", "", "operator '%' is not defined for Float");
}

#[test]
fn this_outside_a_method() {
    check_should_fail_with("Int x = this.count;", "", "'this' used outside of a method");
}

#[test]
fn var_needs_inferable_initializer() {
    let err = check_should_fail_with(
        "Cursor c = path.events();\nfor each (Event e in c) {\n  var x = e.actionId;\n}",
        "Path path",
        "cannot infer the type of 'x'",
    );
    assert!(matches!(err, CompileError::Semantic { .. }));
}

#[test]
fn var_infers_from_literal() {
    check("var x = 1;\nx = x + 2;\nreturn x;", "").unwrap();
}

#[test]
fn unreferenced_classes_see_their_fields() {
    let src = "class Counter {\n  public Int n;\n  public Int next() {\n    return this.n + 1;\n  }\n}\nreturn 1;";
    let compilation = check(src, "").unwrap();
    assert!(compilation.module.class("Counter").is_some());
}
