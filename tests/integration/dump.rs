use eql::{CompilerConfig, Compilation};
use insta::assert_snapshot;

fn parsed(source: &str, params: &str) -> Compilation {
    Compilation::parse(source, params, &CompilerConfig::default()).unwrap()
}

fn analyzed(source: &str, params: &str) -> Compilation {
    let mut compilation = parsed(source, params);
    compilation.analyze().unwrap();
    compilation
}

#[test]
fn dump_parsed_statements() {
    let c = parsed("var x = 1;\nreturn x + 2;", "");
    assert_snapshot!(c.ast.dump(c.root), @r"
    <program>
      <function name='main'>
        <block>
          <var-decl name='x'>
            <literal type='Int' value='1'>
          <return>
            <binary-expr op='+'>
              <var-ref name='x'>
              <literal type='Int' value='2'>
    ");
}

#[test]
fn dump_shows_inferred_types() {
    let c = analyzed("var x = 1;\nreturn x + 2;", "");
    assert_snapshot!(c.ast.dump(c.root), @r"
    <program>
      <function name='main'>
        <type-ref name='Int'>
        <block>
          <var-decl name='x'>
            <type-ref name='Int'>
            <literal type='Int' value='1'>
          <return>
            <binary-expr op='+'>
              <var-ref name='x'>
              <literal type='Int' value='2'>
    ");
}

#[test]
fn dump_class_and_implicit_return() {
    let c = analyzed("[Hashable(\"id\")]\nclass Result {\n  public Int id;\n}", "");
    assert_snapshot!(c.ast.dump(c.root), @r"
    <program>
      <class name='Result'>
        <metadata name='Hashable' args='id'>
        <property access='public'>
          <var-decl name='id'>
            <type-ref name='Int'>
      <function name='main'>
        <type-ref name='Void'>
        <block>
          <return>
    ");
}

#[test]
fn dump_params_and_branches() {
    let src = "if (limit > 0) {\n  return 1.5;\n} else {\n  return 0.0;\n}";
    let c = analyzed(src, "Int limit");
    assert_snapshot!(c.ast.dump(c.root), @r"
    <program>
      <function name='main'>
        <farg>
          <var-decl name='limit'>
            <type-ref name='Int'>
        <type-ref name='Float'>
        <block>
          <if>
            <binary-expr op='>'>
              <var-ref name='limit'>
              <literal type='Int' value='0'>
            <block>
              <return>
                <literal type='Float' value='1.5'>
            <block>
              <return>
                <literal type='Float' value='0.0'>
    ");
}

#[test]
fn dump_of_a_subtree() {
    let c = parsed("Int total = 3 * 4;", "");
    let main = c.main().unwrap();
    let dump = c.ast.dump(main);
    assert!(dump.starts_with("<function name='main'>\n"));
    assert!(dump.contains("    <var-decl name='total'>\n"));
    assert!(dump.contains("<binary-expr op='*'>"));
}
