//! Property-based tests for tree invariants and end-to-end arithmetic.

use proptest::prelude::*;

use eql::ast::{Function, Program};
use eql::parser::parse_program;
use eql::{Output, compile};

#[derive(Debug, Clone, Copy)]
enum Op {
    Add,
    Sub,
    Mul,
}

impl Op {
    fn symbol(self) -> &'static str {
        match self {
            Op::Add => "+",
            Op::Sub => "-",
            Op::Mul => "*",
        }
    }

    fn apply(self, a: i64, b: i64) -> i64 {
        match self {
            Op::Add => a + b,
            Op::Sub => a - b,
            Op::Mul => a * b,
        }
    }
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![Just(Op::Add), Just(Op::Sub), Just(Op::Mul)]
}

/// A chain of declarations, each combining the previous variable with a literal.
fn arb_chain() -> impl Strategy<Value = (i64, Vec<(Op, i64)>)> {
    (0..50i64, prop::collection::vec((arb_op(), 0..20i64), 1..8))
}

fn render(first: i64, steps: &[(Op, i64)]) -> (String, i64) {
    let mut src = format!("Int v0 = {first};\n");
    let mut value = first;
    for (i, (op, operand)) in steps.iter().enumerate() {
        src.push_str(&format!("Int v{} = v{i} {} {operand};\n", i + 1, op.symbol()));
        value = op.apply(value, *operand);
    }
    src.push_str(&format!("return v{};", steps.len()));
    (src, value)
}

fn arb_token_soup() -> impl Strategy<Value = String> {
    let tokens = prop_oneof![
        Just("Int"),
        Just("x"),
        Just("var"),
        Just("return"),
        Just("if"),
        Just("for"),
        Just("each"),
        Just("class"),
        Just("public"),
        Just("="),
        Just("+"),
        Just("<"),
        Just(">"),
        Just(";"),
        Just("("),
        Just(")"),
        Just("{"),
        Just("}"),
        Just("."),
        Just(","),
        Just("1"),
        Just("2.5"),
        Just("\"id\""),
        Just("["),
        Just("]"),
    ];
    prop::collection::vec(tokens, 0..40).prop_map(|tokens| tokens.join(" "))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn parsed_trees_are_well_formed((first, steps) in arb_chain()) {
        let (src, _) = render(first, &steps);
        let (ast, root) = parse_program(&src).unwrap();
        prop_assert!(ast.verify(root).is_ok());
        prop_assert_eq!(ast.descendants(root).len(), ast.len());
    }

    #[test]
    fn copy_then_free_restores_live_count((first, steps) in arb_chain()) {
        let (src, _) = render(first, &steps);
        let (mut ast, root) = parse_program(&src).unwrap();
        let main = ast.get::<Program>(root).unwrap().main.unwrap();
        let before = ast.len();

        let copy = ast.deep_copy(main).unwrap();
        prop_assert_eq!(ast.len(), before + ast.descendants(main).len());
        prop_assert_eq!(ast.dump(copy), ast.dump(main));
        prop_assert!(ast.get::<Function>(copy).is_ok());

        ast.free(copy);
        prop_assert_eq!(ast.len(), before);
        prop_assert!(ast.verify(root).is_ok());
    }

    #[test]
    fn parser_never_panics(src in arb_token_soup()) {
        let _ = parse_program(&src);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn compiled_arithmetic_matches_host((first, steps) in arb_chain()) {
        let (src, expected) = render(first, &steps);
        let query = compile(&src, "").unwrap();
        prop_assert_eq!(query.invoke(&mut []).unwrap(), Output::Int(expected));
    }
}
