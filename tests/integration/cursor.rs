mod common;
use common::{COUNT_PARAMS, COUNT_QUERY, SUM_QUERY, event_path};

use eql::runtime::{AggregateMap, EventPath};
use eql::{Arg, InvokeError, Output, compile};

#[test]
fn sums_action_ids() {
    let query = compile(SUM_QUERY, "Path path").unwrap();
    let mut path = event_path();
    let result = query.invoke(&mut [Arg::Path(&mut path)]).unwrap();
    assert_eq!(result, Output::Int(24));
}

#[test]
fn query_can_run_twice() {
    let query = compile(SUM_QUERY, "Path path").unwrap();
    let mut path = event_path();
    assert_eq!(query.invoke(&mut [Arg::Path(&mut path)]).unwrap(), Output::Int(24));
    assert_eq!(query.invoke(&mut [Arg::Path(&mut path)]).unwrap(), Output::Int(24));
}

#[test]
fn counts_events_per_action() {
    let query = compile(COUNT_QUERY, COUNT_PARAMS).unwrap();
    let mut path = event_path();
    let mut data = AggregateMap::new();
    let result = query.invoke(&mut [Arg::Path(&mut path), Arg::Map(&mut data)]).unwrap();
    assert_eq!(result, Output::Void);

    assert_eq!(data.keys().collect::<Vec<_>>(), vec![11, 0, 13]);
    let layout = query.layout("Result").unwrap();
    let id = layout.slot_index("id").unwrap();
    let count = layout.slot_index("count").unwrap();
    for (key, entry) in data.entries() {
        assert_eq!(entry[id], key);
        assert_eq!(entry[count], 1);
    }
}

#[test]
fn aggregation_accumulates_across_runs() {
    let query = compile(COUNT_QUERY, COUNT_PARAMS).unwrap();
    let mut data = AggregateMap::new();
    for _ in 0..3 {
        let mut path = event_path();
        query.invoke(&mut [Arg::Path(&mut path), Arg::Map(&mut data)]).unwrap();
    }
    let count = query.layout("Result").unwrap().slot_index("count").unwrap();
    assert_eq!(data.get(13).unwrap()[count], 3);
    assert_eq!(data.len(), 3);
}

#[test]
fn one_instantiation_per_map_type() {
    let src = "\
[Hashable(\"id\")]
class Result {
  public Int id;
  public Int count;
}
Result a = data.get(1);
Result b = data.get(2);
return data.count();";
    let query = compile(src, COUNT_PARAMS).unwrap();
    assert_eq!(query.instantiations().len(), 1);
    assert_eq!(query.instantiations()[0].to_string(), "Map<Int, Result>");

    let mut path = event_path();
    let mut data = AggregateMap::new();
    let result = query.invoke(&mut [Arg::Path(&mut path), Arg::Map(&mut data)]).unwrap();
    assert_eq!(result, Output::Int(2));
}

#[test]
fn object_id_and_timestamps() {
    let src = "\
Int last = 0;
for each (Event e in path.events()) {
  last = e.timestamp;
}
return path.objectId() * 1000 + last;";
    let query = compile(src, "Path path").unwrap();
    let mut path = event_path();
    assert_eq!(query.invoke(&mut [Arg::Path(&mut path)]).unwrap(), Output::Int(10_000 + 0xa2));
}

#[test]
fn empty_path_runs_no_iterations() {
    let query = compile(SUM_QUERY, "Path path").unwrap();
    let mut path = EventPath::from_bytes(b"\x01\x00\x00\x00\x00\x00\x00\x00").unwrap();
    assert_eq!(query.invoke(&mut [Arg::Path(&mut path)]).unwrap(), Output::Int(0));
}

#[test]
fn conditionals_and_early_return() {
    let src = "\
Int seen = 0;
for each (Event e in path.events()) {
  if (e.actionId == 0) {
    return seen;
  }
  seen = seen + 1;
}
return -1;";
    let query = compile(src, "Path path").unwrap();
    let mut path = event_path();
    assert_eq!(query.invoke(&mut [Arg::Path(&mut path)]).unwrap(), Output::Int(1));
}

#[test]
fn float_and_boolean_results() {
    let query = compile("Float half = 1.0 / 2.0;\nreturn half * 3.0;", "").unwrap();
    assert_eq!(query.invoke(&mut []).unwrap(), Output::Float(1.5));

    let src = "Boolean any = false;\nfor each (Event e in path.events()) {\n  any = any || e.actionId > 12;\n}\nreturn any;";
    let query = compile(src, "Path path").unwrap();
    let mut path = event_path();
    assert_eq!(query.invoke(&mut [Arg::Path(&mut path)]).unwrap(), Output::Boolean(true));
}

#[test]
fn division_by_zero_is_zero() {
    let query = compile("Int zero = 0;\nreturn 7 / zero + 7 % zero;", "").unwrap();
    assert_eq!(query.invoke(&mut []).unwrap(), Output::Int(0));
}

#[test]
fn dividing_by_minus_one_wraps() {
    let div = compile("return a / b;", "Int a, Int b").unwrap();
    let rem = compile("return a % b;", "Int a, Int b").unwrap();
    let run = |query: &eql::CompiledQuery, a: i64, b: i64| query.invoke(&mut [Arg::Int(a), Arg::Int(b)]).unwrap();

    assert_eq!(run(&div, i64::MIN, -1), Output::Int(i64::MIN));
    assert_eq!(run(&rem, i64::MIN, -1), Output::Int(0));
    assert_eq!(run(&div, 7, -1), Output::Int(-7));
    assert_eq!(run(&div, -7, 2), Output::Int(-3));
    assert_eq!(run(&rem, -7, 3), Output::Int(-1));
}

#[test]
fn integer_arguments() {
    let query = compile("return limit * 2;", "Int limit").unwrap();
    assert_eq!(query.invoke(&mut [Arg::Int(21)]).unwrap(), Output::Int(42));
}

#[test]
fn user_methods_are_callable() {
    let src = "\
[Hashable(\"id\")]
class Result {
  public Int id;
  public Int count;
  public Int bump(Int by) {
    this.count = this.count + by;
    return this.count;
  }
}
Int last = 0;
for each (Event e in path.events()) {
  Result item = data.get(e.actionId);
  last = item.bump(5);
}
return last;";
    let query = compile(src, COUNT_PARAMS).unwrap();
    let mut path = event_path();
    let mut data = AggregateMap::new();
    let result = query.invoke(&mut [Arg::Path(&mut path), Arg::Map(&mut data)]).unwrap();
    assert_eq!(result, Output::Int(5));
    let count = query.layout("Result").unwrap().slot_index("count").unwrap();
    assert_eq!(data.get(11).unwrap()[count], 5);
}

#[test]
fn invoke_checks_arguments() {
    let query = compile(SUM_QUERY, "Path path").unwrap();
    assert_eq!(query.invoke(&mut []).unwrap_err(), InvokeError::Arity { expected: 1, found: 0 });

    let err = query.invoke(&mut [Arg::Int(3)]).unwrap_err();
    assert!(matches!(err, InvokeError::Mismatch { index: 0, found: "Int", .. }), "{err:?}");
}
