#![allow(dead_code)]

use eql::runtime::EventPath;
use eql::{CompileError, check, compile};

/// Object 10 with three events: action 11, no action (0), action 13.
pub const DATA: &[u8] = b"\x0a\x00\x00\x00\x31\x00\x00\x00\x01\xa0\x00\x00\x00\x00\x00\x00\
                          \x00\x0b\x00\x02\xa1\x00\x00\x00\x00\x00\x00\x00\x05\x00\x00\x00\
                          \x01\xa3\x66\x6f\x6f\x03\xa2\x00\x00\x00\x00\x00\x00\x00\x0d\x00\
                          \x05\x00\x00\x00\x01\xa3\x62\x61\x72";

pub const SUM_QUERY: &str = "\
Int total = 0;
Cursor cursor = path.events();
for each (Event event in cursor) {
  total = total + event.actionId;
}
return total;";

pub const COUNT_QUERY: &str = "\
[Hashable(\"id\")]
class Result {
  public Int id;
  public Int count;
}
Cursor cursor = path.events();
for each (Event event in cursor) {
  Result item = data.get(event.actionId);
  item.count = item.count + 1;
}
return;";

pub const COUNT_PARAMS: &str = "Path path, Map<Int, Result> data";

pub fn event_path() -> EventPath {
    EventPath::from_bytes(DATA).unwrap()
}

/// Analyze `source` and assert it fails with a message containing `expected`.
pub fn check_should_fail_with(source: &str, params: &str, expected: &str) -> CompileError {
    match check(source, params) {
        Ok(_) => panic!("expected analysis to fail with '{expected}'"),
        Err(err) => {
            assert!(err.to_string().contains(expected), "expected '{expected}' in '{err}'");
            err
        }
    }
}

pub fn compile_should_fail_with(source: &str, params: &str, expected: &str) -> CompileError {
    match compile(source, params) {
        Ok(_) => panic!("expected compilation to fail with '{expected}'"),
        Err(err) => {
            assert!(err.to_string().contains(expected), "expected '{expected}' in '{err}'");
            err
        }
    }
}
