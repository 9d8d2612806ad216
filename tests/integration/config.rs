mod common;
use common::{SUM_QUERY, event_path};

use std::io::Write;

use eql::config::OptLevel;
use eql::{Arg, CompileError, CompilerConfig, Output, compile_with_config};

fn write_config(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file
}

#[test]
fn loads_settings_from_file() {
    let file = write_config("opt_level = \"none\"\nverify = false\n");
    let config = CompilerConfig::load(file.path()).unwrap();
    assert_eq!(config.opt_level, OptLevel::None);
    assert!(!config.verify);
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CompilerConfig::load(&dir.path().join("eql.toml")).unwrap_err();
    assert!(matches!(err, CompileError::Config { .. }));
    assert!(err.to_string().contains("could not read file"));
}

#[test]
fn malformed_file_is_a_config_error() {
    let file = write_config("opt_level = \"fastest\"\n");
    let err = CompilerConfig::load(file.path()).unwrap_err();
    assert!(err.to_string().contains("invalid configuration"));
}

#[test]
fn every_opt_level_compiles() {
    for level in [OptLevel::None, OptLevel::Speed, OptLevel::SpeedAndSize] {
        let config = CompilerConfig { opt_level: level, verify: true };
        let query = compile_with_config(SUM_QUERY, "Path path", &config).unwrap();
        let mut path = event_path();
        assert_eq!(query.invoke(&mut [Arg::Path(&mut path)]).unwrap(), Output::Int(24));
    }
}
