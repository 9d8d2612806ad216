use std::path::Path;

use serde::Deserialize;

use crate::diagnostics::CompileError;

/// Backend optimization level, as accepted by Cranelift's `opt_level` setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptLevel {
    None,
    #[default]
    Speed,
    SpeedAndSize,
}

impl OptLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            OptLevel::None => "none",
            OptLevel::Speed => "speed",
            OptLevel::SpeedAndSize => "speed_and_size",
        }
    }
}

/// Compiler settings, read from an `eql.toml` file or left at their defaults.
///
/// ```toml
/// opt_level = "speed"
/// verify = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CompilerConfig {
    pub opt_level: OptLevel,
    /// Run the Cranelift IR verifier on every generated function.
    pub verify: bool,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self { opt_level: OptLevel::default(), verify: true }
    }
}

impl CompilerConfig {
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, CompileError> {
        toml::from_str(content).map_err(|e| {
            CompileError::config(format!("{}: invalid configuration: {e}", path.display()), path.to_path_buf())
        })
    }

    pub fn load(path: &Path) -> Result<Self, CompileError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            CompileError::config(format!("{}: could not read file: {e}", path.display()), path.to_path_buf())
        })?;
        let config = Self::from_toml_str(&content, path)?;
        tracing::debug!(path = %path.display(), ?config, "loaded compiler configuration");
        Ok(config)
    }

    /// Cranelift shared settings for a JIT built from this configuration.
    pub fn flags(&self) -> Vec<(&'static str, &'static str)> {
        vec![
            ("opt_level", self.opt_level.as_str()),
            ("enable_verifier", if self.verify { "true" } else { "false" }),
            ("use_colocated_libcalls", "false"),
            ("is_pic", "false"),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default() {
        let config = CompilerConfig::from_toml_str("", Path::new("eql.toml")).unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert!(config.verify);
        assert_eq!(config.opt_level, OptLevel::Speed);
    }

    #[test]
    fn reads_all_keys() {
        let src = "opt_level = \"speed_and_size\"\nverify = false\n";
        let config = CompilerConfig::from_toml_str(src, Path::new("eql.toml")).unwrap();
        assert_eq!(config.opt_level, OptLevel::SpeedAndSize);
        assert!(!config.verify);
    }

    #[test]
    fn rejects_unknown_keys() {
        let err = CompilerConfig::from_toml_str("threads = 4", Path::new("eql.toml")).unwrap_err();
        assert!(matches!(err, CompileError::Config { .. }));
    }

    #[test]
    fn flags_follow_settings() {
        let config = CompilerConfig { opt_level: OptLevel::None, verify: false };
        let flags = config.flags();
        assert!(flags.contains(&("opt_level", "none")));
        assert!(flags.contains(&("enable_verifier", "false")));
    }
}
