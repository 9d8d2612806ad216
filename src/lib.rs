pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod types;
pub mod ast;
pub mod module;
pub mod codegen;
pub mod runtime;
pub mod prelude;
pub mod config;
pub mod pipeline;
pub mod artifact;

pub use artifact::{Arg, CompiledQuery, InvokeError, Output};
pub use config::CompilerConfig;
pub use diagnostics::{CompileError, CompileResult};
pub use pipeline::Compilation;

/// Compile a query with the default configuration
/// (parse → preprocess → resolve → validate → codegen).
///
/// `params` declares the arguments the host passes, e.g. `"Path path, Map<Int, Result> data"`.
pub fn compile(source: &str, params: &str) -> CompileResult<CompiledQuery> {
    compile_with_config(source, params, &CompilerConfig::default())
}

pub fn compile_with_config(source: &str, params: &str, config: &CompilerConfig) -> CompileResult<CompiledQuery> {
    let mut compilation = Compilation::parse(source, params, config)?;
    compilation.analyze()?;
    compilation.codegen()
}

/// Run every phase except code generation. Returns the analyzed compilation for inspection.
pub fn check(source: &str, params: &str) -> CompileResult<Compilation> {
    let mut compilation = Compilation::parse(source, params, &CompilerConfig::default())?;
    compilation.analyze()?;
    Ok(compilation)
}
