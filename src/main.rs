use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use eql::runtime::{AggregateMap, EventPath};
use eql::types::Type;
use eql::{Arg, Compilation, CompileError, CompilerConfig, Output};

#[derive(Parser)]
#[command(name = "eqlc", version, about = "The EQL query compiler")]
struct Cli {
    /// Compiler configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Query parameters, e.g. "Path path, Map<Int, Result> data"
    #[arg(long, global = true, default_value = "")]
    params: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse and analyze a query without generating code
    Check {
        /// Query source file
        file: PathBuf,
    },
    /// Print the analyzed syntax tree
    Dump {
        /// Query source file
        file: PathBuf,
        /// Dump right after parsing, before any pass runs
        #[arg(long)]
        raw: bool,
    },
    /// Compile a query and run it against an event path
    Run {
        /// Query source file
        file: PathBuf,
        /// Serialized event path passed to `Path` parameters
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => CompilerConfig::load(path).unwrap_or_else(|err| fail(&err, "", path)),
        None => CompilerConfig::default(),
    };

    match cli.command {
        Commands::Check { file } => {
            let source = read_source(&file);
            analyze(&source, &cli.params, &config, &file);
            eprintln!("{}: ok", file.display());
        }
        Commands::Dump { file, raw } => {
            let source = read_source(&file);
            let compilation = if raw {
                Compilation::parse(&source, &cli.params, &config).unwrap_or_else(|err| fail(&err, &source, &file))
            } else {
                analyze(&source, &cli.params, &config, &file)
            };
            print!("{}", compilation.ast.dump(compilation.root));
        }
        Commands::Run { file, path } => {
            let source = read_source(&file);
            let compilation = analyze(&source, &cli.params, &config, &file);
            let query = compilation.codegen().unwrap_or_else(|err| fail(&err, &source, &file));

            let mut event_path = path.map(|p| {
                let bytes = std::fs::read(&p).unwrap_or_else(|e| {
                    eprintln!("error: could not read {}: {e}", p.display());
                    std::process::exit(1);
                });
                EventPath::from_bytes(&bytes).unwrap_or_else(|e| {
                    eprintln!("error: {}: {e}", p.display());
                    std::process::exit(1);
                })
            });
            let mut maps: Vec<AggregateMap> = query
                .params()
                .iter()
                .filter(|(_, ty)| ty.name == "Map")
                .map(|_| AggregateMap::new())
                .collect();

            let mut args = bind_args(query.params(), event_path.as_mut(), &mut maps).unwrap_or_else(|msg| {
                eprintln!("error: {msg}");
                std::process::exit(1);
            });

            match query.invoke(&mut args) {
                Ok(Output::Void) => {}
                Ok(Output::Int(n)) => println!("{n}"),
                Ok(Output::Float(n)) => println!("{n}"),
                Ok(Output::Boolean(b)) => println!("{b}"),
                Err(e) => {
                    eprintln!("error: {e}");
                    std::process::exit(1);
                }
            }
            drop(args);
            for ((name, ty), map) in query.params().iter().filter(|(_, ty)| ty.name == "Map").zip(&maps) {
                println!("{name}:");
                let value = ty.subtypes.get(1).and_then(|v| query.layout(&v.name));
                for (key, entry) in map.entries() {
                    let fields: Vec<String> = match value {
                        Some(layout) => layout.fields().zip(entry).map(|((f, _), v)| format!("{f}={v}")).collect(),
                        None => entry.iter().map(i64::to_string).collect(),
                    };
                    println!("  {key}: {}", fields.join(", "));
                }
            }
        }
    }
}

/// Host values for each query parameter: the event path, a fresh map per `Map`, 0 for `Int`.
fn bind_args<'a>(
    params: &[(String, Type)],
    mut path: Option<&'a mut EventPath>,
    maps: &'a mut [AggregateMap],
) -> Result<Vec<Arg<'a>>, String> {
    let has_path = path.is_some();
    let mut maps = maps.iter_mut();
    let mut args = Vec::with_capacity(params.len());
    for (name, ty) in params {
        match ty.name.as_str() {
            "Path" => match path.take() {
                Some(p) => args.push(Arg::Path(p)),
                None if has_path => {
                    return Err(format!("parameter '{name}': only one Path parameter can be bound to --path"));
                }
                None => return Err(format!("parameter '{name}' needs an event path (--path)")),
            },
            "Map" => match maps.next() {
                Some(m) => args.push(Arg::Map(m)),
                None => return Err(format!("no aggregation map left for parameter '{name}'")),
            },
            _ => args.push(Arg::Int(0)),
        }
    }
    Ok(args)
}

fn analyze(source: &str, params: &str, config: &CompilerConfig, file: &Path) -> Compilation {
    let mut compilation = Compilation::parse(source, params, config).unwrap_or_else(|err| fail(&err, source, file));
    if let Err(err) = compilation.analyze() {
        fail(&err, source, file);
    }
    compilation
}

fn read_source(file: &Path) -> String {
    std::fs::read_to_string(file).unwrap_or_else(|e| {
        eprintln!("error: could not read {}: {e}", file.display());
        std::process::exit(1);
    })
}

fn fail(err: &CompileError, source: &str, file: &Path) -> ! {
    eql::diagnostics::render_error(source, &file.to_string_lossy(), err);
    std::process::exit(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    const DATA: &[u8] = b"\x0a\x00\x00\x00\x00\x00\x00\x00";

    fn params(src: &[(&str, &str)]) -> Vec<(String, Type)> {
        src.iter().map(|(n, t)| (n.to_string(), Type::named(*t))).collect()
    }

    #[test]
    fn binds_path_maps_and_ints() {
        let mut path = EventPath::from_bytes(DATA).unwrap();
        let mut maps = vec![AggregateMap::new()];
        let params = params(&[("path", "Path"), ("data", "Map"), ("limit", "Int")]);
        let args = bind_args(&params, Some(&mut path), &mut maps).unwrap();
        assert!(matches!(args.as_slice(), [Arg::Path(_), Arg::Map(_), Arg::Int(0)]));
    }

    #[test]
    fn second_path_is_rejected() {
        let mut path = EventPath::from_bytes(DATA).unwrap();
        let params = params(&[("a", "Path"), ("b", "Path")]);
        let err = bind_args(&params, Some(&mut path), &mut []).err().unwrap();
        assert!(err.contains("only one Path parameter"));
    }

    #[test]
    fn path_parameter_needs_data() {
        let params = params(&[("path", "Path")]);
        let err = bind_args(&params, None, &mut []).err().unwrap();
        assert!(err.contains("needs an event path"));
    }
}
