//! polygolf - compile a JSON IR program to the shortest source for a target.

use clap::Parser;
use polygolf::{CompileConfig, CompileError, ConfigError, Program};
use std::path::{Path, PathBuf};
use std::sync::Once;

/// Compile a polygolf IR program (JSON) for a target language.
#[derive(Parser, Debug)]
#[command(name = "polygolf", version, about, long_about = None)]
struct Args {
    /// IR program as JSON
    #[arg(value_name = "FILE", required_unless_present = "list_targets")]
    input: Option<PathBuf>,

    /// Target language (defaults to `output.target` from config, then "debug")
    #[arg(short, long)]
    target: Option<String>,

    /// Config file to use instead of the global and project configs
    #[arg(short, long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// List the available target languages and exit
    #[arg(long)]
    list_targets: bool,

    /// Compile variants one at a time
    #[arg(long)]
    sequential: bool,
}

#[derive(Debug, thiserror::Error)]
enum LoadError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid IR in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Unknown target {0}. Run with --list-targets to see the available ones")]
    UnknownTarget(String),

    #[error(transparent)]
    Compile(#[from] CompileError),
}

static TRACING_INIT: Once = Once::new();

/// Log to stderr, filtered by `RUST_LOG` (e.g. `RUST_LOG=polygolf=debug`).
fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{EnvFilter, fmt, prelude::*};

        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    });
}

fn load_program(path: &Path) -> Result<Program, LoadError> {
    let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&content).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn load_config(args: &Args) -> Result<CompileConfig, LoadError> {
    let mut config = match &args.config {
        Some(path) => CompileConfig::load_file(path)?,
        None => {
            let root = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            CompileConfig::load(&root)?
        }
    };
    if args.sequential {
        config.variants.parallel = false;
    }
    Ok(config)
}

fn run(args: &Args) -> Result<(), LoadError> {
    if args.list_targets {
        for language in polygolf::languages() {
            println!("{}\t.{}", language.name(), language.extension());
        }
        return Ok(());
    }

    let config = load_config(args)?;
    let name = args
        .target
        .clone()
        .or_else(|| config.output.target.clone())
        .unwrap_or_else(|| "debug".to_string());
    let language =
        polygolf::language_for_name(&name).ok_or_else(|| LoadError::UnknownTarget(name.clone()))?;

    let Some(input) = &args.input else {
        return Ok(());
    };
    let program = load_program(input)?;
    tracing::debug!(target_language = %name, input = %input.display(), "compiling");

    let output = polygolf::compile_with_config(&language.target(), program, &config)?;
    println!("{output}");
    Ok(())
}

fn main() {
    init_tracing();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
