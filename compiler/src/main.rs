use clap::Parser;
use std::path::PathBuf;

use fxc::analyze::{analyze, AnalyzeOptions, AnalyzeResult};
use fxc::ast::Program;
use fxc::system_scope::try_build_system_scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Emit {
    Report,
    Ir,
    Stages,
    Scope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    name = "fxc",
    version,
    about = "Effect compiler front-end: semantic analysis of JSON effect parse trees"
)]
struct Cli {
    /// Input parse tree (JSON-encoded Program)
    source: PathBuf,

    /// Analyzer options file (JSON); command-line flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// Start in strict mode, as if the source began with `use strict;`
    #[arg(long)]
    strict: bool,

    /// Report every warning as an error
    #[arg(long)]
    warnings_as_errors: bool,

    /// Deepest statement/expression nesting before analysis aborts
    #[arg(long)]
    max_depth: Option<usize>,

    /// What to print
    #[arg(long, value_enum, default_value_t = Emit::Report)]
    emit: Emit,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// File name used in diagnostics (defaults to the source path)
    #[arg(long)]
    name: Option<String>,

    /// Log analyzer phases (RUST_LOG overrides)
    #[arg(long)]
    verbose: bool,
}

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("fxc: error: {}", msg);
    std::process::exit(2);
}

fn load_options(cli: &Cli) -> AnalyzeOptions {
    let mut opts = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .unwrap_or_else(|e| fail(format_args!("{}: {}", path.display(), e)));
            serde_json::from_str(&text)
                .unwrap_or_else(|e| fail(format_args!("{}: {}", path.display(), e)))
        }
        None => AnalyzeOptions::default(),
    };
    opts.strict |= cli.strict;
    opts.warnings_as_errors |= cli.warnings_as_errors;
    if let Some(depth) = cli.max_depth {
        opts.max_nesting_depth = depth;
    }
    opts
}

fn emit(cli: &Cli, result: &AnalyzeResult<'_>) -> Result<String, serde_json::Error> {
    let text = match (cli.emit, cli.format) {
        (Emit::Report, Format::Text) => {
            let mut out = String::new();
            for entry in result.report() {
                out.push_str(&entry.to_string());
                out.push('\n');
            }
            out
        }
        (Emit::Report, Format::Json) => serde_json::to_string_pretty(&result.report())?,
        (Emit::Stages, Format::Text) => result.stages.dump(),
        (Emit::Stages, Format::Json) => serde_json::to_string_pretty(&result.stages)?,
        (Emit::Ir, Format::Text) => result.dump_ir(),
        (Emit::Scope, Format::Text) => result.scope.dump_global(),
        (Emit::Ir | Emit::Scope, Format::Json) => {
            let dump = if cli.emit == Emit::Ir {
                result.dump_ir()
            } else {
                result.scope.dump_global()
            };
            serde_json::to_string_pretty(&serde_json::json!({
                "file": result.file,
                "dump": dump,
            }))?
        }
    };
    Ok(text)
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let opts = load_options(&cli);
    log::debug!("options: {:?}", opts);

    // ── Read parse tree ──
    let source = std::fs::read_to_string(&cli.source)
        .unwrap_or_else(|e| fail(format_args!("{}: {}", cli.source.display(), e)));
    let program: Program = serde_json::from_str(&source)
        .unwrap_or_else(|e| fail(format_args!("{}: {}", cli.source.display(), e)));

    // ── Analyze ──
    let system = try_build_system_scope().unwrap_or_else(|e| fail(e));
    let file = cli
        .name
        .clone()
        .unwrap_or_else(|| cli.source.display().to_string());
    let result = analyze(&file, &program, &system, &opts);

    match emit(&cli, &result) {
        Ok(text) => {
            print!("{}", text);
            if !text.is_empty() && !text.ends_with('\n') {
                println!();
            }
        }
        Err(e) => fail(e),
    }

    if cli.emit != Emit::Report {
        for entry in result.report() {
            eprintln!("{}", entry);
        }
    }
    if result.has_errors() {
        std::process::exit(1);
    }
}
