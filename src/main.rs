//! Logica CLI (spec §6 "CLI surface").

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use logica::{CompileOptions, Config, Engine};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "logica", about = "Compile Datalog-family Logica programs to SQL", version)]
struct Cli {
    /// Override `@Engine`: one of sqlite, psql, bigquery, duckdb.
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Colon-separated search path for `import` statements; may repeat.
    #[arg(long = "import-root", global = true, value_delimiter = ':')]
    import_root: Vec<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Emit SQL for `predicate` to stdout.
    Compile { file: PathBuf, predicate: String },
    /// Delegate the compiled SQL to an external engine driver (out of scope here).
    Run { file: PathBuf, predicate: String },
    /// Emit the parsed-and-rewritten AST as JSON (spec §6 "AST JSON output").
    ParseAst { file: PathBuf },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = Config::load().unwrap_or_default();
    let import_roots = resolve_import_roots(&cli.import_root, &config);

    let result = match &cli.command {
        Command::Compile { file, predicate } => run_compile(file, predicate, &cli.engine, &import_roots, &config),
        Command::Run { file, predicate } => run_run(file, predicate),
        Command::ParseAst { file } => run_parse_ast(file, &import_roots),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("LOGICA_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// `LOGICAPATH` (colon-separated) is merged ahead of `--import-root`, then
/// the config file's `import_roots`, per spec.md §6.
fn resolve_import_roots(cli_roots: &[PathBuf], config: &Config) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    if let Ok(path) = std::env::var("LOGICAPATH") {
        roots.extend(path.split(':').filter(|s| !s.is_empty()).map(PathBuf::from));
    }
    roots.extend(cli_roots.iter().cloned());
    roots.extend(config.import_roots.iter().cloned());
    roots
}

fn run_compile(file: &PathBuf, predicate: &str, engine_override: &Option<String>, import_roots: &[PathBuf], config: &Config) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let engine = match engine_override {
        Some(name) => Engine::from_name(name).ok_or_else(|| anyhow::anyhow!("unknown --engine '{name}'"))?,
        None => config.default_engine,
    };
    let options = CompileOptions {
        import_roots: import_roots.to_vec(),
        engine,
        recursion_default_depth: config.recursion_default_depth,
        flag_overrides: Default::default(),
    };
    let file_name = file.to_string_lossy().to_string();
    let sql = logica::compile_source(&source, &file_name, predicate, &options).with_context(|| format!("compiling {predicate}"))?;
    println!("{sql}");
    Ok(())
}

fn run_run(_file: &PathBuf, _predicate: &str) -> anyhow::Result<()> {
    bail!("`run` delegates to an external engine driver, which is not implemented here")
}

fn run_parse_ast(file: &PathBuf, import_roots: &[PathBuf]) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let file_name = file.to_string_lossy().to_string();
    let (rules, statements) = logica::parse_and_rewrite(&source, &file_name, import_roots).with_context(|| format!("parsing {file_name}"))?;
    let json = logica::json_export::export_program(&statements, &rules, &file_name);
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
