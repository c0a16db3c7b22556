//! The Dash checker CLI.
//!
//! Provides the `dashc` command with the following subcommand:
//!
//! - `dashc check <program.json>` - Type-check a JSON-encoded program
//!
//! Options:
//! - `--schema` - JSON schema description (default from dash.toml)
//! - `--config` - Path to dash.toml
//! - `--source` - Original program text, used to label diagnostics
//! - `--query-type` - Name of the type whose fields are global
//! - `--json` - Output diagnostics as JSON (one object per line)
//! - `--no-color` - Disable colorized output

mod config;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use dash_typeck::ast::Node;
use dash_typeck::diagnostics::{render_diagnostic, DiagnosticOptions};
use dash_typeck::error::CheckError;
use dash_typeck::schema::Schema;

use crate::config::Config;

#[derive(Parser)]
#[command(name = "dashc", version, about = "The Dash type checker")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Type-check a JSON-encoded program against a schema
    Check {
        /// Path to the JSON-encoded program AST
        program: PathBuf,

        /// Path to the JSON schema description
        #[arg(long)]
        schema: Option<PathBuf>,

        /// Path to the config file (defaults to ./dash.toml when present)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Original program text the AST spans point into
        #[arg(long)]
        source: Option<PathBuf>,

        /// Name of the type whose fields are in scope at the top level
        #[arg(long = "query-type")]
        query_type: Option<String>,

        /// Output diagnostics as JSON (one object per line) instead of human-readable format
        #[arg(long)]
        json: bool,

        /// Disable colorized output
        #[arg(long = "no-color")]
        no_color: bool,
    },
}

/// Resolved settings for one `check` run, flags over config.
struct CheckArgs {
    program: PathBuf,
    schema: PathBuf,
    source: Option<PathBuf>,
    query_type: Option<String>,
    diag_opts: DiagnosticOptions,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check {
            program,
            schema,
            config,
            source,
            query_type,
            json,
            no_color,
        } => {
            let config = match Config::load(config.as_deref()) {
                Ok(config) => config,
                Err(e) => fail(&e, json),
            };
            init_logging(&config.check.log_level);

            let json = json || config.check.json;
            let schema = match schema.or(config.schema.path) {
                Some(path) => path,
                None => fail("no schema given; pass --schema or set [schema] path", json),
            };
            let args = CheckArgs {
                program,
                schema,
                source,
                query_type: query_type.or(config.schema.query_type),
                diag_opts: DiagnosticOptions {
                    color: !no_color && !json,
                    json,
                },
            };
            match run_check(&args) {
                Ok(true) => {}
                Ok(false) => process::exit(1),
                Err(e) => fail(&e, json),
            }
        }
    }
}

/// Install the fmt subscriber on stderr. `RUST_LOG` wins over the config.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn fail(message: &str, json: bool) -> ! {
    if json {
        let msg = serde_json::json!({
            "code": "C0001",
            "severity": "error",
            "message": message,
            "file": "",
            "spans": [],
        });
        eprintln!("{}", msg);
    } else {
        eprintln!("error: {}", message);
    }
    process::exit(1);
}

fn read(path: &Path) -> Result<String, String> {
    std::fs::read_to_string(path).map_err(|e| format!("Failed to read '{}': {}", path.display(), e))
}

/// Run the checker. Returns false when the program has type errors, which
/// have already been reported.
fn run_check(args: &CheckArgs) -> Result<bool, String> {
    let schema_text = read(&args.schema)?;
    let mut schema = Schema::from_json(&schema_text)
        .map_err(|e| format!("Failed to parse schema '{}': {}", args.schema.display(), e))?;
    if let Some(name) = &args.query_type {
        schema = schema.with_query_type(name.clone());
    }
    debug!(types = schema.types.len(), "loaded schema");

    let program_text = read(&args.program)?;
    let program: Node = serde_json::from_str(&program_text)
        .map_err(|e| format!("Failed to parse program '{}': {}", args.program.display(), e))?;
    let source = match &args.source {
        Some(path) => read(path)?,
        None => String::new(),
    };

    info!(program = %args.program.display(), "checking");
    match dash_typeck::check(&schema, &program) {
        Ok(scheme) => {
            println!("{}", scheme);
            Ok(true)
        }
        Err(CheckError::Schema(e)) => Err(format!("invalid schema: {}", e)),
        Err(CheckError::Type(e)) => {
            let file_name = args
                .source
                .as_ref()
                .unwrap_or(&args.program)
                .display()
                .to_string();
            eprintln!("{}", render_diagnostic(&e, &source, &file_name, &args.diag_opts));
            Ok(false)
        }
    }
}
