use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use silly_lang::ast::printer;
use silly_lang::error::Error;
use silly_lang::language::{self, ProgramRequest};
use silly_lang::services::ServiceRegistry;

#[derive(Parser, Debug)]
#[command(name = "silly", about = "A label-and-goto scripting language interpreter")]
struct Cli {
    /// Source file to run
    file: PathBuf,

    /// Dump consolidated tokens and exit
    #[arg(long)]
    dump_tokens: bool,

    /// Dump AST and exit
    #[arg(long)]
    dump_ast: bool,

    /// AST output format
    #[arg(long, default_value = "sexp", value_parser = ["sexp", "json"])]
    ast_format: String,
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true),
        )
        .with(filter)
        .init();
}

fn report(error: Error) -> anyhow::Error {
    let code = error.code();
    match error {
        Error::Compile(e) => {
            eprintln!("{:?}", miette::Report::new(e));
            anyhow!("{code}: compilation failed")
        }
        other => anyhow!("{code}: {other}"),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let source = std::fs::read_to_string(&cli.file)
        .with_context(|| format!("read source file '{}'", cli.file.display()))?;
    let name = cli.file.display().to_string();

    if cli.dump_tokens {
        let mut tokens = language::token_stream(&name, &source).map_err(report)?;
        while let Some(token) = tokens.pop() {
            println!("{token}");
        }
        return Ok(());
    }

    if cli.dump_ast {
        let program = language::parse_source(&name, &source).map_err(report)?;
        match cli.ast_format.as_str() {
            "json" => println!("{}", printer::to_json(&program).context("serialize AST")?),
            _ => print!("{}", printer::to_sexp(&program)),
        }
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("start async runtime")?;
    let registry = ServiceRegistry::with_builtins();
    let request = ProgramRequest::single(name, source);
    runtime
        .block_on(language::run_program(
            &registry,
            &request,
            Box::new(std::io::stdout()),
        ))
        .map_err(report)?;
    Ok(())
}
