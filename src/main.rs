//! spaql command-line driver.
//!
//! Mirrors the harness call pattern: load one SIMPLE source, then evaluate
//! any number of PQL queries against it.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use itertools::Itertools;
use spaql::QueryEngine;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "spaql")]
#[command(version)]
#[command(about = "Static program-query engine for the SIMPLE language")]
#[command(long_about = r#"
spaql parses a SIMPLE program into a program knowledge base and evaluates
PQL queries against it.

Example usage:
  spaql parse program.simple
  spaql query program.simple -q "stmt s; Select s such that Follows(1, s)"
  spaql query program.simple --queries-file queries.txt --json
"#)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a SIMPLE source file and report what was extracted
    Parse {
        /// Input SIMPLE file
        input: PathBuf,

        /// Dump the AST as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate PQL queries against a SIMPLE source file
    Query {
        /// Input SIMPLE file
        input: PathBuf,

        /// An inline query; may be given several times
        #[arg(short, long = "query")]
        queries: Vec<String>,

        /// A file with one query per line
        #[arg(long)]
        queries_file: Option<PathBuf>,

        /// Emit results as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Parse { input, json } => cmd_parse(&input, json),
        Commands::Query {
            input,
            queries,
            queries_file,
            json,
        } => cmd_query(&input, queries, queries_file.as_deref(), json),
    }
}

/// RUST_LOG wins over the verbosity flags when set.
fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_parse(input: &std::path::Path, json: bool) -> Result<()> {
    let source = std::fs::read_to_string(input)
        .with_context(|| format!("failed to read {}", input.display()))?;
    let program = spaql::frontend::parse(&source)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&program)?);
        return Ok(());
    }

    let pkb = spaql::Pkb::build(&program)?;
    println!(
        "{}: {} procedures, {} statements, {} variables, {} constants",
        input.display(),
        pkb.all_procedures().len(),
        pkb.all_statements().len(),
        pkb.all_variables().len(),
        pkb.all_constants().len(),
    );
    Ok(())
}

fn cmd_query(
    input: &std::path::Path,
    mut queries: Vec<String>,
    queries_file: Option<&std::path::Path>,
    json: bool,
) -> Result<()> {
    if let Some(path) = queries_file {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        queries.extend(
            text.lines()
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(String::from),
        );
    }
    anyhow::ensure!(!queries.is_empty(), "no queries given; use -q or --queries-file");

    let mut engine = QueryEngine::new();
    engine.parse_file(input)?;

    let mut reports = Vec::new();
    for query in &queries {
        let mut results = Vec::new();
        engine.evaluate(query, &mut results);
        if json {
            reports.push(serde_json::json!({
                "query": query,
                "results": results,
            }));
        } else {
            println!("{}", results.iter().join(", "));
        }
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&reports)?);
    }
    Ok(())
}
