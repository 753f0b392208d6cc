//! prism-agg - evaluate an aggregate over JSON documents
//!
//! Reads a JSON array or JSON lines from a file or stdin, runs one regular
//! aggregate over them and prints the result as JSON.

use anyhow::{Context as _, Result};
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, Level};

use prism_agg::{
    AggregateConfig, AggregateModifiers, AggregateSpec, ExpressionRef, FieldExpression, Item,
    ParallelAggregator,
};

#[derive(Parser)]
#[command(name = "prism-agg")]
#[command(about = "Evaluate an aggregate function over JSON documents")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Aggregate function name, e.g. SUM or COUNT
    #[arg(short, long)]
    function: String,

    /// Field paths passed as operands; none means COUNT(*)
    #[arg(long = "field")]
    fields: Vec<String>,

    /// Apply DISTINCT
    #[arg(long)]
    distinct: bool,

    /// JSON configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads, overrides the configuration
    #[arg(short, long)]
    threads: Option<usize>,

    /// Increase logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Input file (stdin if not specified)
    input: Option<PathBuf>,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn read_documents(input: Option<&PathBuf>) -> Result<Vec<Item>> {
    let text = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("cannot read {}", path.display()))?,
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).context("cannot read stdin")?;
            text
        }
    };

    let documents: Vec<serde_json::Value> = if text.trim_start().starts_with('[') {
        serde_json::from_str(&text).context("input is not a JSON array")?
    } else {
        text.lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(n, line)| {
                serde_json::from_str(line).with_context(|| format!("invalid JSON on line {}", n + 1))
            })
            .collect::<Result<_>>()?
    };
    Ok(documents.into_iter().map(Item::from).collect())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = match &cli.config {
        Some(path) => AggregateConfig::from_file(path)
            .with_context(|| format!("cannot load configuration {}", path.display()))?,
        None => AggregateConfig::default(),
    };
    if let Some(threads) = cli.threads {
        config = config.with_threads(threads);
    }

    let operands: Vec<ExpressionRef> = cli
        .fields
        .iter()
        .map(|path| Arc::new(FieldExpression::new(path)) as ExpressionRef)
        .collect();
    let mut spec = AggregateSpec::new(&cli.function, operands)?;
    if cli.distinct {
        spec = spec.with_modifiers(AggregateModifiers::DISTINCT);
    }

    let items = read_documents(cli.input.as_ref())?;
    debug!(rows = items.len(), aggregate = %spec, "input loaded");

    let aggregator = ParallelAggregator::new(config)?;
    let result = aggregator.aggregate(&spec, &items)?;
    // MISSING prints nothing
    if let Some(json) = result.to_json() {
        println!("{}", serde_json::to_string(&json)?);
    }
    Ok(())
}
