use anyhow::{Context, Result};
use clap::Parser;
use harp_ingest::Registry;
use harp_ingest::dispatch;
use std::path::PathBuf;
use tracing::info;

/// Apply an operation string to a single ingested product and print a
/// summary of the resulting variables and history.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(name = "harp")]
struct Cli {
    /// Path to the input file
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Operation string, e.g. "keep(time,pressure);pressure >= 100[hPa]"
    #[arg(short = 'a', long = "apply", value_name = "OPERATIONS")]
    apply: Option<String>,

    /// Verbose output (overrides RUST_LOG with "debug")
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let args = Cli::parse();
    init_logging(args.verbose);

    let mut registry = Registry::new();
    registry.register(Box::new(harp_ingest::modules::text_grid::TextGridModule));

    info!(file = %args.file.display(), "ingesting");
    let mut product = dispatch(&registry, &args.file)
        .with_context(|| format!("failed to ingest {}", args.file.display()))?;

    if let Some(source) = &args.apply {
        let pipeline = harp_dsl::compile(source).with_context(|| format!("failed to compile '{source}'"))?;
        harp_ops::execute(&pipeline, &mut product).with_context(|| format!("failed to apply '{source}'"))?;
    }

    println!("source: {}", product.source_product.as_deref().unwrap_or("-"));
    println!("variables:");
    for variable in product.variables() {
        let unit = variable.unit.as_deref().unwrap_or("-");
        println!(
            "  {:<20} {:?} {:<16} {}",
            variable.name,
            variable.dimension_lengths(),
            variable.element_type().to_string(),
            unit
        );
    }
    if !product.history().is_empty() {
        println!("history:");
        for line in product.history().lines() {
            println!("  {line}");
        }
    }

    Ok(())
}
