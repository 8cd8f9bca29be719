use anyhow::{Context, Result};
use chrono::{Datelike, Local};
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use csv2txf::brokers::resolve_broker;
use csv2txf::diagnostics::LogSink;
use csv2txf::txf;

/// Converts a brokerage capital-gains export to TXF for import into tax
/// software.
#[derive(Parser, Debug)]
#[command(name = "csv2txf", version, about)]
struct Args {
    /// Broker name (amtd, ib, tdameritrade, vanguard, schwab); detected
    /// from the file content when omitted
    #[arg(long)]
    broker: Option<String>,

    /// Input file
    #[arg(short = 'f', long = "file")]
    filename: PathBuf,

    /// Output file, leave empty for stdout
    #[arg(short = 'o', long = "outfile")]
    out_filename: Option<PathBuf>,

    /// Tax year; defaults to the previous calendar year
    #[arg(long)]
    year: Option<i32>,
}

fn main() -> Result<()> {
    // Logs go to stderr so the TXF output stays pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let today = Local::now().date_naive();
    let tax_year = args.year.unwrap_or(today.year() - 1);

    let content = fs::read_to_string(&args.filename)
        .with_context(|| format!("failed to read {}", args.filename.display()))?;

    let broker = resolve_broker(args.broker.as_deref(), &content)?;
    tracing::info!("converting with the {} adapter, tax year {tax_year}", broker.name());

    let txn_list = broker.parse(&content, Some(tax_year), &mut LogSink)?;
    let txf_out = txf::render(&txn_list, today).join("\n");

    match args.out_filename {
        Some(path) => fs::write(&path, txf_out)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{txf_out}"),
    }

    Ok(())
}
