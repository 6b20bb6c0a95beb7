//! Normalize a saved extraction response offline.

use anyhow::{Context, Result};
use clap::Parser;
use klipp_scanner_lib::{logging, ocr};
use std::io::Read;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dump_scan")]
#[command(about = "Print the normalized result for a saved extraction response", long_about = None)]
struct Args {
    /// Response JSON, either the `{ success, data }` envelope or a bare data object (default: stdin)
    path: Option<PathBuf>,

    /// Treat a bare data object as a successful extraction
    #[arg(long)]
    success: bool,
}

fn main() -> Result<()> {
    logging::init("debug");
    let args = Args::parse();

    let raw = match &args.path {
        Some(p) => std::fs::read_to_string(p).with_context(|| format!("Could not read {}", p.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Could not read stdin")?;
            buf
        }
    };
    let value: serde_json::Value = serde_json::from_str(&raw).context("Input is not valid JSON")?;
    let result = ocr::normalize_saved(value, args.success).context("Input is not an extraction response")?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
