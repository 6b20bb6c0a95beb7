use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use klipp_scanner_lib::{logging, mime_type_for_path, ApiClient, ScanConfig, ScanFile, ScanService};
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "klipp-scanner")]
#[command(about = "Klipp document scanner - extract and normalize receipt/invoice fields", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan one or more documents and print the normalized result as JSON
    Scan {
        /// Documents to send in a single extraction request
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Folder the document will be filed under
        #[arg(long)]
        folder_id: Option<String>,

        /// MIME type for every file (default: guessed from the first file's extension)
        #[arg(long)]
        mime_type: Option<String>,

        /// Fail on read/network/decode errors instead of printing an empty result
        #[arg(long)]
        strict: bool,
    },

    /// Show whether the extraction backend is configured
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init("info");
    let cli = Cli::parse();

    match cli.command {
        Commands::Status => {
            println!("{}", ScanConfig::status());
        }
        Commands::Scan {
            files,
            folder_id,
            mime_type,
            strict,
        } => {
            let service = ScanService::new(ApiClient::from_env().context("Extraction backend is not configured")?);
            info!(
                url = %service.backend().config().scan_url(),
                "Klipp scanner v{}",
                env!("CARGO_PKG_VERSION")
            );

            let inputs: Vec<ScanFile> = files
                .iter()
                .map(|path| {
                    let mime = mime_type
                        .clone()
                        .unwrap_or_else(|| mime_type_for_path(path).to_string());
                    ScanFile::from_path(path.clone(), mime)
                })
                .collect();

            let result = if strict {
                service
                    .scan_strict(&inputs, folder_id.as_deref())
                    .await
                    .map_err(|e| anyhow::anyhow!(e.user_message()))?
            } else {
                service.scan(&inputs, folder_id.as_deref()).await?
            };
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
    }

    Ok(())
}
