//! # tillroll CLI
//!
//! Command-line interface for thermal receipt printing.
//!
//! ## Usage
//!
//! ```bash
//! # Print a bill on the profile's printer
//! tillroll print --document bill.json --profile counter.json
//!
//! # List printers reachable over a transport
//! tillroll discover serial-bridge
//!
//! # Show the instruction program, or the encoded bytes, without a printer
//! tillroll preview --document bill.json
//! tillroll preview --document bill.json --hex
//!
//! # Run the HTTP API
//! tillroll serve --listen 0.0.0.0:8080
//! ```
//!
//! Logging goes to stderr and follows `RUST_LOG` (default `info,tillroll=debug`).

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tillroll::{
    document::ReceiptDocument,
    printer::{PrintSettings, PrinterProfile},
    server::{self, ServerConfig},
    service::{PrintOutcome, PrintService},
    transport::{TransportRegistry, TransportVariant},
};

/// tillroll - ESC/POS receipt printer utility
#[derive(Parser, Debug)]
#[command(name = "tillroll")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Settings file (JSON); defaults apply to missing fields
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Characters per line, overriding the settings file
    #[arg(long, global = true)]
    width: Option<usize>,

    /// Bytes per write, overriding the settings file
    #[arg(long, global = true)]
    chunk_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a receipt
    Print {
        /// Receipt document (JSON)
        #[arg(long, value_name = "FILE")]
        document: PathBuf,

        /// Printer profile (JSON)
        #[arg(long, value_name = "FILE")]
        profile: PathBuf,
    },

    /// List printers reachable over a transport
    Discover {
        #[arg(value_enum)]
        variant: TransportVariant,
    },

    /// Show the receipt without printing
    Preview {
        /// Receipt document (JSON)
        #[arg(long, value_name = "FILE")]
        document: PathBuf,

        /// Print the encoded frame as hex instead of the instruction list
        #[arg(long)]
        hex: bool,
    },

    /// Run the HTTP API
    Serve {
        /// Address to listen on
        #[arg(long, default_value = "127.0.0.1:8080")]
        listen: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] tillroll::error::ConfigError),

    #[error(transparent)]
    Print(#[from] tillroll::error::PrintError),

    #[error("{}: {source}", path.display())]
    Input {
        path: PathBuf,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tillroll=debug"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run(Cli::parse()).await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let settings = load_settings(&cli)?;

    match cli.command {
        Commands::Print { document, profile } => {
            let document: ReceiptDocument = read_json(&document)?;
            let profile: PrinterProfile = read_json(&profile)?;

            let registry = TransportRegistry::detect(&settings).await;
            let service = PrintService::new(registry, settings);
            match service.print_receipt(&document, &profile).await {
                Ok(PrintOutcome::Printed { bytes, chunks }) => {
                    println!(
                        "Printed bill {} ({} bytes, {} writes)",
                        document.bill.number, bytes, chunks
                    );
                }
                Ok(PrintOutcome::Cancelled) => println!("Cancelled."),
                Err(e) if e.is_not_ready() => {
                    eprintln!("Printer not ready.");
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Discover { variant } => {
            let registry = TransportRegistry::detect(&settings).await;
            let service = PrintService::new(registry, settings);

            let mut scan = service.discover_devices(variant);
            let mut found = 0;
            while let Some(device) = scan.next().await {
                found += 1;
                let mut tags = Vec::new();
                if device.paired {
                    tags.push("paired");
                }
                if device.simulated {
                    tags.push("simulated");
                }
                println!("{}  {}  {}", device.address, device.label(), tags.join(","));
            }
            if let Some(e) = scan.error() {
                eprintln!("Discovery stopped early: {}", e);
            }
            if found == 0 {
                println!("No printers found.");
            }
        }

        Commands::Preview { document, hex } => {
            let document: ReceiptDocument = read_json(&document)?;
            let service = PrintService::new(TransportRegistry::new(), settings);

            if hex {
                for line in service.frame(&document).chunks(16) {
                    let bytes: Vec<String> = line.iter().map(|b| format!("{:02X}", b)).collect();
                    println!("{}", bytes.join(" "));
                }
            } else {
                let program = service.program(&document);
                let json = serde_json::to_string_pretty(&program).map_err(std::io::Error::other)?;
                println!("{}", json);
            }
        }

        Commands::Serve { listen } => {
            let registry = TransportRegistry::detect(&settings).await;
            let config = ServerConfig {
                listen_addr: listen,
            };
            server::serve(config, PrintService::new(registry, settings)).await?;
        }
    }

    Ok(())
}

/// Settings from `--config` (or defaults) with CLI overrides applied.
fn load_settings(cli: &Cli) -> Result<PrintSettings, CliError> {
    let mut settings = match &cli.config {
        Some(path) => PrintSettings::load(path)?,
        None => PrintSettings::default(),
    };
    if let Some(width) = cli.width {
        settings.paper_width = width;
    }
    if let Some(chunk_size) = cli.chunk_size {
        settings.chunk_size = chunk_size;
    }
    settings.validate()?;
    Ok(settings)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let input = |source: Box<dyn std::error::Error + Send + Sync>| CliError::Input {
        path: path.to_path_buf(),
        source,
    };
    let contents = std::fs::read_to_string(path).map_err(|e| input(e.into()))?;
    serde_json::from_str(&contents).map_err(|e| input(e.into()))
}
