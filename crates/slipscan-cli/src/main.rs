//! CLI application for Thai payment slip scanning.

mod commands;
mod providers;

use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::{delete, scan, slip};

/// Thai payment slip scanner - Extract amounts and dates from slip photos
#[derive(Parser)]
#[command(name = "slipscan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a directory of photos for payment slips
    Scan(scan::ScanArgs),

    /// Extract fields from a single slip image
    Slip(slip::SlipArgs),

    /// Remove a slip image from disk
    Delete(delete::DeleteArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Commands::Scan(args) => scan::run(args, cli.config.as_deref()).await,
        Commands::Slip(args) => slip::run(args, cli.config.as_deref()).await,
        Commands::Delete(args) => delete::run(args).await,
    }
}
