//! Slip command - extract fields from a single slip image.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use console::style;
use rust_decimal::Decimal;

use slipscan_core::models::config::SlipscanConfig;
use slipscan_core::service::ScanService;

use crate::providers::{DirectoryLibrary, SidecarRecognizer};

/// Arguments for the slip command.
#[derive(Args)]
pub struct SlipArgs {
    /// Slip image to scan
    #[arg(required = true)]
    image: PathBuf,

    /// Print the full result as JSON
    #[arg(long)]
    json: bool,
}

pub async fn run(args: SlipArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    // Load configuration
    let config = if let Some(path) = config_path {
        SlipscanConfig::from_file(Path::new(path))?
    } else {
        SlipscanConfig::default()
    };

    let root = args
        .image
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    let library = DirectoryLibrary::new(root);
    let service = ScanService::new(Arc::new(library), Arc::new(SidecarRecognizer), config);

    let result = service
        .scan_payment_slip(&args.image.to_string_lossy())
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("{} {}", style("Image:").bold(), result.image_path);
    if result.amount > Decimal::ZERO {
        println!("{} {}", style("Amount:").bold(), result.amount);
    } else {
        println!("{} {}", style("Amount:").bold(), style("not found").yellow());
    }
    if result.date.is_empty() {
        println!("{} {}", style("Date:").bold(), style("not found").yellow());
    } else {
        println!("{} {}", style("Date:").bold(), result.date);
    }

    Ok(())
}
