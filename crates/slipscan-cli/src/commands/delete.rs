//! Delete command - remove a slip image from disk.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use console::style;

use slipscan_core::models::config::SlipscanConfig;
use slipscan_core::service::ScanService;

use crate::providers::{DirectoryLibrary, SidecarRecognizer};

/// Arguments for the delete command.
#[derive(Args)]
pub struct DeleteArgs {
    /// Slip image to remove
    #[arg(required = true)]
    image: PathBuf,
}

pub async fn run(args: DeleteArgs) -> anyhow::Result<()> {
    let service = ScanService::new(
        Arc::new(DirectoryLibrary::new(".")),
        Arc::new(SidecarRecognizer),
        SlipscanConfig::default(),
    );

    service
        .delete_slip_image(&args.image.to_string_lossy())
        .await?;

    println!("{} Removed {}", style("✓").green(), args.image.display());
    Ok(())
}
