//! Scan command - bulk scan a directory of photos for payment slips.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;
use tracing::debug;

use slipscan_core::models::config::SlipscanConfig;
use slipscan_core::models::slip::SlipRecord;
use slipscan_core::scan::ScanEvent;
use slipscan_core::service::ScanService;

use crate::providers::{DirectoryLibrary, SidecarRecognizer};

/// Arguments for the scan command.
#[derive(Args)]
pub struct ScanArgs {
    /// Directory to scan for slip photos
    #[arg(required = true)]
    dir: PathBuf,

    /// Output file for the found slips
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Scan only the newest N images
    #[arg(short, long)]
    limit: Option<usize>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON output
    Json,
    /// CSV output
    Csv,
    /// Plain text summary
    Text,
}

pub async fn run(args: ScanArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let start = Instant::now();

    // Load configuration
    let config = if let Some(path) = config_path {
        SlipscanConfig::from_file(std::path::Path::new(path))?
    } else {
        SlipscanConfig::default()
    };

    if !args.dir.is_dir() {
        anyhow::bail!("Not a directory: {}", args.dir.display());
    }

    let library = DirectoryLibrary::new(&args.dir).with_limit(args.limit);
    let service = ScanService::new(Arc::new(library), Arc::new(SidecarRecognizer), config);

    let (tx, mut rx) = mpsc::channel(256);

    // Drain events while the scan runs so emission never backs up
    let reporter = tokio::spawn(async move {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} photos {msg}",
                )
                .unwrap()
                .progress_chars("=>-"),
        );

        let mut slips: Vec<SlipRecord> = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                ScanEvent::Progress(progress) => {
                    pb.set_length(progress.total as u64);
                    pb.set_position(progress.processed as u64);
                    pb.set_message(format!("{} slips", progress.slips_found));
                }
                ScanEvent::PartialResults(chunk) => {
                    debug!("received chunk of {} slips", chunk.slips.len());
                    slips.extend(chunk.slips);
                }
            }
        }
        pb.finish_and_clear();
        slips
    });

    let summary = service.scan_all_photos(tx).await?;
    let slips = reporter.await?;

    println!(
        "{} Scanned {} photos in {:?}",
        style("✓").green(),
        summary.processed,
        start.elapsed()
    );
    println!("{} {} slips found", style("✓").green(), summary.slips_found);

    if let Some(output_path) = &args.output {
        let content = format_slips(&slips, args.format)?;
        fs::write(output_path, content)?;
        println!(
            "{} Output written to {}",
            style("✓").green(),
            output_path.display()
        );
    }

    Ok(())
}

fn format_slips(slips: &[SlipRecord], format: OutputFormat) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => Ok(serde_json::to_string_pretty(slips)?),
        OutputFormat::Csv => format_csv(slips),
        OutputFormat::Text => Ok(format_text(slips)),
    }
}

fn format_csv(slips: &[SlipRecord]) -> anyhow::Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record(["asset_id", "amount", "date", "created_at"])?;
    for slip in slips {
        wtr.write_record([
            slip.asset_id.clone(),
            slip.amount.to_string(),
            slip.date.clone(),
            slip.created_at.clone(),
        ])?;
    }

    let data = String::from_utf8(wtr.into_inner()?)?;
    Ok(data)
}

fn format_text(slips: &[SlipRecord]) -> String {
    let mut output = String::new();

    for slip in slips {
        output.push_str(&format!("{}\n", slip.asset_id));
        output.push_str(&format!("  Amount: {}\n", slip.amount));
        output.push_str(&format!("  Date:   {}\n", slip.date));
        output.push('\n');
    }

    output
}
