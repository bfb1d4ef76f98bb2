//! OCR page service binary
//!
//! Run with: cargo run -p case-timeline --bin case-timeline-ocr

use case_timeline::{config::TimelineConfig, ocr_server::OcrServer};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "case-timeline-ocr", version, about = "Page-cached OCR service")]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "CASE_TIMELINE_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "case_timeline=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = TimelineConfig::load(args.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - OCR model: {}", config.ocr.model_url);
    tracing::info!("  - Resolution: {} dpi", config.ocr.resolution);
    tracing::info!("  - Page cache: {}", config.cache.root.display());

    let server = OcrServer::new(config).await?;

    println!("\nOCR service starting...");
    println!("  Status: http://{}/", server.address());
    println!("  Parse:  POST http://{}/parse (file, start_page, end_page)", server.address());
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
