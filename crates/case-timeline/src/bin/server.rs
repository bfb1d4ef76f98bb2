//! Timeline backend binary
//!
//! Run with: cargo run -p case-timeline --bin case-timeline-server

use case_timeline::{config::TimelineConfig, server::TimelineServer};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "case-timeline-server", version, about = "Legal document timeline backend")]
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

    println!(
        r#"
╔═══════════════════════════════════════════════════════════╗
║                       Case Timeline                       ║
║         Dated events from case documents, with chat       ║
╚═══════════════════════════════════════════════════════════╝
"#
    );

    let config = TimelineConfig::load(args.config.as_deref())?;

    tracing::info!("Configuration loaded");
    tracing::info!("  - LLM endpoint: {}", config.llm.endpoint);
    tracing::info!("  - OCR: {}", if config.ocr.enabled { config.ocr.model_url.as_str() } else { "disabled" });
    tracing::info!("  - Page cache: {}", config.cache.root.display());
    tracing::info!("  - Upload dir: {}", config.upload.upload_dir.display());
    tracing::info!("  - Timeline ordering: {}", config.timeline.ordering);

    let server = TimelineServer::new(config).await?;

    println!("\nServer starting...");
    println!("  API: http://{}", server.address());
    println!("  Health: http://{}/health", server.address());
    println!("  API Info: http://{}/api/info", server.address());
    println!("\nEndpoints:");
    println!("  POST /api/documents/upload          - Upload PDF/DOCX files");
    println!("  GET  /api/documents                 - List documents");
    println!("  GET  /api/documents/timeline/events - Ordered timeline");
    println!("  POST /api/chat                      - Ask about the timeline");
    println!("\nPress Ctrl+C to stop\n");

    server.start().await?;

    Ok(())
}
