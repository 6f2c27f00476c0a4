use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use wp_mirror::wordpress::{RemoteGateway, WpClient};
use wp_mirror::{config, discover, pairing, reconcile};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Root folder of the documents to publish
    folder: PathBuf,
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    init_logging(cfg.app.log_file.as_deref())?;

    let gateway = WpClient::from_config(&cfg)?;
    gateway
        .test_connectivity()
        .await
        .context("cannot reach the WordPress REST API")?;
    if let Err(err) = gateway.test_translation_endpoint().await {
        warn!(%err, "Polylang connector unavailable; translation linking will fail");
    }

    let files = discover::scan(&args.folder, &cfg.app.excluded_folders)?;
    let documents = discover::load_documents(&files, &cfg);
    if documents.is_empty() {
        info!("no documents marked publish: true");
        return Ok(());
    }

    let index = pairing::build_index(&documents);
    let pairs = pairing::resolve(&documents, &index, &cfg.languages.secondary.folders);
    info!(documents = documents.len(), pairs = pairs.len(), "resolved publish plan");

    let summary = reconcile::reconcile(&pairs, &gateway, &cfg).await;

    let primary = &cfg.languages.primary.code;
    let secondary = &cfg.languages.secondary.code;
    info!("run summary:");
    info!("  pairs processed: {}", summary.pairs);
    info!("  {primary} created: {}, updated: {}", summary.primary_created, summary.primary_updated);
    info!("  {secondary} created: {}, updated: {}", summary.secondary_created, summary.secondary_updated);
    info!("  translations linked: {}", summary.linked);
    info!("  covers set: {}", summary.covers_set);
    info!("  failed: {}", summary.failed);
    if summary.persist_failures > 0 {
        warn!(
            "  {} metadata write(s) failed after remote success; re-run may duplicate posts",
            summary.persist_failures
        );
    }

    Ok(())
}

fn init_logging(log_file: Option<&str>) -> Result<()> {
    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact();
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(console_layer);

    match log_file {
        Some(path) => {
            if let Some(parent) = std::path::Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("cannot open log file {path}"))?;
            let file_layer = tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Arc::new(file));
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
    Ok(())
}
