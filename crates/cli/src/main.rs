use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use sha2::{Digest, Sha256};
use tokio::signal;
use tokio::sync::broadcast;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tunedeck_core::{
    downloader::SingleFlight,
    enrichment::Enricher,
    load_config, output,
    process::TokioProcessRunner,
    validate_config, AcquisitionRequest, Config, Downloader, ProgressHandle, SanitizedConfig,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(query) = args.next() else {
        bail!("usage: tunedeck <query-or-url> [output-dir]");
    };
    let output_dir = args.next().map(PathBuf::from).unwrap_or_else(|| {
        std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
    });

    // Determine config path
    let config_path = std::env::var("TUNEDECK_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration; a missing file falls back to defaults.
    let config = if config_path.exists() {
        info!("Loading configuration from {:?}", config_path);
        load_config(&config_path)
            .with_context(|| format!("Failed to load config from {:?}", config_path))?
    } else {
        info!("No config file at {:?}, using defaults", config_path);
        Config::default()
    };
    validate_config(&config).context("Configuration validation failed")?;

    let config_json = serde_json::to_string(&SanitizedConfig::from(&config)).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!(
        version = VERSION,
        config_hash = &config_hash[..16],
        "tunedeck starting"
    );

    // Register metrics so a future exporter surface sees them.
    let _registry = prometheus_registry()?;

    // Progress printer: tool output lines go straight to stdout.
    let (progress, mut progress_rx) = ProgressHandle::channel(config.progress.buffer);
    let printer = tokio::spawn(async move {
        while let Some(line) = progress_rx.recv().await {
            println!("{}", line.text);
        }
    });

    // Ctrl-C translates into a shutdown broadcast that kills the tool.
    let (shutdown_tx, _) = broadcast::channel(4);
    {
        let shutdown_tx = shutdown_tx.clone();
        tokio::spawn(async move {
            if signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, shutting down");
                let _ = shutdown_tx.send(());
            }
        });
    }

    let runner = Arc::new(TokioProcessRunner::new(config.process.clone(), progress));
    let downloader = Downloader::new(
        runner,
        config.downloader.clone(),
        SingleFlight::new(),
        shutdown_tx,
    );

    let request = AcquisitionRequest::new(query, output_dir);
    let result = downloader.acquire(request).await?;

    info!(
        downloaded = result.downloaded_files.len(),
        skipped = result.skipped.len(),
        missing = result.skipped_or_missing.len(),
        source = result.source.as_str(),
        "acquisition complete"
    );

    // Enrich everything the job touched.
    let enricher = Enricher::new(config.enrichment.clone())
        .context("Failed to build enrichment providers")?;

    let mut targets: Vec<(String, String)> = Vec::new();
    for path in &result.downloaded_files {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            let (artist, title) = output::split_artist_title(stem);
            targets.push((output::primary_artist(&artist), output::clean_title(&title)));
        }
    }
    targets.extend(result.skipped.iter().cloned());

    for (artist, title) in targets {
        let enriched = enricher.enrich(&artist, &title).await;
        println!(
            "{}",
            serde_json::to_string_pretty(&enriched).unwrap_or_default()
        );
    }

    drop(downloader);
    printer.abort();

    Ok(())
}

fn prometheus_registry() -> Result<prometheus::Registry> {
    let registry = prometheus::Registry::new();
    for metric in tunedeck_core::metrics::all_metrics() {
        registry
            .register(metric)
            .context("Failed to register metric")?;
    }
    Ok(registry)
}
