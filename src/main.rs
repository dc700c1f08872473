//! partscan - Live part-number scan-match engine demo
//!
//! Replays scripted recognizer frames through the engine and prints the
//! lookup and match events a presentation layer would subscribe to.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use partscan::catalog::{CatalogItem, CatalogSearch, HttpCatalog, StaticCatalog};
use partscan::config::{self, EngineConfig};
use partscan::events::{EngineEvent, ResolveOutcome};
use partscan::{EngineMode, ScanEngine, TextFragment};

/// partscan - replay recognizer frames against the catalog
#[derive(Parser, Debug)]
#[command(name = "partscan")]
#[command(about = "Live part-number scan-match engine demo")]
struct Args {
    /// JSON file with scripted frames (array of arrays of fragments)
    #[arg(short, long)]
    frames: PathBuf,

    /// Catalog items JSON file for the built-in demo catalog
    #[arg(long)]
    catalog_file: Option<PathBuf>,

    /// Catalog service base URL (overrides the config file and
    /// --catalog-file)
    #[arg(long)]
    catalog_url: Option<String>,

    /// Config file path (defaults to the user config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    let mut engine_config = load_or_default_config(args.config.as_deref());
    if let Some(url) = &args.catalog_url {
        engine_config.lookup.catalog_url = Some(url.clone());
    }

    let catalog = build_catalog(&engine_config, args.catalog_file.as_deref())?;
    let engine = ScanEngine::new(engine_config.clone(), catalog);
    let events = engine.subscribe();

    let frames = load_frames(&args.frames)?;
    info!("Replaying {} frames", frames.len());

    let interval = Duration::from_millis(engine_config.region.min_frame_interval_ms.max(1));
    for frame in frames {
        let summary = engine.process_frame(frame);
        if summary.processed {
            info!(
                "Frame: {} fragments kept, {} candidates, {} lookups",
                summary.fragments_kept, summary.candidates, summary.lookups_started
            );
        }
        drain_events(&events);

        if engine.mode() == EngineMode::Frozen {
            break;
        }
        std::thread::sleep(interval);
    }

    // Let outstanding lookups finish before reporting
    let deadline = Instant::now() + Duration::from_secs(5);
    while !engine.progress().in_flight.is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
        drain_events(&events);
    }
    drain_events(&events);

    let progress = engine.progress();
    info!(
        "Session finished: {} keys resolved, {} lookup failures",
        progress.resolved.len(),
        engine.lookup_failures()
    );

    match engine.match_result() {
        Some(result) => {
            println!("MATCH {}", result.matched_item.number);
            for conflict in &result.conflicts {
                println!("  conflict: {}", conflict.number);
            }
        }
        None => println!("NO MATCH"),
    }

    Ok(())
}

/// Load configuration from the given path, the user config directory, or
/// fall back to defaults
fn load_or_default_config(path: Option<&std::path::Path>) -> EngineConfig {
    let candidate = path
        .map(|p| p.to_path_buf())
        .or_else(|| config::default_config_path().ok());

    if let Some(path) = candidate {
        if path.exists() {
            if let Ok(config) = config::load_config(&path) {
                info!("Loaded configuration from {:?}", path);
                return config;
            }
        }
    }
    info!("Using default configuration");
    EngineConfig::default()
}

/// Pick the catalog implementation: HTTP when a URL is configured, else the
/// in-memory demo catalog
fn build_catalog(
    config: &EngineConfig,
    catalog_file: Option<&std::path::Path>,
) -> Result<Arc<dyn CatalogSearch>> {
    if let Some(url) = &config.lookup.catalog_url {
        info!("Using catalog service at {}", url);
        return Ok(Arc::new(HttpCatalog::new(url.clone())));
    }

    let items: Vec<CatalogItem> = match catalog_file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read catalog file {:?}", path))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid catalog file {:?}", path))?
        }
        None => vec![
            CatalogItem::new("C123-1"),
            CatalogItem::new("C123-17"),
            CatalogItem::new("C123-10"),
            CatalogItem::new("X900-5"),
        ],
    };

    info!("Using in-memory catalog with {} items", items.len());
    Ok(Arc::new(StaticCatalog::new(items)))
}

/// Load scripted frames from a JSON file
fn load_frames(path: &std::path::Path) -> Result<Vec<Vec<TextFragment>>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read frames file {:?}", path))?;
    let frames: Vec<Vec<TextFragment>> =
        serde_json::from_str(&content).with_context(|| format!("Invalid frames file {:?}", path))?;
    Ok(frames)
}

/// Print any pending engine events
fn drain_events(events: &crossbeam_channel::Receiver<EngineEvent>) {
    while let Ok(event) = events.try_recv() {
        match event {
            EngineEvent::KeyResolved { key, outcome } => {
                let outcome = match outcome {
                    ResolveOutcome::Matched => "matched",
                    ResolveOutcome::NoMatch => "no match",
                };
                info!("Key {:?} resolved: {}", key, outcome);
            }
            EngineEvent::MatchFrozen(result) => {
                info!(
                    "Frozen on {:?} with {} conflicts",
                    result.matched_item.number,
                    result.conflicts.len()
                );
            }
            EngineEvent::Restarted => info!("Session restarted"),
        }
    }
}
