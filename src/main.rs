//! Water Quality Monitoring Service - Main Daemon
//!
//! Synthesizes per-region water quality readings for the Northeast India
//! sensor network, scores them, and:
//! 1. Serves them over a JSON HTTP API (dashboard, analytics, alerting)
//! 2. Republishes every reading, plus an alert for each poor/fair one, to
//!    the downstream backend on a fixed interval
//!
//! Usage:
//!   cargo run --release                            # API on port 5000, transmission on
//!   cargo run --release -- --port 8080             # Different port
//!   cargo run --release -- --regions regions.toml  # Region catalog from file
//!   cargo run --release -- --no-transmit           # API only
//!
//! Environment (also read from .env):
//!   WQMON_PORT, WQMON_REGIONS_FILE, WQMON_SEND_INTERVAL_SECS,
//!   WQMON_REFERENCE_REFRESH_SECS, WQMON_BACKEND_URL, WQMON_API_KEY,
//!   WQMON_PUBSUB, WQMON_REFERENCE_URL, WQMON_REFERENCE_RESOURCE,
//!   WQMON_REFERENCE_API_KEY, WQMON_LOG, WQMON_LOG_JSON

use std::env;
use std::process;
use std::sync::{Arc, RwLock};

use wqmon_service::config::{self, ServiceConfig};
use wqmon_service::daemon::{TransmissionWorker, WorkerConfig};
use wqmon_service::endpoint::{self, Api};
use wqmon_service::ingest::ReferenceSource;
use wqmon_service::ingest::fixtures::FixtureSource;
use wqmon_service::ingest::ogd::OgdSource;
use wqmon_service::logging;
use wqmon_service::publish::{HttpPublisher, LogPublisher, Publisher};
use wqmon_service::regions::RegionCatalog;
use wqmon_service::service::MonitorContext;

/// Request-handling threads for the HTTP endpoint.
const ENDPOINT_WORKERS: usize = 8;

fn main() {
    dotenv::dotenv().ok();
    let mut config = ServiceConfig::from_env();
    let mut transmit = true;

    // Parse command-line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" => {
                match args.get(i + 1).and_then(|p| p.parse().ok()) {
                    Some(port) => config.port = port,
                    None => {
                        eprintln!("Error: --port requires a port number");
                        process::exit(1);
                    }
                }
                i += 2;
            }
            "--regions" => {
                match args.get(i + 1) {
                    Some(path) => config.regions_file = Some(path.clone()),
                    None => {
                        eprintln!("Error: --regions requires a file path");
                        process::exit(1);
                    }
                }
                i += 2;
            }
            "--no-transmit" => {
                transmit = false;
                i += 1;
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                eprintln!("Usage: {} [--port PORT] [--regions FILE] [--no-transmit]", args[0]);
                process::exit(1);
            }
        }
    }

    if let Err(e) = logging::init_logging(&config.log_filter, config.log_json) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    println!("🌊 Water Quality Monitoring Service");
    println!("===================================\n");

    // Region catalog
    let catalog = match &config.regions_file {
        Some(path) => match config::load_region_catalog(path) {
            Ok(catalog) => catalog,
            Err(e) => {
                eprintln!("\n❌ {}\n", e);
                process::exit(1);
            }
        },
        None => RegionCatalog::northeast_india(),
    };
    println!("📍 Monitoring {} regions: {}", catalog.len(), catalog.names().join(", "));

    // Reference data
    let source: Box<dyn ReferenceSource> = match &config.reference_url {
        Some(url) => match OgdSource::new(
            url,
            &config.reference_resource,
            &config.reference_api_key,
            &catalog,
        ) {
            Ok(source) => {
                println!("📊 Reference data: {}", url);
                Box::new(source)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Reference client unavailable; using built-in samples");
                Box::new(FixtureSource)
            }
        },
        None => {
            println!("📊 Reference data: built-in CPCB samples");
            Box::new(FixtureSource)
        }
    };

    let context = Arc::new(MonitorContext::new(
        catalog,
        source,
        config.reference_refresh_interval,
    ));

    // Downstream publishing
    let settings = Arc::new(RwLock::new(config.transmission_settings()));
    let publisher: Box<dyn Publisher> =
        match HttpPublisher::new(Arc::clone(&settings), config.api_key.clone(), config.pubsub) {
            Ok(publisher) => Box::new(publisher),
            Err(e) => {
                tracing::warn!(error = %e, "HTTP client unavailable; readings will only be logged");
                Box::new(LogPublisher)
            }
        };
    match &config.backend_url {
        Some(url) => println!("📡 Backend: {} (every {}s)", url, config.send_interval.as_secs()),
        None => println!("📡 Backend: not configured, readings are logged only"),
    }

    let worker = Arc::new(TransmissionWorker::new(
        Arc::clone(&context),
        publisher,
        settings,
        WorkerConfig::default(),
    ));
    if transmit {
        worker.start();
    } else {
        println!("   Transmission disabled (--no-transmit)");
    }

    println!("\n🚀 Server starting on http://0.0.0.0:{}", config.port);
    println!("   GET  /api/status - System status");
    println!("   GET  /api/sensors/latest - Latest readings");
    println!("   GET  /api/sensors/alerts - Active alerts");
    println!("   GET  /api/transmission/stats - Transmission health");
    println!("   Press Ctrl+C to stop\n");

    let api = Arc::new(Api { context, worker });
    if let Err(e) = endpoint::start_endpoint_server(api, config.port, ENDPOINT_WORKERS) {
        eprintln!("\n❌ {}", e);
        process::exit(1);
    }
}
