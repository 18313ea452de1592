//! catfeed server binary
//!
//! Run with: catfeed [BIND_ADDR]
//!
//! Candidate endpoints are read from `CATFEED_SOURCES`, a comma-separated
//! list of URLs each serving a JSON array of cat records:
//!
//!   CATFEED_SOURCES=http://localhost:8080/cats.json catfeed 127.0.0.1:50051
//!
//! Talk to it with any line-oriented client:
//!
//!   echo '{"method":"ListCats"}' | nc localhost 50051
//!   echo '{"method":"StreamCatsByBreed","breed":"siamese"}' | nc localhost 50051

use std::net::SocketAddr;
use std::sync::Arc;

use catfeed::server::config::DEFAULT_PORT;
use catfeed::{
    BroadcastEngine, CatServer, CatService, Catalog, ChatRelay, Error, HttpSource, IngestConfig,
    IngestionScheduler, ServerConfig, SubscriptionRegistry,
};
use tracing_subscriber::filter::{Directive, EnvFilter};

/// Environment variable listing candidate endpoints
const SOURCES_ENV: &str = "CATFEED_SOURCES";

fn parse_bind_addr(arg: &str) -> Result<SocketAddr, String> {
    // Replace "localhost" with "127.0.0.1"
    let normalized = arg.replace("localhost", "127.0.0.1");

    // Try parsing as SocketAddr first (includes port)
    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    // Try parsing as IP address without port
    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, DEFAULT_PORT));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn source_endpoints() -> Vec<String> {
    std::env::var(SOURCES_ENV)
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(String::from)
        .collect()
}

fn print_usage() {
    eprintln!("Usage: catfeed [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:{})", DEFAULT_PORT);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  {}   Comma-separated candidate endpoint URLs", SOURCES_ENV);
    eprintln!("  RUST_LOG          Log filter (default: catfeed=info)");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  catfeed                       # binds to 0.0.0.0:{}", DEFAULT_PORT);
    eprintln!("  catfeed localhost             # binds to 127.0.0.1:{}", DEFAULT_PORT);
    eprintln!("  catfeed 127.0.0.1:6000        # binds to 127.0.0.1:6000");
}

#[tokio::main]
async fn main() -> catfeed::Result<()> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ServerConfig::default();
    if let Some(addr_str) = args.get(1) {
        match parse_bind_addr(addr_str) {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    // Initialize logging
    let directive = "catfeed=info"
        .parse::<Directive>()
        .map_err(|e| Error::Config(format!("log directive: {}", e)))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    let endpoints = source_endpoints();
    if endpoints.is_empty() {
        tracing::warn!("{} is empty; the catalog will stay empty", SOURCES_ENV);
    }

    let catalog = Arc::new(Catalog::new());
    let registry = Arc::new(SubscriptionRegistry::new());
    let engine = Arc::new(BroadcastEngine::new(Arc::clone(&registry)));
    let chat = Arc::new(ChatRelay::new());

    let scheduler = Arc::new(IngestionScheduler::new(
        IngestConfig::default(),
        Arc::clone(&catalog),
        engine,
        HttpSource::new(endpoints)?,
    ));

    let service = Arc::new(CatService::new(catalog, registry, chat));
    let server = CatServer::new(config, service);

    // Bind failure aborts startup before any fetch
    let listener = server.bind().await?;

    scheduler.seed().await;
    let ingest_handle = scheduler.spawn();

    let result = server
        .serve(listener, async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await;

    ingest_handle.abort();
    tracing::info!("Server stopped");
    result
}
