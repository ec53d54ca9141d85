//! huginnd - chat relay daemon.
//!
//! Serves the chat relay, the completion endpoint and the page tools over
//! HTTP and WebSocket.

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use tracing::{info, warn};

use huginn::chat::{ChatStore, RelayHub};
use huginn::extract::PageFetcher;
use huginn::server::config::{Config, Secrets};
use huginn::server::{AppState, router};
use huginn::{CompletionGateway, GroqClient, Huginn, HuginnError};

/// Huginn daemon: real-time chat relay with AI completions.
#[derive(Parser)]
#[command(name = "huginnd")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Huginn chat relay daemon")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,

    /// Address to bind to (overrides the config file).
    #[arg(short, long, env = "HUGINN_ADDRESS")]
    address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    // Load configuration
    let config = Config::load(args.config.as_deref())?;
    let secrets = Secrets::load()?;

    let gateway = build_gateway(&config, &secrets)?;
    let hub = RelayHub::new(ChatStore::new());
    let fetcher = PageFetcher::new(config.fetch_timeout())?;

    let address = args.address.unwrap_or_else(|| config.server.address.clone());
    let addr: SocketAddr = address
        .parse()
        .map_err(|e| HuginnError::Configuration(format!("Invalid address: {e}")))?;

    let state = AppState {
        gateway: Arc::new(gateway),
        hub: Arc::new(hub),
        fetcher,
    };
    let app = router(state, config.server.static_dir.as_deref());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(version = huginn::PKG_VERSION, %addr, "huginnd starting");
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the [`CompletionGateway`] from configuration.
fn build_gateway(config: &Config, secrets: &Secrets) -> huginn::Result<CompletionGateway> {
    let groq = GroqClient::new(secrets.groq_api_key(), config.groq_options())?;
    if !groq.has_api_key() {
        warn!("no Groq API key configured; /api/chat will answer 503");
    }

    let mut builder = Huginn::builder()
        .provider(Arc::new(groq))
        .retry(config.retry_config())
        .response_cache(config.cache_config())
        .pacing(config.pacing())
        .history_limit(config.completion.history_limit);

    if let Some(ref prompt) = config.completion.system_prompt {
        builder = builder.system_prompt(prompt);
    }

    builder.build()
}
