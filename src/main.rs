//! Telemetry Relay entry point.
//!
//! - `monitor [DOMAINS]` joins the selected domains and writes raw records to stdout
//! - `serve` reads a record stream and broadcasts events to WebSocket viewers

mod os_signals;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use telemetry_relay::adapters::aggregator::{AggregatorSettings, FanInAggregator, SharedSink};
use telemetry_relay::adapters::credentials::FilesystemCredentialResolver;
use telemetry_relay::adapters::http::relay_router;
use telemetry_relay::adapters::transport::{InMemoryTransport, SimulatedFeed};
use telemetry_relay::adapters::websocket::{BroadcastHub, IngestSettings, StreamIngestor, WebSocketState};
use telemetry_relay::config::{AppConfig, HttpConfig, UpstreamSource, DOMAINS_ENV_VAR};

use os_signals::wait_for_shutdown_signal;

/// Multi-domain telemetry aggregator and real-time WebSocket relay
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve viewers from an upstream record stream (default)
    Serve {
        /// Read the record stream from stdin instead of spawning the upstream command
        #[arg(long)]
        stdin: bool,
    },
    /// Join domains and write their samples to stdout as raw records
    Monitor {
        /// Domain selection, e.g. `0,2-4,6`
        domains: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = AppConfig::load().context("failed to load configuration")?;
    config.validate().context("invalid configuration")?;
    init_tracing(&config.http);

    match cli.command.unwrap_or(Command::Serve { stdin: false }) {
        Command::Serve { stdin } => serve(config, stdin).await,
        Command::Monitor { domains } => monitor(config, domains).await,
    }
}

/// Logs go to stderr so `monitor` keeps stdout for records.
fn init_tracing(http: &HttpConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&http.log_filter));
    let registry = tracing_subscriber::registry().with(filter);

    if http.json_logs {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry.with(fmt::layer().with_writer(std::io::stderr)).init();
    }
}

/// Stop flag raised once by the first termination signal.
fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
    let (tx, rx) = watch::channel(false);
    let signal_tx = tx.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            tracing::warn!(error = %e, "signal handlers unavailable, falling back to ctrl-c");
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
        }
        let _ = signal_tx.send(true);
    });
    (tx, rx)
}

async fn stopped(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn serve(config: AppConfig, force_stdin: bool) -> Result<()> {
    let (_stop, shutdown) = shutdown_channel();
    let hub = Arc::new(BroadcastHub::new(config.http.viewer_buffer));

    let addr = config.http.bind;
    let router = relay_router(WebSocketState::new(hub.clone()), &config.http.origins());
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    tracing::info!(addr = %addr, version = env!("CARGO_PKG_VERSION"), "relay listening");

    let upstream = config.upstream.clone();
    let ingestor = StreamIngestor::new(
        hub.clone(),
        IngestSettings {
            read_chunk_bytes: upstream.read_chunk_bytes,
            max_buffer_bytes: upstream.max_buffer_bytes,
        },
    );
    let ingest_shutdown = shutdown.clone();
    let source = if force_stdin {
        UpstreamSource::Stdin
    } else {
        upstream.source
    };
    let ingest = tokio::spawn(async move {
        match source {
            UpstreamSource::Stdin => match ingestor.run_stdin(ingest_shutdown).await {
                Ok(_) => tracing::info!("stdin closed, viewers keep their connections"),
                Err(e) => tracing::error!(error = %e, "stdin ingestion failed"),
            },
            UpstreamSource::Command => {
                let args = upstream.args_list();
                match ingestor.run_command(&upstream.command, &args, ingest_shutdown).await {
                    Ok(summaries) => {
                        let events: u64 = summaries.iter().map(|s| s.parser.events).sum();
                        tracing::info!(command = %upstream.command, events, "upstream command finished");
                    }
                    Err(e) => tracing::error!(command = %upstream.command, error = %e, "upstream command failed"),
                }
            }
        }
    });

    axum::serve(listener, router)
        .with_graceful_shutdown(stopped(shutdown))
        .await
        .context("server error")?;

    if let Err(e) = ingest.await {
        tracing::warn!(error = %e, "ingest task aborted");
    }
    tracing::info!("relay stopped");
    Ok(())
}

async fn monitor(config: AppConfig, cli_domains: Option<String>) -> Result<()> {
    let (_stop, shutdown) = shutdown_channel();

    let env_domains = std::env::var(DOMAINS_ENV_VAR).ok();
    let selection = config
        .monitor
        .domain_selection(cli_domains.as_deref(), env_domains.as_deref());
    for term in &selection.rejected {
        tracing::warn!(term = %term, "ignoring malformed domain term");
    }
    let domains = selection.domains;
    tracing::info!(domains = ?domains.iter().map(|d| d.value()).collect::<Vec<_>>(), "domains selected");

    let transport = InMemoryTransport::new();
    let feed = SimulatedFeed::start(transport.clone(), &domains, config.monitor.simulate_interval());

    let settings = AggregatorSettings::default()
        .with_participant_name(config.monitor.participant_name.clone())
        .with_idle_poll(config.monitor.idle_poll());
    let aggregator = FanInAggregator::new(Arc::new(transport), SharedSink::stdout(), settings)
        .with_credentials(Arc::new(FilesystemCredentialResolver::from_env()));

    let report = aggregator.run(domains, shutdown).await;
    let published = feed.stop();

    for failed in &report.setup.failed {
        tracing::warn!(domain = %failed.domain, reason = %failed.reason, "domain was not joined");
    }
    tracing::info!(
        active = report.setup.active.len(),
        failed = report.setup.failed.len(),
        published,
        records = report.records_emitted(),
        "monitor stopped"
    );
    Ok(())
}
