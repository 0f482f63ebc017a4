use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio::sync::oneshot;
use tracing::{error, info};

use relay_bridge::config::CONSOLE_NAME;
use relay_bridge::{
    serve_metrics, ChatBackend, Config, Connection, ConnectionConfig, ConsoleBackend, LineBackend,
    MetricsReporter, PeerOptions, PrometheusReporter, RelayHub, RestartScheduler,
    TokioRestartScheduler,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse configuration
    let config = Config::parse();

    // Initialize logging
    let filter = if config.verbose { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    info!("Starting relay bridge v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        return Err(e);
    }

    // Initialize metrics
    PrometheusReporter::init_metrics()?;

    // Create infrastructure implementations (dependency injection)
    let scheduler: Arc<dyn RestartScheduler> = Arc::new(TokioRestartScheduler::current());
    let metrics: Arc<dyn MetricsReporter> = Arc::new(PrometheusReporter::new());
    let settings = config
        .to_relay_settings()
        .map_err(|e| anyhow::anyhow!("{}", e))?;
    let timeouts = config.to_line_timeouts();

    let mut builder = RelayHub::builder(scheduler, metrics).settings(settings);
    for spec in &config.backends {
        info!(
            "  Backend {}: {} as {} in {:?}",
            spec.name,
            spec.endpoint.address(),
            spec.endpoint.identity(),
            spec.endpoint.channel()
        );
        let backend: Arc<dyn ChatBackend> =
            Arc::new(LineBackend::new(spec.endpoint.clone(), timeouts));
        let connection = Connection::new(
            ConnectionConfig::new(spec.name.clone(), spec.verbosity)
                .map_err(|e| anyhow::anyhow!("{}", e))?,
            backend,
        );
        builder = builder.connection(
            connection,
            PeerOptions {
                reconnect: Some(spec.reconnect),
                honors_shutdown_phrase: spec.honors_shutdown_phrase,
            },
        );
    }

    let console_backend: Arc<dyn ChatBackend> = Arc::new(ConsoleBackend::stdio(CONSOLE_NAME));
    let console = Connection::new(
        ConnectionConfig::new(CONSOLE_NAME, config.console_verbosity)
            .map_err(|e| anyhow::anyhow!("{}", e))?,
        console_backend,
    );
    let hub = Arc::new(builder.console(console).build());

    if let Some(port) = config.metrics_port {
        tokio::spawn(serve_metrics(port, Arc::clone(&hub)));
        info!("Metrics server started on port {}", port);
    }

    // Network connections open on the blocking pool; they keep themselves alive from here on
    let starter = Arc::clone(&hub);
    tokio::task::spawn_blocking(move || starter.start());

    // The console loop blocks on stdin, so it gets a plain thread that never holds up exit
    let (console_done_tx, console_done_rx) = oneshot::channel::<()>();
    let console_hub = Arc::clone(&hub);
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            console_hub.run_console();
            let _ = console_done_tx.send(());
        })?;

    tokio::select! {
        _ = console_done_rx => info!("Console input closed"),
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            hub.announce_from_console("Goodbye.");
        }
    }

    let stopper = Arc::clone(&hub);
    tokio::task::spawn_blocking(move || stopper.shutdown()).await?;

    info!("Relay bridge shutdown complete");
    Ok(())
}
