use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use mimalloc::MiMalloc;
use tracing::{error, info};

use audio_exporter::api::{ApiServer, ApiServerConfig, AppState};
use audio_exporter::config::{AppConfig, DEFAULT_LISTEN_ADDR};
use audio_exporter::logging::{LoggingOptions, init_logging};
use audio_exporter::metrics::MetricsCollector;
use audio_exporter::monitor::{
    FfmpegLauncher, FfmpegLauncherConfig, FfmpegProbe, MonitorService, MonitorServiceConfig,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

/// Upper bound on waiting for monitor tasks during shutdown.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// Prometheus exporter for live audio stream health.
#[derive(Parser, Debug)]
#[command(name = "audio-exporter", version, about)]
struct Args {
    /// Configuration file
    #[arg(short, long, env = "AUDIO_EXPORTER_CONFIG", default_value = "config.yml")]
    config: PathBuf,

    /// Listen address (`host:port` or `:port`), overrides the config file
    #[arg(short, long, env = "AUDIO_EXPORTER_LISTEN")]
    listen: Option<String>,

    /// Also write daily rolling log files to this directory
    #[arg(long, env = "AUDIO_EXPORTER_LOG_DIR")]
    log_dir: Option<PathBuf>,

    /// Emit console logs as JSON
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let _log_guard = init_logging(&LoggingOptions {
        log_dir: args.log_dir.clone(),
        json: args.json_logs,
    })?;

    let config = AppConfig::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let listen_addr = args
        .listen
        .clone()
        .or_else(|| config.listen.clone())
        .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string());

    let collector = Arc::new(MetricsCollector::new());
    let streams = config.targets();

    let monitor = MonitorService::start(
        streams.clone(),
        MonitorServiceConfig::from(&config),
        collector.clone(),
        Arc::new(FfmpegLauncher::new(FfmpegLauncherConfig::from(&config))),
        Arc::new(FfmpegProbe::from(&config)),
    );

    let server = ApiServer::new(
        ApiServerConfig { listen_addr },
        AppState::new(collector, streams),
    );
    let server_token = monitor.cancellation_token().child_token();
    let mut server_task = tokio::spawn({
        let token = server_token.clone();
        async move { server.run(token).await }
    });

    let server_result = tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
            None
        }
        result = &mut server_task => Some(result),
    };

    server_token.cancel();
    monitor.shutdown(SHUTDOWN_TIMEOUT).await;

    let server_result = match server_result {
        Some(result) => result,
        None => server_task.await,
    };

    match server_result {
        Ok(Ok(())) => {
            info!("audio-exporter stopped");
            Ok(())
        }
        Ok(Err(e)) => {
            error!("API server failed: {}", e);
            Err(e.into())
        }
        Err(e) => Err(anyhow::anyhow!("API server task panicked: {}", e)),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
