mod cli;

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use boardbox::config::Config;
use boardbox::observability::Metrics;
use boardbox::spawn;
use cli::Cli;

const DEBUG_FILE: &str = "./debug.log";

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing();

    let config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("ERROR: {err}");
            return ExitCode::FAILURE;
        }
    };

    let metrics = Metrics::new();
    let pipelines = spawn::run(&config, &metrics).await;

    if pipelines.is_empty() {
        info!("no board pipelines running, exiting");
        return ExitCode::SUCCESS;
    }

    shutdown_signal().await;

    // Each board's dumper stops independently.
    for pipeline in pipelines {
        pipeline.shutdown().await;
    }
    ExitCode::SUCCESS
}

/// Stderr output plus a best-effort append-mode debug log file; failure
/// to open the file is a non-fatal warning.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let debug_layer = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(DEBUG_FILE)
    {
        Ok(file) => Some(
            tracing_subscriber::fmt::layer()
                .with_writer(Arc::new(file))
                .with_ansi(false),
        ),
        Err(err) => {
            eprintln!("WARN: cannot write to debug file: {err}");
            None
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(debug_layer)
        .init();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate()).expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Shutdown signal received");
}
