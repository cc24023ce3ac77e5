//! herakles-host-exporter - version 0.1.0
//!
//! Host CPU, memory and disk metrics exporter with tracing logging.
//! This is the main entry point that initializes the server and handles subcommands.

use clap::Parser;
use std::sync::Arc;
use tokio::{net::TcpListener, signal, sync::watch};
use tracing::{debug, error, info, level_filters::LevelFilter, warn};

use herakles_host_exporter::cli::{Args, Commands, LogLevel};
use herakles_host_exporter::commands::{command_check, command_config, command_test};
use herakles_host_exporter::config::{
    resolve_config, show_config, validate_effective_config, Config,
};
use herakles_host_exporter::handlers;
use herakles_host_exporter::health_stats::ExporterStats;
use herakles_host_exporter::metrics::MetricsRegistry;
use herakles_host_exporter::sampler::{HostStats, Sampler};
use herakles_host_exporter::state::AppState;
use herakles_host_exporter::system::ProcfsHost;
use herakles_host_exporter::updater::run_collection_loop;

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(log_level: LogLevel) -> Result<(), Box<dyn std::error::Error>> {
    let filter = match log_level {
        LogLevel::Off => LevelFilter::OFF,
        LogLevel::Error => LevelFilter::ERROR,
        LogLevel::Warn => LevelFilter::WARN,
        LogLevel::Info => LevelFilter::INFO,
        LogLevel::Debug => LevelFilter::DEBUG,
        LogLevel::Trace => LevelFilter::TRACE,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Logging initialized with level: {:?}", log_level);
    Ok(())
}

/// Resolves and validates configuration.
/// Exits the process with error code 1 if either step fails.
fn load_validated_config(args: &Args) -> Config {
    let config = match resolve_config(args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Configuration invalid: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = validate_effective_config(&config) {
        eprintln!("❌ Configuration invalid: {}", e);
        std::process::exit(1);
    }
    config
}

/// Logical core count from procfs, falling back to the scheduler's view.
fn detect_core_count(host: &ProcfsHost) -> usize {
    match host.core_count() {
        Ok(count) => count,
        Err(e) => {
            let fallback = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            warn!(
                "Could not count cores from {}: {} - assuming {}",
                host.proc_root().display(),
                e,
                fallback
            );
            fallback
        }
    }
}

/// Completes on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT (Ctrl+C), shutting down gracefully...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}

/// Main application entry point.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Early config resolution for show/check modes
    if args.show_config || args.check_config {
        let config = load_validated_config(&args);

        if args.check_config {
            println!("✅ Configuration is valid");
            return Ok(());
        }

        return show_config(&config, args.config_format);
    }

    // Handle subcommands
    if let Some(command) = &args.command {
        if let Commands::Config {
            output,
            format,
            commented,
        } = command
        {
            return command_config(output.clone(), *format, *commented);
        }

        let config = load_validated_config(&args);

        return match command {
            Commands::Check => command_check(&config),
            Commands::Test {
                iterations,
                verbose,
            } => command_test(*iterations, *verbose, &config),
            Commands::Config { .. } => unreachable!("Config handled above"),
        };
    }

    // Load configuration for main server mode
    let config = load_validated_config(&args);

    setup_logging(config.log_level())?;

    info!("Starting herakles-host-exporter");

    let host = Arc::new(ProcfsHost::default());
    let core_count = detect_core_count(&host);
    info!("Detected {} logical cores", core_count);

    let registry = Arc::new(MetricsRegistry::new(core_count)?);
    debug!("Metrics registry initialized");

    let stats = Arc::new(ExporterStats::new());
    let sampler = Arc::new(Sampler::new(
        host,
        config.mount_path(),
        config.cpu_window(),
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let collection = tokio::spawn(run_collection_loop(
        sampler,
        registry.clone(),
        stats.clone(),
        config.interval(),
        shutdown_rx,
    ));

    let bind_host = config.bind_addr().to_string();
    let port = config.port();

    let state = AppState::new(registry, stats.clone(), config).shared();
    let app = handlers::router(state);

    let listener = match TcpListener::bind((bind_host.as_str(), port)).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}:{}: {}", bind_host, port, e);
            return Err(e.into());
        }
    };
    info!(
        "herakles-host-exporter listening on http://{}:{}",
        bind_host, port
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // Stop the collection loop
    let _ = shutdown_tx.send(true);
    if let Err(e) = collection.await {
        error!("Collection task failed: {}", e);
    }

    info!("\n{}", stats.render_table());

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    info!("herakles-host-exporter stopped gracefully");
    Ok(())
}
