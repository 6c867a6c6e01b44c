#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use server::config::{CliArgs, DemoConfig};
use server::demo::run_demo;
use server::http::{RequestCounter, serve};
use server::telemetry::init_telemetry;
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = DemoConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let shutdown_token = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown_token.clone()));

    let http = config.http_addr.clone().map(|addr| {
        tokio::spawn(serve(
            addr,
            RequestCounter::new(),
            shutdown_token.clone(),
        ))
    });

    let res = run(&config, shutdown_token.clone(), http).await;

    shutdown_token.cancel();
    providers.shutdown();
    res
}

async fn run(
    config: &DemoConfig,
    shutdown_token: CancellationToken,
    http: Option<tokio::task::JoinHandle<anyhow::Result<()>>>,
) -> anyhow::Result<()> {
    let summary = run_demo(config, shutdown_token).await?;

    println!(
        "Submitted {} tasks ({} rejected), received {} results{}",
        summary.submitted,
        summary.rejected,
        summary.received,
        if summary.deadline_hit {
            " before the deadline cancelled the pool"
        } else {
            ""
        }
    );

    // The HTTP server keeps running until Ctrl+C or SIGTERM.
    if let Some(http) = http {
        #[cfg(feature = "tracing")]
        tracing::info!("Demo complete, still serving HTTP until interrupted");
        http.await??;
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shut down successfully");
    Ok(())
}

fn log_startup_info(_config: &DemoConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting worker pool demo with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting worker pool demo with {} workers and {} tasks",
            _config.pool.worker_count(),
            _config.num_tasks
        );
    }
}

async fn shutdown_signal(shutdown_token: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Failed to install SIGTERM handler: {_e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::error!("Failed to install Ctrl+C handler: {_e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
        () = shutdown_token.cancelled() => return,
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Shutdown signal received, terminating gracefully...");

    shutdown_token.cancel();
}
