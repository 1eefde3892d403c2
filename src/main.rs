use clap::Parser;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod classify;
mod error;
mod language;
mod resolver;
mod routes;
mod views;

use resolver::BaseRoot;
use routes::AppState;

// --- Configuration ---
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// The directory browsing is confined to
    #[arg(
        short,
        long,
        value_name = "DIR",
        default_value = ".",
        env = "FILE_BROWSER_ROOT"
    )]
    root_dir: PathBuf,

    /// The network address to bind to
    #[arg(
        short,
        long,
        value_name = "ADDR",
        default_value = "127.0.0.1:5000",
        env = "FILE_BROWSER_ADDR"
    )]
    bind_addr: SocketAddr,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    let base = match BaseRoot::new(&args.root_dir) {
        Ok(base) => base,
        Err(e) => {
            error!("{}. Exiting.", e);
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    info!("Serving files from: {}", base.path().display());
    info!("Listening on: {}", args.bind_addr);

    let app = routes::app(Arc::new(AppState { base }));

    let listener = match tokio::net::TcpListener::bind(args.bind_addr).await {
        Ok(l) => l,
        Err(e) => {
            error!("Failed to bind to address {}: {}", args.bind_addr, e);
            eprintln!("Error: Failed to bind to address {}: {}", args.bind_addr, e);
            std::process::exit(1);
        }
    };
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
