use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use markerboard::config::{Cli, Config, default_config_dir, default_config_path};
use markerboard::db::Database;
use markerboard::handler::AppState;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    // Data (the database file) lives next to the config file.
    let (config_path, data_dir) = match args.config_path {
        Some(path) => {
            let path = PathBuf::from(path);
            let dir = path
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir)
        }
        None => (default_config_path(), default_config_dir()),
    };

    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("failed to create data directory {:?}: {}", data_dir, e);
        std::process::exit(1);
    }

    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    tracing::info!("markerboard.svc starting");

    let cfg = Config::new(&config_path.to_string_lossy()).unwrap_or_else(|e| {
        tracing::error!(error = %e, path = ?config_path, "failed to load config file");
        std::process::exit(1);
    });

    let db = Arc::new(Database::new(&cfg.app, &data_dir));
    tracing::info!(path = ?db.path(), "database will be opened on first use");

    let app = markerboard::app(AppState::new(db.clone(), &cfg.app));
    let address = format!("0.0.0.0:{}", cfg.app.get_port());

    let listener = tokio::net::TcpListener::bind(&address).await.unwrap_or_else(|e| {
        tracing::error!(error = %e, "failed to setup tcp listener");
        std::process::exit(1);
    });

    let cancellation_token = CancellationToken::new();
    let signal_token = cancellation_token.clone();
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl+c");
            return;
        }
        tracing::info!("ctrl+c signal received, preparing to shutdown");
        signal_token.cancel();
    });

    tracing::info!("markerboard.svc running on {}", &address);
    let server = axum::serve(listener, app).with_graceful_shutdown(cancellation_token.cancelled_owned());
    if let Err(err) = server.await {
        tracing::error!(error = %err, "server error");
    }

    if let Err(e) = db.shutdown().await {
        tracing::error!(error = %markerboard::unpack_error(&e), "failed to close store cleanly");
    }
    tracing::info!("markerboard.svc going off, graceful shutdown complete");
}
