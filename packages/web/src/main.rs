//! MindCare HTTP server.
//!
//! Reads settings from the environment and `mindcare.toml`, picks the hosted
//! backend or the in-memory demo backend, and serves the JSON routes with
//! cookie sessions.

use std::sync::Arc;

use api::backend::{Backend, MemoryBackend, SupabaseBackend};
use api::crypto::NoteKey;
use api::services::seed_demo;
use api::video::HmsClient;
use api::{Platform, Settings};
use chrono::Local;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod error;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        error!("Server failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;
    let config = settings.load_config()?;
    let note_key = NoteKey::derive(&settings.notes_passphrase)?;

    let backend: Arc<dyn Backend> = match &settings.backend {
        Some(remote) => {
            info!("Using backend at {}", remote.url);
            Arc::new(SupabaseBackend::new(&remote.url, &remote.anon_key))
        }
        None => {
            warn!("SUPABASE_URL not set, running in demo mode with in-memory data");
            Arc::new(MemoryBackend::new())
        }
    };

    let mut platform =
        Platform::new(backend, note_key).with_join_policy(config.schedule.join_policy());
    match settings.video(&config) {
        Some(video) => platform = platform.with_video(Arc::new(HmsClient::new(video))),
        None => warn!("Video credentials missing, joining sessions is disabled"),
    }

    if settings.backend.is_none() {
        seed_demo(&platform, Local::now().date_naive()).await?;
    }

    let addr = settings
        .bind_addr
        .clone()
        .unwrap_or_else(|| config.server.bind_addr.clone());
    let app = routes::router(AppState::new(platform, config));

    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received terminate signal, shutting down"),
    }
}
