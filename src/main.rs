use anyhow::Result;
use axum::Router;
use bucket_emulator::{
    StorageService,
    config::{self, Backend},
    routes::routes::routes,
    stores::sqlite,
};
use std::{fs, io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

const MAX_DB_CONNECTIONS: u32 = 5;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting bucket-emulator with config: {:?}", cfg);

    // --- Initialize the storage collaborator ---
    let storage = match cfg.backend {
        Backend::Memory => {
            if migrate {
                tracing::info!("In-memory backend has no schema to migrate.");
                return Ok(());
            }
            StorageService::in_memory(cfg.public_url.clone())
        }
        Backend::Sqlite => {
            ensure_db_parent(&cfg.database_url)?;
            let db = Arc::new(sqlite::connect(&cfg.database_url, MAX_DB_CONNECTIONS).await?);
            sqlite::run_migrations(&db).await?;

            // --- Handle migration mode ---
            if migrate {
                tracing::info!("Database migration complete.");
                return Ok(()); // exit after migration
            }
            StorageService::sqlite(db, cfg.public_url.clone())
        }
    };

    // --- Build router ---
    let app: Router = routes().with_state(storage);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Create the directory holding a file-backed SQLite database.
fn ensure_db_parent(database_url: &str) -> Result<()> {
    let db_path = database_url
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:")
        .trim_start_matches("file:");
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    if db_path.is_empty() || db_path.starts_with(":memory:") {
        return Ok(());
    }
    tracing::debug!("Interpreted SQLite path => {}", db_path);

    if let Some(parent) = Path::new(db_path).parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
            tracing::info!("Created missing directory {:?}", parent);
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {}", err);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
