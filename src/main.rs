use anyhow::Result;
use axum::Router;
use post_drafts::{
    config::AppConfig,
    routes,
    services::backend::{self, BackendClient, Credentials},
    state::AppState,
};
use std::{io::ErrorKind, path::Path, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config + migrate flag ---
    let (cfg, migrate) = AppConfig::from_env_and_args()?;

    tracing::info!(
        "Starting post-drafts on {} (bucket `{}`, database {})",
        cfg.addr(),
        cfg.bucket,
        cfg.database_url
    );

    // --- Ensure storage directory exists ---
    if !Path::new(&cfg.storage_dir).exists() {
        std::fs::create_dir_all(&cfg.storage_dir)?;
        tracing::info!("Created storage directory at {}", cfg.storage_dir);
    }

    // --- Initialize SQLite connection ---
    let db = Arc::new(backend::connect(&cfg.database_url).await?);
    backend::run_migrations(&db).await?;

    if migrate {
        tracing::info!("Database migration complete.");
        return Ok(());
    }

    // --- Backend client + services ---
    let credentials = Credentials::from_service_key(cfg.service_role_key.as_deref());
    if credentials == Credentials::Anon {
        tracing::warn!(
            "No service role key configured; deleting a draft will leave its media in storage"
        );
    }
    let client = BackendClient::new(
        db,
        cfg.storage_dir.clone(),
        cfg.public_base_url.clone(),
        credentials,
    );
    let state = AppState::new(client, &cfg.bucket)?;

    // --- Build router ---
    let app: Router = routes::routes::routes(cfg.max_upload_bytes).with_state(state);

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
    axum::serve(listener, app).await?;

    Ok(())
}
