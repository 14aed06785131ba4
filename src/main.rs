use anyhow::Context;
use jobtrail::ollama::OllamaClient;
use jobtrail::{create_app, db, store, AppState};
use migration::{Migrator, MigratorTrait};
use std::env;
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let conn = db::connect().await.context("database connection failed")?;
    Migrator::up(&conn, None)
        .await
        .context("migrations failed")?;

    // One-time import from the pre-database file store, if one is present.
    if let Err(e) = store::import_legacy_jobs(&conn, Path::new("jobs.json")).await {
        tracing::warn!("legacy jobs.json import failed: {}", e);
    }

    let ollama = OllamaClient::from_env().context("failed to build Ollama client")?;
    let state = AppState::new(conn, ollama);
    let app = create_app(state);

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "127.0.0.1:3000".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Server running on http://{}", bind_addr);
    axum::serve(listener, app).await?;
    Ok(())
}
