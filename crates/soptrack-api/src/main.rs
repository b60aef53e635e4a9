//! # soptrack-api: Binary Entry Point
//!
//! Reads configuration from the environment, prepares the database, and
//! serves the web application.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use soptrack_api::config::AppConfig;
use soptrack_api::{auth, db, import, AppState};
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env();
    init_tracing(config.log_json);
    config.warn_insecure_defaults();

    let pool = db::connect(&config.database_url, 5)
        .await
        .with_context(|| format!("opening database {}", config.database_url))?;

    auth::ensure_default_admin(&pool, &config)
        .await
        .context("creating default admin account")?;

    if let Some(dir) = config.sop_dir.clone() {
        let pool = pool.clone();
        tokio::spawn(async move {
            let dir = PathBuf::from(dir);
            match import::import_if_empty(&pool, &dir).await {
                Ok(Some(summary)) => {
                    tracing::info!(inserted = summary.inserted, "startup document import complete")
                }
                Ok(None) => {}
                Err(e) => tracing::error!(dir = %dir.display(), "startup document import failed: {e}"),
            }
        });
    }

    let port = config.port;
    let app = soptrack_api::app(AppState::new(pool, config));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("SOPTrack listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("serving HTTP")?;

    Ok(())
}
