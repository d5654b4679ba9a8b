mod clipboard;
mod config;
mod gate;
mod maintenance;
mod session;
mod store;
mod web;
mod workflow;

use std::net::SocketAddr;

use anyhow::{Context, Result};
use dotenvy::dotenv;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::{config::AppConfig, web::AppState};

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_tracing();

    if let Err(err) = app_main().await {
        error!(?err, "application error");
        std::process::exit(1);
    }
}

async fn app_main() -> Result<()> {
    let config = AppConfig::from_env().context("failed to load configuration")?;
    let port = config.port;
    info!(
        max_images = config.workflow.max_images,
        max_image_bytes = config.max_image_bytes,
        "configuration loaded"
    );

    let state = AppState::new(config)?;
    maintenance::spawn(state.clone());

    let app = web::router::build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "listening");

    let listener = TcpListener::bind(addr)
        .await
        .context("failed to bind listener")?;
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .init();
}
