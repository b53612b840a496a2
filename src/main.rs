mod config;
mod error;
mod routes;
mod state;
mod sync;
mod utils {
    pub mod token;
}

use std::sync::Arc;

use anyhow::Context;
use axum::{Extension, Router};
use sqlx::SqlitePool;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::{
    config::Config,
    routes::search::SearchGateway,
    state::SharedHub,
    utils::token::{self, TokenCache},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cfg = Config::from_env()?;

    let pool = SqlitePool::connect(&cfg.database_url)
        .await
        .with_context(|| format!("opening {}", cfg.database_url))?;
    token::init_db(&pool).await?;

    let http   = reqwest::Client::new();
    let tokens = TokenCache::new(pool, http.clone(), cfg.accounts_url.clone(), cfg.spotify.clone());
    let search = Arc::new(SearchGateway::new(http, cfg.api_url.clone(), tokens));
    let hub    = SharedHub::default();

    let app = Router::new()
        .merge(routes::router())
        .merge(routes::pages(&cfg.static_dir))
        .layer(Extension(hub))
        .layer(Extension(cfg.heartbeat))
        .layer(Extension(search));

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    info!(addr = %cfg.bind_addr, "listening");
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
