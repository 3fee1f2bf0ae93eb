//! offline-proxy entry point.
//!
//! Boots the worker against the configured origin and cache database, then
//! serves its events as MCP tools over stdio. Logging goes to stderr to avoid
//! interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offline_client::{AppOrigin, FetchClient, FetchConfig};
use offline_core::{AppConfig, CacheDb};
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod page;
mod tools;
mod worker;

use page::{PwaConfig, PwaTools};
use worker::{Worker, report_unhandled};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(
        origin = %config.origin,
        cache = %config.cache_name(),
        db = %config.db_path.display(),
        "starting offline-proxy on stdio transport"
    );

    let db = CacheDb::open(&config.db_path).await?;
    let origin = AppOrigin::parse(&config.origin)?;
    let network = FetchClient::new(FetchConfig::from(&config), origin)?;
    let worker = Arc::new(Worker::new(&config, db, Arc::new(network))?);

    let starting = worker.clone();
    tokio::spawn(async move {
        if let Err(e) = starting.start().await {
            report_unhandled("startup install", &e);
        }
    });

    let page = Arc::new(PwaTools::new(PwaConfig::from(&config), worker.clone()));
    page.init().await;

    let handler = handler::OfflineProxyServer::new(worker, page.clone());
    let result = match serve_server(handler, stdio()).await {
        Ok(server) => server.waiting().await.map(|_| ()).map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };

    page.dispose().await;
    result
}
