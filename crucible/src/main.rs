use anyhow::{Context, Result};
use clap::Parser;
use crucible::api;
use crucible::config::{load_config, Cli};
use crucible_core::auth::Hs256Verifier;
use crucible_core::storage::{FileResourceStore, MemoryResourceStore, ResourceStore};
use crucible_core::ResourceService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let config = load_config()?;

    let store: Arc<dyn ResourceStore> = if cli.memory {
        info!("using in-memory resource store");
        Arc::new(MemoryResourceStore::new())
    } else {
        info!("loading resources from {}", cli.data_dir.display());
        Arc::new(FileResourceStore::new(&cli.data_dir)?)
    };
    let service = ResourceService::new(store, config.identity_provider());
    let verifier = Arc::new(Hs256Verifier::new(config.session_secret.clone()));
    let app = api::router(service, verifier, config.sso_cookie.as_str());

    let addr: SocketAddr = cli
        .addr
        .parse()
        .with_context(|| format!("invalid listen address {}", cli.addr))?;
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
