use std::sync::Arc;

use anyhow::Context;

use gatehouse_api::app::{AppServices, build_app};
use gatehouse_auth::SharedDirectory;
use gatehouse_infra::{ConfigLoader, InMemoryDirectory, seed_defaults};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ConfigLoader::new().load().context("failed to load configuration")?;
    gatehouse_observability::init_with(config.log_format);

    let directory = Arc::new(InMemoryDirectory::new());
    let seeded = seed_defaults(&directory).context("failed to seed roles and permissions")?;
    tracing::info!(links_added = seeded.links_added, "seeded default roles");

    let directory: SharedDirectory = directory;
    let services = AppServices::from_config(&config, directory).context("failed to build services")?;
    let app = build_app(Arc::new(services));

    let addr = config.server.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(addr = %listener.local_addr()?, "listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
