use anyhow::Result;
use std::sync::Arc;
use suhua_core::Config;
use suhua_server::{router, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    suhua_core::init()?;

    let (config, _) = Config::load_validated()?;
    let state = Arc::new(AppState::from_config(&config)?);
    let app = router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Su-Hua dashboard backend listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
