mod app_state;
mod config;
mod router;
mod routes;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::from_filename("./takt-relay/.env.local").ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "takt_relay=debug,tower_http=debug".into()),
        )
        .init();

    let config = config::read_config().context("Failed to read configuration")?;
    let state = app_state::AppState::new(&config).context("Failed to build the upstream client")?;
    let address = format!(
        "{}:{}",
        config.application.host, config.application.port
    );
    let app = router::create(state, &config);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    tracing::info!("Relay listening on {}", address);
    axum::serve(listener, app).await?;

    Ok(())
}
