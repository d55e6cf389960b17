use anyhow::Result;
use tracing::info;

use scan_it_know_it::api::{build_app, serve};
use scan_it_know_it::config::AppConfig;
use scan_it_know_it::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "scan_it_know_it=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT").map(|v| v == "json").unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    info!("Starting Scan It Know It");

    let state = AppState::init(&config).await?;
    let app = build_app(state);
    serve(app, &config.bind_address()).await
}
