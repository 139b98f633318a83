use useraudit::{app, AppConfig, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let dotenv = dotenvy::dotenv();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "useraudit=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    if dotenv.is_err() {
        tracing::info!("no .env file found, using environment variables");
    }

    let config = AppConfig::from_env()?;
    let server = config.server.clone();

    // No directory, nothing to serve: a failed initial load ends the process.
    let state = AppState::init(config).await?;

    app::serve(app::build_app(state), &server).await
}
