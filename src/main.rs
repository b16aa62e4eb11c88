mod app;
mod auth;
mod coerce;
mod config;
mod db;
mod error;
mod feedback;
mod memory;
mod paytypes;
mod pos;
mod products;
mod state;
mod transactions;
mod users;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fratpos=debug,axum=info,tower_http=info".to_string());
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

    let app_state = state::AppState::init().await?;

    if let Some(admin) = &app_state.config.admin {
        auth::services::ensure_admin(app_state.accounts.as_ref(), admin).await?;
    }

    app::serve(app::build_app(app_state)).await
}
