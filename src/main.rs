use std::net::SocketAddr;

use tokio::net::TcpListener;

use portfolio_cms::{app_state::AppState, config::Config, handlers};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    // Load configuration
    let config = Config::from_env()?;
    let address = config.server_address();

    // Initialize application state
    let app_state = AppState::new(config).await?;

    // Build the application router
    let app = handlers::build_router(app_state);

    tracing::info!("Server starting on http://{}", address);

    let listener = TcpListener::bind(&address).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
