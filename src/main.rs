use customer_health_api::config::Config;
use customer_health_api::dataset::CustomerDataset;
use customer_health_api::handlers::{self, AppState, RateLimit};
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the application.
///
/// This function initializes the application, including:
/// - Logging and tracing.
/// - Configuration loading.
/// - Customer dataset (fatal if missing or invalid).
/// - Messages API client.
/// - HTTP routes and middleware (CORS, Rate Limiting).
///
/// It then starts the Axum server.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "customer_health_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;

    // Load the customer dataset once; the service cannot run without it
    let dataset = match CustomerDataset::load(&config.customers_csv) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::error!("❌ {}", e);
            return Err(anyhow::anyhow!(e));
        }
    };

    let app_state = Arc::new(AppState::new(config.clone(), dataset)?);
    tracing::info!(
        "✓ Messages API client initialized: {} ({})",
        config.anthropic_base_url,
        app_state.client.model()
    );

    let app = handlers::app(app_state, RateLimit::default())?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
