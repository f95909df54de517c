//! checkout HTTP Server
//!
//! Axum back-end-for-front-end over the checkout core: card validation,
//! fee + FX quotes, payment link creation, lookup and payment.

mod handlers;
mod routes;
mod state;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use checkout_client::{CheckoutBackend, ClientConfig};

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment
    dotenvy::dotenv().ok();

    // Collaborators
    let config = ClientConfig::from_env()?;
    let backend = CheckoutBackend::from_config(&config)?;
    tracing::info!(
        base_url = %config.base_url,
        timeout_secs = config.timeout.as_secs(),
        tokenizer = backend.tokenizer.name(),
        "Checkout back-end configured"
    );

    let app = routes::router(AppState::new(backend));

    // Start server
    let addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("checkout server running on http://{}", addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health                - Health check");
    tracing::info!("  POST /api/cards/validate    - Card form validation");
    tracing::info!("  POST /api/quote             - Fees + currency conversion");
    tracing::info!("  POST /api/links             - Create payment link");
    tracing::info!("  GET  /api/links/{{id}}        - Payment link status");
    tracing::info!("  POST /api/links/{{id}}/pay    - Pay a link");

    axum::serve(listener, app).await?;

    Ok(())
}
