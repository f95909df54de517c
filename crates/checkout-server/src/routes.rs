//! Router

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{create_link, get_link, health_check, pay_link, quote, validate_card};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health
        .route("/health", get(health_check))

        // Checkout form
        .route("/api/cards/validate", post(validate_card))
        .route("/api/quote", post(quote))

        // Payment links
        .route("/api/links", post(create_link))
        .route("/api/links/{id}", get(get_link))
        .route("/api/links/{id}/pay", post(pay_link))

        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
