//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::State,
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, info, warn};

use super::{
    handlers,
    models::{ApiResponse, TranscriptMessage},
};
use crate::config::Config;
use crate::service::TranscriptService;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<TranscriptService>,
    pub config: Arc<Config>,
}

/// Build the router with CORS and request tracing
pub fn build_router(state: AppState) -> Router {
    // Configure CORS to allow extension and browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/health", get(health_handler))
        .route("/api/transcript", post(transcript_handler))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

/// Configure and start the HTTP server
pub async fn start_http_server(service: Arc<TranscriptService>, config: Arc<Config>, port: u16) -> Result<()> {
    debug!("{}", config.summary());
    let app = build_router(AppState { service, config });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🌐 API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    match handlers::health_check().await {
        Ok(data) => (StatusCode::OK, Json(data)).into_response(),
        Err(e) => {
            let status = StatusCode::INTERNAL_SERVER_ERROR;
            (status, Json(serde_json::json!({"error": e.to_string()}))).into_response()
        }
    }
}

/// Extension message handler
async fn transcript_handler(
    State(state): State<AppState>,
    Json(message): Json<TranscriptMessage>,
) -> impl IntoResponse {
    match handlers::handle_message(&state.service, &message).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e) => {
            warn!("Rejected message: {}", e);
            let status = StatusCode::BAD_REQUEST;
            (status, Json(ApiResponse::<()>::error(e.to_string()))).into_response()
        }
    }
}
