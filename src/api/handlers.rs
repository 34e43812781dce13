//! API request handlers

use anyhow::{anyhow, Result};
use serde_json::Value;
use tracing::info;

use super::models::{ApiResponse, TranscriptMessage, GET_YOUTUBE_TRANSCRIPT, PING};
use crate::service::TranscriptService;

/// Handle health check requests
pub async fn health_check() -> Result<Value> {
    Ok(serde_json::json!({
        "status": "healthy",
        "service": "snippet-transcript",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Handle an extension message; unknown actions are an error
pub async fn handle_message(service: &TranscriptService, message: &TranscriptMessage) -> Result<ApiResponse<Value>> {
    match message.action.as_str() {
        GET_YOUTUBE_TRANSCRIPT => {
            info!("📥 Transcript requested for {}", message.video_id);
            let result = service.get_transcript(&message.to_request()).await;
            Ok(ApiResponse::success(serde_json::to_value(result)?))
        }
        PING => Ok(ApiResponse::ok()),
        other => Err(anyhow!("Unsupported action: {}", other)),
    }
}
