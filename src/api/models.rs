//! API data models

use crate::service::TranscriptRequest;
use serde::{Deserialize, Serialize};

/// Message action that requests a transcript capture
pub const GET_YOUTUBE_TRANSCRIPT: &str = "getYouTubeTranscript";

/// Liveness message action
pub const PING: &str = "ping";

/// API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Success without a payload
    pub fn ok() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message),
        }
    }
}

/// Message sent by the extension's content script
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptMessage {
    pub action: String,
    #[serde(default)]
    pub video_id: String,
    #[serde(default)]
    pub with_timestamp: Option<bool>,
    #[serde(default)]
    pub try_fallback: Option<bool>,
}

impl TranscriptMessage {
    pub fn to_request(&self) -> TranscriptRequest {
        TranscriptRequest::new(self.video_id.clone())
            .with_timestamp(self.with_timestamp.unwrap_or(true))
            .with_fallback(self.try_fallback.unwrap_or(false))
    }
}
