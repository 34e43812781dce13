/// Transcript relay through the cooperating extension component
use super::{LooseNumber, StrategyError, StrategyOutput, StrategyRequest, TranscriptSegment, TranscriptStrategy};
use crate::config::RelayConfig;
use crate::error::{Result, TranscriptError};
use crate::text::normalize_text;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Action name understood by the privileged component
pub const RELAY_ACTION: &str = "get_yt_scripts";

/// Message sent across the context boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayMessage {
    pub action: String,
    pub video_id: String,
    pub vss_id: String,
    pub title: String,
}

impl RelayMessage {
    pub fn new(video_id: &str, vss_id: &str, title: &str) -> Self {
        Self {
            action: RELAY_ACTION.to_string(),
            video_id: video_id.to_string(),
            vss_id: vss_id.to_string(),
            title: title.to_string(),
        }
    }
}

/// `{ data: { transcripts: [{ text, start }] } }`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayResponse {
    #[serde(default)]
    pub data: Option<RelayData>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayData {
    #[serde(default)]
    pub transcripts: Vec<RelayTranscript>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RelayTranscript {
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    start: Option<LooseNumber>,
}

impl RelayTranscript {
    /// Start offset in seconds, either a number or a numeric string
    pub fn start_seconds(&self) -> Option<f64> {
        self.start.as_ref().and_then(LooseNumber::value)
    }
}

/// Message channel to the component holding already-loaded transcripts
#[async_trait]
pub trait RelayChannel: Send + Sync {
    async fn send(&self, message: &RelayMessage) -> Result<RelayResponse>;
}

/// Relay channel that posts the message as JSON to an HTTP endpoint.
///
/// Without an endpoint every send fails, which the orchestrator treats as
/// "try the next strategy".
#[derive(Clone)]
pub struct HttpRelayChannel {
    client: Client,
    endpoint: Option<String>,
}

impl HttpRelayChannel {
    pub fn new(config: &RelayConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            endpoint: config.endpoint.clone(),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint.is_some()
    }
}

#[async_trait]
impl RelayChannel for HttpRelayChannel {
    async fn send(&self, message: &RelayMessage) -> Result<RelayResponse> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| TranscriptError::Relay("no relay endpoint configured".to_string()))?;

        let response = self.client.post(endpoint).json(message).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptError::HttpStatus {
                status: status.as_u16(),
                url: endpoint.to_string(),
            });
        }

        let body = response.text().await?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Asks the relay for transcripts it already holds
#[derive(Clone)]
pub struct RelayStrategy {
    channel: Arc<dyn RelayChannel>,
}

impl RelayStrategy {
    pub fn new(channel: Arc<dyn RelayChannel>) -> Self {
        Self { channel }
    }

    /// Segments from the relay; empty when both ids are blank or the call fails
    pub async fn fetch_via_relay(&self, video_id: &str, track_id: &str, title: &str) -> Vec<TranscriptSegment> {
        if video_id.is_empty() && track_id.is_empty() {
            return Vec::new();
        }

        let message = RelayMessage::new(video_id, track_id, title);
        match self.channel.send(&message).await {
            Ok(response) => to_segments(response),
            Err(e) => {
                warn!("Relay request failed: {}", e);
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl TranscriptStrategy for RelayStrategy {
    fn name(&self) -> &'static str {
        "relay"
    }

    async fn fetch(&self, request: &StrategyRequest) -> std::result::Result<StrategyOutput, StrategyError> {
        info!("📨 Asking relay for track {}", request.track_id);
        let segments = self
            .fetch_via_relay(&request.video_id, &request.track_id, &request.title)
            .await;
        if segments.is_empty() {
            return Err(StrategyError::Empty(self.name()));
        }
        Ok(StrategyOutput::from_segments(segments))
    }
}

fn to_segments(response: RelayResponse) -> Vec<TranscriptSegment> {
    let transcripts = response.data.map(|data| data.transcripts).unwrap_or_default();
    debug!("Relay returned {} raw transcripts", transcripts.len());

    transcripts
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let text = normalize_text(raw.text.as_deref().unwrap_or_default());
            if text.is_empty() {
                return None;
            }
            let start = raw.start_seconds().unwrap_or(0.0).round().max(0.0) as u64;
            Some(TranscriptSegment {
                start,
                duration: None,
                text,
                ordinal: Some(index),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingChannel {
        sent: Mutex<Vec<RelayMessage>>,
        reply: Option<&'static str>,
    }

    #[async_trait]
    impl RelayChannel for RecordingChannel {
        async fn send(&self, message: &RelayMessage) -> Result<RelayResponse> {
            self.sent.lock().unwrap().push(message.clone());
            match self.reply {
                Some(body) => Ok(serde_json::from_str(body)?),
                None => Err(TranscriptError::Relay("closed".to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_maps_relay_transcripts() {
        let channel = Arc::new(RecordingChannel {
            reply: Some(r#"{"data":{"transcripts":[
                {"text":"first &amp; foremost","start":1.6},
                {"text":"  ","start":3},
                {"text":"<i>third</i>","start":7.2}
            ]}}"#),
            ..Default::default()
        });
        let strategy = RelayStrategy::new(channel.clone());

        let segments = strategy.fetch_via_relay("abc123def45", "en", "Title").await;

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "first & foremost");
        assert_eq!(segments[0].start, 2);
        assert_eq!(segments[0].ordinal, Some(0));
        assert_eq!(segments[1].text, "third");
        assert_eq!(segments[1].ordinal, Some(2));

        let sent = channel.sent.lock().unwrap();
        assert_eq!(sent[0], RelayMessage::new("abc123def45", "en", "Title"));
        assert_eq!(sent[0].action, "get_yt_scripts");
    }

    #[tokio::test]
    async fn test_string_start_offsets_are_accepted() {
        let channel = Arc::new(RecordingChannel {
            reply: Some(r#"{"data":{"transcripts":[
                {"text":"hello","start":"1.6"},
                {"text":"world","start":4},
                {"text":"again","start":"oops"}
            ]}}"#),
            ..Default::default()
        });
        let strategy = RelayStrategy::new(channel);

        let segments = strategy.fetch_via_relay("abc123def45", "en", "Title").await;

        let starts: Vec<u64> = segments.iter().map(|s| s.start).collect();
        assert_eq!(starts, vec![2, 4, 0]);
        assert_eq!(segments[0].text, "hello");
    }

    #[tokio::test]
    async fn test_blank_ids_skip_relay() {
        let channel = Arc::new(RecordingChannel::default());
        let strategy = RelayStrategy::new(channel.clone());

        assert!(strategy.fetch_via_relay("", "", "Title").await.is_empty());
        assert!(channel.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_channel_failure_is_empty() {
        let strategy = RelayStrategy::new(Arc::new(RecordingChannel::default()));
        let request = StrategyRequest {
            video_id: "abc123def45".to_string(),
            track_id: "en".to_string(),
            ..Default::default()
        };
        assert!(matches!(strategy.fetch(&request).await, Err(StrategyError::Empty("relay"))));
    }

    #[tokio::test]
    async fn test_unconfigured_http_channel_fails() {
        let channel = HttpRelayChannel::new(&RelayConfig {
            endpoint: None,
            timeout_seconds: 1,
        });
        assert!(!channel.is_configured());
        let result = channel.send(&RelayMessage::new("abc123def45", "en", "")).await;
        assert!(matches!(result, Err(TranscriptError::Relay(_))));
    }

    #[test]
    fn test_message_serializes_camel_case() {
        let value = serde_json::to_value(RelayMessage::new("v", "a.en", "t")).unwrap();
        assert_eq!(value["action"], "get_yt_scripts");
        assert_eq!(value["videoId"], "v");
        assert_eq!(value["vssId"], "a.en");
    }
}
