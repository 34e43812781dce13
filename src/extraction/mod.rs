//! Transcript extraction strategies and their orchestrator
//!
//! Three independent strategies of decreasing reliability:
//! - the private transcript endpoint ([`InternalApiStrategy`])
//! - the rendered transcript panel ([`PanelStrategy`])
//! - the cooperating extension component ([`RelayStrategy`])
//!
//! The orchestrator runs them strictly in that order and stops at the first
//! one that returns segments.

pub mod internal_api;
pub mod panel;
pub mod relay;

pub use internal_api::InternalApiStrategy;
pub use panel::PanelStrategy;
pub use relay::{HttpRelayChannel, RelayChannel, RelayMessage, RelayStrategy};

use crate::error::TranscriptError;
use crate::language::CaptionTrack;
use crate::retry::Validity;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One timestamped caption fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    /// Start offset in whole seconds
    pub start: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<u64>,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordinal: Option<usize>,
}

impl TranscriptSegment {
    pub fn new(start: u64, text: impl Into<String>) -> Self {
        Self {
            start,
            duration: None,
            text: text.into(),
            ordinal: None,
        }
    }
}

/// Continuation token for an alternate caption language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LanguageContinuation {
    pub language: String,
    pub continuation_token: String,
}

/// Everything a strategy may need for one capture
#[derive(Debug, Clone, Default)]
pub struct StrategyRequest {
    pub video_id: String,
    pub language: String,
    pub track_id: String,
    pub title: String,
    pub transcript_params: String,
}

/// Segments recovered by one strategy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrategyOutput {
    pub segments: Vec<TranscriptSegment>,
    pub duration_ms: Option<u64>,
    pub alternate_languages: Vec<LanguageContinuation>,
}

impl StrategyOutput {
    pub fn from_segments(segments: Vec<TranscriptSegment>) -> Self {
        Self {
            segments,
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl Validity for StrategyOutput {
    fn is_valid(&self) -> bool {
        !self.is_empty()
    }
}

/// Why a strategy produced nothing; either way the next strategy runs
#[derive(thiserror::Error, Debug)]
pub enum StrategyError {
    #[error("{0} produced no segments")]
    Empty(&'static str),

    #[error("{strategy} failed: {source}")]
    Failed {
        strategy: &'static str,
        #[source]
        source: TranscriptError,
    },
}

/// A single way of obtaining transcript segments
#[async_trait]
pub trait TranscriptStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch(&self, request: &StrategyRequest) -> Result<StrategyOutput, StrategyError>;
}

/// Per-capture switches for the orchestrator
#[derive(Debug, Clone, Default)]
pub struct ExtractionOptions {
    pub video_id: String,
    pub transcript_params: String,
    pub allow_fallback: bool,
    pub restricted: bool,
}

/// Runs the strategies in priority order, first non-empty result wins
#[derive(Clone)]
pub struct ExtractionOrchestrator {
    internal: Arc<dyn TranscriptStrategy>,
    panel: Arc<dyn TranscriptStrategy>,
    relay: Arc<dyn TranscriptStrategy>,
}

impl ExtractionOrchestrator {
    pub fn new(
        internal: Arc<dyn TranscriptStrategy>,
        panel: Arc<dyn TranscriptStrategy>,
        relay: Arc<dyn TranscriptStrategy>,
    ) -> Self {
        Self { internal, panel, relay }
    }

    /// Strategies that apply to this capture, in the order they are tried
    fn plan(&self, track: &CaptionTrack, options: &ExtractionOptions) -> Vec<Arc<dyn TranscriptStrategy>> {
        let mut plan = vec![self.internal.clone()];
        if options.allow_fallback {
            plan.push(self.panel.clone());
        }
        if !options.restricted && !track.track_id.is_empty() {
            plan.push(self.relay.clone());
        }
        plan
    }

    /// Extract segments for the given track; empty output when every strategy fails
    pub async fn extract(&self, track: &CaptionTrack, options: &ExtractionOptions) -> StrategyOutput {
        if track.retrieval_link.is_empty() || options.video_id.is_empty() || track.language.is_empty() {
            debug!("Missing retrieval link, video id or language; skipping extraction");
            return StrategyOutput::default();
        }

        let request = StrategyRequest {
            video_id: options.video_id.clone(),
            language: track.language.clone(),
            track_id: track.track_id.clone(),
            title: track.title.clone(),
            transcript_params: options.transcript_params.clone(),
        };

        for strategy in self.plan(track, options) {
            debug!("Trying strategy: {}", strategy.name());
            match strategy.fetch(&request).await {
                Ok(output) if !output.is_empty() => {
                    info!("📝 {} returned {} segments", strategy.name(), output.segments.len());
                    return output;
                }
                Ok(_) => debug!("{} returned no segments", strategy.name()),
                Err(e) => warn!("Strategy {} failed: {}", strategy.name(), e),
            }
        }

        warn!("All extraction strategies exhausted for {}", options.video_id);
        StrategyOutput::default()
    }
}

/// Numeric field the host sends either as a JSON number or as a string
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub(crate) enum LooseNumber {
    Text(String),
    Number(f64),
}

impl LooseNumber {
    /// Finite value, `None` for unparsable text
    pub(crate) fn value(&self) -> Option<f64> {
        let value = match self {
            LooseNumber::Text(text) => text.trim().parse().ok()?,
            LooseNumber::Number(value) => *value,
        };
        value.is_finite().then_some(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loose_number_accepts_text_and_numbers() {
        let values: Vec<LooseNumber> = serde_json::from_str(r#"["1.6", 7, " 250 ", "abc", "NaN"]"#).unwrap();
        let parsed: Vec<Option<f64>> = values.iter().map(LooseNumber::value).collect();
        assert_eq!(parsed, vec![Some(1.6), Some(7.0), Some(250.0), None, None]);
    }
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Scripted {
        name: &'static str,
        calls: AtomicU32,
        outcome: fn() -> Result<StrategyOutput, StrategyError>,
    }

    impl Scripted {
        fn new(name: &'static str, outcome: fn() -> Result<StrategyOutput, StrategyError>) -> Arc<Self> {
            Arc::new(Self {
                name,
                calls: AtomicU32::new(0),
                outcome,
            })
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl TranscriptStrategy for Scripted {
        fn name(&self) -> &'static str {
            self.name
        }

        async fn fetch(&self, _request: &StrategyRequest) -> Result<StrategyOutput, StrategyError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            (self.outcome)()
        }
    }

    fn empty() -> Result<StrategyOutput, StrategyError> {
        Err(StrategyError::Empty("scripted"))
    }

    fn failing() -> Result<StrategyOutput, StrategyError> {
        Err(StrategyError::Failed {
            strategy: "scripted",
            source: TranscriptError::NoSegmentsRendered,
        })
    }

    fn one_segment() -> Result<StrategyOutput, StrategyError> {
        Ok(StrategyOutput::from_segments(vec![TranscriptSegment::new(0, "hello")]))
    }

    fn track(track_id: &str) -> CaptionTrack {
        CaptionTrack {
            language: "English".to_string(),
            retrieval_link: "https://example.com/timedtext".to_string(),
            title: "Title".to_string(),
            track_id: track_id.to_string(),
        }
    }

    fn options(allow_fallback: bool, restricted: bool) -> ExtractionOptions {
        ExtractionOptions {
            video_id: "abc123def45".to_string(),
            transcript_params: "params".to_string(),
            allow_fallback,
            restricted,
        }
    }

    #[tokio::test]
    async fn test_first_non_empty_wins() {
        let internal = Scripted::new("internal", one_segment);
        let panel = Scripted::new("panel", one_segment);
        let relay = Scripted::new("relay", one_segment);
        let orchestrator = ExtractionOrchestrator::new(internal.clone(), panel.clone(), relay.clone());

        let output = orchestrator.extract(&track("en"), &options(true, false)).await;

        assert_eq!(output.segments.len(), 1);
        assert_eq!(internal.calls(), 1);
        assert_eq!(panel.calls(), 0);
        assert_eq!(relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_failures_fall_through_in_order() {
        let internal = Scripted::new("internal", failing);
        let panel = Scripted::new("panel", empty);
        let relay = Scripted::new("relay", one_segment);
        let orchestrator = ExtractionOrchestrator::new(internal.clone(), panel.clone(), relay.clone());

        let output = orchestrator.extract(&track("en"), &options(true, false)).await;

        assert_eq!(output.segments[0].text, "hello");
        assert_eq!((internal.calls(), panel.calls(), relay.calls()), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_restricted_page_never_uses_relay() {
        let internal = Scripted::new("internal", empty);
        let panel = Scripted::new("panel", one_segment);
        let relay = Scripted::new("relay", one_segment);
        let orchestrator = ExtractionOrchestrator::new(internal.clone(), panel.clone(), relay.clone());

        let output = orchestrator.extract(&track("en"), &options(false, true)).await;

        assert!(output.is_empty());
        assert_eq!(internal.calls(), 1);
        assert_eq!(panel.calls(), 0);
        assert_eq!(relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_relay_needs_track_id() {
        let internal = Scripted::new("internal", empty);
        let panel = Scripted::new("panel", empty);
        let relay = Scripted::new("relay", one_segment);
        let orchestrator = ExtractionOrchestrator::new(internal, panel, relay.clone());

        let output = orchestrator.extract(&track(""), &options(true, false)).await;

        assert!(output.is_empty());
        assert_eq!(relay.calls(), 0);
    }

    #[tokio::test]
    async fn test_blank_inputs_skip_all_strategies() {
        let internal = Scripted::new("internal", one_segment);
        let orchestrator = ExtractionOrchestrator::new(internal.clone(), internal.clone(), internal.clone());

        let mut blank_link = track("en");
        blank_link.retrieval_link.clear();
        assert!(orchestrator.extract(&blank_link, &options(true, false)).await.is_empty());

        let mut blank_language = track("en");
        blank_language.language.clear();
        assert!(orchestrator.extract(&blank_language, &options(true, false)).await.is_empty());

        let mut no_video = options(true, false);
        no_video.video_id.clear();
        assert!(orchestrator.extract(&track("en"), &no_video).await.is_empty());

        assert_eq!(internal.calls(), 0);
    }
}
