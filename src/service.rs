//! Transcript service: the single entry point for a capture
//!
//! One call runs the whole pipeline:
//! 1. Fetch the watch page
//! 2. Parse caption metadata and rank the languages
//! 3. Extract segments for the top-ranked track
//! 4. Chunk the segments and assemble the text
//!
//! The pipeline is retried as a whole; when every attempt fails the caller
//! gets the empty [`TranscriptResult`], never an error.

use crate::chunker::{Chunker, ProcessedChunk};
use crate::config::Config;
use crate::error::{Result, TranscriptError};
use crate::extraction::{
    ExtractionOptions, ExtractionOrchestrator, HttpRelayChannel, InternalApiStrategy, LanguageContinuation,
    PanelStrategy, RelayStrategy, TranscriptSegment,
};
use crate::language::{CaptionTrack, LanguageSelector};
use crate::page::{self, metadata, ChannelInfo, HostPage, HostPageFetcher, PageSource};
use crate::retry::{RetryExecutor, Validity};
use crate::text::format_timestamp;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Capture request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptRequest {
    /// Video id or watch URL
    pub video_id: String,
    #[serde(default = "default_with_timestamp")]
    pub with_timestamp: bool,
    #[serde(default)]
    pub try_fallback: bool,
}

fn default_with_timestamp() -> bool {
    true
}

impl TranscriptRequest {
    pub fn new(video_id: impl Into<String>) -> Self {
        Self {
            video_id: video_id.into(),
            with_timestamp: true,
            try_fallback: false,
        }
    }

    pub fn with_timestamp(mut self, enable: bool) -> Self {
        self.with_timestamp = enable;
        self
    }

    pub fn with_fallback(mut self, enable: bool) -> Self {
        self.try_fallback = enable;
        self
    }
}

/// One chunk positioned on the video timeline
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub video_id: String,
    pub seconds: u64,
    pub time_text: String,
    pub transcript_text: String,
}

/// Normalized transcript handed back to the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptResult {
    pub title: String,
    pub language: String,
    pub text: String,
    pub segments: Vec<TranscriptSegment>,
    pub chunks: Vec<ProcessedChunk>,
    pub language_options: Vec<CaptionTrack>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub channel: ChannelInfo,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    #[serde(default)]
    pub alternate_languages: Vec<LanguageContinuation>,
}

impl TranscriptResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl Validity for TranscriptResult {
    fn is_valid(&self) -> bool {
        !self.is_empty()
    }
}

/// Composes page access, extraction and chunking behind one call
#[derive(Clone)]
pub struct TranscriptService {
    pages: Arc<dyn PageSource>,
    host_page: Arc<dyn HostPage>,
    orchestrator: ExtractionOrchestrator,
    selector: LanguageSelector,
    chunker: Chunker,
    retry: RetryExecutor,
}

impl TranscriptService {
    /// Service with the production fetcher and strategies
    pub fn from_config(config: &Config, host_page: Arc<dyn HostPage>) -> Self {
        let pages = Arc::new(HostPageFetcher::new(&config.fetch, &config.retry));
        let orchestrator = ExtractionOrchestrator::new(
            Arc::new(InternalApiStrategy::new(&config.fetch, &config.retry)),
            Arc::new(PanelStrategy::new(host_page.clone(), config.panel.clone(), &config.retry)),
            Arc::new(RelayStrategy::new(Arc::new(HttpRelayChannel::new(&config.relay)))),
        );

        Self::new(pages, host_page, orchestrator, config)
    }

    pub fn new(
        pages: Arc<dyn PageSource>,
        host_page: Arc<dyn HostPage>,
        orchestrator: ExtractionOrchestrator,
        config: &Config,
    ) -> Self {
        Self {
            pages,
            host_page,
            orchestrator,
            selector: LanguageSelector::new(config.language.preferred.clone()),
            chunker: Chunker::new(config.chunking),
            retry: RetryExecutor::from_config("get_transcript", config.retry.service_attempts, &config.retry),
        }
    }

    /// Capture the transcript; the empty result stands for every failure
    pub async fn get_transcript(&self, request: &TranscriptRequest) -> TranscriptResult {
        let input = request.video_id.trim();
        if input.is_empty() {
            return TranscriptResult::default();
        }

        let video_id = match page::resolve_video_id(input) {
            Ok(id) => id,
            Err(e) => {
                debug!("{}, using input as-is", e);
                input.to_string()
            }
        };

        info!("🎬 Capturing transcript for {}", video_id);
        match self.retry.run(|| self.capture(&video_id, request)).await {
            Ok(result) => {
                info!(
                    "✅ Captured {} chunks ({} segments) in {}",
                    result.chunks.len(),
                    result.segments.len(),
                    result.language
                );
                result
            }
            Err(e) => {
                warn!("❌ Transcript capture failed for {}: {}", video_id, e);
                TranscriptResult::default()
            }
        }
    }

    async fn capture(&self, video_id: &str, request: &TranscriptRequest) -> Result<TranscriptResult> {
        let restricted = match self.host_page.markup().await {
            Ok(markup) => page::is_restricted(&markup),
            Err(e) => {
                debug!("Host page unavailable, assuming public: {}", e);
                false
            }
        };

        let html = self.pages.fetch_page(video_id, restricted).await?;
        let channel = metadata::channel(&html);
        let transcript_params = metadata::transcript_params(&html);

        let language_options = match metadata::parse(&html) {
            Ok(captions) => self.selector.rank(&captions.caption_tracks, &captions.title),
            Err(e) => {
                debug!("Caption metadata unavailable: {}", e);
                Vec::new()
            }
        };

        let track = language_options.first().cloned().ok_or(TranscriptError::NoLanguageOptions)?;
        debug!("Selected language {} (track {})", track.language, track.track_id);

        let options = ExtractionOptions {
            video_id: video_id.to_string(),
            transcript_params,
            allow_fallback: request.try_fallback,
            restricted,
        };
        let output = self.orchestrator.extract(&track, &options).await;
        if output.is_empty() {
            return Err(TranscriptError::NoSegmentsRetrieved);
        }

        let chunks = self.chunker.chunk(&output.segments);
        let timeline = chunks
            .iter()
            .map(|chunk| TimelineEntry {
                video_id: video_id.to_string(),
                seconds: chunk.start,
                time_text: format_timestamp(chunk.start),
                transcript_text: chunk.text.clone(),
            })
            .collect();
        let text = assemble_text(&chunks, request.with_timestamp);

        Ok(TranscriptResult {
            title: track.title.clone(),
            language: track.language.clone(),
            text,
            segments: output.segments,
            chunks,
            language_options,
            duration_ms: output.duration_ms,
            channel,
            timeline,
            alternate_languages: output.alternate_languages,
        })
    }
}

/// Chunk texts joined by spaces, each optionally prefixed with `(MM:SS)`
pub fn assemble_text(chunks: &[ProcessedChunk], with_timestamp: bool) -> String {
    chunks
        .iter()
        .map(|chunk| {
            let text = chunk.text.trim();
            if with_timestamp {
                format!("({}) {}", format_timestamp(chunk.start), text)
            } else {
                text.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
