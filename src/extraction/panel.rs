/// Rendered transcript panel scraping
use super::{StrategyError, StrategyOutput, StrategyRequest, TranscriptSegment, TranscriptStrategy};
use crate::config::{PanelConfig, RetryConfig};
use crate::error::{Result, TranscriptError};
use crate::page::{parse_selector, selector_matches, HostPage};
use crate::retry::RetryExecutor;
use crate::text::{normalize_text, parse_timestamp};
use async_trait::async_trait;
use scraper::Html;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info, warn};

const TIMESTAMP_SELECTOR: &str = "div.segment-timestamp";
const TEXT_SELECTOR: &str = "yt-formatted-string";

/// Opens the page's own transcript panel and reads the rendered segments
#[derive(Clone)]
pub struct PanelStrategy {
    page: Arc<dyn HostPage>,
    config: PanelConfig,
    retry: RetryExecutor,
}

impl PanelStrategy {
    pub fn new(page: Arc<dyn HostPage>, config: PanelConfig, retry: &RetryConfig) -> Self {
        Self {
            page,
            config,
            retry: RetryExecutor::from_config("panel_scrape", retry.panel_attempts, retry)
                .with_should_retry(|error, _| matches!(error, TranscriptError::NoSegmentsRendered)),
        }
    }

    /// Segments shown in the panel; empty on any failure
    pub async fn scrape_rendered_panel(&self) -> Vec<TranscriptSegment> {
        match self.try_scrape().await {
            Ok(segments) => segments,
            Err(e) => {
                warn!("Transcript panel scrape failed: {}", e);
                Vec::new()
            }
        }
    }

    async fn try_scrape(&self) -> Result<Vec<TranscriptSegment>> {
        if !self.page.click(&self.config.toggle_selector).await? {
            debug!("Transcript toggle not present on page");
            return Ok(Vec::new());
        }

        if !self.wait_for_segments().await? {
            debug!(
                "No segments rendered within {}ms, reading anyway",
                self.config.poll_timeout_ms
            );
        }

        self.retry
            .run(|| async {
                let markup = self.page.markup().await?;
                parse_rendered_segments(&markup, &self.config.segment_selector)
            })
            .await
    }

    /// Poll until the segment container renders or the timeout passes
    async fn wait_for_segments(&self) -> Result<bool> {
        let interval = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let deadline = Instant::now() + Duration::from_millis(self.config.poll_timeout_ms);

        loop {
            let markup = self.page.markup().await?;
            if selector_matches(&markup, &self.config.segment_selector)? {
                return Ok(true);
            }
            if Instant::now() + interval > deadline {
                return Ok(false);
            }
            tokio::time::sleep(interval).await;
        }
    }
}

#[async_trait]
impl TranscriptStrategy for PanelStrategy {
    fn name(&self) -> &'static str {
        "transcript_panel"
    }

    async fn fetch(&self, request: &StrategyRequest) -> std::result::Result<StrategyOutput, StrategyError> {
        info!("🖱️  Opening transcript panel for {} ({})", request.video_id, request.language);
        let segments = self.scrape_rendered_panel().await;
        if segments.is_empty() {
            return Err(StrategyError::Empty(self.name()));
        }
        Ok(StrategyOutput::from_segments(segments))
    }
}

/// Read rendered segment elements; both a timestamp and text are required
pub fn parse_rendered_segments(markup: &str, segment_selector: &str) -> Result<Vec<TranscriptSegment>> {
    let segment_selector = parse_selector(segment_selector)?;
    let timestamp_selector = parse_selector(TIMESTAMP_SELECTOR)?;
    let text_selector = parse_selector(TEXT_SELECTOR)?;

    let document = Html::parse_document(markup);
    let mut segments = Vec::new();

    for (index, element) in document.select(&segment_selector).enumerate() {
        let timestamp = element
            .select(&timestamp_selector)
            .next()
            .map(|e| e.text().collect::<String>().trim().to_string())
            .unwrap_or_default();
        let text = element
            .select(&text_selector)
            .next()
            .map(|e| normalize_text(&e.text().collect::<String>()))
            .unwrap_or_default();

        if timestamp.is_empty() || text.is_empty() {
            continue;
        }

        match parse_timestamp(&timestamp) {
            Some(start) => segments.push(TranscriptSegment {
                start,
                duration: None,
                text,
                ordinal: Some(index),
            }),
            None => debug!("Skipping segment with unreadable timestamp '{}'", timestamp),
        }
    }

    if segments.is_empty() {
        return Err(TranscriptError::NoSegmentsRendered);
    }
    Ok(segments)
}
