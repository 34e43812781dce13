//! Private transcript endpoint
//!
//! The endpoint answers with a deeply nested renderer tree. Each level is a
//! typed struct whose fields are all optional, so a missing level reads as
//! `None` instead of failing the whole response.

use super::{LanguageContinuation, LooseNumber, StrategyError, StrategyOutput, StrategyRequest, TranscriptSegment, TranscriptStrategy};
use crate::config::{FetchConfig, RetryConfig};
use crate::error::{Result, TranscriptError};
use crate::page::metadata::TextRun;
use crate::retry::RetryExecutor;
use crate::text::normalize_text;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Local, NaiveDate};
use rand::Rng;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Client versions are dated within this many days back from today
const CLIENT_VERSION_WINDOW_DAYS: i64 = 30;

/// Fetches segments through the host's private transcript API
#[derive(Clone)]
pub struct InternalApiStrategy {
    client: Client,
    endpoint: String,
    retry: RetryExecutor,
}

impl InternalApiStrategy {
    pub fn new(fetch: &FetchConfig, retry: &RetryConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(fetch.request_timeout_seconds))
            .user_agent(fetch.user_agent.as_str())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self::with_client(client, fetch.transcript_endpoint.clone(), retry)
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>, retry: &RetryConfig) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            retry: RetryExecutor::from_config("internal_api", retry.api_attempts, retry)
                .with_should_retry(|error, _| error.is_transient_api_failure()),
        }
    }

    /// Segments and alternate languages for the given parameter string.
    ///
    /// Blank parameters, a non-retryable error or exhausted retries all give
    /// the empty output.
    pub async fn fetch_transcript(&self, params: &str) -> StrategyOutput {
        if params.trim().is_empty() {
            debug!("No transcript parameters on page, skipping private endpoint");
            return StrategyOutput::default();
        }

        match self.retry.run(|| self.request_once(params)).await {
            Ok(output) => output,
            Err(e) => {
                warn!("Private transcript endpoint gave nothing: {}", e);
                StrategyOutput::default()
            }
        }
    }

    async fn request_once(&self, params: &str) -> Result<StrategyOutput> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&request_body(params))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranscriptError::HttpStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(TranscriptError::EmptyResponse(self.endpoint.clone()));
        }

        parse_response(&body)
    }
}

#[async_trait]
impl TranscriptStrategy for InternalApiStrategy {
    fn name(&self) -> &'static str {
        "internal_api"
    }

    async fn fetch(&self, request: &StrategyRequest) -> std::result::Result<StrategyOutput, StrategyError> {
        info!("🔌 Requesting transcript from private endpoint");
        let output = self.fetch_transcript(&request.transcript_params).await;
        if output.is_empty() {
            return Err(StrategyError::Empty(self.name()));
        }
        Ok(output)
    }
}

/// Request body with a freshly dated web client version
pub fn request_body(params: &str) -> serde_json::Value {
    let days_back = rand::thread_rng().gen_range(0..CLIENT_VERSION_WINDOW_DAYS);
    let version = client_version(Local::now().date_naive(), days_back);

    json!({
        "context": {
            "client": {
                "clientName": "WEB",
                "clientVersion": version,
            }
        },
        "params": params,
    })
}

/// `2.YYYYMMDD.00.00` for the day `days_back` days before `today`
pub fn client_version(today: NaiveDate, days_back: i64) -> String {
    let day = today - ChronoDuration::days(days_back);
    format!("2.{}.00.00", day.format("%Y%m%d"))
}

/// Walk the endpoint's JSON answer into segments and language continuations
pub fn parse_response(body: &str) -> Result<StrategyOutput> {
    let response: TranscriptResponse = serde_json::from_str(body)?;

    let mut duration_ms = None;
    let mut segments = Vec::new();
    for renderer in response.segment_renderers() {
        if let Some(end) = renderer.end_ms() {
            duration_ms = Some(end.max(0.0).round() as u64);
        }
        if let Some(segment) = renderer.to_segment() {
            segments.push(segment);
        }
    }

    if segments.is_empty() {
        return Err(TranscriptError::NoTranscriptEntries);
    }

    let alternate_languages = response
        .language_items()
        .iter()
        .filter_map(SubMenuItem::continuation)
        .collect();

    Ok(StrategyOutput {
        segments,
        duration_ms,
        alternate_languages,
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptResponse {
    #[serde(default)]
    actions: Vec<Action>,
}

impl TranscriptResponse {
    fn search_panel(&self) -> Option<&SearchPanel> {
        self.actions
            .first()?
            .update_engagement_panel_action
            .as_ref()?
            .content
            .as_ref()?
            .transcript_renderer
            .as_ref()?
            .content
            .as_ref()?
            .transcript_search_panel_renderer
            .as_ref()
    }

    fn segment_renderers(&self) -> impl Iterator<Item = &SegmentRenderer> {
        self.search_panel()
            .and_then(|panel| panel.body.as_ref())
            .and_then(|body| body.transcript_segment_list_renderer.as_ref())
            .map(|list| list.initial_segments.as_slice())
            .unwrap_or_default()
            .iter()
            .filter_map(|segment| segment.transcript_segment_renderer.as_ref())
    }

    fn language_items(&self) -> &[SubMenuItem] {
        self.search_panel()
            .and_then(|panel| panel.footer.as_ref())
            .and_then(|footer| footer.transcript_footer_renderer.as_ref())
            .and_then(|renderer| renderer.language_menu.as_ref())
            .and_then(|menu| menu.sort_filter_sub_menu_renderer.as_ref())
            .map(|menu| menu.sub_menu_items.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Action {
    update_engagement_panel_action: Option<UpdateEngagementPanelAction>,
}

#[derive(Debug, Deserialize)]
struct UpdateEngagementPanelAction {
    content: Option<PanelContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelContent {
    transcript_renderer: Option<TranscriptRenderer>,
}

#[derive(Debug, Deserialize)]
struct TranscriptRenderer {
    content: Option<TranscriptRendererContent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TranscriptRendererContent {
    transcript_search_panel_renderer: Option<SearchPanel>,
}

#[derive(Debug, Deserialize)]
struct SearchPanel {
    body: Option<PanelBody>,
    footer: Option<PanelFooter>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelBody {
    transcript_segment_list_renderer: Option<SegmentList>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentList {
    #[serde(default)]
    initial_segments: Vec<InitialSegment>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InitialSegment {
    transcript_segment_renderer: Option<SegmentRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SegmentRenderer {
    start_ms: Option<LooseNumber>,
    end_ms: Option<LooseNumber>,
    snippet: Option<Snippet>,
}

impl SegmentRenderer {
    fn start_ms(&self) -> Option<f64> {
        self.start_ms.as_ref().and_then(LooseNumber::value)
    }

    fn end_ms(&self) -> Option<f64> {
        self.end_ms.as_ref().and_then(LooseNumber::value)
    }

    fn text(&self) -> String {
        self.snippet.as_ref().map(Snippet::text).unwrap_or_default()
    }

    /// Segment in whole seconds; `None` without both offsets or without text
    fn to_segment(&self) -> Option<TranscriptSegment> {
        let start = self.start_ms()?;
        let end = self.end_ms()?;
        let text = normalize_text(&self.text());
        if text.is_empty() {
            return None;
        }

        Some(TranscriptSegment {
            start: (start / 1000.0).round().max(0.0) as u64,
            duration: Some(((end - start) / 1000.0).round().max(0.0) as u64),
            text,
            ordinal: None,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Snippet {
    #[serde(default)]
    runs: Vec<TextRun>,
    simple_text: Option<String>,
}

impl Snippet {
    fn text(&self) -> String {
        match &self.simple_text {
            Some(text) => text.clone(),
            None => self.runs.iter().map(|run| run.text.as_str()).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PanelFooter {
    transcript_footer_renderer: Option<FooterRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FooterRenderer {
    language_menu: Option<LanguageMenu>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LanguageMenu {
    sort_filter_sub_menu_renderer: Option<SubMenu>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubMenu {
    #[serde(default)]
    sub_menu_items: Vec<SubMenuItem>,
}

#[derive(Debug, Deserialize)]
struct SubMenuItem {
    title: Option<String>,
    continuation: Option<ItemContinuation>,
}

impl SubMenuItem {
    fn continuation(&self) -> Option<LanguageContinuation> {
        let language = self.title.as_deref().filter(|t| !t.is_empty())?;
        let token = self
            .continuation
            .as_ref()?
            .reload_continuation_data
            .as_ref()?
            .continuation
            .as_deref()
            .filter(|c| !c.is_empty())?;

        Some(LanguageContinuation {
            language: language.to_string(),
            continuation_token: token.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemContinuation {
    reload_continuation_data: Option<ReloadContinuationData>,
}

#[derive(Debug, Deserialize)]
struct ReloadContinuationData {
    continuation: Option<String>,
}
