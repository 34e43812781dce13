use async_trait::async_trait;
use snippet_transcript::extraction::{
    PanelStrategy, RelayChannel, RelayMessage, RelayStrategy, StrategyError, StrategyOutput, StrategyRequest,
};
use snippet_transcript::extraction::relay::RelayResponse;
use snippet_transcript::extraction::LanguageContinuation;
use snippet_transcript::page::PageSource;
use snippet_transcript::{
    Config, ConfigBuilder, ExtractionOrchestrator, HostPage, Result, StaticPage, TranscriptRequest,
    TranscriptSegment, TranscriptService, TranscriptStrategy,
};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

const WATCH_PAGE: &str = r#"<html><script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[
{"baseUrl":"https://example.com/timedtext?lang=de","name":{"simpleText":"German"},"vssId":".de","languageCode":"de"},
{"baseUrl":"https://example.com/timedtext?lang=en","name":{"simpleText":"English"},"vssId":".en","languageCode":"en"}
]}},"videoDetails":{"videoId":"abc123def45","title":"Borrowing in Practice","lengthSeconds":"640"}};</script>
<script>var ytInitialData = {"getTranscriptEndpoint":{"params":"CgtwYXJhbXM%3D"},
"videoOwnerRenderer":{"thumbnail":{"thumbnails":[{"url":"https://yt3.example/s88","width":88,"height":88},{"url":"https://yt3.example/s176","width":176,"height":176}]},"title":{"runs":[{"text":"Systems Hour","navigationEndpoint":{"commandMetadata":{"webCommandMetadata":{"url":"/@systemshour"}}}}]}}};</script></html>"#;

const PRIVATE_BADGE: &str = r#"<div id="title"><ytd-badge-supported-renderer><div class="badge">Private</div></ytd-badge-supported-renderer></div>
<div id="primary-button"><ytd-button-renderer><yt-button-shape><button>Transcript</button></yt-button-shape></ytd-button-renderer></div>"#;

const RENDERED_PANEL: &str = r#"<div id="segments-container">
<ytd-transcript-segment-renderer><div class="segment-timestamp">0:01</div><yt-formatted-string>from the panel</yt-formatted-string></ytd-transcript-segment-renderer>
</div>"#;

fn fast_config() -> Config {
    ConfigBuilder::new().with_base_delay_ms(1).with_panel_timing(5, 20).build()
}

/// Serves fixed markup and records each fetch
struct FixedPages {
    html: String,
    fetches: Mutex<Vec<(String, bool)>>,
}

impl FixedPages {
    fn new(html: &str) -> Arc<Self> {
        Arc::new(Self {
            html: html.to_string(),
            fetches: Mutex::new(Vec::new()),
        })
    }

    fn fetches(&self) -> Vec<(String, bool)> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for FixedPages {
    async fn fetch_page(&self, video_id: &str, restricted: bool) -> Result<String> {
        self.fetches.lock().unwrap().push((video_id.to_string(), restricted));
        Ok(self.html.clone())
    }
}

/// Stand-in for the private endpoint
struct FixedApi {
    calls: AtomicU32,
    output: StrategyOutput,
}

impl FixedApi {
    fn returning(segments: Vec<TranscriptSegment>) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            output: StrategyOutput {
                segments,
                duration_ms: Some(9_000),
                alternate_languages: vec![LanguageContinuation {
                    language: "German".to_string(),
                    continuation_token: "tok-de".to_string(),
                }],
            },
        })
    }

    fn empty() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicU32::new(0),
            output: StrategyOutput::default(),
        })
    }
}

#[async_trait]
impl TranscriptStrategy for FixedApi {
    fn name(&self) -> &'static str {
        "fixed_api"
    }

    async fn fetch(&self, request: &StrategyRequest) -> std::result::Result<StrategyOutput, StrategyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert_eq!(request.transcript_params, "CgtwYXJhbXM%3D");
        if self.output.is_empty() {
            return Err(StrategyError::Empty(self.name()));
        }
        Ok(self.output.clone())
    }
}

/// Relay channel that counts messages and answers with one transcript
#[derive(Default)]
struct CountingRelay {
    sent: Mutex<Vec<RelayMessage>>,
}

#[async_trait]
impl RelayChannel for CountingRelay {
    async fn send(&self, message: &RelayMessage) -> Result<RelayResponse> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(serde_json::from_str(r#"{"data":{"transcripts":[{"text":"from the relay","start":2}]}}"#)?)
    }
}

fn service(
    pages: Arc<FixedPages>,
    host_page: Arc<dyn HostPage>,
    api: Arc<FixedApi>,
    relay: Arc<CountingRelay>,
) -> TranscriptService {
    let config = fast_config();
    let orchestrator = ExtractionOrchestrator::new(
        api,
        Arc::new(PanelStrategy::new(host_page.clone(), config.panel.clone(), &config.retry)),
        Arc::new(RelayStrategy::new(relay)),
    );
    TranscriptService::new(pages, host_page, orchestrator, &config)
}

#[tokio::test]
async fn test_page_without_captions_gives_empty_result() {
    let pages = FixedPages::new("<html><body>nothing to see</body></html>");
    let api = FixedApi::returning(vec![TranscriptSegment::new(0, "never used")]);
    let service = service(pages.clone(), Arc::new(StaticPage::empty()), api.clone(), Arc::default());

    let result = service.get_transcript(&TranscriptRequest::new("abc123def45")).await;

    assert!(result.segments.is_empty());
    assert_eq!(result.text, "");
    assert_eq!(result.title, "");
    assert_eq!(pages.fetches().len(), 3);
    assert_eq!(api.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_blank_video_id_skips_network() {
    let pages = FixedPages::new(WATCH_PAGE);
    let service = service(pages.clone(), Arc::new(StaticPage::empty()), FixedApi::empty(), Arc::default());

    let result = service.get_transcript(&TranscriptRequest::new("   ")).await;

    assert!(result.is_empty());
    assert!(pages.fetches().is_empty());
}

#[tokio::test]
async fn test_full_capture_through_private_endpoint() {
    let pages = FixedPages::new(WATCH_PAGE);
    let api = FixedApi::returning(vec![
        TranscriptSegment::new(0, "Welcome to the show."),
        TranscriptSegment::new(20, "Today: borrowing."),
        TranscriptSegment::new(95, "After the break."),
        TranscriptSegment::new(100, "See you."),
    ]);
    let relay = Arc::new(CountingRelay::default());
    let service = service(pages.clone(), Arc::new(StaticPage::empty()), api, relay.clone());

    let request = TranscriptRequest::new("https://www.youtube.com/watch?v=abc123def45&t=3");
    let result = service.get_transcript(&request).await;

    assert_eq!(pages.fetches(), vec![("abc123def45".to_string(), false)]);
    assert_eq!(result.title, "Borrowing in Practice");
    assert_eq!(result.language, "English");
    assert_eq!(result.language_options.len(), 2);
    assert_eq!(result.language_options[0].track_id, "en");
    assert_eq!(result.segments.len(), 4);
    assert_eq!(result.duration_ms, Some(9_000));
    assert_eq!(result.alternate_languages[0].continuation_token, "tok-de");

    assert_eq!(result.chunks.len(), 2);
    assert_eq!(result.chunks[1].start, 100);
    assert_eq!(
        result.text,
        "(00:00) Welcome to the show. Today: borrowing. After the break. (01:40) See you."
    );

    assert_eq!(result.timeline.len(), 2);
    assert_eq!(result.timeline[1].time_text, "01:40");
    assert_eq!(result.timeline[1].video_id, "abc123def45");

    assert_eq!(result.channel.name.as_deref(), Some("Systems Hour"));
    assert_eq!(result.channel.id.as_deref(), Some("systemshour"));
    assert!(relay.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_relay_used_when_private_endpoint_is_empty() {
    let pages = FixedPages::new(WATCH_PAGE);
    let relay = Arc::new(CountingRelay::default());
    let service = service(pages, Arc::new(StaticPage::empty()), FixedApi::empty(), relay.clone());

    let result = service
        .get_transcript(&TranscriptRequest::new("abc123def45").with_timestamp(false))
        .await;

    assert_eq!(result.text, "from the relay");
    let sent = relay.sent.lock().unwrap();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].vss_id, "en");
    assert_eq!(sent[0].video_id, "abc123def45");
}

#[tokio::test]
async fn test_restricted_page_without_fallback_never_calls_relay() {
    let pages = FixedPages::new(WATCH_PAGE);
    let relay = Arc::new(CountingRelay::default());
    let host_page = Arc::new(StaticPage::new(PRIVATE_BADGE));
    let service = service(pages.clone(), host_page, FixedApi::empty(), relay.clone());

    let result = service.get_transcript(&TranscriptRequest::new("abc123def45")).await;

    assert!(result.is_empty());
    assert!(relay.sent.lock().unwrap().is_empty());
    assert!(pages.fetches().iter().all(|(_, restricted)| *restricted));
}

#[tokio::test]
async fn test_restricted_page_falls_back_to_rendered_panel() {
    let config = Config::default();
    let pages = FixedPages::new(WATCH_PAGE);
    let relay = Arc::new(CountingRelay::default());
    let host_page = Arc::new(
        StaticPage::new(PRIVATE_BADGE).with_revealed_on_click(config.panel.toggle_selector.clone(), RENDERED_PANEL),
    );
    let service = service(pages, host_page.clone(), FixedApi::empty(), relay.clone());

    let result = service
        .get_transcript(&TranscriptRequest::new("abc123def45").with_fallback(true))
        .await;

    assert_eq!(result.text, "(00:01) from the panel");
    assert_eq!(result.segments[0].ordinal, Some(0));
    assert_eq!(host_page.clicks(), 1);
    assert!(relay.sent.lock().unwrap().is_empty());
}
