//! Host page access: the rendered document, its visibility state, and the raw watch page
//!
//! The engine never owns a browser. Whatever drives the page (an extension
//! content script, a headless browser, a saved snapshot) is reached through
//! [`HostPage`], which only needs to hand back the current markup and
//! perform a click.

pub mod fetcher;
pub mod metadata;

pub use fetcher::{HostPageFetcher, PageSource};
pub use metadata::{CaptionMetadata, ChannelInfo, RawCaptionTrack};

use crate::error::{Result, TranscriptError};
use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::atomic::{AtomicU32, Ordering};
use tokio::sync::RwLock;
use tracing::debug;

/// Badge shown next to the title of private videos
const VISIBILITY_BADGE_SELECTOR: &str = "#title > ytd-badge-supported-renderer > div.badge";

/// The rendered page the capture was started from
#[async_trait]
pub trait HostPage: Send + Sync {
    /// Current rendered markup
    async fn markup(&self) -> Result<String>;

    /// Click the first element matching the selector; `false` when nothing matched
    async fn click(&self, selector: &str) -> Result<bool>;
}

/// In-memory page snapshot.
///
/// Optionally swaps in a second document when a given toggle is clicked,
/// which is how a saved page with a collapsed transcript panel behaves.
pub struct StaticPage {
    markup: RwLock<String>,
    revealed: Option<(String, String)>,
    clicks: AtomicU32,
}

impl StaticPage {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: RwLock::new(markup.into()),
            revealed: None,
            clicks: AtomicU32::new(0),
        }
    }

    /// A page with no rendered content
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    /// Replace the markup with `revealed` once `toggle_selector` is clicked
    pub fn with_revealed_on_click(mut self, toggle_selector: impl Into<String>, revealed: impl Into<String>) -> Self {
        self.revealed = Some((toggle_selector.into(), revealed.into()));
        self
    }

    /// Number of successful clicks so far
    pub fn clicks(&self) -> u32 {
        self.clicks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl HostPage for StaticPage {
    async fn markup(&self) -> Result<String> {
        Ok(self.markup.read().await.clone())
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        let current = self.markup.read().await.clone();
        if !selector_matches(&current, selector)? {
            return Ok(false);
        }

        self.clicks.fetch_add(1, Ordering::SeqCst);
        if let Some((toggle, revealed)) = &self.revealed {
            if toggle == selector {
                debug!("Toggle {} clicked, revealing panel markup", selector);
                *self.markup.write().await = revealed.clone();
            }
        }
        Ok(true)
    }
}

/// Parse a CSS selector, reporting bad selectors as page errors
pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| TranscriptError::Page(format!("invalid selector '{}': {:?}", selector, e)))
}

/// True when at least one element in the markup matches the selector
pub fn selector_matches(markup: &str, selector: &str) -> Result<bool> {
    let selector = parse_selector(selector)?;
    let document = Html::parse_document(markup);
    let matched = document.select(&selector).next().is_some();
    Ok(matched)
}

/// Page-visibility heuristic: a private video carries a "Private" badge next to its title
pub fn is_restricted(markup: &str) -> bool {
    let Ok(selector) = Selector::parse(VISIBILITY_BADGE_SELECTOR) else {
        return false;
    };
    let document = Html::parse_document(markup);
    let restricted = document
        .select(&selector)
        .any(|badge| badge.text().collect::<String>().trim().contains("Private"));
    restricted
}

/// Accept a bare video id or a watch, short or embed URL and return the id
pub fn resolve_video_id(input: &str) -> Result<String> {
    let input = input.trim();
    if is_video_id(input) {
        return Ok(input.to_string());
    }

    let candidate = if input.starts_with("http://") || input.starts_with("https://") {
        input.to_string()
    } else {
        format!("https://{}", input)
    };

    let parsed = url::Url::parse(&candidate).map_err(|_| TranscriptError::InvalidVideoId(input.to_string()))?;
    let host = parsed.host_str().unwrap_or_default();

    if host == "youtube.com" || host.ends_with(".youtube.com") {
        if let Some((_, id)) = parsed.query_pairs().find(|(key, _)| key == "v") {
            if is_video_id(&id) {
                return Ok(id.into_owned());
            }
        }
        if let Some(segments) = parsed.path_segments() {
            let segments: Vec<&str> = segments.collect();
            if segments.len() >= 2 && matches!(segments[0], "embed" | "shorts" | "live") && is_video_id(segments[1]) {
                return Ok(segments[1].to_string());
            }
        }
    } else if host == "youtu.be" {
        if let Some(id) = parsed.path_segments().and_then(|mut s| s.next()) {
            if is_video_id(id) {
                return Ok(id.to_string());
            }
        }
    }

    Err(TranscriptError::InvalidVideoId(input.to_string()))
}

fn is_video_id(candidate: &str) -> bool {
    candidate.len() == 11 && candidate.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
