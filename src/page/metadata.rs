//! Caption metadata embedded in the watch page markup
//!
//! The page exposes no stable schema: the player configuration is an inline
//! script object, so everything here works by slicing the raw text between
//! known markers and handing the fragment to `serde_json`.

use crate::error::{Result, TranscriptError};
use serde::{Deserialize, Serialize};
use tracing::debug;

const CAPTIONS_MARKER: &str = "\"captions\":";
const VIDEO_DETAILS_MARKER: &str = ",\"videoDetails";
const TITLE_MARKER: &str = "\"title\":\"";
const LENGTH_MARKER: &str = "\",\"lengthSeconds\"";
const TRANSCRIPT_ENDPOINT_MARKER: &str = "\"getTranscriptEndpoint\":";
const PARAMS_MARKER: &str = "\"params\":\"";
const OWNER_MARKER: &str = "\"videoOwnerRenderer\":";
const AVATAR_MARKER: &str = ",\"width\":88,\"height\":88},{\"url\":\"";
const CHANNEL_NAME_MARKER: &str = "\"title\":{\"runs\":[{\"text\":\"";
const CHANNEL_HANDLE_MARKER: &str = "\"webCommandMetadata\":{\"url\":\"/@";

/// Caption track list and title read from one page fetch
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionMetadata {
    pub caption_tracks: Vec<RawCaptionTrack>,
    pub title: String,
}

/// One entry of `playerCaptionsTracklistRenderer.captionTracks`
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCaptionTrack {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub name: TrackName,
    #[serde(default)]
    pub vss_id: String,
    #[serde(default)]
    pub language_code: String,
}

impl RawCaptionTrack {
    /// Display name of the track
    pub fn display_name(&self) -> String {
        self.name.text()
    }
}

/// Track display name, either a plain string or a list of runs
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackName {
    pub simple_text: Option<String>,
    #[serde(default)]
    pub runs: Vec<TextRun>,
}

impl TrackName {
    pub fn text(&self) -> String {
        match &self.simple_text {
            Some(text) => text.clone(),
            None => self.runs.iter().map(|run| run.text.as_str()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct TextRun {
    #[serde(default)]
    pub text: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionsFragment {
    player_captions_tracklist_renderer: TracklistRenderer,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    caption_tracks: Vec<RawCaptionTrack>,
}

/// Owning channel of the video; every field is optional
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Parse caption tracks and title from the raw page
pub fn parse(html: &str) -> Result<CaptionMetadata> {
    let caption_tracks = caption_tracks(html)?;
    let title = title(html)?;
    debug!("Found {} caption tracks for '{}'", caption_tracks.len(), title);

    Ok(CaptionMetadata { caption_tracks, title })
}

/// Caption tracks from the embedded player configuration
pub fn caption_tracks(html: &str) -> Result<Vec<RawCaptionTrack>> {
    let fragment = after(html, CAPTIONS_MARKER).ok_or(TranscriptError::CaptionsNotFound)?;
    let fragment = before(fragment, VIDEO_DETAILS_MARKER);
    let fragment: String = fragment.chars().filter(|c| *c != '\n' && *c != '\r').collect();

    let parsed: CaptionsFragment =
        serde_json::from_str(&fragment).map_err(|_| TranscriptError::CaptionsNotFound)?;

    Ok(parsed.player_captions_tracklist_renderer.caption_tracks)
}

/// Video title, decoded from its JSON string form
pub fn title(html: &str) -> Result<String> {
    let raw = match html.find(LENGTH_MARKER) {
        Some(end) => {
            let head = &html[..end];
            let start = head.rfind(TITLE_MARKER).ok_or(TranscriptError::TitleNotFound)?;
            &head[start + TITLE_MARKER.len()..]
        }
        None => {
            let rest = after(html, TITLE_MARKER).ok_or(TranscriptError::TitleNotFound)?;
            before(rest, "\"")
        }
    };

    Ok(decode_json_string(raw))
}

/// Parameter string for the private transcript endpoint, blank when absent
pub fn transcript_params(html: &str) -> String {
    after(html, TRANSCRIPT_ENDPOINT_MARKER)
        .and_then(|rest| after(rest, PARAMS_MARKER))
        .map(|rest| before(rest, "\"").to_string())
        .unwrap_or_default()
}

/// Channel name, handle and avatar from the owner renderer fragment
pub fn channel(html: &str) -> ChannelInfo {
    let mut channel = ChannelInfo::default();

    let Some(owner) = after(html, OWNER_MARKER) else {
        return channel;
    };

    let Some(rest) = after(owner, AVATAR_MARKER) else {
        return channel;
    };
    channel.avatar_url = non_empty(before(rest, "\""));

    let Some(rest) = after(rest, CHANNEL_NAME_MARKER) else {
        return channel;
    };
    channel.name = non_empty(before(rest, "\"")).map(|name| decode_json_string(&name));

    let Some(rest) = after(rest, CHANNEL_HANDLE_MARKER) else {
        return channel;
    };
    channel.id = non_empty(before(rest, "\""));

    channel
}

fn after<'a>(haystack: &'a str, marker: &str) -> Option<&'a str> {
    haystack.find(marker).map(|index| &haystack[index + marker.len()..])
}

fn before<'a>(haystack: &'a str, marker: &str) -> &'a str {
    match haystack.find(marker) {
        Some(index) => &haystack[..index],
        None => haystack,
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn decode_json_string(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{}\"", raw)).unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<script>var ytInitialPlayerResponse = {"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[
{"baseUrl":"https://example.com/api/timedtext?lang=es","name":{"simpleText":"Spanish"},"vssId":".es","languageCode":"es"},
{"baseUrl":"https://example.com/api/timedtext?lang=en","name":{"simpleText":"English"},"vssId":".en","languageCode":"en"},
{"baseUrl":"https://example.com/api/timedtext?lang=en&kind=asr","name":{"runs":[{"text":"English (auto-generated)"}]},"vssId":"a.en","languageCode":"en"}
]}},"videoDetails":{"videoId":"abc123def45","title":"Rust & Friends: Ownership","lengthSeconds":"812"}};</script>
<script>var ytInitialData = {"engagementPanels":[{"getTranscriptEndpoint":{"params":"CgthYmMxMjNkZWY0NQ%3D%3D"}}],
"videoOwnerRenderer":{"thumbnail":{"thumbnails":[{"url":"https://yt3.example/s48","width":48,"height":48},{"url":"https://yt3.example/s88","width":88,"height":88},{"url":"https://yt3.example/s176","width":176,"height":176}]},"title":{"runs":[{"text":"Rustacean Station","navigationEndpoint":{"commandMetadata":{"webCommandMetadata":{"url":"/@rustaceans","webPageType":"WEB_PAGE_TYPE_CHANNEL"}}}}]}}}</script>"#;

    #[test]
    fn test_parse_caption_tracks_and_title() {
        let metadata = parse(PAGE).unwrap();
        assert_eq!(metadata.caption_tracks.len(), 3);
        assert_eq!(metadata.caption_tracks[0].display_name(), "Spanish");
        assert_eq!(metadata.caption_tracks[1].vss_id, ".en");
        assert_eq!(metadata.caption_tracks[2].display_name(), "English (auto-generated)");
        assert_eq!(metadata.title, "Rust & Friends: Ownership");
    }

    #[test]
    fn test_missing_captions_marker() {
        let err = parse("<html><body>no player here</body></html>").unwrap_err();
        assert!(matches!(err, TranscriptError::CaptionsNotFound));
    }

    #[test]
    fn test_unparsable_captions_fragment() {
        let html = r#"{"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"#;
        assert!(matches!(caption_tracks(html), Err(TranscriptError::CaptionsNotFound)));
    }

    #[test]
    fn test_title_missing() {
        assert!(matches!(title("{}"), Err(TranscriptError::TitleNotFound)));
    }

    #[test]
    fn test_transcript_params() {
        assert_eq!(transcript_params(PAGE), "CgthYmMxMjNkZWY0NQ%3D%3D");
        assert_eq!(transcript_params("nothing"), "");
    }

    #[test]
    fn test_channel_info() {
        let channel = channel(PAGE);
        assert_eq!(channel.avatar_url.as_deref(), Some("https://yt3.example/s176"));
        assert_eq!(channel.name.as_deref(), Some("Rustacean Station"));
        assert_eq!(channel.id.as_deref(), Some("rustaceans"));
    }

    #[test]
    fn test_channel_info_partial() {
        let html = r#""videoOwnerRenderer":{"thumbnail":{}}"#;
        assert_eq!(channel(html), ChannelInfo::default());
    }
}
