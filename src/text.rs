//! Caption text normalization and timestamp helpers

use regex::Regex;
use std::sync::OnceLock;

fn tag_pattern() -> &'static Regex {
    static TAGS: OnceLock<Regex> = OnceLock::new();
    TAGS.get_or_init(|| Regex::new(r"<[^>]*>").expect("valid markup tag pattern"))
}

/// Strip markup tags and decode HTML entities from raw caption text.
///
/// Tags are removed before decoding so that an encoded `&lt;` survives as a
/// literal `<` in the output.
pub fn normalize_text(raw: &str) -> String {
    let stripped = tag_pattern().replace_all(raw, "");
    html_escape::decode_html_entities(&stripped).trim().to_string()
}

/// Collapse embedded line breaks into single spaces
pub fn collapse_newlines(text: &str) -> String {
    text.replace("\r\n", " ").replace(['\n', '\r'], " ")
}

/// Parse a displayed timestamp into whole seconds.
///
/// Accepts `H:MM:SS`, `MM:SS` and `SS`. Returns `None` for anything else.
pub fn parse_timestamp(text: &str) -> Option<u64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }

    let mut values = Vec::with_capacity(parts.len());
    for part in &parts {
        values.push(part.trim().parse::<u64>().ok()?);
    }

    match values.as_slice() {
        [hours, minutes, seconds] => hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(*seconds),
        [minutes, seconds] => minutes.checked_mul(60)?.checked_add(*seconds),
        [seconds] => Some(*seconds),
        _ => None,
    }
}

/// Format seconds for display: `MM:SS` under an hour, `HH:MM:SS` otherwise
pub fn format_timestamp(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours == 0 {
        format!("{:02}:{:02}", minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}
