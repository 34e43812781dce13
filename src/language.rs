//! Caption track ranking

use crate::page::RawCaptionTrack;
use serde::{Deserialize, Serialize};

/// A caption track offered by the page, ready for extraction
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    /// Display name, e.g. `English (auto-generated)`
    pub language: String,
    pub retrieval_link: String,
    pub title: String,
    /// Provider track id with the leading `.` removed
    pub track_id: String,
}

/// Orders caption tracks so the preferred language comes first
#[derive(Debug, Clone)]
pub struct LanguageSelector {
    preferred: String,
}

impl LanguageSelector {
    pub fn new(preferred: impl Into<String>) -> Self {
        Self {
            preferred: preferred.into(),
        }
    }

    pub fn preferred(&self) -> &str {
        &self.preferred
    }

    /// Rank tracks: exact preferred name, then names containing it, then the rest.
    ///
    /// Tracks sharing a display name collapse into one entry that keeps the
    /// position of the first occurrence and the data of the last.
    pub fn rank(&self, tracks: &[RawCaptionTrack], title: &str) -> Vec<CaptionTrack> {
        let mut unique: Vec<(String, &RawCaptionTrack)> = Vec::new();
        for track in tracks {
            let name = track.display_name();
            match unique.iter_mut().find(|(existing, _)| *existing == name) {
                Some(entry) => entry.1 = track,
                None => unique.push((name, track)),
            }
        }

        // Both sorts are stable, so the second pass keeps the first one's order among ties
        unique.sort_by_key(|(name, _)| !name.contains(self.preferred.as_str()));
        unique.sort_by_key(|(name, _)| *name != self.preferred);

        unique
            .into_iter()
            .map(|(language, track)| CaptionTrack {
                language,
                retrieval_link: track.base_url.clone(),
                title: title.to_string(),
                track_id: clean_track_id(&track.vss_id),
            })
            .collect()
    }
}

impl Default for LanguageSelector {
    fn default() -> Self {
        Self::new("English")
    }
}

fn clean_track_id(vss_id: &str) -> String {
    vss_id.strip_prefix('.').unwrap_or(vss_id).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::metadata::TrackName;

    fn track(name: &str, vss_id: &str, url: &str) -> RawCaptionTrack {
        RawCaptionTrack {
            base_url: url.to_string(),
            name: TrackName {
                simple_text: Some(name.to_string()),
                runs: Vec::new(),
            },
            vss_id: vss_id.to_string(),
            language_code: String::new(),
        }
    }

    fn names(ranked: &[CaptionTrack]) -> Vec<&str> {
        ranked.iter().map(|t| t.language.as_str()).collect()
    }

    #[test]
    fn test_preferred_language_first() {
        let tracks = vec![
            track("Spanish", ".es", "u1"),
            track("English", ".en", "u2"),
            track("English (auto)", "a.en", "u3"),
        ];
        let ranked = LanguageSelector::default().rank(&tracks, "Talk");
        assert_eq!(names(&ranked), vec!["English", "English (auto)", "Spanish"]);
        assert!(ranked.iter().all(|t| t.title == "Talk"));
    }

    #[test]
    fn test_containment_beats_unrelated() {
        let tracks = vec![
            track("French", ".fr", "u1"),
            track("English (auto)", "a.en", "u2"),
            track("German", ".de", "u3"),
        ];
        let ranked = LanguageSelector::default().rank(&tracks, "");
        assert_eq!(names(&ranked), vec!["English (auto)", "French", "German"]);
    }

    #[test]
    fn test_duplicates_keep_first_position_last_value() {
        let tracks = vec![
            track("Spanish", ".es", "first"),
            track("German", ".de", "u2"),
            track("Spanish", ".es-419", "last"),
        ];
        let ranked = LanguageSelector::default().rank(&tracks, "");
        assert_eq!(names(&ranked), vec!["Spanish", "German"]);
        assert_eq!(ranked[0].retrieval_link, "last");
        assert_eq!(ranked[0].track_id, "es-419");
    }

    #[test]
    fn test_track_id_strips_single_dot() {
        assert_eq!(clean_track_id(".en"), "en");
        assert_eq!(clean_track_id("a.en"), "a.en");
        assert_eq!(clean_track_id("..en"), ".en");
        assert_eq!(clean_track_id(""), "");
    }

    #[test]
    fn test_empty_input() {
        assert!(LanguageSelector::default().rank(&[], "title").is_empty());
    }

    #[test]
    fn test_custom_preferred_language() {
        let tracks = vec![track("English", ".en", "u1"), track("Spanish", ".es", "u2")];
        let ranked = LanguageSelector::new("Spanish").rank(&tracks, "");
        assert_eq!(names(&ranked), vec!["Spanish", "English"]);
    }
}
