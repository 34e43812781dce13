//! Error types for transcript acquisition

/// Result type for transcript engine operations
pub type Result<T> = std::result::Result<T, TranscriptError>;

/// Error types for transcript engine operations
#[derive(thiserror::Error, Debug)]
pub enum TranscriptError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Empty response: {0}")]
    EmptyResponse(String),

    #[error("Invalid JSON response: {0}")]
    InvalidJson(String),

    #[error("Captions not found in page markup")]
    CaptionsNotFound,

    #[error("Title not found in page markup")]
    TitleNotFound,

    #[error("No language options found")]
    NoLanguageOptions,

    #[error("No transcript entries found")]
    NoTranscriptEntries,

    #[error("No segments found in the transcript panel")]
    NoSegmentsRendered,

    #[error("No raw transcripts retrieved")]
    NoSegmentsRetrieved,

    #[error("Invalid result on attempt {attempt}")]
    InvalidResult { attempt: u32 },

    #[error("Gave up after {attempts} attempts: {last_error}")]
    RetryExhausted {
        attempts: u32,
        #[source]
        last_error: Box<TranscriptError>,
    },

    #[error("Relay error: {0}")]
    Relay(String),

    #[error("Host page error: {0}")]
    Page(String),

    #[error("Invalid video id: {0}")]
    InvalidVideoId(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TranscriptError {
    /// True for failures the private transcript endpoint may recover from on a second call
    pub fn is_transient_api_failure(&self) -> bool {
        matches!(
            self,
            TranscriptError::HttpStatus { .. }
                | TranscriptError::InvalidJson(_)
                | TranscriptError::NoTranscriptEntries
        )
    }
}

impl From<serde_json::Error> for TranscriptError {
    fn from(err: serde_json::Error) -> Self {
        TranscriptError::InvalidJson(err.to_string())
    }
}
