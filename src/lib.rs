/// Snippet Transcript
///
/// Transcript acquisition and chunking engine for video page captures.
/// Reads caption data from a host page, falls back across three extraction
/// strategies and folds the timestamped segments into readable chunks.

pub mod chunker;
pub mod config;
pub mod connection;
pub mod error;
pub mod extraction;
pub mod language;
pub mod page;
pub mod retry;
pub mod service;
pub mod text;

#[cfg(feature = "api")]
pub mod api;

// Re-export main types for easy access
pub use crate::chunker::{Chunker, ProcessedChunk};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::connection::{ConnectionManager, ConnectionState, Notification};
pub use crate::error::{Result, TranscriptError};
pub use crate::extraction::{ExtractionOrchestrator, TranscriptSegment, TranscriptStrategy};
pub use crate::language::{CaptionTrack, LanguageSelector};
pub use crate::page::{HostPage, StaticPage};
pub use crate::retry::RetryExecutor;
pub use crate::service::{TranscriptRequest, TranscriptResult, TranscriptService};
